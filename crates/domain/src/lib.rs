pub mod api_key;
pub mod delivery;
pub mod endpoint;
pub mod event;

pub use api_key::ApiKey;
pub use delivery::{EventDelivery, EventDeliveryAttempt, WebhookDeliveryJob};
pub use endpoint::Endpoint;
pub use event::{Event, EventMappingJob};
