//! Endpoint id generation: `zhwe_` + a 20-char lexicographically-sortable
//! globally unique token, mirroring the `rs/xid` token the source embeds.

const ENDPOINT_ID_PREFIX: &str = "zhwe_";

/// Generate a new endpoint id: `zhwe_` followed by a 20-character xid.
pub fn generate_endpoint_id() -> String {
    format!("{ENDPOINT_ID_PREFIX}{}", xid::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_id_format() {
        let id = generate_endpoint_id();
        assert!(id.starts_with(ENDPOINT_ID_PREFIX));
        assert_eq!(id.len(), ENDPOINT_ID_PREFIX.len() + 20);
    }

    #[test]
    fn test_endpoint_ids_are_unique() {
        let a = generate_endpoint_id();
        let b = generate_endpoint_id();
        assert_ne!(a, b);
    }
}
