/*!
 * HTTP send + outcome classification for a single delivery attempt (§4.6
 * steps 4-8).
 */

use std::time::{Duration, Instant};
use zebrahook_domain::delivery::DeliveryOutcome;

/// The result of attempting to send one webhook over HTTP.
#[derive(Debug, Clone)]
pub struct SendResult {
    pub outcome: DeliveryOutcome,
    pub http_status_code: Option<i32>,
    pub http_body_response: Option<String>,
    pub http_response_time_secs: f32,
}

/// Owns the shared HTTP client every delivery consumer sends through.
#[derive(Clone)]
pub struct Sender {
    client: reqwest::Client,
    user_agent: String,
    signature_header_name: String,
}

impl Sender {
    pub fn new(timeout: Duration, user_agent: String, signature_header_name: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            user_agent,
            signature_header_name,
        })
    }

    /// Sign and POST `body` to `url`, classifying the outcome per §4.6.
    pub async fn send(&self, url: &str, body: &str, signature_header_value: &str) -> SendResult {
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("User-Agent", &self.user_agent)
            .header(self.signature_header_name.as_str(), signature_header_value)
            .body(body.to_string())
            .send()
            .await;

        let elapsed_secs = round_to_hundredths(start.elapsed());

        match response {
            Ok(resp) => {
                let status = resp.status();
                let http_status_code = Some(status.as_u16() as i32);
                let body_text = resp.text().await.unwrap_or_default();
                let http_body_response = Some(truncate_at_char_boundary(&body_text, 200));

                let outcome = if status.is_success() {
                    DeliveryOutcome::Success
                } else {
                    DeliveryOutcome::ErrorResponse
                };

                SendResult {
                    outcome,
                    http_status_code,
                    http_body_response,
                    http_response_time_secs: elapsed_secs,
                }
            }
            Err(e) => {
                let outcome = if e.is_timeout() {
                    DeliveryOutcome::ErrorTimeout
                } else {
                    DeliveryOutcome::ErrorNetwork
                };

                SendResult {
                    outcome,
                    http_status_code: None,
                    http_body_response: Some(truncate_at_char_boundary(&e.to_string(), 200)),
                    http_response_time_secs: elapsed_secs,
                }
            }
        }
    }
}

fn round_to_hundredths(d: Duration) -> f32 {
    (d.as_secs_f32() * 100.0).round() / 100.0
}

/// Truncate `s` to at most `max_bytes` bytes, backing off to the nearest
/// preceding UTF-8 char boundary rather than splitting a multi-byte char.
fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate_at_char_boundary("hello", 200), "hello");
    }

    #[test]
    fn test_truncate_long_ascii() {
        let s = "a".repeat(300);
        let truncated = truncate_at_char_boundary(&s, 200);
        assert_eq!(truncated.len(), 200);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // Each 'é' is 2 bytes in UTF-8; 100 of them is 200 bytes, landing
        // exactly on a boundary only if the cut doesn't split a char.
        let s = "é".repeat(150);
        let truncated = truncate_at_char_boundary(&s, 199);
        assert!(truncated.len() <= 199);
        assert!(s.is_char_boundary(truncated.len()));
        // re-encoding must not panic or lose partial bytes
        assert!(truncated.chars().count() > 0);
    }

    #[tokio::test]
    async fn test_send_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let sender = Sender::new(Duration::from_secs(5), "Zebrahook".into(), "Zebrahook-Signature".into()).unwrap();
        let result = sender
            .send(&format!("{}/hook", server.url()), "{}", "t=1,v1=abc")
            .await;

        mock.assert_async().await;
        assert_eq!(result.outcome, DeliveryOutcome::Success);
        assert_eq!(result.http_status_code, Some(200));
        assert_eq!(result.http_body_response.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_send_error_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let sender = Sender::new(Duration::from_secs(5), "Zebrahook".into(), "Zebrahook-Signature".into()).unwrap();
        let result = sender
            .send(&format!("{}/hook", server.url()), "{}", "t=1,v1=abc")
            .await;

        assert_eq!(result.outcome, DeliveryOutcome::ErrorResponse);
        assert_eq!(result.http_status_code, Some(500));
    }

    #[tokio::test]
    async fn test_send_network_error() {
        let sender = Sender::new(Duration::from_secs(1), "Zebrahook".into(), "Zebrahook-Signature".into()).unwrap();
        let result = sender
            .send("http://127.0.0.1:1", "{}", "t=1,v1=abc")
            .await;

        assert_eq!(result.outcome, DeliveryOutcome::ErrorNetwork);
        assert_eq!(result.http_status_code, None);
    }
}
