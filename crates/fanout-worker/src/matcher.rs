/*!
 * Endpoint matcher (C5, §4.4).
 *
 * An endpoint subscribes to an event type if any of its `enabled_events`
 * patterns is `"*"`, the literal event type, or a `p1.p2.….*` prefix of it.
 * We build one alternation regex per event and ask Postgres to match it
 * against each endpoint's `enabled_events` array, unnested.
 */

use sqlx::PgExecutor;
use zebrahook_domain::endpoint::MatchedEndpoint;

/// Build `(full|p1.*|p1.p2.*|…)` for `event_type`, mirroring
/// `buildEventSearchRegex` from the source this was distilled from.
pub fn build_event_search_regex(event_type: &str) -> String {
    let segments: Vec<&str> = event_type.split('.').collect();

    let mut alternatives = event_type.to_string();
    for i in 0..segments.len() {
        alternatives.push('|');
        alternatives.push_str(&segments[0..=i].join("."));
        alternatives.push_str(".*");
    }

    format!("({alternatives})")
}

/// Pure predicate version of the same rule (I7), usable without a database —
/// exercised directly by unit tests and available for in-process checks.
pub fn pattern_matches(pattern: &str, event_type: &str) -> bool {
    if pattern == "*" || pattern == event_type {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(".*") {
        return event_type == prefix || event_type.starts_with(&format!("{prefix}."));
    }
    false
}

/// Query the `enabled` endpoints subscribed to `event_type` (§4.4, §4.7
/// `find_enabled_subscribed_endpoints`). Takes any Postgres executor so it
/// can run against a plain pool or inside the fan-out worker's transaction.
pub async fn find_matching_endpoints<'c, E>(
    executor: E,
    event_type: &str,
) -> Result<Vec<MatchedEndpoint>, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    let regex = build_event_search_regex(event_type);

    sqlx::query_as::<_, MatchedEndpoint>(
        r#"
        SELECT DISTINCT x.id
        FROM (
            SELECT id, unnest(enabled_events) AS enabled_event
            FROM endpoints
            WHERE status = 'enabled'
        ) x
        WHERE x.enabled_event ~ $1 OR x.enabled_event = '*'
        "#,
    )
    .bind(regex)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_regex_single_segment() {
        assert_eq!(build_event_search_regex("shipped"), "(shipped|shipped.*)");
    }

    #[test]
    fn test_build_regex_multi_segment() {
        let regex = build_event_search_regex("merchant-1.order.shipped");
        assert_eq!(
            regex,
            "(merchant-1.order.shipped|merchant-1.*|merchant-1.order.*|merchant-1.order.shipped.*)"
        );
    }

    #[test]
    fn test_pattern_matches_wildcard() {
        assert!(pattern_matches("*", "merchant-1.order.shipped"));
    }

    #[test]
    fn test_pattern_matches_literal() {
        assert!(pattern_matches(
            "merchant-1.order.shipped",
            "merchant-1.order.shipped"
        ));
        assert!(!pattern_matches(
            "merchant-1.order.shipped",
            "merchant-1.order.refunded"
        ));
    }

    #[test]
    fn test_pattern_matches_prefix_wildcard() {
        assert!(pattern_matches("merchant-1.order.*", "merchant-1.order.shipped"));
        assert!(pattern_matches("merchant-1.order.*", "merchant-1.order"));
        assert!(!pattern_matches("merchant-1.order.*", "merchant-1.refund.issued"));
        assert!(!pattern_matches("other.*", "merchant-1.order.shipped"));
    }

    /// The regex we hand to Postgres (POSIX ERE) must agree with our pure
    /// predicate for plausible `enabled_events` entries, since a divergence
    /// here would mean the DB and the in-process rule disagree on matches.
    #[test]
    fn test_built_regex_agrees_with_pure_predicate() {
        let event_type = "merchant-1.order.shipped";
        let regex = regex::Regex::new(&build_event_search_regex(event_type)).unwrap();

        let candidates = [
            "merchant-1.order.shipped",
            "merchant-1.*",
            "merchant-1.order.*",
            "merchant-1.refund.*",
            "other.*",
        ];

        for pattern in candidates {
            assert_eq!(
                regex.is_match(pattern),
                pattern_matches(pattern, event_type),
                "disagreement for pattern {pattern:?}"
            );
        }
    }
}
