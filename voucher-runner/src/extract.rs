//! Response extraction.
//!
//! The engine never sees raw bodies; these helpers turn upstream text
//! into the minimal structured fields the pipelines consume. Anything
//! the patterns cannot find is reported as absent, never guessed.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static IDENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-user-id="([^"]+)""#).expect("static regex"));

static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""code":"([^"]+)""#).expect("static regex"));

static PLAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""plan":\s*\{[^{}]*"name":"([^"]+)""#).expect("static regex"));

static USES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""uses":\s*(\d+)"#).expect("static regex"));

/// Marker the validation endpoint returns for identifiers it has
/// never issued.
const UNKNOWN_MARKER: &str = "Unknown Code";

/// Plan tier attached to a valid code. Plans that are neither
/// monthly nor yearly land in the quarterly bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTier {
    Monthly,
    Quarterly,
    Yearly,
}

impl PlanTier {
    fn from_plan_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("monthly") {
            PlanTier::Monthly
        } else if lower.contains("yearly") {
            PlanTier::Yearly
        } else {
            PlanTier::Quarterly
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlanTier::Monthly => "1 Month",
            PlanTier::Quarterly => "3 Months",
            PlanTier::Yearly => "1 Year",
        }
    }
}

/// Classified state of a checked code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckVerdict {
    Unknown,
    Used,
    Valid(PlanTier),
}

/// Identity probe: the embedded account identifier, if present.
pub fn identity(body: &str) -> Option<String> {
    IDENTITY_RE
        .captures(body)
        .map(|caps| caps[1].to_string())
}

/// Acquisition: the freshly issued code, if present.
pub fn claim_code(body: &str) -> Option<String> {
    CODE_RE.captures(body).map(|caps| caps[1].to_string())
}

/// Validation: verdict for a checked code, or `None` when the body
/// has neither a uses flag nor the unknown marker.
pub fn check_verdict(body: &str) -> Option<CheckVerdict> {
    if body.contains(UNKNOWN_MARKER) {
        return Some(CheckVerdict::Unknown);
    }

    let uses: u32 = USES_RE.captures(body)?.get(1)?.as_str().parse().ok()?;
    if uses > 0 {
        return Some(CheckVerdict::Used);
    }

    let tier = PLAN_RE
        .captures(body)
        .map(|caps| PlanTier::from_plan_name(&caps[1]))
        .unwrap_or(PlanTier::Quarterly);

    Some(CheckVerdict::Valid(tier))
}

/// Rate-limit payload: the server's suggested wait, in seconds.
pub fn retry_after_hint(body: &str) -> Option<Duration> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let secs = value.get("retry_after")?.as_f64()?;
    if secs.is_sign_negative() {
        return None;
    }
    Some(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_embedded_identity() {
        let body = r#"<div class="profile" data-user-id="9f1c-aa02">x</div>"#;
        assert_eq!(identity(body).as_deref(), Some("9f1c-aa02"));
        assert_eq!(identity("<html></html>"), None);
    }

    #[test]
    fn finds_the_issued_code() {
        let body = r#"{"offer":{"code":"WXYZ1234","expires":null}}"#;
        assert_eq!(claim_code(body).as_deref(), Some("WXYZ1234"));
        assert_eq!(claim_code(r#"{"error":"exhausted"}"#), None);
    }

    #[test]
    fn classifies_verdicts() {
        assert_eq!(
            check_verdict(r#"{"uses": 0, "plan": {"id": 7, "name": "Premium Monthly"}}"#),
            Some(CheckVerdict::Valid(PlanTier::Monthly))
        );
        assert_eq!(
            check_verdict(r#"{"uses": 0, "plan": {"name": "Premium Yearly"}}"#),
            Some(CheckVerdict::Valid(PlanTier::Yearly))
        );
        // No recognizable plan: default bucket.
        assert_eq!(
            check_verdict(r#"{"uses": 0}"#),
            Some(CheckVerdict::Valid(PlanTier::Quarterly))
        );
        assert_eq!(check_verdict(r#"{"uses": 1}"#), Some(CheckVerdict::Used));
        assert_eq!(
            check_verdict(r#"{"message": "Unknown Code"}"#),
            Some(CheckVerdict::Unknown)
        );
        assert_eq!(check_verdict(r#"{"weird": true}"#), None);
    }

    #[test]
    fn parses_the_wait_hint() {
        let body = r#"{"message": "You are being rate limited.", "retry_after": 1.5}"#;
        assert_eq!(retry_after_hint(body), Some(Duration::from_secs_f64(1.5)));
        assert_eq!(retry_after_hint(r#"{"message": "slow down"}"#), None);
        assert_eq!(retry_after_hint("not json"), None);
    }
}
