use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-supplied resumption watermark.
///
/// The review service hands out plain JSON numbers (integral in most
/// deployments, fractional in some). The value is echoed back to the server
/// verbatim, so the number is kept as received instead of being coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(serde_json::Number);

impl Timestamp {
    /// Numeric value used only for ordering comparisons.
    pub fn as_f64(&self) -> f64 {
        self.0.as_f64().unwrap_or_default()
    }

    /// Whether this watermark lies strictly before `other`.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.as_f64() < other.as_f64()
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value.into())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One reported review result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub lesson_title: String,
    /// Path relative to the review service origin, e.g. `/lessons/1`.
    pub lesson_url: String,
    pub is_negative: bool,
}

/// Classified result of one long-poll request.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Server hold time elapsed with nothing new.
    Timeout { next_timestamp: Timestamp },
    /// One or more attempts were reviewed since the cursor.
    Found {
        next_timestamp: Timestamp,
        attempts: Vec<Attempt>,
    },
    /// Well-formed JSON we do not recognise. Never advances the cursor.
    Unexpected { raw_payload: Value },
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RawResponse {
    Timeout {
        timestamp_to_request: Timestamp,
    },
    Found {
        last_attempt_timestamp: Timestamp,
        #[serde(default)]
        new_attempts: Vec<Attempt>,
    },
}

impl PollOutcome {
    /// Classify a decoded response body.
    ///
    /// Anything that does not match one of the two known shapes (missing or
    /// unknown `status`, missing timestamp, malformed attempts) becomes
    /// [`PollOutcome::Unexpected`] carrying the payload as received.
    pub fn from_json(payload: Value) -> Self {
        match RawResponse::deserialize(&payload) {
            Ok(RawResponse::Timeout {
                timestamp_to_request,
            }) => PollOutcome::Timeout {
                next_timestamp: timestamp_to_request,
            },
            Ok(RawResponse::Found {
                last_attempt_timestamp,
                new_attempts,
            }) => PollOutcome::Found {
                next_timestamp: last_attempt_timestamp,
                attempts: new_attempts,
            },
            Err(_) => PollOutcome::Unexpected {
                raw_payload: payload,
            },
        }
    }

    /// The watermark the server asks us to resume from, if the response is trusted.
    pub fn next_timestamp(&self) -> Option<&Timestamp> {
        match self {
            PollOutcome::Timeout { next_timestamp } => Some(next_timestamp),
            PollOutcome::Found { next_timestamp, .. } => Some(next_timestamp),
            PollOutcome::Unexpected { .. } => None,
        }
    }
}

/// Resumption cursor for the long-poll stream.
///
/// Lives for the process lifetime only; a restart polls from "now".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollState {
    timestamp: Option<Timestamp>,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.timestamp.as_ref()
    }

    /// Adopt the server-supplied watermark.
    ///
    /// Returns the previous value when the new one lies before it, so the
    /// caller can report the regression. The server value is adopted either way.
    pub fn advance(&mut self, next: Timestamp) -> Option<Timestamp> {
        let regressed = self
            .timestamp
            .as_ref()
            .filter(|current| next.is_before(current))
            .cloned();
        self.timestamp = Some(next);
        regressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timeout_response() {
        let outcome = PollOutcome::from_json(json!({
            "status": "timeout",
            "timestamp_to_request": 1000
        }));
        assert_eq!(
            outcome,
            PollOutcome::Timeout {
                next_timestamp: Timestamp::from(1000)
            }
        );
    }

    #[test]
    fn test_found_response_keeps_order() {
        let outcome = PollOutcome::from_json(json!({
            "status": "found",
            "last_attempt_timestamp": 2000,
            "new_attempts": [
                {"lesson_title": "Async", "lesson_url": "/lessons/1", "is_negative": false},
                {"lesson_title": "Traits", "lesson_url": "/lessons/2", "is_negative": true, "submitted_at": "x"}
            ]
        }));

        match outcome {
            PollOutcome::Found {
                next_timestamp,
                attempts,
            } => {
                assert_eq!(next_timestamp, Timestamp::from(2000));
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].lesson_title, "Async");
                assert_eq!(attempts[1].lesson_title, "Traits");
                assert!(attempts[1].is_negative);
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status_is_unexpected() {
        let payload = json!({"status": "maintenance"});
        assert_eq!(
            PollOutcome::from_json(payload.clone()),
            PollOutcome::Unexpected {
                raw_payload: payload
            }
        );
    }

    #[test]
    fn test_missing_status_is_unexpected() {
        let payload = json!({"timestamp_to_request": 5});
        let outcome = PollOutcome::from_json(payload);
        assert!(matches!(outcome, PollOutcome::Unexpected { .. }));
        assert!(outcome.next_timestamp().is_none());
    }

    #[test]
    fn test_found_without_timestamp_is_unexpected() {
        let outcome = PollOutcome::from_json(json!({"status": "found", "new_attempts": []}));
        assert!(matches!(outcome, PollOutcome::Unexpected { .. }));
    }

    #[test]
    fn test_fractional_timestamp_echoed_verbatim() {
        let outcome = PollOutcome::from_json(json!({
            "status": "timeout",
            "timestamp_to_request": 1555493856.4415
        }));
        let ts = outcome.next_timestamp().unwrap();
        assert_eq!(ts.to_string(), "1555493856.4415");
    }

    #[test]
    fn test_poll_state_advance_reports_regression() {
        let mut state = PollState::new();
        assert!(state.timestamp().is_none());

        assert_eq!(state.advance(Timestamp::from(2000)), None);
        assert_eq!(state.timestamp(), Some(&Timestamp::from(2000)));

        let regressed = state.advance(Timestamp::from(1500));
        assert_eq!(regressed, Some(Timestamp::from(2000)));
        assert_eq!(state.timestamp(), Some(&Timestamp::from(1500)));
    }
}
