//! Job data model — submissions, keys, outcomes, and read status.

use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel returned on the read path when no outcome is stored for a key.
pub const RESULT_NOT_AVAILABLE: &str = "Result not available yet.";

/// Raw submission as it arrives from a client.
///
/// Every field is optional here; `validate()` turns it into a [`TripRequest`].
/// Fields accept JSON strings or numbers (`"budget": 20000`, `20000.0` and
/// `"20000"` are the same request). Any other JSON type reads as missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub budget: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub num_people: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub trip_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub month: Option<String>,
}

impl SubmitRequest {
    /// Validate that all five fields are present and non-blank.
    ///
    /// Returns the names of the missing fields on failure, in declaration order.
    pub fn validate(&self) -> Result<TripRequest, Vec<&'static str>> {
        let fields = [
            ("category", &self.category),
            ("budget", &self.budget),
            ("num_people", &self.num_people),
            ("trip_type", &self.trip_type),
            ("month", &self.month),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| normalize(value).is_none())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(missing);
        }

        // All present after the check above.
        let take = |value: &Option<String>| normalize(value).unwrap_or_default();
        Ok(TripRequest {
            category: take(&self.category),
            budget: take(&self.budget),
            num_people: take(&self.num_people),
            trip_type: take(&self.trip_type),
            month: take(&self.month),
        })
    }
}

fn normalize(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(number_text(&n)),
        // Null, bools, arrays and objects carry no usable field value.
        _ => None,
    })
}

/// Integral floats render without a fraction so `20000.0` keys like `20000`.
fn number_text(n: &serde_json::Number) -> String {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < MAX_EXACT => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// A validated trip research request. Passed by value into the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripRequest {
    pub category: String,
    pub budget: String,
    pub num_people: String,
    pub trip_type: String,
    pub month: String,
}

impl TripRequest {
    /// Derive the deduplication key for this request.
    pub fn key(&self) -> JobKey {
        JobKey {
            category: self.category.clone(),
            trip_type: self.trip_type.clone(),
            month: self.month.clone(),
            budget: self.budget.clone(),
            num_people: self.num_people.clone(),
        }
    }
}

/// Canonical identity of a job.
///
/// Two submissions with identical (normalized) fields produce equal keys and
/// share one slot in the result store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobKey {
    pub category: String,
    pub trip_type: String,
    pub month: String,
    pub budget: String,
    pub num_people: String,
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.category, self.trip_type, self.month, self.budget, self.num_people
        )
    }
}

/// Terminal result of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The job produced a payload.
    Success { payload: serde_json::Value },
    /// The job failed; `message` describes why.
    Error { message: String },
}

impl Outcome {
    pub fn success(payload: impl Into<serde_json::Value>) -> Self {
        Self::Success {
            payload: payload.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Read-side view of a key in the result store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Never submitted (or evicted).
    Unknown,
    /// Submitted, no outcome stored yet.
    Pending,
    /// An outcome is stored. A re-run of the same key may be in flight.
    Completed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beach() -> SubmitRequest {
        SubmitRequest {
            category: Some("Beach".into()),
            budget: Some("20000".into()),
            num_people: Some("2".into()),
            trip_type: Some("Leisure".into()),
            month: Some("December".into()),
        }
    }

    #[test]
    fn validate_accepts_complete_request() {
        let req = beach().validate().unwrap();
        assert_eq!(req.category, "Beach");
        assert_eq!(req.num_people, "2");
    }

    #[test]
    fn validate_reports_every_missing_field() {
        let mut req = beach();
        req.budget = None;
        req.month = Some("   ".into());
        let missing = req.validate().unwrap_err();
        assert_eq!(missing, vec!["budget", "month"]);
    }

    #[test]
    fn keys_ignore_surrounding_whitespace() {
        let mut padded = beach();
        padded.category = Some("  Beach ".into());
        let a = beach().validate().unwrap().key();
        let b = padded.validate().unwrap().key();
        assert_eq!(a, b);
    }

    #[test]
    fn different_fields_give_different_keys() {
        let mut other = beach();
        other.month = Some("January".into());
        assert_ne!(
            beach().validate().unwrap().key(),
            other.validate().unwrap().key()
        );
    }

    #[test]
    fn numbers_and_strings_deserialize_alike() {
        let from_numbers: SubmitRequest = serde_json::from_str(
            r#"{"category":"Beach","budget":20000,"num_people":2,"trip_type":"Leisure","month":"December"}"#,
        )
        .unwrap();
        assert_eq!(
            from_numbers.validate().unwrap().key(),
            beach().validate().unwrap().key()
        );
    }

    #[test]
    fn null_field_counts_as_missing() {
        let req: SubmitRequest =
            serde_json::from_str(r#"{"category":null,"budget":"1","num_people":"1","trip_type":"x","month":"y"}"#)
                .unwrap();
        assert_eq!(req.validate().unwrap_err(), vec!["category"]);
    }

    #[test]
    fn non_scalar_fields_count_as_missing() {
        let req: SubmitRequest = serde_json::from_str(
            r#"{"category":[],"budget":{},"num_people":[1,2],"trip_type":false,"month":"May"}"#,
        )
        .unwrap();
        assert_eq!(
            req.validate().unwrap_err(),
            vec!["category", "budget", "num_people", "trip_type"]
        );
    }

    #[test]
    fn integral_float_keys_like_integer() {
        let from_float: SubmitRequest = serde_json::from_str(
            r#"{"category":"Beach","budget":20000.0,"num_people":2,"trip_type":"Leisure","month":"December"}"#,
        )
        .unwrap();
        let key = from_float.validate().unwrap().key();
        assert_eq!(key.budget, "20000");
        assert_eq!(key, beach().validate().unwrap().key());

        let fractional: SubmitRequest = serde_json::from_str(
            r#"{"category":"Beach","budget":1500.5,"num_people":2,"trip_type":"Leisure","month":"December"}"#,
        )
        .unwrap();
        assert_eq!(fractional.validate().unwrap().budget, "1500.5");
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let json = serde_json::to_value(Outcome::error("boom")).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["message"], "boom");

        let json = serde_json::to_value(Outcome::success("report")).unwrap();
        assert_eq!(json["kind"], "success");
        assert_eq!(json["payload"], "report");
    }

    #[test]
    fn job_status_display() {
        assert_eq!(JobStatus::Pending.to_string(), "pending");
        assert_eq!(JobStatus::Unknown.to_string(), "unknown");
    }
}
