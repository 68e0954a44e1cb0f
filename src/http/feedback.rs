use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    Proceeding,
    Closed,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishedResult {
    None,
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub finished: FinishedResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusBody {
    pub execution: Execution,
    pub result: StatusResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// Wire shape of a DDI feedback envelope, as POSTed to
/// `deploymentBase/{id}/feedback` or PUT to `configData`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub time: String,
    pub status: StatusBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

impl FeedbackEnvelope {
    #[must_use]
    pub fn build(
        id: Option<&str>,
        detail: Option<&str>,
        finished: FinishedResult,
        execution: Execution,
        data: Option<BTreeMap<String, String>>,
    ) -> Self {
        Self {
            id: id.map(str::to_owned),
            time: Utc::now().format("%Y%m%dT%H%M%S").to_string(),
            status: StatusBody {
                execution,
                result: StatusResult { finished },
                details: detail.map(|detail| vec![detail.to_owned()]),
            },
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_field_is_well_formed() {
        let envelope =
            FeedbackEnvelope::build(Some("42"), None, FinishedResult::None, Execution::Proceeding, None);
        assert_eq!(envelope.time.len(), 15);
        assert!(envelope.time.chars().nth(8) == Some('T'));
    }

    #[test]
    fn detail_is_elided_when_absent() {
        let envelope =
            FeedbackEnvelope::build(None, None, FinishedResult::None, Execution::Proceeding, None);
        let json = serde_json::to_value(&envelope).expect("serializable");
        assert!(json.get("id").is_none());
        assert!(json["status"].get("details").is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let mut data = BTreeMap::new();
        data.insert("hw".to_owned(), "v1".to_owned());
        let envelope = FeedbackEnvelope::build(
            Some("7"),
            Some("Download complete."),
            FinishedResult::Success,
            Execution::Closed,
            Some(data.clone()),
        );
        let json = serde_json::to_value(&envelope).expect("serializable");
        assert_eq!(json["id"], "7");
        assert_eq!(json["status"]["execution"], "closed");
        assert_eq!(json["status"]["result"]["finished"], "success");
        assert_eq!(json["status"]["details"][0], "Download complete.");
        assert_eq!(json["data"]["hw"], "v1");
    }
}
