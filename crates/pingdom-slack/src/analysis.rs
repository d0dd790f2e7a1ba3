//! Root cause analysis from the Pingdom API.
//!
//! For a DOWN alert, Pingdom keeps an analysis of the failing probe. Finding
//! it takes two calls: list the analyses of the check, pick the one whose
//! first test matches the state change, then fetch its detail.

use reqwest::Client;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AnalysisError;

/// Diagnostic data for one downtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub tasks: Vec<AnalysisTask>,
}

/// One probe task of an analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisTask {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, rename = "result")]
    pub entries: ResultEntries,
}

/// Result entries of a task, in the order Pingdom sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultEntries(pub Vec<ResultEntry>);

impl ResultEntries {
    pub fn iter(&self) -> std::slice::Iter<'_, ResultEntry> {
        self.0.iter()
    }
}

/// A named value in a task result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub name: String,
    pub value: EntryValue,
}

impl ResultEntry {
    pub fn new(name: impl Into<String>, value: EntryValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Value of a result entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    /// Missing value
    Null,
    /// A single value, kept as its JSON text
    Scalar(String),
    /// A sequence of lines
    Lines(Vec<String>),
}

impl EntryValue {
    /// All lines of the value.
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Self::Null => Vec::new(),
            Self::Scalar(s) => vec![s.as_str()],
            Self::Lines(lines) => lines.iter().map(String::as_str).collect(),
        }
    }
}

impl From<Value> for EntryValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(s) => Self::Scalar(s),
            Value::Array(items) => Self::Lines(items.into_iter().map(scalar_text).collect()),
            other => Self::Scalar(other.to_string()),
        }
    }
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl<'de> Deserialize<'de> for ResultEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ResultEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of result entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, value)) = map.next_entry::<String, Value>()? {
                    entries.push(ResultEntry::new(name, value.into()));
                }
                Ok(ResultEntries(entries))
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(ResultEntries::default())
            }
        }

        deserializer.deserialize_any(EntriesVisitor)
    }
}

// =============================================================================
// Pingdom API types
// =============================================================================

#[derive(Debug, Deserialize)]
struct AnalysisList {
    #[serde(default)]
    analysis: Vec<AnalysisSummary>,
}

#[derive(Debug, Deserialize)]
struct AnalysisSummary {
    id: i64,
    #[serde(default)]
    timefirsttest: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AnalysisDetail {
    analysisresult: AnalysisResult,
}

// =============================================================================
// Client
// =============================================================================

/// Client for the Pingdom analysis endpoints.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl AnalysisClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    /// Fetch the analysis of the downtime that started at `state_changed`.
    ///
    /// Never fails: every error is logged and reported as no analysis.
    pub async fn fetch(
        &self,
        check_id: Option<i64>,
        state_changed: Option<i64>,
    ) -> Option<AnalysisResult> {
        let (Some(check_id), Some(state_changed)) = (check_id, state_changed) else {
            warn!("Alert has no check id or state change time, skipping analysis");
            return None;
        };
        let Some(token) = self.token.as_deref() else {
            warn!(check_id, "PINGDOM_TOKEN not set, skipping analysis");
            return None;
        };

        match self.try_fetch(token, check_id, state_changed).await {
            Ok(Some(analysis)) => {
                info!(check_id, tasks = analysis.tasks.len(), "Fetched root cause analysis");
                Some(analysis)
            }
            Ok(None) => {
                info!(check_id, state_changed, "No analysis matches this state change");
                None
            }
            Err(e) => {
                warn!(check_id, error = %e, "Failed to fetch root cause analysis");
                None
            }
        }
    }

    async fn try_fetch(
        &self,
        token: &str,
        check_id: i64,
        state_changed: i64,
    ) -> Result<Option<AnalysisResult>, AnalysisError> {
        let list_url = format!("{}/analysis/{check_id}", self.base_url);
        let list: AnalysisList = self.get_json(&list_url, token, "analysis list").await?;

        let Some(matched) = list
            .analysis
            .iter()
            .find(|summary| summary.timefirsttest == Some(state_changed))
        else {
            return Ok(None);
        };

        debug!(check_id, analysis_id = matched.id, "Found matching analysis");

        let detail_url = format!("{}/analysis/{check_id}/{}", self.base_url, matched.id);
        let detail: AnalysisDetail = self.get_json(&detail_url, token, "analysis detail").await?;

        Ok(Some(detail.analysisresult))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        step: &'static str,
    ) -> Result<T, AnalysisError> {
        let response = self.client.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Status { step, status });
        }

        response
            .json::<T>()
            .await
            .map_err(|_| AnalysisError::Decode(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> AnalysisClient {
        AnalysisClient::new(
            server.uri(),
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_entries_keep_wire_order() {
        let task: AnalysisTask = serde_json::from_str(
            r#"{"type": "http", "result": {"zeta": 1, "alpha": ["a", "b"], "mid": null}}"#,
        )
        .unwrap();

        let names: Vec<&str> = task.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(task.entries.0[0].value, EntryValue::Scalar("1".to_string()));
        assert_eq!(
            task.entries.0[1].value,
            EntryValue::Lines(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(task.entries.0[2].value, EntryValue::Null);
    }

    #[tokio::test]
    async fn test_fetch_lists_then_fetches_detail() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/analysis/42"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "analysis": [
                    {"id": 7, "timefirsttest": 1_699_999_000, "timeconfirmtest": 1_699_999_060},
                    {"id": 8, "timefirsttest": 1_700_000_000, "timeconfirmtest": 1_700_000_060}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/analysis/42/8"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "analysisresult": {
                    "id": 8,
                    "tasks": [{"type": "http", "result": {"timestamp": 1_700_000_000}}]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let analysis = client(&server, Some("secret"))
            .fetch(Some(42), Some(1_700_000_000))
            .await
            .expect("analysis");

        assert_eq!(analysis.id, Some(8));
        assert_eq!(analysis.tasks.len(), 1);
        assert_eq!(analysis.tasks[0].kind.as_deref(), Some("http"));
    }

    #[tokio::test]
    async fn test_list_failure_means_no_analysis() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/analysis/42"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let analysis = client(&server, Some("secret"))
            .fetch(Some(42), Some(1_700_000_000))
            .await;
        assert!(analysis.is_none());
    }

    #[tokio::test]
    async fn test_no_matching_analysis_skips_detail() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/analysis/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "analysis": [{"id": 7, "timefirsttest": 1}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/analysis/42/7"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let analysis = client(&server, Some("secret"))
            .fetch(Some(42), Some(1_700_000_000))
            .await;
        assert!(analysis.is_none());
    }

    #[tokio::test]
    async fn test_detail_failure_means_no_analysis() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/analysis/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "analysis": [{"id": 9, "timefirsttest": 5}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/analysis/42/9"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server, Some("secret")).fetch(Some(42), Some(5)).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_calls() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert!(client(&server, None).fetch(Some(42), Some(5)).await.is_none());
        assert!(client(&server, Some("secret")).fetch(None, Some(5)).await.is_none());
    }
}
