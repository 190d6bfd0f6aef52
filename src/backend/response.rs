use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Decode a response body. An empty body or one that isn't the expected JSON shape is
/// [`Error::MalformedResponse`]; a JSON object carrying a top-level `error` string is
/// [`Error::ApplicationError`].
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    if body.trim().is_empty() {
        return Err(Error::MalformedResponse("No response text".to_string()));
    }
    let value: Value =
        serde_json::from_str(body).map_err(|e| Error::MalformedResponse(e.to_string()))?;
    if let Some(err) = value.get("error").and_then(Value::as_str) {
        return Err(Error::ApplicationError(err.to_string()));
    }
    serde_json::from_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))
}

/// Ids arrive as numbers or as numeric strings.
fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(None),
            Some(id) => Ok(Some(id)),
            None => Err(D::Error::custom(format!("bad id {}", n))),
        },
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => s
            .parse::<u64>()
            .map(|id| if id == 0 { None } else { Some(id) })
            .map_err(|_| D::Error::custom(format!("bad id {}", s))),
        other => Err(D::Error::custom(format!("bad id {}", other))),
    }
}

/// Flags arrive as booleans, 0/1, or strings.
fn de_truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// The results of a search.
///
/// `results` is a list of records for a plain search, or an object keyed by group-by field for
/// a grouped one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResults {
    #[serde(deserialize_with = "de_opt_id")]
    pub qid: Option<u64>,
    #[serde(rename = "totalRecords")]
    pub total_records: u64,
    pub results: Value,
    pub groupby: Vec<String>,
    pub errors: Vec<Value>,
    pub warnings: Vec<Value>,
    /// The query was too large to run inline and was queued as a batch job.
    #[serde(deserialize_with = "de_truthy")]
    pub batch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_message: Option<String>,
    /// Present on saved results: the query that produced them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_meta_params: Option<Map<String, Value>>,
}

impl SearchResults {
    /// Records of an ungrouped search.
    pub fn records(&self) -> &[Value] {
        self.results.as_array().map_or(&[], |v| v.as_slice())
    }

    /// Rows for one group-by field of a grouped search.
    pub fn group(&self, field: &str) -> Option<&[Value]> {
        self.results
            .get(field)
            .and_then(Value::as_array)
            .map(|v| v.as_slice())
    }

    /// Group-by fields, from the results or, for saved results, from the stored query.
    pub fn grouped_by(&self) -> Vec<&str> {
        if !self.groupby.is_empty() {
            return self.groupby.iter().map(String::as_str).collect();
        }
        self.query_meta_params
            .as_ref()
            .and_then(|m| m.get("groupby"))
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// The archive query currently running for this user, if any.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunningQuery {
    #[serde(deserialize_with = "de_opt_id")]
    pub qid: Option<u64>,
}

/// One page of rows from a listing endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Listing<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(rename = "totalRecords", default)]
    pub total_records: u64,
    #[serde(rename = "recordsReturned", default)]
    pub records_returned: Option<u64>,
}

/// One entry of this user's query history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviousQuery {
    #[serde(deserialize_with = "de_opt_id")]
    pub qid: Option<u64>,
    /// The query payload as JSON text.
    pub query: String,
    pub timestamp: String,
    pub num_results: u64,
    pub milliseconds: u64,
}

/// A chart on a dashboard.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartInfo {
    #[serde(deserialize_with = "de_opt_id")]
    pub chart_id: Option<u64>,
    pub chart_type: String,
    pub chart_options: Value,
}

impl ChartInfo {
    pub fn title(&self) -> Option<&str> {
        self.chart_options.get("title").and_then(Value::as_str)
    }
}

/// The charts of one dashboard.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardCharts {
    pub charts: Vec<ChartInfo>,
}

/// A query the backend re-runs on an interval.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduledQuery {
    #[serde(deserialize_with = "de_opt_id")]
    pub id: Option<u64>,
    pub query: String,
    pub frequency: String,
    pub start: Value,
    pub end: Value,
    pub connector: Option<String>,
    pub params: Option<String>,
    #[serde(deserialize_with = "de_truthy")]
    pub enabled: bool,
    pub last_alert: Value,
    pub alert_threshold: Value,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_results() {
        let body = r#"{"qid": "17", "totalRecords": 2, "results": [{"msg": "a"}, {"msg": "b"}],
            "warnings": ["slow"]}"#;
        let res: SearchResults = decode(body).unwrap();
        assert_eq!(res.qid, Some(17));
        assert_eq!(res.total_records, 2);
        assert_eq!(res.records().len(), 2);
        assert!(!res.batch);
        assert_eq!(res.warnings, vec![json!("slow")]);
        assert!(res.grouped_by().is_empty());
    }

    #[test]
    fn grouped_results() {
        let body = r#"{"qid": 3, "groupby": ["srcip"],
            "results": {"srcip": [{"_groupby": "10.0.0.1", "_count": 4}]}}"#;
        let res: SearchResults = decode(body).unwrap();
        assert_eq!(res.grouped_by(), vec!["srcip"]);
        assert_eq!(res.group("srcip").unwrap().len(), 1);
        assert!(res.records().is_empty());

        let saved = r#"{"qid": 3, "results": {}, "query_string": "x",
            "query_meta_params": {"groupby": ["program"]}}"#;
        let res: SearchResults = decode(saved).unwrap();
        assert_eq!(res.grouped_by(), vec!["program"]);
    }

    #[test]
    fn batch() {
        let res: SearchResults =
            decode(r#"{"qid": 9, "batch": 1, "batch_message": "queued"}"#).unwrap();
        assert!(res.batch);
        assert_eq!(res.batch_message.as_deref(), Some("queued"));
    }

    #[test]
    fn errors() {
        assert_eq!(
            decode::<SearchResults>(r#"{"error": "Invalid query"}"#).unwrap_err(),
            Error::ApplicationError("Invalid query".to_string())
        );
        assert!(matches!(
            decode::<SearchResults>(""),
            Err(Error::MalformedResponse(_))
        ));
        assert!(matches!(
            decode::<SearchResults>("<html>"),
            Err(Error::MalformedResponse(_))
        ));
        assert!(matches!(
            decode::<SearchResults>(r#"{"totalRecords": "many"}"#),
            Err(Error::MalformedResponse(_))
        ));
        assert!(matches!(
            decode::<SearchResults>(r#"{"qid": -4}"#),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn running_query() {
        let none: RunningQuery = decode(r#"{"qid": 0}"#).unwrap();
        assert_eq!(none.qid, None);
        let some: RunningQuery = decode(r#"{"qid": 12}"#).unwrap();
        assert_eq!(some.qid, Some(12));
    }

    #[test]
    fn history_and_charts() {
        let body = r#"{"totalRecords": 2, "recordsReturned": 1, "results": [
            {"qid": "88", "query": "{\"query_string\":\"sshd\"}",
             "timestamp": "2024-01-01 00:00:00", "num_results": 12, "milliseconds": 340}]}"#;
        let listing: Listing<PreviousQuery> = decode(body).unwrap();
        assert_eq!(listing.records_returned, Some(1));
        assert_eq!(listing.results[0].qid, Some(88));
        assert_eq!(listing.results[0].milliseconds, 340);

        let charts: DashboardCharts = decode(
            r#"{"charts": [{"chart_id": 5, "chart_type": "PieChart",
                "chart_options": {"title": "Top hosts"}}]}"#,
        )
        .unwrap();
        assert_eq!(charts.charts[0].chart_id, Some(5));
        assert_eq!(charts.charts[0].title(), Some("Top hosts"));
    }

    #[test]
    fn schedule_listing() {
        let body = r#"{"totalRecords": 1, "recordsReturned": 1, "results": [
            {"id": 4, "query": "{\"query_string\":\"sshd\"}", "frequency": "1:0:0:0:0:0",
             "start": 1700000000, "end": 0, "connector": null, "enabled": "1"}]}"#;
        let listing: Listing<ScheduledQuery> = decode(body).unwrap();
        assert_eq!(listing.total_records, 1);
        let sched = &listing.results[0];
        assert_eq!(sched.id, Some(4));
        assert!(sched.enabled);
        assert_eq!(sched.connector, None);
    }
}
