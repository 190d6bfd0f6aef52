use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{
    decode, DashboardCharts, Endpoint, Listing, PreviousQuery, Request, RunningQuery,
    ScheduledQuery, SearchResults, Transport,
};
use crate::config::QueryConfig;
use crate::error::Result;
use crate::query::QueryPayload;

/// How often a scheduled query runs. The discriminants are the backend's interval codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interval {
    Year = 1,
    Month = 2,
    Week = 3,
    Day = 4,
    Hour = 5,
    Minute = 6,
}

/// A request to re-run a saved query on an interval.
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    pub qid: u64,
    /// Run every `count` intervals.
    pub count: u32,
    pub interval: Interval,
    /// Days to keep running; 0 means forever.
    pub days: u32,
    /// Connector to send results to. Empty saves a report instead.
    pub connector: String,
    pub connector_params: String,
}

impl Schedule {
    pub fn new(qid: u64, interval: Interval) -> Self {
        Self {
            qid,
            count: 1,
            interval,
            days: 7,
            connector: String::new(),
            connector_params: String::new(),
        }
    }
}

/// A new dashboard.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NewDashboard {
    pub title: String,
    /// Last path segment of the dashboard's URL.
    pub alias: String,
    pub auth_required: u8,
    /// Exported dashboard JSON to import, if any.
    pub data: Option<String>,
}

/// Chart id sent when the query should start a new chart.
pub const NEW_CHART: &str = "__NEW__";

/// A query to attach to a dashboard chart.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartQuery {
    pub dashboard_id: u64,
    /// The chart to add to, or `None` for a new chart.
    pub chart_id: Option<u64>,
    pub label: String,
    pub query: String,
    /// Field the chart groups by, appended to the query as `groupby:<field>`.
    pub groupby: Option<String>,
}

impl ChartQuery {
    /// A new chart on `dashboard_id`, labelled with the query text itself.
    pub fn new(dashboard_id: u64, query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            dashboard_id,
            chart_id: None,
            label: query.clone(),
            query,
            groupby: None,
        }
    }

    pub fn chart(mut self, chart_id: u64) -> Self {
        self.chart_id = Some(chart_id);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn groupby(mut self, field: impl Into<String>) -> Self {
        self.groupby = Some(field.into());
        self
    }

    /// The query text as sent, with the group-by clause appended.
    pub fn query_text(&self) -> String {
        match self.groupby {
            Some(ref field) => format!("{} groupby:{}", self.query, field),
            None => self.query.clone(),
        }
    }
}

/// Typed calls to every backend endpoint.
pub struct Client<T> {
    transport: T,
    base_path: String,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            base_path: String::new(),
        }
    }

    pub fn with_config(transport: T, config: &QueryConfig) -> Self {
        Self {
            transport,
            base_path: config.base_path.clone(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn request(&self, endpoint: Endpoint) -> Request {
        Request::new(endpoint, &self.base_path)
    }

    /// Send a request and decode its response.
    pub fn call<R: DeserializeOwned>(&self, request: Request) -> Result<R> {
        log::debug!("{} {}", request.method(), request.url());
        let body = self.transport.send(&request).map_err(|e| {
            log::error!("{} failed: {}", request.path, e);
            e
        })?;
        decode(&body).map_err(|e| {
            log::error!("{}: {}", request.path, e);
            e
        })
    }

    /// Run a search. The payload goes out as JSON in the `q` parameter.
    pub fn search(&self, payload: &QueryPayload) -> Result<SearchResults> {
        self.call(self.request(Endpoint::Search).param("q", payload.to_json()))
    }

    /// Tell the backend to abandon a running query.
    pub fn cancel_query(&self, qid: u64) -> Result<Value> {
        self.call(self.request(Endpoint::CancelQuery).param("qid", qid))
    }

    /// The id of this user's running archive query, if there is one.
    pub fn running_archive_query(&self) -> Result<Option<u64>> {
        let running: RunningQuery = self.call(self.request(Endpoint::RunningArchiveQuery))?;
        Ok(running.qid)
    }

    /// This user's query history.
    pub fn previous_queries(&self) -> Result<Listing<PreviousQuery>> {
        self.call(self.request(Endpoint::PreviousQueries))
    }

    /// Extra information about one log, given its fields. The field map is sent as base64 JSON
    /// in the `q` parameter.
    pub fn log_info(&self, fields: &Map<String, Value>) -> Result<Value> {
        let data = STANDARD.encode(Value::Object(fields.clone()).to_string());
        self.call(self.request(Endpoint::LogInfo).param("q", data))
    }

    pub fn save_results(&self, comments: &str, results: &Value) -> Result<Value> {
        self.call(
            self.request(Endpoint::SaveResults)
                .param("comments", comments)
                .json_param("results", results),
        )
    }

    /// List saved queries, or fetch the saved results of one query.
    pub fn saved_queries(&self, qid: Option<u64>) -> Result<Value> {
        let mut req = self.request(Endpoint::SavedQueries);
        if let Some(qid) = qid {
            req = req.param("qid", qid);
        }
        self.call(req)
    }

    /// Fetch one set of saved results, along with the query that produced them.
    pub fn saved_result(&self, qid: u64) -> Result<SearchResults> {
        self.call(self.request(Endpoint::SavedResult).param("qid", qid))
    }

    pub fn delete_saved_results(&self, qid: u64) -> Result<Value> {
        self.call(self.request(Endpoint::DeleteSavedResults).param("qid", qid))
    }

    pub fn scheduled_queries(&self) -> Result<Listing<ScheduledQuery>> {
        self.call(self.request(Endpoint::ScheduledQueries))
    }

    pub fn schedule_query(&self, schedule: &Schedule) -> Result<Value> {
        self.call(
            self.request(Endpoint::ScheduleQuery)
                .param("qid", schedule.qid)
                .param("count", schedule.count)
                .param("time_unit", schedule.interval as u8)
                .param("days", schedule.days)
                .param("connector", &schedule.connector)
                .param("connector_params", &schedule.connector_params),
        )
    }

    /// Change one property of a scheduled query.
    pub fn update_scheduled_query(&self, id: u64, property: &str, value: &Value) -> Result<Value> {
        self.call(
            self.request(Endpoint::UpdateScheduledQuery)
                .param("id", id)
                .json_param(property, value),
        )
    }

    pub fn delete_scheduled_query(&self, id: u64) -> Result<Value> {
        self.call(self.request(Endpoint::DeleteScheduledQuery).param("id", id))
    }

    pub fn dashboards(&self) -> Result<Value> {
        self.call(self.request(Endpoint::Dashboards))
    }

    pub fn add_dashboard(&self, dashboard: &NewDashboard) -> Result<Value> {
        let mut req = self
            .request(Endpoint::AddDashboard)
            .param("title", &dashboard.title)
            .param("alias", &dashboard.alias)
            .param("auth_required", dashboard.auth_required);
        if let Some(ref data) = dashboard.data {
            req = req.param("data", data);
        }
        self.call(req)
    }

    /// Change one column of a dashboard.
    pub fn update_dashboard(&self, id: u64, column: &str, value: &str) -> Result<Value> {
        self.call(
            self.request(Endpoint::UpdateDashboard)
                .param("id", id)
                .param("col", column)
                .param("val", value),
        )
    }

    pub fn delete_dashboard(&self, id: u64) -> Result<Value> {
        self.call(self.request(Endpoint::DeleteDashboard).param("id", id))
    }

    /// Export a dashboard's definition.
    pub fn export_dashboard(&self, id: u64) -> Result<Value> {
        self.call(self.request(Endpoint::ExportDashboard).param("data", id))
    }

    pub fn dashboard_charts(&self, dashboard_id: u64) -> Result<DashboardCharts> {
        self.call(
            self.request(Endpoint::DashboardCharts)
                .param("dashboard_id", dashboard_id),
        )
    }

    /// Attach a query to a dashboard chart, or start a new chart with it.
    pub fn add_chart_query(&self, chart: &ChartQuery) -> Result<Value> {
        let chart_id = match chart.chart_id {
            Some(id) => id.to_string(),
            None => NEW_CHART.to_string(),
        };
        self.call(
            self.request(Endpoint::AddChartQuery)
                .param("label", &chart.label)
                .param("query", chart.query_text())
                .param("chart_id", chart_id)
                .param("dashboard_id", chart.dashboard_id),
        )
    }

    /// Export a result set in the named format.
    pub fn export(&self, format: &str, data: &Value) -> Result<Value> {
        self.call(
            self.request(Endpoint::Export)
                .param("type", format)
                .json_param("data", data),
        )
    }

    /// Hand records to a connector, along with the query that produced them. The JSON payload is
    /// base64-encoded in the `data` parameter.
    pub fn send_to_connector(
        &self,
        connector: &str,
        records: &[Value],
        query: &QueryPayload,
    ) -> Result<Value> {
        let payload = json!({
            "results": { "results": records },
            "connectors": [connector],
            "query": query,
        });
        let data = STANDARD.encode(payload.to_string());
        self.call(self.request(Endpoint::SendTo).param("data", data))
    }
}
