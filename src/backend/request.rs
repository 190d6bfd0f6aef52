use std::fmt;

use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Every backend endpoint the client talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    CancelQuery,
    RunningArchiveQuery,
    PreviousQueries,
    LogInfo,
    SaveResults,
    SavedQueries,
    SavedResult,
    DeleteSavedResults,
    ScheduledQueries,
    ScheduleQuery,
    UpdateScheduledQuery,
    DeleteScheduledQuery,
    Dashboards,
    AddDashboard,
    UpdateDashboard,
    DeleteDashboard,
    ExportDashboard,
    DashboardCharts,
    AddChartQuery,
    Export,
    SendTo,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Search => "Query/query",
            Endpoint::CancelQuery => "Query/cancel_query",
            Endpoint::RunningArchiveQuery => "Query/get_running_archive_query",
            Endpoint::PreviousQueries => "Query/get_previous_queries",
            Endpoint::LogInfo => "Query/get_log_info",
            Endpoint::SaveResults => "Query/save_results",
            Endpoint::SavedQueries => "Query/get_saved_queries",
            Endpoint::SavedResult => "Query/get_saved_result",
            Endpoint::DeleteSavedResults => "Query/delete_saved_results",
            Endpoint::ScheduledQueries => "Query/get_scheduled_queries",
            Endpoint::ScheduleQuery => "Query/schedule_query",
            Endpoint::UpdateScheduledQuery => "Query/update_scheduled_query",
            Endpoint::DeleteScheduledQuery => "Query/delete_scheduled_query",
            Endpoint::Dashboards => "Charts/get_dashboards",
            Endpoint::AddDashboard => "Charts/add_dashboard",
            Endpoint::UpdateDashboard => "Charts/update_dashboard",
            Endpoint::DeleteDashboard => "Charts/del_dashboard",
            Endpoint::ExportDashboard => "Charts/export_dashboard",
            Endpoint::DashboardCharts => "Charts/get",
            Endpoint::AddChartQuery => "Charts/add_query",
            Endpoint::Export => "Query/export",
            Endpoint::SendTo => "send_to",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::Search
            | Endpoint::CancelQuery
            | Endpoint::RunningArchiveQuery
            | Endpoint::PreviousQueries
            | Endpoint::SavedQueries
            | Endpoint::SavedResult
            | Endpoint::DashboardCharts
            | Endpoint::ScheduledQueries
            | Endpoint::Dashboards
            | Endpoint::UpdateDashboard => Method::Get,
            _ => Method::Post,
        }
    }
}

/// A request ready to hand to a [`Transport`][super::Transport].
///
/// Parameters are kept unencoded; [`Request::encoded_params`] produces the
/// `application/x-www-form-urlencoded` form used both for GET query strings and POST bodies.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub endpoint: Endpoint,
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl Request {
    pub fn new(endpoint: Endpoint, base_path: &str) -> Self {
        Self {
            endpoint,
            path: format!("{}{}", base_path, endpoint.path()),
            params: Vec::new(),
        }
    }

    pub fn method(&self) -> Method {
        self.endpoint.method()
    }

    /// Add a text parameter.
    pub fn param(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a JSON parameter. Strings are sent as-is, everything else as JSON text.
    pub fn json_param(self, key: &str, value: &Value) -> Self {
        match value {
            Value::String(s) => self.param(key, s),
            other => self.param(key, other),
        }
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn encoded_params(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// The URL to request: the path, plus the encoded parameters for a GET.
    pub fn url(&self) -> String {
        match self.method() {
            Method::Get if !self.params.is_empty() => {
                format!("{}?{}", self.path, self.encoded_params())
            }
            _ => self.path.clone(),
        }
    }

    /// The encoded form body, for a POST.
    pub fn body(&self) -> Option<String> {
        match self.method() {
            Method::Post => Some(self.encoded_params()),
            Method::Get => None,
        }
    }
}
