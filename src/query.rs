//! The query model: search terms, query metadata, and the free-text query buffer.
//!
//! A [`Query`] collects terms as the user adds them, checks each one against the
//! [`FieldSchema`], and folds accepted terms into the free-text buffer that becomes the
//! `query_string` sent to the backend. The term map is kept alongside as a record of what was
//! validated; the buffer is what gets sent.
//!
//! Metadata (`limit`, `start`, `end`, `class`, `groupby`, `connector`, ...) lives in a separate
//! map that survives [`Query::reset_terms`] and is sent as `query_meta_params`.
//!
//! ```
//! # use std::sync::Arc;
//! # use elsa_query::{FieldDescriptor, FieldSchema, Query};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(FieldSchema::new(vec![
//!     FieldDescriptor::new("ANY.host").display("host"),
//! ]));
//! let mut query = Query::new(schema);
//! query.add_term("host=1.2.3.4")?;
//! query.set_boolean("and")?;
//! query.add_term_with("program", "\"sshd\"", None)?;
//! assert_eq!(query.stringify_terms(), "host=1.2.3.4 +program=\"sshd\"");
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::schema::FieldSchema;
use crate::term::{is_meta_like, quote_value, BoolOp, FieldRef, TermSpec};
use crate::time::{epoch_seconds, format_iso, parse_iso};

/// The `limit` a fresh query starts with.
pub const DEFAULT_LIMIT: u64 = 100;

/// The two representations the backend accepts for a search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub query_string: String,
    #[serde(default)]
    pub query_meta_params: Map<String, Value>,
}

impl QueryPayload {
    /// JSON text of the payload, as sent in the `q` parameter of a search.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "query_string": self.query_string,
            "query_meta_params": self.query_meta_params,
        })
        .to_string()
    }
}

/// The start & end of the search's time window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// What happened to a term that passed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermOutcome {
    /// Stored in the term map and appended to the query string.
    Added,
    /// Appended as a transform filter; no term was stored.
    Filtered,
    /// Set the time window instead of adding a term.
    Window(TimeWindow),
}

/// The search currently being built.
#[derive(Clone, Debug)]
pub struct Query {
    schema: Arc<FieldSchema>,
    terms: BTreeMap<String, String>,
    metas: Map<String, Value>,
    freetext: String,
    boolean: BoolOp,
    window: TimeWindow,
}

impl Query {
    pub fn new(schema: Arc<FieldSchema>) -> Self {
        Self::with_limit(schema, DEFAULT_LIMIT)
    }

    pub fn with_config(schema: Arc<FieldSchema>, config: &QueryConfig) -> Self {
        Self::with_limit(schema, config.default_limit)
    }

    fn with_limit(schema: Arc<FieldSchema>, limit: u64) -> Self {
        let mut metas = Map::new();
        if limit > 0 {
            metas.insert("limit".to_string(), Value::from(limit));
        }
        Self {
            schema,
            terms: BTreeMap::new(),
            metas,
            freetext: String::new(),
            boolean: BoolOp::Or,
            window: TimeWindow::default(),
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn terms(&self) -> &BTreeMap<String, String> {
        &self.terms
    }

    pub fn metas(&self) -> &Map<String, Value> {
        &self.metas
    }

    pub fn meta(&self, field: &str) -> Option<&Value> {
        self.metas.get(field)
    }

    pub fn boolean(&self) -> BoolOp {
        self.boolean
    }

    pub fn time_window(&self) -> TimeWindow {
        self.window
    }

    /// Clear the terms and the free-text buffer. Metadata, the boolean operator, and the time
    /// window are kept.
    pub fn reset_terms(&mut self) {
        log::debug!("resetting {} terms", self.terms.len());
        self.terms.clear();
        self.freetext.clear();
    }

    /// Drop all metadata, including `limit`.
    pub fn reset_metas(&mut self) {
        self.metas.clear();
    }

    /// Set the operator applied to every term appended from now on. Accepts `OR`, `AND`, or
    /// `NOT` in any case; anything else leaves the operator unchanged.
    pub fn set_boolean(&mut self, op: &str) -> Result<()> {
        match op.parse::<BoolOp>() {
            Ok(op) => {
                self.boolean = op;
                Ok(())
            }
            Err(e) => {
                log::warn!("{}", e);
                Err(e)
            }
        }
    }

    pub fn set_bool_op(&mut self, op: BoolOp) {
        self.boolean = op;
    }

    /// Replace the free-text buffer with text typed by the user.
    pub fn set_query_text(&mut self, text: impl Into<String>) {
        self.freetext = text.into();
    }

    /// Append user text to the free-text buffer.
    pub fn push_text(&mut self, text: &str) {
        self.append_token(text);
    }

    fn append_token(&mut self, token: &str) {
        if token.is_empty() {
            return;
        }
        if !self.freetext.is_empty() && !self.freetext.ends_with(' ') {
            self.freetext.push(' ');
        }
        self.freetext.push_str(token);
    }

    /// Add a term written as `<field><op><value>`, such as `net.srcport>=1024`.
    pub fn add_term(&mut self, spec: &str) -> Result<TermOutcome> {
        let spec = TermSpec::parse(spec)?;
        self.apply_term(spec)
    }

    /// Add a term from its parts. An empty `value` means `field` holds the whole
    /// `<field><op><value>` text. The operator defaults to `=`.
    pub fn add_term_with(
        &mut self,
        field: &str,
        value: &str,
        op: Option<&str>,
    ) -> Result<TermOutcome> {
        if value.is_empty() {
            return self.add_term(field);
        }
        self.apply_term(TermSpec::new(field, value, op))
    }

    fn apply_term(&mut self, spec: TermSpec) -> Result<TermOutcome> {
        let value = quote_value(&spec.value).into_owned();
        let field_ref = FieldRef::parse(&spec.field)?;
        log::debug!(
            "adding to current query field: {}{}, val: {}",
            self.boolean.prefix(),
            spec.field,
            value
        );
        match field_ref {
            FieldRef::Transform {
                transform_field, ..
            } => {
                self.append_token(&format!("| grep({},{})", transform_field, value));
                Ok(TermOutcome::Filtered)
            }
            FieldRef::TimeWindow(unit) => {
                let (start, end) = unit.window(parse_iso(&spec.value)?)?;
                log::debug!(
                    "time window {} to {}",
                    format_iso(&start),
                    format_iso(&end)
                );
                self.window = TimeWindow {
                    start: Some(start),
                    end: Some(end),
                };
                Ok(TermOutcome::Window(self.window))
            }
            FieldRef::Field { .. } => {
                if !self.validate_term(&spec.field, &value)? {
                    log::warn!("invalid value {} for field {}", value, spec.field);
                    return Err(Error::InvalidTerm {
                        field: spec.field,
                        value,
                    });
                }
                let token = format!(
                    "{}{}{}{}",
                    self.boolean.prefix(),
                    field_ref.query_name(),
                    spec.op,
                    value
                );
                self.append_token(&token);
                self.terms.insert(field_ref.query_name().into_owned(), value);
                Ok(TermOutcome::Added)
            }
        }
    }

    /// Forget the term for `field`, however its class was spelled. Not an error if there isn't
    /// one.
    pub fn del_term(&mut self, field: &str) {
        log::debug!("removing current query field: {}", field);
        match FieldRef::parse(field) {
            Ok(field_ref @ FieldRef::Field { .. }) => {
                self.terms.remove(field_ref.query_name().as_ref());
            }
            _ => {
                self.terms.remove(field);
            }
        }
    }

    /// Set a meta parameter. Setting `null` removes it, so the sent parameters never carry
    /// nulls. Returns false if the value was rejected.
    pub fn add_meta(&mut self, field: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        log::debug!("adding to current query meta: {}, val: {}", field, value);
        if !self.validate_meta(field, &value) {
            log::warn!("invalid value {} given for meta {}", value, field);
            return false;
        }
        if value.is_null() {
            self.metas.remove(field);
        } else {
            self.metas.insert(field.to_string(), value);
        }
        true
    }

    pub fn del_meta(&mut self, field: &str) {
        log::debug!("removing current query meta: {}", field);
        self.metas.remove(field);
    }

    pub fn set_limit(&mut self, limit: NonZeroU64) {
        self.add_meta("limit", limit.get());
    }

    /// Route results to a connector. `params` is a comma-separated list; an empty list clears
    /// any previous parameters.
    pub fn set_connector(&mut self, connector: &str, params: &str) {
        self.add_meta("connector", connector);
        let params: Vec<Value> = params
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Value::from)
            .collect();
        if params.is_empty() {
            self.del_meta("connector_params");
        } else {
            self.add_meta("connector_params", params);
        }
    }

    pub fn set_start_time(&mut self, iso: &str) -> Result<()> {
        self.window.start = Some(parse_iso(iso)?);
        Ok(())
    }

    pub fn set_end_time(&mut self, iso: &str) -> Result<()> {
        self.window.end = Some(parse_iso(iso)?);
        Ok(())
    }

    pub fn clear_time_window(&mut self) {
        self.window = TimeWindow::default();
    }

    /// The query string: the free-text buffer, verbatim.
    pub fn stringify_terms(&self) -> &str {
        &self.freetext
    }

    pub fn to_payload(&self) -> QueryPayload {
        QueryPayload {
            query_string: self.freetext.clone(),
            query_meta_params: self.metas.clone(),
        }
    }

    pub fn to_json(&self) -> String {
        self.to_payload().to_json()
    }

    /// Check a value against a field. Meta-like fields go to [`Query::validate_meta`]; everything
    /// else is checked against the schema.
    pub fn validate_term(&self, field: &str, value: &str) -> Result<bool> {
        log::debug!("validating {}:{}", field, value);
        if is_meta_like(field) {
            return Ok(self.validate_meta(field, &Value::from(value)));
        }
        self.schema.validate(field, value)
    }

    /// Meta parameters aren't checked; every value is accepted.
    pub fn validate_meta(&self, _field: &str, _value: &Value) -> bool {
        true
    }

    /// Apply the time window as `start`/`end` epoch seconds, take a snapshot of the payload, and
    /// clear the terms for the next search.
    pub fn submit(&mut self) -> QueryPayload {
        if let Some(start) = self.window.start {
            self.add_meta("start", epoch_seconds(&start));
        }
        if let Some(end) = self.window.end {
            self.add_meta("end", epoch_seconds(&end));
        }
        let payload = self.to_payload();
        log::debug!("submitting query: {}", payload.to_json());
        self.reset_terms();
        payload
    }

    /// Narrow the search to a value picked from a result: require `field="value"`, drop any
    /// grouping, and submit. The boolean operator is restored afterwards, even if the term is
    /// rejected.
    pub fn pivot_on(&mut self, field: &str, value: &str) -> Result<QueryPayload> {
        let saved = self.boolean;
        self.boolean = BoolOp::And;
        let result = self
            .add_term_with(field, &format!("\"{}\"", value), Some("="))
            .map(|_| {
                self.clear_grouping();
                self.submit()
            });
        self.boolean = saved;
        result
    }

    /// Re-run the search grouped by `field`. `class` picks which class to group within; `None`
    /// groups across classes without setting one.
    pub fn group_by(&mut self, class: Option<&str>, field: &str) -> QueryPayload {
        self.clear_grouping();
        if let Some(class) = class {
            if class != "any" {
                log::debug!(
                    "grouping {}.{} of type {}",
                    class,
                    field,
                    self.schema.field_type(class, field)
                );
            }
            self.add_meta("class", class);
        }
        self.add_meta("groupby", vec![field]);
        self.submit()
    }

    fn clear_grouping(&mut self) {
        self.del_meta("class");
        self.del_meta("groupby");
        self.del_meta("limit");
    }
}
