//! elsa-query is the query side of a log-search client. It builds searches from terms picked by
//! the user, checks them against the backend's field schema, and serializes them into the
//! `{query_string, query_meta_params}` payload the search backend expects.
//!
//! It provides:
//!
//! - A [`FieldSchema`] of searchable fields, each with an input rule that values are checked
//!     against before they reach a query.
//! - A [`Query`] that collects terms and metadata
//!     - Terms are written as `<field><op><value>` and joined with a boolean operator
//!     - Values with unsafe characters are quoted
//!     - Transform fields become `grep` filters and time-unit fields become a time window
//!     - Metadata (`limit`, `class`, `groupby`, `start`, `end`, ...) rides alongside as a map
//! - The [backend] contract: a request for every endpoint, typed responses, and a
//!     [`Transport`] trait for the embedding application to deliver requests with.
//! - A [`Session`] holding the query being built and the result views opened for it.
//! - A [`CapabilityRegistry`] for dispatching named actions, and declarative [`Form`]s for the
//!     dialogs around them.
//!
//! ```
//! # use std::sync::Arc;
//! # use elsa_query::{FieldSchema, Query};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(FieldSchema::from_json(r#"[
//!     {"fqdn_field": "ANY.host", "value": "host", "type": "ip_int"},
//!     {"fqdn_field": "FIREWALL.srcport", "value": "srcport", "type": "int"}
//! ]"#)?);
//! let mut query = Query::new(schema);
//! query.add_term("ANY.host=10.0.0.1")?;
//! query.set_boolean("AND")?;
//! query.add_term("FIREWALL.srcport>1024")?;
//! assert!(query.add_term("FIREWALL.srcport=ssh").is_err());
//! assert_eq!(query.stringify_terms(), "host=10.0.0.1 +FIREWALL.srcport>1024");
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod config;
mod error;
mod form;
mod query;
mod registry;
mod schema;
mod session;
mod term;
mod time;

pub use self::backend::{Client, Transport};
pub use self::config::QueryConfig;
pub use self::error::{Error, Result};
pub use self::form::{Cell, Form, FormItem, InputItem, ItemArgs};
pub use self::query::{Query, QueryPayload, TermOutcome, TimeWindow, DEFAULT_LIMIT};
pub use self::registry::CapabilityRegistry;
pub use self::schema::{FieldDescriptor, FieldSchema, InputRule, HOST_FIELD};
pub use self::session::{ResultView, Session, ViewId, ViewStatus};
pub use self::term::{needs_quotes, quote_value, BoolOp, FieldRef, TermSpec};
pub use self::time::{epoch_seconds, format_iso, parse_iso, TimeUnit};
