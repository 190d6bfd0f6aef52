use std::fmt;

use serde::de;

use crate::session::ViewId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A boolean operator other than `OR`, `AND`, or `NOT` was given.
    InvalidOperator(String),
    /// A term's field wasn't in the schema, or its value failed the field's input rule.
    InvalidTerm { field: String, value: String },
    /// The schema declares an `input_validation` tag this crate doesn't know.
    UnknownValidation { field: String, tag: String },
    /// A term was added without any field name.
    MissingField,
    /// Text couldn't be read as an ISO-8601 date & time.
    BadTimestamp(String),
    /// The transport failed to deliver a request or got a non-success HTTP status.
    NetworkFailure(String),
    /// The backend answered with a well-formed `{"error": ...}` payload.
    ApplicationError(String),
    /// The backend's response body was empty or didn't have the expected shape.
    MalformedResponse(String),
    /// No handler is registered under the requested capability name.
    UnknownCapability(String),
    /// No result view is open under the given identifier.
    UnknownView(ViewId),
    /// Occurs when serde deserialization of a schema, config, or form fails.
    SerdeFail(String),
}

impl Error {
    /// True for errors raised by local validation, which never touch model state. False for
    /// anything that came back from (or failed to reach) the backend.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::InvalidOperator(_)
                | Error::InvalidTerm { .. }
                | Error::UnknownValidation { .. }
                | Error::MissingField
                | Error::BadTimestamp(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidOperator(ref op) => write!(f, "Invalid boolean given: {}", op),
            Error::InvalidTerm {
                ref field,
                ref value,
            } => write!(f, "Invalid value {} for field {}", value, field),
            Error::UnknownValidation { ref field, ref tag } => {
                write!(f, "Unknown input_validation {} on field {}", tag, field)
            }
            Error::MissingField => f.write_str("Added term without a field"),
            Error::BadTimestamp(ref text) => write!(f, "Not an ISO-8601 date: {}", text),
            Error::NetworkFailure(ref err) => write!(f, "Request failed: {}", err),
            Error::ApplicationError(ref err) => f.write_str(err),
            Error::MalformedResponse(ref err) => write!(f, "Could not parse response: {}", err),
            Error::UnknownCapability(ref name) => write!(f, "Unknown capability: {}", name),
            Error::UnknownView(id) => write!(f, "No result view with id {}", id),
            Error::SerdeFail(ref msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}
