//! Pieces of a search term: boolean prefixes, field references, and value quoting.
//!
//! A term in the query string looks like `<boolean><class.>field<op>value`, for example
//! `+net.srcport>=1024` or `-program="cron daemon"`.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::time::TimeUnit;

static UNSAFE_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9.\-@_]").unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^"[^"]+"$"#).unwrap());
static TERM_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:<>=]+").unwrap());
static TRANSFORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Transform\.([^.]+)\.([^.]+)\.([^.]+)").unwrap());

/// Field names handled as query metadata rather than looked up in the field schema.
const META_LIKE: [&str; 7] = ["class", "program", "timestamp", "minute", "hour", "day", "node"];

pub const DEFAULT_OP: &str = "=";

/// Boolean operator applied to each term appended to the query string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoolOp {
    #[default]
    Or,
    And,
    Not,
}

impl BoolOp {
    pub fn prefix(self) -> &'static str {
        match self {
            BoolOp::Or => "",
            BoolOp::And => "+",
            BoolOp::Not => "-",
        }
    }
}

impl FromStr for BoolOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OR" => Ok(BoolOp::Or),
            "AND" => Ok(BoolOp::And),
            "NOT" => Ok(BoolOp::Not),
            _ => Err(Error::InvalidOperator(s.to_string())),
        }
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BoolOp::Or => f.write_str("OR"),
            BoolOp::And => f.write_str("AND"),
            BoolOp::Not => f.write_str("NOT"),
        }
    }
}

/// True if the value has to be wrapped in double quotes before going into the query string.
pub fn needs_quotes(value: &str) -> bool {
    UNSAFE_CHAR.is_match(value) && !QUOTED.is_match(value)
}

/// Wrap the value in double quotes if it has any character outside `[a-zA-Z0-9.\-@_]` and isn't
/// already quoted.
pub fn quote_value(value: &str) -> Cow<'_, str> {
    if needs_quotes(value) {
        Cow::Owned(format!("\"{}\"", value))
    } else {
        Cow::Borrowed(value)
    }
}

/// A term split into its field, comparison operator, and value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermSpec {
    pub field: String,
    pub op: String,
    pub value: String,
}

impl TermSpec {
    pub fn new(field: impl Into<String>, value: impl Into<String>, op: Option<&str>) -> Self {
        let op = match op {
            Some(op) if !op.is_empty() => op,
            _ => DEFAULT_OP,
        };
        Self {
            field: field.into(),
            op: op.to_string(),
            value: value.into(),
        }
    }

    /// Split `<field><op><value>`, where `op` is a run of `:`, `<`, `>`, and `=`. Everything after
    /// the first operator run is the value.
    pub fn parse(spec: &str) -> Result<Self> {
        let m = TERM_SPLIT.find(spec).ok_or_else(|| Error::InvalidTerm {
            field: spec.to_string(),
            value: String::new(),
        })?;
        let field = &spec[..m.start()];
        if field.is_empty() {
            return Err(Error::MissingField);
        }
        Ok(Self {
            field: field.to_string(),
            op: m.as_str().to_string(),
            value: spec[m.end()..].to_string(),
        })
    }
}

/// What a term's field name refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldRef<'a> {
    /// `Transform.<name>.<logfield>.<transformfield>`: filters the output of a transform.
    Transform {
        name: &'a str,
        log_field: &'a str,
        transform_field: &'a str,
    },
    /// A relative time window (`any.hour` and friends).
    TimeWindow(TimeUnit),
    /// A plain `class.field` or bare `field`. `class` is empty for bare fields.
    Field { class: &'a str, field: &'a str },
}

impl<'a> FieldRef<'a> {
    pub fn parse(name: &'a str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::MissingField);
        }
        if name.starts_with("Transform.") {
            let caps = TRANSFORM.captures(name).ok_or_else(|| Error::InvalidTerm {
                field: name.to_string(),
                value: String::new(),
            })?;
            return match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(t), Some(l), Some(f)) => Ok(FieldRef::Transform {
                    name: t.as_str(),
                    log_field: l.as_str(),
                    transform_field: f.as_str(),
                }),
                _ => Err(Error::InvalidTerm {
                    field: name.to_string(),
                    value: String::new(),
                }),
            };
        }
        let (class, field) = match name.split_once('.') {
            Some((class, field)) if !field.is_empty() => (class, field),
            Some((class, _)) => ("", class),
            None => ("", name),
        };
        if is_any_class(class) {
            if let Some(unit) = TimeUnit::from_field(field) {
                return Ok(FieldRef::TimeWindow(unit));
            }
        }
        Ok(FieldRef::Field { class, field })
    }

    /// How the field is written in the query string. The `any` class is left off, since the
    /// backend treats a bare field as "any class".
    pub fn query_name(&self) -> Cow<'a, str> {
        match *self {
            FieldRef::Field { class, field } if is_any_class(class) => Cow::Borrowed(field),
            FieldRef::Field { class, field } => Cow::Owned(format!("{}.{}", class, field)),
            FieldRef::Transform {
                transform_field, ..
            } => Cow::Borrowed(transform_field),
            FieldRef::TimeWindow(_) => Cow::Borrowed(""),
        }
    }
}

pub fn is_any_class(class: &str) -> bool {
    class.is_empty() || class.eq_ignore_ascii_case("any")
}

/// True for `class`, `program`, `timestamp`, `minute`, `hour`, `day`, `node`, with or without
/// an `any.` prefix.
pub fn is_meta_like(name: &str) -> bool {
    let bare = name.strip_prefix("any.").unwrap_or(name);
    META_LIKE.contains(&bare)
}
