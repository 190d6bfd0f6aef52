//! The field schema: every searchable field the backend knows about.
//!
//! The schema is loaded once at startup, from the same JSON the backend hands the search form,
//! and is immutable for the rest of the session. It is used to look up fields by name and to
//! decide which values a field will accept.
//!
//! ```
//! # use elsa_query::FieldSchema;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = FieldSchema::from_json(r#"{ "fields": [
//!     { "fqdn_field": "ANY.host", "value": "host", "input_validation": "IPv4" },
//!     { "fqdn_field": "net.srcport", "value": "srcport", "type": "int" }
//! ]}"#)?;
//! assert!(schema.validate("net.srcport", "80")?);
//! assert!(!schema.validate("net.srcport", "80a")?);
//! # Ok(())
//! # }
//! ```

use educe::Educe;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::Error as _, Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fully-qualified name of the host field, which gets its own input rule.
pub const HOST_FIELD: &str = "ANY.host";

static HOST_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^['"]?[a-zA-Z0-9\-.]+['"]?$"#).unwrap());
static IPV4_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^['"]?\d+\.\d+\.\d+\.\d+['"]?$"#).unwrap());
static INT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static ANY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.+$").unwrap());

#[inline]
fn is_string_type(v: &str) -> bool {
    v == "string"
}

/// A single searchable field.
///
/// # Defaults
///
/// - fqdn_field: ""
/// - field_type: "string"
/// - input_validation: None
/// - value: ""
/// - text: ""
/// - class: ""
#[derive(Educe, Clone, Debug, Serialize, Deserialize)]
#[educe(PartialEq, Default)]
#[serde(default)]
pub struct FieldDescriptor {
    /// Fully-qualified name, `class.field` or `ANY.field`.
    pub fqdn_field: String,
    /// Declared type, such as `int` or `string`.
    #[educe(Default(expression = String::from("string")))]
    #[serde(rename = "type", alias = "field_type", skip_serializing_if = "is_string_type")]
    pub field_type: String,
    /// Tag naming a stricter input rule, such as `IPv4`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_validation: Option<String>,
    /// Display name, also accepted when looking a field up.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// Display label.
    #[educe(PartialEq(ignore))]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub class: String,
}

impl FieldDescriptor {
    pub fn new(fqdn_field: impl Into<String>) -> Self {
        Self {
            fqdn_field: fqdn_field.into(),
            ..Default::default()
        }
    }

    pub fn field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = field_type.into();
        self
    }

    pub fn input_validation(mut self, tag: impl Into<String>) -> Self {
        self.input_validation = Some(tag.into());
        self
    }

    pub fn display(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    fn matches_name(&self, name: &str) -> bool {
        (!self.fqdn_field.is_empty() && self.fqdn_field.eq_ignore_ascii_case(name))
            || (!self.value.is_empty() && self.value.eq_ignore_ascii_case(name))
    }

    /// Work out which input rule applies to this field.
    pub fn input_rule(&self) -> Result<InputRule> {
        if self.fqdn_field.eq_ignore_ascii_case(HOST_FIELD) {
            return Ok(InputRule::Host);
        }
        match self.input_validation.as_deref() {
            Some("IPv4") => Ok(InputRule::IPv4),
            Some(tag) => Err(Error::UnknownValidation {
                field: self.fqdn_field.clone(),
                tag: tag.to_string(),
            }),
            None => match self.field_type.as_str() {
                "int" => Ok(InputRule::Int),
                _ => Ok(InputRule::Any),
            },
        }
    }
}

/// The pattern a field's values must match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputRule {
    /// Host names and dotted addresses, optionally quoted.
    Host,
    /// Dotted-quad IPv4 addresses, optionally quoted.
    IPv4,
    /// Unsigned decimal integers.
    Int,
    /// Anything non-empty.
    Any,
}

impl InputRule {
    pub fn regex(self) -> &'static Regex {
        match self {
            InputRule::Host => &HOST_REGEX,
            InputRule::IPv4 => &IPV4_REGEX,
            InputRule::Int => &INT_REGEX,
            InputRule::Any => &ANY_REGEX,
        }
    }

    pub fn is_match(self, value: &str) -> bool {
        self.regex().is_match(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaDoc {
    Bare(Vec<FieldDescriptor>),
    Form { fields: Vec<FieldDescriptor> },
}

/// The ordered, immutable set of fields known to the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FieldSchema {
    fields: Vec<FieldDescriptor>,
}

impl FieldSchema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    /// Load a schema from JSON: either a bare array of field descriptors, or the form-parameter
    /// object carrying them under `fields`.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: SchemaDoc = serde_json::from_str(json).map_err(Error::custom)?;
        let fields = match doc {
            SchemaDoc::Bare(fields) => fields,
            SchemaDoc::Form { fields } => fields,
        };
        log::debug!("loaded field schema with {} fields", fields.len());
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find the first field whose fully-qualified or display name matches, ignoring case.
    pub fn find(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.matches_name(name))
    }

    /// Check a value against the named field's input rule. Returns `Ok(false)` if the field isn't
    /// in the schema or the value doesn't match, and fails if the field's validation tag is
    /// unknown.
    pub fn validate(&self, name: &str, value: &str) -> Result<bool> {
        let field = match self.find(name) {
            Some(field) => field,
            None => {
                log::debug!("field {} not in schema", name);
                return Ok(false);
            }
        };
        let rule = field.input_rule().map_err(|e| {
            log::warn!("{}", e);
            e
        })?;
        log::debug!("testing {} against {:?}", value, rule);
        Ok(rule.is_match(value))
    }

    /// Declared type of `class.field`, defaulting to `string` for unknown fields.
    pub fn field_type(&self, class: &str, field: &str) -> &str {
        let fqdn = format!("{}.{}", class, field);
        self.fields
            .iter()
            .find(|f| f.fqdn_field == fqdn)
            .map_or("string", |f| f.field_type.as_str())
    }

    /// Distinct class names, in schema order.
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = Vec::new();
        for field in self.fields.iter() {
            let class = if field.class.is_empty() {
                match field.fqdn_field.split_once('.') {
                    Some((class, _)) => class,
                    None => continue,
                }
            } else {
                field.class.as_str()
            };
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
        classes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn schema() -> FieldSchema {
        FieldSchema::new(vec![
            FieldDescriptor::new("ANY.host").display("host"),
            FieldDescriptor::new("net.srcip")
                .display("srcip")
                .input_validation("IPv4"),
            FieldDescriptor::new("net.srcport").field_type("int"),
            FieldDescriptor::new("net.proto").input_validation("MAC"),
            FieldDescriptor::new("web.uri"),
        ])
    }

    #[test]
    fn lookup_ignores_case() {
        let schema = schema();
        assert_eq!(schema.find("any.HOST").unwrap().fqdn_field, "ANY.host");
        assert_eq!(schema.find("SRCIP").unwrap().fqdn_field, "net.srcip");
        assert!(schema.find("net.dstip").is_none());
    }

    #[test]
    fn host() {
        let schema = schema();
        assert!(schema.validate("ANY.host", "10.0.0.5").unwrap());
        assert!(schema.validate("ANY.host", "\"mail-01.example.com\"").unwrap());
        assert!(!schema.validate("ANY.host", "not an ip!").unwrap());
    }

    #[test]
    fn ipv4() {
        let schema = schema();
        assert!(schema.validate("net.srcip", "1.2.3.4").unwrap());
        assert!(schema.validate("net.srcip", "'1.2.3.4'").unwrap());
        assert!(!schema.validate("net.srcip", "1.2.3").unwrap());
    }

    #[test]
    fn int() {
        let schema = schema();
        assert!(schema.validate("net.srcport", "80").unwrap());
        assert!(!schema.validate("net.srcport", "80a").unwrap());
        assert!(!schema.validate("net.srcport", "").unwrap());
    }

    #[test]
    fn anything_else() {
        let schema = schema();
        assert!(schema.validate("web.uri", "/index.html?a=b").unwrap());
        assert!(!schema.validate("web.uri", "").unwrap());
        assert!(!schema.validate("web.missing", "x").unwrap());
    }

    #[test]
    fn unknown_validation() {
        let schema = schema();
        let err = schema.validate("net.proto", "tcp").unwrap_err();
        assert_eq!(
            err,
            Error::UnknownValidation {
                field: "net.proto".to_string(),
                tag: "MAC".to_string()
            }
        );
    }

    #[test]
    fn load_json() {
        let bare = FieldSchema::from_json(
            r#"[{"fqdn_field": "net.srcport", "type": "int", "text": "Source Port"}]"#,
        )
        .unwrap();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare.fields()[0].input_rule().unwrap(), InputRule::Int);

        let form = FieldSchema::from_json(
            r#"{"fields": [{"fqdn_field": "net.srcport", "field_type": "int"}], "classes": {}}"#,
        )
        .unwrap();
        assert_eq!(bare, form);
        assert_eq!(form.field_type("net", "srcport"), "int");
        assert_eq!(form.field_type("net", "dstport"), "string");

        assert!(matches!(
            FieldSchema::from_json("{\"fields\": 3}"),
            Err(Error::SerdeFail(_))
        ));
    }

    #[test]
    fn class_names() {
        let schema = schema();
        assert_eq!(schema.classes(), vec!["ANY", "net", "web"]);
    }
}
