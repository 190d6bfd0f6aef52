//! Declarative dialog forms.
//!
//! Forms for saving results, scheduling queries, picking connectors and the like are described
//! as a grid of items. Each row is a list of cells, and a cell is either one item or several
//! items stacked together. Items are tagged by `type`:
//!
//! - `text`: a static label.
//! - `input`: a text box, optionally carrying a `regex` its value must match.
//! - `element`: an arbitrary element, named by `element`.
//! - `widget`: a widget, named by `className`.
//!
//! ```
//! # use std::collections::BTreeMap;
//! # use elsa_query::Form;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let form = Form::from_json(r#"[
//!     [{"type": "text", "args": {"label": "Days to run"}},
//!      {"type": "input", "args": {"id": "days", "value": "7"}, "regex": "^\\d+$"}]
//! ]"#)?;
//! let mut values = BTreeMap::new();
//! values.insert("days".to_string(), "seven".to_string());
//! assert!(form.validate(&values).is_err());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use regex::Regex;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

mod serde_regex;

/// Arguments common to every item. Anything not named here is kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Item arguments, or a bare string as shorthand for just a `label`.
fn de_args<'de, D>(deserializer: D) -> Result<ItemArgs, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Label(String),
        Args(ItemArgs),
    }
    Ok(match Repr::deserialize(deserializer)? {
        Repr::Label(label) => ItemArgs {
            label: Some(label),
            ..Default::default()
        },
        Repr::Args(args) => args,
    })
}

/// A text box.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InputItem {
    #[serde(default, deserialize_with = "de_args")]
    pub args: ItemArgs,
    /// A regular expression that non-empty values must match.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "serde_regex")]
    pub regex: Option<Box<Regex>>,
}

impl InputItem {
    /// The key this input's value is reported under: its `id`, or failing that its `name`.
    pub fn key(&self) -> Option<&str> {
        self.args.id.as_deref().or(self.args.name.as_deref())
    }

    /// True if `value` is empty or matches the input's regex.
    pub fn accepts(&self, value: &str) -> bool {
        value.is_empty() || self.regex.as_ref().map_or(true, |re| re.is_match(value))
    }
}

impl PartialEq for InputItem {
    fn eq(&self, rhs: &Self) -> bool {
        (self.args == rhs.args)
            && match (&self.regex, &rhs.regex) {
                (None, None) => true,
                (Some(_), None) => false,
                (None, Some(_)) => false,
                (Some(lhs), Some(rhs)) => lhs.as_str() == rhs.as_str(),
            }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FormItem {
    Text {
        #[serde(default, deserialize_with = "de_args")]
        args: ItemArgs,
    },
    Input(InputItem),
    Element {
        element: String,
        #[serde(default, deserialize_with = "de_args")]
        args: ItemArgs,
    },
    Widget {
        #[serde(rename = "className")]
        class_name: String,
        #[serde(default, deserialize_with = "de_args")]
        args: ItemArgs,
    },
}

impl FormItem {
    pub fn args(&self) -> &ItemArgs {
        match self {
            FormItem::Text { args } => args,
            FormItem::Input(input) => &input.args,
            FormItem::Element { args, .. } => args,
            FormItem::Widget { args, .. } => args,
        }
    }
}

/// One grid cell: a single item, or several stacked in the same cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    One(FormItem),
    Stack(Vec<FormItem>),
}

impl Cell {
    pub fn items(&self) -> &[FormItem] {
        match self {
            Cell::One(item) => std::slice::from_ref(item),
            Cell::Stack(items) => items,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Form {
    pub grid: Vec<Vec<Cell>>,
}

impl Form {
    pub fn new(grid: Vec<Vec<Cell>>) -> Self {
        Self { grid }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::custom(e.to_string()))
    }

    /// Number of columns: the length of the longest row.
    pub fn width(&self) -> usize {
        self.grid.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// How many columns the last cell of `row` spans so the row fills the grid. `None` if there
    /// is no such row or it's empty.
    pub fn colspan(&self, row: usize) -> Option<usize> {
        let len = self.grid.get(row)?.len();
        if len == 0 {
            return None;
        }
        Some(self.width() - len + 1)
    }

    /// Every text box in the form, in reading order.
    pub fn inputs(&self) -> impl Iterator<Item = &InputItem> {
        self.grid
            .iter()
            .flatten()
            .flat_map(Cell::items)
            .filter_map(|item| match item {
                FormItem::Input(input) => Some(input),
                _ => None,
            })
    }

    fn value_of<'a>(input: &'a InputItem, key: &str, entered: &'a BTreeMap<String, String>) -> &'a str {
        entered
            .get(key)
            .map(String::as_str)
            .or(input.args.value.as_deref())
            .unwrap_or("")
    }

    /// Check entered values against each input's regex. Inputs with nothing entered fall back to
    /// their default `value`. Fails on the first input whose non-empty value doesn't match.
    pub fn validate(&self, entered: &BTreeMap<String, String>) -> Result<()> {
        for input in self.inputs() {
            let key = match input.key() {
                Some(key) => key,
                None => continue,
            };
            let value = Self::value_of(input, key, entered);
            if !input.accepts(value) {
                log::warn!("invalid value {} for input {}", value, key);
                return Err(Error::InvalidTerm {
                    field: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The non-empty value of each keyed input, from `entered` or the input's default.
    pub fn values(&self, entered: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        self.inputs()
            .filter_map(|input| {
                let key = input.key()?;
                let value = Self::value_of(input, key, entered);
                if value.is_empty() {
                    None
                } else {
                    Some((key.to_string(), value.to_string()))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCHEDULE: &str = r#"[
        [{"type": "text", "args": {"label": "Run every"}},
         {"type": "input", "args": {"id": "count", "value": "1", "size": 2}, "regex": "^\\d+$"},
         {"type": "widget", "className": "Menu", "args": {"id": "time_unit"}}],
        [[{"type": "text", "args": {"label": "for"}},
          {"type": "input", "args": {"name": "days"}, "regex": "^\\d+$"}]],
        [{"type": "element", "element": "br"},
         {"type": "input", "args": {"id": "comments"}}]
    ]"#;

    fn entered(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_grid() {
        let form = Form::from_json(SCHEDULE).unwrap();
        assert_eq!(form.grid.len(), 3);
        assert_eq!(form.width(), 3);
        assert_eq!(form.colspan(0), Some(1));
        assert_eq!(form.colspan(1), Some(3));
        assert_eq!(form.colspan(2), Some(2));
        assert_eq!(form.colspan(9), None);
        assert!(matches!(form.grid[1][0], Cell::Stack(ref items) if items.len() == 2));

        let keys: Vec<&str> = form.inputs().filter_map(InputItem::key).collect();
        assert_eq!(keys, vec!["count", "days", "comments"]);

        match &form.grid[0][1] {
            Cell::One(FormItem::Input(input)) => {
                assert_eq!(input.args.extra.get("size"), Some(&Value::from(2)));
            }
            other => panic!("expected an input, got {:?}", other),
        }
        match &form.grid[0][2] {
            Cell::One(FormItem::Widget { class_name, args }) => {
                assert_eq!(class_name, "Menu");
                assert_eq!(args.id.as_deref(), Some("time_unit"));
            }
            other => panic!("expected a widget, got {:?}", other),
        }
    }

    #[test]
    fn validate_inputs() {
        let form = Form::from_json(SCHEDULE).unwrap();
        form.validate(&entered(&[])).unwrap();
        form.validate(&entered(&[("count", "5"), ("days", "30"), ("comments", "nightly run")]))
            .unwrap();
        assert_eq!(
            form.validate(&entered(&[("days", "a month")])).unwrap_err(),
            Error::InvalidTerm {
                field: "days".to_string(),
                value: "a month".to_string()
            }
        );
    }

    #[test]
    fn collect_values() {
        let form = Form::from_json(SCHEDULE).unwrap();
        let values = form.values(&entered(&[("days", "30"), ("comments", "")]));
        assert_eq!(values, entered(&[("count", "1"), ("days", "30")]));
    }

    #[test]
    fn string_args_are_labels() {
        let form = Form::from_json(
            r#"[[{"type": "text", "args": "Params (optional)"},
                 {"type": "input", "args": {"id": "params", "size": 32}}]]"#,
        )
        .unwrap();
        match &form.grid[0][0] {
            Cell::One(FormItem::Text { args }) => {
                assert_eq!(args.label.as_deref(), Some("Params (optional)"));
                assert!(args.id.is_none());
                assert!(args.extra.is_empty());
            }
            other => panic!("expected text, got {:?}", other),
        }
        assert_eq!(form.values(&BTreeMap::new()).len(), 0);
        assert!(Form::from_json(r#"[[{"type": "text", "args": 5}]]"#).is_err());
    }

    #[test]
    fn bad_forms() {
        assert!(matches!(
            Form::from_json(r#"[[{"type": "slider"}]]"#),
            Err(Error::SerdeFail(_))
        ));
        assert!(matches!(
            Form::from_json(r#"[[{"type": "input", "regex": "(unclosed"}]]"#),
            Err(Error::SerdeFail(_))
        ));
    }

    #[test]
    fn round_trip_keeps_regex() {
        let form = Form::from_json(SCHEDULE).unwrap();
        let json = serde_json::to_string(&form).unwrap();
        assert_eq!(Form::from_json(&json).unwrap(), form);
    }
}
