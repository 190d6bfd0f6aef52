//! Named capabilities, looked up by string at runtime.
//!
//! Menus and result-view actions refer to what they do by name ("addTermAndSubmit", "groupBy",
//! "sendToConnector", ...). A [`CapabilityRegistry`] maps those names to handlers that act on some
//! shared context `C`, usually a [`Session`][crate::Session].

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};

type Handler<C> = Box<dyn Fn(&mut C, &Value) -> Result<Value>>;

pub struct CapabilityRegistry<C> {
    handlers: BTreeMap<String, Handler<C>>,
}

impl<C> Default for CapabilityRegistry<C> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<C> fmt::Debug for CapabilityRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl<C> CapabilityRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any earlier one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&mut C, &Value) -> Result<Value> + 'static,
    {
        let name = name.into();
        if self.handlers.insert(name.clone(), Box::new(handler)).is_some() {
            log::debug!("replaced capability {}", name);
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn invoke(&self, name: &str, context: &mut C, args: &Value) -> Result<Value> {
        let handler = self.handlers.get(name).ok_or_else(|| {
            log::warn!("no capability named {}", name);
            Error::UnknownCapability(name.to_string())
        })?;
        handler(context, args)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::Query;
    use crate::schema::{FieldDescriptor, FieldSchema};
    use serde_json::json;
    use std::sync::Arc;

    fn query() -> Query {
        Query::new(Arc::new(FieldSchema::new(vec![
            FieldDescriptor::new("ANY.host").display("host"),
        ])))
    }

    fn registry() -> CapabilityRegistry<Query> {
        let mut reg = CapabilityRegistry::new();
        reg.register("addTermAndSubmit", |query: &mut Query, args: &Value| {
            let field = args["field"].as_str().unwrap_or_default();
            let value = args["value"].as_str().unwrap_or_default();
            let payload = query.pivot_on(field, value)?;
            Ok(json!(payload))
        })
        .register("groupBy", |query: &mut Query, args: &Value| {
            let field = args["field"].as_str().unwrap_or_default();
            Ok(json!(query.group_by(args["class"].as_str(), field)))
        });
        reg
    }

    #[test]
    fn dispatch() {
        let reg = registry();
        let mut query = query();
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["addTermAndSubmit", "groupBy"]);
        assert!(reg.contains("groupBy"));

        let out = reg
            .invoke("addTermAndSubmit", &mut query, &json!({"field": "host", "value": "10.1.1.1"}))
            .unwrap();
        assert_eq!(out["query_string"], "+host=\"10.1.1.1\"");

        let out = reg
            .invoke("groupBy", &mut query, &json!({"class": "SNORT", "field": "sig_msg"}))
            .unwrap();
        assert_eq!(out["query_meta_params"]["groupby"], json!(["sig_msg"]));
        assert_eq!(out["query_meta_params"]["class"], "SNORT");
    }

    #[test]
    fn handler_errors_pass_through() {
        let reg = registry();
        let mut query = query();
        let err = reg
            .invoke("addTermAndSubmit", &mut query, &json!({"field": "host", "value": "not a host!"}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTerm { .. }));
    }

    #[test]
    fn unknown() {
        let reg = registry();
        let mut query = query();
        assert_eq!(
            reg.invoke("nope", &mut query, &Value::Null).unwrap_err(),
            Error::UnknownCapability("nope".to_string())
        );
    }
}
