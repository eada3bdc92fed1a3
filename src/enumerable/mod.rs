//! Enumerated string attributes for document models.
//!
//! Declaring an attribute with [`Model::enumerable`](crate::models::Model::enumerable)
//! installs, for every declared value `v`:
//!
//! - a mutator `prefix + v + "!"` that writes `v` through the store,
//! - a predicate `prefix + v + "?"`,
//! - a scope selecting documents whose field equals `v`,
//!
//! plus one `all_<field>` accessor listing the values in declaration order.
//!
//! ```
//! use doc_enumerable::enumerable::Enumerable;
//! use doc_enumerable::models::Model;
//!
//! let mut build = Model::new("Build");
//! build
//!     .enumerable(Enumerable::new("status", ["completed", "running", "failed", "waiting"]))
//!     .unwrap();
//!
//! assert!(build.responds_to("waiting!"));
//! assert!(build.responds_to("waiting?"));
//! assert_eq!(build.introspect("all_status").unwrap().len(), 4);
//! ```

mod error;
mod field;
mod hooks;
mod install;

pub use error::EnumerableError;
pub use field::{EnumField, Transition};
pub use hooks::{
    truthy, AfterChange, AfterChangeFn, Arity, BeforeChange, BeforeChangeFn, Callback, Hook,
};

pub(crate) use install::install;

use serde::{Deserialize, Serialize};

/// How scope names are derived from declared values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeNaming {
    /// Scope named `prefix + value`, same stem as the instance members.
    #[default]
    Prefixed,
    /// Scope named by the bare value, prefix ignored.
    Bare,
}

/// Declaration of an enumerated attribute.
///
/// The first value is the default unless [`Enumerable::default_value`] says
/// otherwise. Validation happens when the declaration is installed on a model.
#[derive(Debug, Clone)]
pub struct Enumerable {
    field: String,
    values: Vec<String>,
    default: Option<String>,
    prefix: Option<String>,
    scope_naming: ScopeNaming,
    before_change: Option<BeforeChange>,
    after_change: Option<AfterChange>,
}

impl Enumerable {
    pub fn new<I, V>(field: impl AsRef<str>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        Self {
            field: field.as_ref().to_string(),
            values: values.into_iter().map(|v| v.as_ref().to_string()).collect(),
            default: None,
            prefix: None,
            scope_naming: ScopeNaming::default(),
            before_change: None,
            after_change: None,
        }
    }

    pub fn default_value(mut self, value: impl AsRef<str>) -> Self {
        self.default = Some(value.as_ref().to_string());
        self
    }

    /// Prepended to every generated member name.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn scope_naming(mut self, naming: ScopeNaming) -> Self {
        self.scope_naming = naming;
        self
    }

    pub fn before_change(mut self, hook: BeforeChange) -> Self {
        self.before_change = Some(hook);
        self
    }

    pub fn after_change(mut self, hook: AfterChange) -> Self {
        self.after_change = Some(hook);
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Check the declaration and fix its default.
    pub(crate) fn resolve(self) -> Result<EnumAttribute, EnumerableError> {
        let field = self.field;

        let mut values: Vec<String> = Vec::with_capacity(self.values.len());
        for value in self.values {
            if value.trim().is_empty() {
                return Err(EnumerableError::BlankValue { field });
            }
            if !values.contains(&value) {
                values.push(value);
            }
        }

        let Some(first) = values.first() else {
            return Err(EnumerableError::EmptyValues { field });
        };

        let default = match self.default {
            Some(default) if values.contains(&default) => default,
            Some(default) => return Err(EnumerableError::InvalidDefault { field, default }),
            None => first.clone(),
        };

        Ok(EnumAttribute {
            field,
            values,
            default,
            prefix: self.prefix.unwrap_or_default(),
            scope_naming: self.scope_naming,
            before_change: self.before_change,
            after_change: self.after_change,
        })
    }
}

/// A validated declaration as stored on the model.
#[derive(Debug, Clone)]
pub(crate) struct EnumAttribute {
    pub(crate) field: String,
    pub(crate) values: Vec<String>,
    pub(crate) default: String,
    pub(crate) prefix: String,
    pub(crate) scope_naming: ScopeNaming,
    pub(crate) before_change: Option<BeforeChange>,
    pub(crate) after_change: Option<AfterChange>,
}

impl EnumAttribute {
    pub(crate) fn mutator_name(&self, value: &str) -> String {
        format!("{}{}!", self.prefix, value)
    }

    pub(crate) fn predicate_name(&self, value: &str) -> String {
        format!("{}{}?", self.prefix, value)
    }

    pub(crate) fn scope_name(&self, value: &str) -> String {
        match self.scope_naming {
            ScopeNaming::Prefixed => format!("{}{}", self.prefix, value),
            ScopeNaming::Bare => value.to_string(),
        }
    }

    pub(crate) fn introspection_name(&self) -> String {
        introspection_name(&self.field)
    }
}

pub(crate) fn introspection_name(field: &str) -> String {
    format!("all_{field}")
}
