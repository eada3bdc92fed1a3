use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::{EnumAttribute, EnumerableError};
use crate::db::DocumentStore;
use crate::models::{Criteria, Document, Model};

/// Outcome of a mutator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub field: String,
    pub from: String,
    pub to: String,
    /// `false` when a before-change hook vetoed the write.
    pub applied: bool,
}

/// Typed access to one enumerable attribute of a model.
#[derive(Debug, Clone, Copy)]
pub struct EnumField<'m> {
    model: &'m Model,
    attr: &'m EnumAttribute,
}

impl<'m> EnumField<'m> {
    pub(crate) fn new(model: &'m Model, attr: &'m EnumAttribute) -> Self {
        Self { model, attr }
    }

    pub fn field(&self) -> &'m str {
        &self.attr.field
    }

    /// Declared values in declaration order.
    pub fn all_values(&self) -> &'m [String] {
        &self.attr.values
    }

    pub fn default_value(&self) -> &'m str {
        &self.attr.default
    }

    pub fn prefix(&self) -> &'m str {
        &self.attr.prefix
    }

    pub fn mutator_name(&self, value: &str) -> String {
        self.attr.mutator_name(value)
    }

    pub fn predicate_name(&self, value: &str) -> String {
        self.attr.predicate_name(value)
    }

    pub fn scope_name(&self, value: &str) -> String {
        self.attr.scope_name(value)
    }

    /// Current value of the field.
    ///
    /// A document without the field reads as the declared default. A stored
    /// value that is not a string (`null` included) is no value at all and
    /// yields `None`.
    pub fn current<'a>(&self, document: &'a Document) -> Option<&'a str>
    where
        'm: 'a,
    {
        match document.get(&self.attr.field) {
            None => Some(self.attr.default.as_str()),
            Some(Value::String(value)) => Some(value.as_str()),
            Some(_) => None,
        }
    }

    pub fn is(&self, document: &Document, value: &str) -> bool {
        self.current(document) == Some(value)
    }

    /// The value handed to hooks as the old value. Non-string values are
    /// passed as their JSON text, so a stored `null` arrives as `"null"`.
    fn previous(&self, document: &Document) -> String {
        match document.get(&self.attr.field) {
            None => self.attr.default.clone(),
            Some(Value::String(value)) => value.clone(),
            Some(raw) => raw.to_string(),
        }
    }

    /// Scope selecting documents whose field equals `value`.
    pub fn scope_for(&self, value: &str) -> Option<Criteria> {
        let value = self.token(value).ok()?;
        Some(self.model.criteria().where_eq(self.attr.field.as_str(), value))
    }

    /// Move the document to `value`.
    ///
    /// Both hooks are resolved before anything runs, so a bad callback fails
    /// the call with the field untouched. The before-change hook may veto the
    /// write; the after-change hook only runs once the store accepted it.
    pub fn set<S>(
        &self,
        store: &S,
        document: &mut Document,
        value: &str,
    ) -> Result<Transition, EnumerableError>
    where
        S: DocumentStore + ?Sized,
    {
        let to = self.token(value)?;
        let from = self.previous(document);

        let before_change = self
            .attr
            .before_change
            .as_ref()
            .map(|hook| hook.resolve(self.model))
            .transpose()?;
        let after_change = self
            .attr
            .after_change
            .as_ref()
            .map(|hook| hook.resolve(self.model))
            .transpose()?;

        let mut transition = Transition {
            field: self.attr.field.clone(),
            from,
            to: to.to_string(),
            applied: false,
        };

        if let Some(hook) = &before_change {
            if !hook.allows(document, &transition.from, to) {
                tracing::debug!(
                    model = %self.model.name(),
                    id = %document.id,
                    field = %transition.field,
                    from = %transition.from,
                    to = %to,
                    "Change vetoed by before_change hook"
                );
                return Ok(transition);
            }
        }

        let mut updated = document.clone();
        updated.set(self.attr.field.as_str(), to);
        updated.updated_at = Utc::now();
        store.save(&updated)?;
        *document = updated;
        transition.applied = true;

        tracing::debug!(
            model = %self.model.name(),
            id = %document.id,
            field = %transition.field,
            from = %transition.from,
            to = %to,
            "Enumerable changed"
        );

        if let Some(hook) = &after_change {
            hook.notify(document, &transition.from, to);
        }

        Ok(transition)
    }

    fn token(&self, value: &str) -> Result<&'m str, EnumerableError> {
        self.attr
            .values
            .iter()
            .find(|v| v.as_str() == value)
            .map(String::as_str)
            .ok_or_else(|| EnumerableError::UnknownValue {
                field: self.attr.field.clone(),
                value: value.to_string(),
            })
    }
}
