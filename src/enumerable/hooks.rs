//! Change hooks run around an enumerable transition.
//!
//! A hook is either an inline closure, whose two-argument signature is
//! fixed by its type, or the name of a [`Callback`] defined on the model.
//! Named callbacks carry a declared [`Arity`] that is checked every time a
//! mutator resolves them.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::EnumerableError;
use crate::models::{Document, Model};

pub type BeforeChangeFn = dyn Fn(&Document, &str, &str) -> bool + Send + Sync;
pub type AfterChangeFn = dyn Fn(&Document, &str, &str) + Send + Sync;

/// Runs before the field is written. A falsy result vetoes the change.
pub type BeforeChange = Hook<BeforeChangeFn>;

/// Runs after the field was written.
pub type AfterChange = Hook<AfterChangeFn>;

pub enum Hook<F: ?Sized> {
    /// A callback looked up on the model by name when the mutator runs.
    Named(String),
    Inline(Arc<F>),
}

impl<F: ?Sized> Hook<F> {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Find the callable behind this hook, validating named callbacks.
    pub(crate) fn resolve<'a>(
        &'a self,
        model: &'a Model,
    ) -> Result<Resolved<'a, F>, EnumerableError> {
        match self {
            Self::Inline(f) => Ok(Resolved::Inline(&**f)),
            Self::Named(name) => {
                let callback = model
                    .callback(name)
                    .ok_or_else(|| EnumerableError::MissingCallback {
                        model: model.name().to_string(),
                        name: name.clone(),
                    })?;
                callback.validate(name)?;
                Ok(Resolved::Callback(callback))
            }
        }
    }
}

impl Hook<BeforeChangeFn> {
    pub fn inline(f: impl Fn(&Document, &str, &str) -> bool + Send + Sync + 'static) -> Self {
        Self::Inline(Arc::new(f))
    }
}

impl Hook<AfterChangeFn> {
    pub fn inline(f: impl Fn(&Document, &str, &str) + Send + Sync + 'static) -> Self {
        Self::Inline(Arc::new(f))
    }
}

impl<F: ?Sized> Clone for Hook<F> {
    fn clone(&self) -> Self {
        match self {
            Self::Named(name) => Self::Named(name.clone()),
            Self::Inline(f) => Self::Inline(Arc::clone(f)),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

pub(crate) enum Resolved<'a, F: ?Sized> {
    Inline(&'a F),
    Callback(&'a Callback),
}

impl Resolved<'_, BeforeChangeFn> {
    pub(crate) fn allows(&self, document: &Document, old: &str, new: &str) -> bool {
        match self {
            Self::Inline(f) => f(document, old, new),
            Self::Callback(callback) => truthy(&callback.invoke_change(document, old, new)),
        }
    }
}

impl Resolved<'_, AfterChangeFn> {
    pub(crate) fn notify(&self, document: &Document, old: &str, new: &str) {
        match self {
            Self::Inline(f) => f(document, old, new),
            Self::Callback(callback) => {
                callback.invoke_change(document, old, new);
            }
        }
    }
}

/// Declared parameter count of a [`Callback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Accepts any number of arguments; never rejected as a hook.
    Variadic,
}

/// A named method defined on a model, callable with positional JSON arguments.
#[derive(Clone)]
pub struct Callback {
    arity: Arity,
    body: Arc<dyn Fn(&Document, &[Value]) -> Value + Send + Sync>,
}

impl Callback {
    pub fn new(
        arity: Arity,
        body: impl Fn(&Document, &[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            arity,
            body: Arc::new(body),
        }
    }

    /// A callback taking `(old_value, new_value)`.
    pub fn change(body: impl Fn(&Document, &str, &str) -> Value + Send + Sync + 'static) -> Self {
        Self::new(Arity::Fixed(2), move |document, args| {
            let old = args.first().and_then(Value::as_str).unwrap_or_default();
            let new = args.get(1).and_then(Value::as_str).unwrap_or_default();
            body(document, old, new)
        })
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn invoke(&self, document: &Document, args: &[Value]) -> Value {
        (self.body)(document, args)
    }

    fn invoke_change(&self, document: &Document, old: &str, new: &str) -> Value {
        self.invoke(
            document,
            &[Value::String(old.to_string()), Value::String(new.to_string())],
        )
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), EnumerableError> {
        match self.arity {
            Arity::Fixed(2) | Arity::Variadic => Ok(()),
            Arity::Fixed(_) => Err(EnumerableError::InvalidHookSignature {
                method: name.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// `null` and `false` are falsy, every other value is truthy.
pub fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}
