use std::collections::BTreeMap;

use super::Model;
use crate::enumerable::EnumerableError;

/// Models indexed by name.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Model>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `model`, making it known to every registered ancestor so their
    /// scopes return its documents.
    pub fn register(&mut self, model: Model) -> Result<(), EnumerableError> {
        if self.models.contains_key(model.name()) {
            return Err(EnumerableError::ModelAlreadyRegistered(
                model.name().to_string(),
            ));
        }
        for ancestor in model.ancestors() {
            if let Some(registered) = self.models.get_mut(ancestor) {
                registered.add_descendant(model.name());
            }
        }
        self.models.insert(model.name().to_string(), model);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Like [`ModelRegistry::get`], failing with `UnknownModel`.
    pub fn require(&self, name: &str) -> Result<&Model, EnumerableError> {
        self.get(name)
            .ok_or_else(|| EnumerableError::UnknownModel(name.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
