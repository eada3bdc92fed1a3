use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::{Criteria, Document};
use crate::db::DocumentStore;
use crate::enumerable::{
    self, introspection_name, Callback, EnumAttribute, EnumField, Enumerable, EnumerableError,
    Transition,
};

/// A document model type.
///
/// A `Model` plays the part of a model class: it owns the declared fields,
/// the generated instance members (mutators and predicates), the generated
/// scopes and the named callbacks hooks can refer to. Nothing is shared
/// between models, so two models declaring the same values stay independent.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    collection: String,
    /// Enclosing models, root first.
    ancestors: Vec<String>,
    /// Known subclasses at any depth.
    descendants: Vec<String>,
    fields: Vec<FieldDeclaration>,
    members: BTreeMap<String, Member>,
    scopes: BTreeMap<String, Scope>,
    callbacks: BTreeMap<String, Callback>,
    enumerables: Vec<EnumAttribute>,
}

/// A persisted field with its default value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDeclaration {
    pub name: String,
    pub default: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Mutator,
    Predicate,
}

/// A generated instance member bound to one value of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub kind: MemberKind,
    pub field: String,
    pub value: String,
}

impl Member {
    pub fn new(kind: MemberKind, field: &str, value: &str) -> Self {
        Self {
            kind,
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// A generated scope: documents whose `field` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub field: String,
    pub value: String,
}

impl Scope {
    pub fn new(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Result of invoking a member by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MemberOutput {
    Predicate(bool),
    Transition(Transition),
}

impl Model {
    /// Create a model stored in the default collection for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let collection = default_collection(&name);
        Self {
            name,
            collection,
            ancestors: Vec::new(),
            descendants: Vec::new(),
            fields: Vec::new(),
            members: BTreeMap::new(),
            scopes: BTreeMap::new(),
            callbacks: BTreeMap::new(),
            enumerables: Vec::new(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn parent(&self) -> Option<&str> {
        self.ancestors.last().map(String::as_str)
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    pub fn descendants(&self) -> &[String] {
        &self.descendants
    }

    /// Derive a model sharing this model's collection and declarations.
    ///
    /// Declarations made on the subclass afterwards are not visible to the
    /// parent, and scopes called on the subclass are bound to the subclass
    /// and its own subclasses. The parent only learns about the new model
    /// through [`Model::add_descendant`], which [`super::ModelRegistry`]
    /// calls on registration.
    pub fn subclass(&self, name: impl Into<String>) -> Self {
        let mut model = self.clone();
        model.name = name.into();
        model.ancestors.push(self.name.clone());
        model.descendants.clear();
        model
    }

    /// Record `name` as a subclass whose documents this model's scopes return.
    pub fn add_descendant(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.name && !self.descendants.contains(&name) {
            self.descendants.push(name);
        }
    }

    /// Whether `document` is an instance of this model or of a known subclass.
    pub fn owns(&self, document: &Document) -> bool {
        document.collection == self.collection
            && (document.model == self.name || self.descendants.contains(&document.model))
    }

    // ============================================================
    // Declarations
    // ============================================================

    /// Declare an enumerated attribute and generate its members and scopes.
    pub fn enumerable(&mut self, declaration: Enumerable) -> Result<(), EnumerableError> {
        enumerable::install(self, declaration)
    }

    /// Define a named callback that hooks can refer to.
    pub fn define_callback(&mut self, name: impl Into<String>, callback: Callback) -> &mut Self {
        self.callbacks.insert(name.into(), callback);
        self
    }

    pub fn callback(&self, name: &str) -> Option<&Callback> {
        self.callbacks.get(name)
    }

    pub fn fields(&self) -> &[FieldDeclaration] {
        &self.fields
    }

    pub fn declares_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub(crate) fn declare_field(&mut self, field: FieldDeclaration) {
        self.fields.push(field);
    }

    pub(crate) fn insert_member(&mut self, name: String, member: Member) {
        self.members.insert(name, member);
    }

    pub(crate) fn insert_scope(&mut self, name: String, scope: Scope) {
        self.scopes.insert(name, scope);
    }

    pub(crate) fn push_enumerable(&mut self, attr: EnumAttribute) {
        self.enumerables.push(attr);
    }

    // ============================================================
    // Typed access
    // ============================================================

    pub fn enum_field(&self, field: &str) -> Option<EnumField<'_>> {
        self.enumerables
            .iter()
            .find(|attr| attr.field == field)
            .map(|attr| EnumField::new(self, attr))
    }

    pub fn enum_fields(&self) -> impl Iterator<Item = EnumField<'_>> {
        self.enumerables
            .iter()
            .map(move |attr| EnumField::new(self, attr))
    }

    /// A new, unsaved document with every declared default applied.
    pub fn new_document(&self) -> Document {
        let mut document = Document::new(self.name.as_str(), self.collection.as_str());
        for field in &self.fields {
            document.set(field.name.as_str(), field.default.clone());
        }
        document
    }

    /// An unfiltered criteria over this model's documents.
    ///
    /// A subclass is narrowed to itself and its descendants; a root model
    /// sees its whole collection.
    pub fn criteria(&self) -> Criteria {
        let criteria = Criteria::new(self.name.as_str(), self.collection.as_str());
        if self.ancestors.is_empty() {
            return criteria;
        }
        let types = std::iter::once(&self.name)
            .chain(&self.descendants)
            .cloned()
            .collect();
        criteria.with_types(types)
    }

    // ============================================================
    // Access by name
    // ============================================================

    /// Whether documents of this model have an instance member called `name`.
    pub fn responds_to(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Whether the model itself answers to `name`, either as a scope or as
    /// an `all_<field>` accessor.
    pub fn defines_class_member(&self, name: &str) -> bool {
        self.scopes.contains_key(name) || self.introspect(name).is_some()
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(name, member)| (name.as_str(), member))
    }

    pub fn scopes(&self) -> impl Iterator<Item = (&str, &Scope)> {
        self.scopes.iter().map(|(name, scope)| (name.as_str(), scope))
    }

    /// Run the scope called `name`.
    pub fn scope(&self, name: &str) -> Option<Criteria> {
        self.scopes.get(name).map(|scope| {
            self.criteria()
                .where_eq(scope.field.as_str(), scope.value.as_str())
        })
    }

    /// Values of the `all_<field>` accessor called `name`.
    pub fn introspect(&self, name: &str) -> Option<&[String]> {
        self.enumerables
            .iter()
            .find(|attr| introspection_name(&attr.field) == name)
            .map(|attr| attr.values.as_slice())
    }

    /// Invoke the instance member called `name` on `document`.
    pub fn call<S>(
        &self,
        store: &S,
        document: &mut Document,
        name: &str,
    ) -> Result<MemberOutput, EnumerableError>
    where
        S: DocumentStore + ?Sized,
    {
        let undefined = || EnumerableError::UndefinedMember {
            model: self.name.clone(),
            name: name.to_string(),
        };
        let member = self.members.get(name).ok_or_else(undefined)?;
        let field = self.enum_field(&member.field).ok_or_else(undefined)?;

        match member.kind {
            MemberKind::Predicate => Ok(MemberOutput::Predicate(
                field.is(document, &member.value),
            )),
            MemberKind::Mutator => field
                .set(store, document, &member.value)
                .map(MemberOutput::Transition),
        }
    }
}

/// `Build` -> `builds`, `TaskRun` -> `task_runs`.
fn default_collection(name: &str) -> String {
    let mut collection = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                collection.push('_');
            }
            collection.extend(c.to_lowercase());
        } else {
            collection.push(c);
        }
    }
    if !collection.ends_with('s') {
        collection.push('s');
    }
    collection
}
