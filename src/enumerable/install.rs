use serde_json::Value;

use super::{Enumerable, EnumerableError};
use crate::models::{FieldDeclaration, Member, MemberKind, Model, Scope};

/// Install an enumerable declaration on `model`.
///
/// Every generated name is checked before the model is touched, so a failed
/// declaration leaves the model exactly as it was.
pub(crate) fn install(model: &mut Model, declaration: Enumerable) -> Result<(), EnumerableError> {
    let attr = declaration.resolve()?;

    if model.declares_field(&attr.field) {
        return Err(EnumerableError::FieldAlreadyDeclared {
            model: model.name().to_string(),
            field: attr.field,
        });
    }

    let mut members = Vec::with_capacity(attr.values.len() * 2);
    let mut scopes = Vec::with_capacity(attr.values.len());
    for value in &attr.values {
        members.push((
            attr.mutator_name(value),
            Member::new(MemberKind::Mutator, &attr.field, value),
        ));
        members.push((
            attr.predicate_name(value),
            Member::new(MemberKind::Predicate, &attr.field, value),
        ));
        scopes.push((attr.scope_name(value), Scope::new(&attr.field, value)));
    }

    let introspection = attr.introspection_name();
    let scope_names = || scopes.iter().map(|(name, _)| name);

    let collision = members
        .iter()
        .map(|(name, _)| name)
        .find(|name| model.responds_to(name))
        .or_else(|| {
            scope_names()
                .chain(std::iter::once(&introspection))
                .find(|name| model.defines_class_member(name))
        })
        // A bare scope may shadow the accessor of its own field.
        .or_else(|| scope_names().find(|name| **name == introspection));
    if let Some(name) = collision {
        return Err(EnumerableError::NameCollision {
            model: model.name().to_string(),
            name: name.clone(),
        });
    }

    model.declare_field(FieldDeclaration {
        name: attr.field.clone(),
        default: Value::String(attr.default.clone()),
    });
    for (name, member) in members {
        model.insert_member(name, member);
    }
    for (name, scope) in scopes {
        model.insert_scope(name, scope);
    }

    tracing::info!(
        model = %model.name(),
        field = %attr.field,
        values = ?attr.values,
        default = %attr.default,
        "Installed enumerable"
    );

    model.push_enumerable(attr);
    Ok(())
}
