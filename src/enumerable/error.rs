use thiserror::Error;

/// Errors raised while declaring enumerable attributes or running their members.
#[derive(Debug, Error)]
pub enum EnumerableError {
    /// A named callback used as a hook does not take exactly two arguments.
    #[error("Method {method} must receive two parameters: old_value and new_value")]
    InvalidHookSignature { method: String },

    #[error("undefined callback `{name}` for {model}")]
    MissingCallback { model: String, name: String },

    #[error("enumerable `{field}` must declare at least one value")]
    EmptyValues { field: String },

    #[error("enumerable `{field}` declares a blank value")]
    BlankValue { field: String },

    #[error("default `{default}` is not one of the values declared for `{field}`")]
    InvalidDefault { field: String, default: String },

    #[error("`{value}` is not a declared value of `{field}`")]
    UnknownValue { field: String, value: String },

    #[error("field `{field}` is already declared on {model}")]
    FieldAlreadyDeclared { model: String, field: String },

    #[error("`{name}` is already defined on {model}")]
    NameCollision { model: String, name: String },

    #[error("undefined method `{name}` for {model}")]
    UndefinedMember { model: String, name: String },

    #[error("model {0} is already registered")]
    ModelAlreadyRegistered(String),

    #[error("unknown model {0}")]
    UnknownModel(String),

    #[error("failed to persist document: {0}")]
    Persistence(#[from] anyhow::Error),
}
