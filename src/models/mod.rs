//! Document models.
//!
//! # Core Concepts
//!
//! - [`Model`]: a document model type. Enumerable attributes are declared on it
//!   and it owns everything they generate.
//! - [`Document`]: one persisted record, fields kept as JSON.
//! - [`Criteria`]: the query a scope returns, run by a
//!   [`DocumentStore`](crate::db::DocumentStore).
//! - [`ModelRegistry`]: models looked up by name, built from configuration.

mod criteria;
mod document;
mod model;
mod registry;

pub use criteria::*;
pub use document::*;
pub use model::*;
pub use registry::*;
