//! Declarative enumerated attributes for document models.
//!
//! See [`enumerable`] for the installer and [`models`] for the document layer
//! it decorates.

pub mod config;
pub mod db;
pub mod enumerable;
pub mod models;
pub mod render;
