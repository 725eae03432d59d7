//! Changeset file discovery and ordering.

pub mod resolver;

pub use resolver::{FileResolver, expand_braces, is_glob};
