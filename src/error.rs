//! Error types for usage mistakes that must fail the render.

use thiserror::Error;

/// Result alias used by fallible component constructors.
pub type Result<T> = std::result::Result<T, PrimitiveError>;

/// Errors surfaced by the primitives.
///
/// Only programmer mistakes end up here. Environment problems and bad
/// numeric input are recovered locally and logged instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    /// A consumer was rendered outside the provider it depends on.
    #[error("`{consumer}` must be used within `{provider}`")]
    MissingProvider { consumer: String, provider: String },

    /// A required discriminant prop was not supplied.
    #[error("`{component}` requires the `{prop}` prop")]
    MissingProp {
        component: &'static str,
        prop: &'static str,
    },

    /// An operation needed a mounted node but the node has been released.
    #[error("node {node} is not mounted")]
    DetachedNode { node: usize },
}
