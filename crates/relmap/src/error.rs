//! Error types for relmap

use thiserror::Error;

/// Result type alias for relmap operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for schema declaration, query rendering, and row mapping.
///
/// Everything here is raised synchronously while building or mapping; nothing
/// is retried by the core. Transient database failures surface through
/// [`OrmError::Executor`] and retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum OrmError {
    /// A value is missing for a required column with no default, or a field
    /// name does not exist on the table.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The table foreign-key graph contains a cycle.
    #[error("Circular dependency detected in table foreign keys: {0}")]
    CircularDependency(String),

    /// A raw SQL template interpolated something other than a table or
    /// column reference.
    #[error("Unsupported raw SQL interpolation: {0}")]
    UnsupportedInterpolation(String),

    /// Render was requested on an incomplete or invalid builder state.
    #[error("Builder state error: {0}")]
    BuilderState(String),

    /// A fetched row does not match the declared selection shape.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Failure reported by the execution collaborator.
    #[error("Executor error: {0}")]
    Executor(String),
}

impl OrmError {
    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a row-mapping error.
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping(message.into())
    }

    /// Create a builder-state error.
    pub fn builder_state(message: impl Into<String>) -> Self {
        Self::BuilderState(message.into())
    }

    /// Create an executor error.
    pub fn executor(message: impl Into<String>) -> Self {
        Self::Executor(message.into())
    }

    /// Check if this is a circular dependency error.
    pub fn is_circular_dependency(&self) -> bool {
        matches!(self, Self::CircularDependency(_))
    }

    /// Check if this is a mapping error.
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }
}
