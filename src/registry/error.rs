//! Registry error types

use super::entry::ContextId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Stream name is still claimed by a live context
    StreamNameInUse { name: String, owner: ContextId },
    /// Context is not registered
    ContextNotFound(ContextId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::StreamNameInUse { name, owner } => {
                write!(f, "Stream name {} already claimed by {}", name, owner)
            }
            RegistryError::ContextNotFound(id) => write!(f, "Context not found: {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}
