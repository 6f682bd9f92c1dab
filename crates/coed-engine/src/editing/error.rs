use crate::model::ModelError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("coordinate does not resolve in this document: {0}")]
    NotFound(String),
    #[error("unknown block type: {0}")]
    UnknownBlockType(String),
    #[error("block type {0} is a mark and has no node form")]
    MarkBlock(String),
    #[error("invalid block descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("transaction was built against an older document")]
    StaleTransaction,
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Failure reported by a resolver through its completion callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("resolution failed: {0}")]
    Failed(String),
}
