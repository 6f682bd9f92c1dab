pub mod editing;
pub mod model;

#[cfg(test)]
pub(crate) mod tests;

// Re-export key types for easier usage
pub use editing::{
    BlockCodec, BlockDescriptor, BlockParent, Coordinate, DomHandle, EditError, Editor,
    EditorOptions, LinkResolver, Outcome, Reference, ResolverChain, Transaction,
};
pub use model::{AttrValue, Attrs, DomElement, DomNode, Fragment, Mark, Node, Schema};
