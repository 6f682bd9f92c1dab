//! # Content tree
//!
//! Immutable, position-addressed tree of typed nodes with inline marks.
//!
//! Positions count tree units: each character of text is one unit, a leaf
//! node is one unit, and a node with children adds one unit on each side of
//! its content. A [`ResolvedPos`] describes a position relative to all its
//! ancestors in one snapshot.
//!
//! - **`attrs`**: attribute values shared by nodes, marks and descriptors
//! - **`node`**: `Node`, `Mark`, `Fragment` and the splice primitives
//! - **`resolved`**: `ResolvedPos`
//! - **`schema`**: type registration with block roles
//! - **`dom`**: DOM-like structure for templates and clipboard

pub mod attrs;
pub mod dom;
pub mod node;
pub mod resolved;
pub mod schema;

pub use attrs::{AttrValue, Attrs, attrs};
pub use dom::{DomElement, DomFragment, DomNode};
pub use node::{Fragment, Mark, Node};
pub use resolved::{ResolvedPos, Side};
pub use schema::{BlockRole, MarkSpec, NodeSpec, Schema};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("position {pos} is outside of the document (size {size})")]
    PositionOutOfRange { pos: usize, size: usize },
    #[error("cannot replace {from}..{to}: the ends do not share a parent")]
    InvalidReplace { from: usize, to: usize },
}
