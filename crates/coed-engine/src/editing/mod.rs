/*!
 * # Block Mapping
 *
 * Maps positions in the content tree to the blocks around them, and moves
 * blocks between their live form (a node or mark in the tree) and a
 * detached descriptor.
 *
 * ## Architecture Overview
 *
 * ### 1. Blocks Are Types With a Role
 * - A block type registers one **root** type and one **content slot** type
 *   per named slot (`link` with `link_title` and `link_content`)
 * - Mark types can be roots too; their extent is the run of text carrying
 *   the mark
 *
 * ### 2. Read Side: Pure Queries
 * - Coordinates (positions or DOM-style handles) resolve against one tree
 *   snapshot and never touch it
 * - The ancestor walk reports every enclosing block root, outermost first,
 *   with the slot the position sits in
 * - Selections report only the blocks both ends share, by identity
 *
 * ### 3. Write Side: Transactions
 * - Helpers build a **`Transaction`** against a snapshot; only the editor
 *   applies it, and it refuses ones built on an older snapshot
 *
 * ### 4. Resolvers and Placeholders
 * - A resolver claims a reference by returning a placeholder descriptor and
 *   completes later through a one-shot callback
 * - Placeholders carry a unique marker id; completions find them again by
 *   that marker, so edits made in the meantime never misdirect them
 *
 * ## Module Structure
 *
 * - **`error`**: `EditError` and `ResolveError`
 * - **`position`**: `Coordinate`, `DomHandle` and resolution to `ResolvedPos`
 * - **`ancestors`**: block-root and content-slot walk
 * - **`selection`**: blocks shared by both ends of a selection
 * - **`descriptor`**: `BlockDescriptor` with lazily serialized slot content
 * - **`codec`**: `BlockSpec` registrations and node/descriptor/DOM/wire conversion
 * - **`link`**: the built-in link block and its resolver
 * - **`resolver`**: resolver chain, completions and settling
 * - **`paste`**: reference detection and id reconciliation for pasted content
 * - **`transaction`**: batched edits against one snapshot
 * - **`commands`**: select, insert, delete, replace, remove and refresh helpers
 * - **`editor`**: current tree, apply step and resolution processing
 */

pub mod ancestors;
pub mod codec;
pub mod commands;
pub mod descriptor;
pub mod editor;
pub mod error;
pub mod link;
pub mod paste;
pub mod position;
pub mod resolver;
pub mod selection;
pub mod transaction;

pub use ancestors::{BlockParent, BlockRoot, BlockTarget, ContentSlot, block_parent, block_parents};
pub use codec::{BlockCodec, BlockSpec, RootKind, SlotSpec};
pub use descriptor::{BlockDescriptor, SlotContent};
pub use editor::{Editor, EditorOptions};
pub use error::{EditError, ResolveError};
pub use link::{EchoInspector, Inspector, LinkBlock, LinkResolver};
pub use position::{Coordinate, DomHandle};
pub use resolver::{
    Completion, Outcome, Reference, ResolveContext, Resolver, ResolverChain, ResolverCoordinator,
};
pub use selection::{Selection, selection_parents};
pub use transaction::{Step, Transaction};
