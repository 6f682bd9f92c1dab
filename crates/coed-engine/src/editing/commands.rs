//! Block-level edit helpers.
//!
//! Each helper addresses a block by coordinate and builds one
//! [`Transaction`] against the given tree; nothing is applied here. A
//! coordinate that does not resolve, or that is not inside a block, makes
//! the helper do nothing (`Ok(None)`) rather than fail.

use log::debug;

use crate::editing::EditError;
use crate::editing::ancestors::{BlockParent, BlockTarget, block_parent};
use crate::editing::codec::BlockCodec;
use crate::editing::descriptor::BlockDescriptor;
use crate::editing::position::{Coordinate, resolve};
use crate::editing::transaction::Transaction;
use crate::model::{Fragment, Node, Side};

/// The innermost block around `coordinate`.
pub fn select(codec: &BlockCodec, doc: &Node, coordinate: &Coordinate) -> Option<BlockParent> {
    let rpos = match resolve(doc, coordinate) {
        Ok(rpos) => rpos,
        Err(err) => {
            debug!("nothing to select: {err}");
            return None;
        }
    };
    block_parent(codec.schema(), &rpos, Side::After)
}

/// Insert a new block at `coordinate`.
pub fn insert(
    codec: &BlockCodec,
    doc: &Node,
    coordinate: &Coordinate,
    desc: &BlockDescriptor,
) -> Result<Option<Transaction>, EditError> {
    let pos = match coordinate.to_pos(doc) {
        Ok(pos) => pos,
        Err(err) => {
            debug!("nowhere to insert: {err}");
            return Ok(None);
        }
    };
    let node = codec.block_to_node(desc)?;
    let mut tr = Transaction::new(doc);
    tr.insert(pos, Fragment::from(vec![node]))?;
    Ok(Some(tr))
}

/// Delete the content between two coordinates.
pub fn delete(doc: &Node, from: &Coordinate, to: &Coordinate) -> Result<Option<Transaction>, EditError> {
    let (from, to) = match (from.to_pos(doc), to.to_pos(doc)) {
        (Ok(from), Ok(to)) => (from.min(to), from.max(to)),
        (Err(err), _) | (_, Err(err)) => {
            debug!("nothing to delete: {err}");
            return Ok(None);
        }
    };
    let mut tr = Transaction::new(doc);
    tr.delete(from, to)?;
    Ok(Some(tr))
}

/// Replace the block around `coordinate` with `desc`.
pub fn replace(
    codec: &BlockCodec,
    doc: &Node,
    coordinate: &Coordinate,
    desc: &BlockDescriptor,
) -> Result<Option<Transaction>, EditError> {
    let Some(parent) = select(codec, doc, coordinate) else {
        return Ok(None);
    };
    let range = parent.root.range;
    let mut tr = Transaction::new(doc);
    match parent.root.target {
        BlockTarget::Node(_) => {
            let node = codec.block_to_node(desc)?;
            tr.replace_with(range.start, range.end, Fragment::from(vec![node]))?;
        }
        BlockTarget::Mark(old) => {
            let mark = codec.block_to_mark(desc)?;
            tr.remove_mark(range.start, range.end, &old)?
                .add_mark(range.start, range.end, &mark)?;
        }
    }
    Ok(Some(tr))
}

/// Unwrap the block around `coordinate`: a node block is deleted, a mark
/// block loses its mark and keeps its text.
pub fn remove(codec: &BlockCodec, doc: &Node, coordinate: &Coordinate) -> Result<Option<Transaction>, EditError> {
    let Some(parent) = select(codec, doc, coordinate) else {
        return Ok(None);
    };
    let range = parent.root.range;
    let mut tr = Transaction::new(doc);
    match &parent.root.target {
        BlockTarget::Node(_) => tr.delete(range.start, range.end)?,
        BlockTarget::Mark(mark) => tr.remove_mark(range.start, range.end, mark)?,
    };
    Ok(Some(tr))
}

/// Re-render the block around `coordinate` through its template.
pub fn refresh(codec: &BlockCodec, doc: &Node, coordinate: &Coordinate) -> Result<Option<Transaction>, EditError> {
    let Some(parent) = select(codec, doc, coordinate) else {
        return Ok(None);
    };
    let desc = codec.node_to_block(&parent.root.target)?;
    let at = Coordinate::Pos(parent.root.range.start);
    replace(codec, doc, &at, &desc)
}
