use crate::editing::EditError;
use crate::editing::ancestors::{BlockParent, block_parents};
use crate::model::{Node, ResolvedPos, Schema, Side};

/// A pair of positions in one tree snapshot, `from <= to`.
#[derive(Debug, Clone)]
pub struct Selection {
    from: ResolvedPos,
    to: ResolvedPos,
}

impl Selection {
    pub fn new(doc: &Node, from: usize, to: usize) -> Result<Self, EditError> {
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        Ok(Self {
            from: doc.resolve(from)?,
            to: doc.resolve(to)?,
        })
    }

    pub fn cursor(doc: &Node, pos: usize) -> Result<Self, EditError> {
        Self::new(doc, pos, pos)
    }

    pub fn from(&self) -> &ResolvedPos {
        &self.from
    }

    pub fn to(&self) -> &ResolvedPos {
        &self.to
    }

    pub fn is_empty(&self) -> bool {
        self.from.pos() == self.to.pos()
    }
}

/// Block roots shared by both ends of the selection, outermost first.
///
/// The ends are compared by identity from the innermost shared depth
/// outwards; the first pair that is not the very same node or mark ends
/// the walk. Entries carry the slot seen from the start of the selection.
pub fn selection_parents(schema: &Schema, selection: &Selection) -> Vec<BlockParent> {
    let mut from_chain = block_parents(schema, selection.from(), Side::After);
    if selection.is_empty() {
        return from_chain;
    }
    let to_chain = block_parents(schema, selection.to(), Side::Before);

    let shared = from_chain.len().min(to_chain.len());
    let mut kept = 0;
    for i in (0..shared).rev() {
        if !from_chain[i].root.target.same_as(&to_chain[i].root.target) {
            break;
        }
        kept = shared - i;
    }

    from_chain.truncate(shared);
    from_chain.split_off(shared - kept)
}
