use std::ops::Range;

use crate::model::{AttrValue, Attrs, BlockRole, Mark, Node, ResolvedPos, Schema, Side};

/// A node or mark whose type carries a block role.
#[derive(Debug, Clone)]
pub enum BlockTarget {
    Node(Node),
    Mark(Mark),
}

impl BlockTarget {
    pub fn kind(&self) -> &str {
        match self {
            BlockTarget::Node(node) => node.kind(),
            BlockTarget::Mark(mark) => mark.kind(),
        }
    }

    pub fn attrs(&self) -> &Attrs {
        match self {
            BlockTarget::Node(node) => node.attrs(),
            BlockTarget::Mark(mark) => mark.attrs(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs().get(name)
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            BlockTarget::Node(node) => Some(node),
            BlockTarget::Mark(_) => None,
        }
    }

    pub fn as_mark(&self) -> Option<&Mark> {
        match self {
            BlockTarget::Mark(mark) => Some(mark),
            BlockTarget::Node(_) => None,
        }
    }

    /// Identity, not structure: two equal-looking nodes are different blocks.
    pub fn same_as(&self, other: &BlockTarget) -> bool {
        match (self, other) {
            (BlockTarget::Node(a), BlockTarget::Node(b)) => Node::ptr_eq(a, b),
            (BlockTarget::Mark(a), BlockTarget::Mark(b)) => Mark::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockRoot {
    pub target: BlockTarget,
    /// Ancestor level; `depth + 1` for the node or mark right next to the position.
    pub level: usize,
    pub range: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct ContentSlot {
    pub name: String,
    pub target: BlockTarget,
    pub level: usize,
    pub range: Range<usize>,
}

/// A block root enclosing a position, with the slot of it the position is in.
#[derive(Debug, Clone)]
pub struct BlockParent {
    pub root: BlockRoot,
    pub content: Option<ContentSlot>,
}

impl BlockParent {
    pub fn kind(&self) -> &str {
        self.root.target.kind()
    }

    pub fn slot(&self) -> Option<&str> {
        self.content.as_ref().map(|slot| slot.name.as_str())
    }
}

/// Innermost block root around `rpos`, if any.
pub fn block_parent(schema: &Schema, rpos: &ResolvedPos, side: Side) -> Option<BlockParent> {
    walk(schema, rpos, side, true).pop()
}

/// Every block root around `rpos`, outermost first.
pub fn block_parents(schema: &Schema, rpos: &ResolvedPos, side: Side) -> Vec<BlockParent> {
    walk(schema, rpos, side, false)
}

fn walk(schema: &Schema, rpos: &ResolvedPos, side: Side, innermost: bool) -> Vec<BlockParent> {
    let mut found = Vec::new();
    let mut slot: Option<ContentSlot> = None;
    let top = rpos.depth() + 1;

    for level in (0..=top).rev() {
        let tagged = if level == top {
            adjacent_tagged(schema, rpos, side)
        } else {
            ancestor_tagged(schema, rpos, level)
        };
        let Some((target, role, range)) = tagged else {
            continue;
        };

        match role {
            BlockRole::Content(name) => {
                // a nested slot wins over the slot of an outer wrapper
                if slot.is_none() {
                    slot = Some(ContentSlot {
                        name,
                        target,
                        level,
                        range,
                    });
                }
            }
            BlockRole::Root => {
                found.push(BlockParent {
                    root: BlockRoot {
                        target,
                        level,
                        range,
                    },
                    content: slot.take(),
                });
                if innermost {
                    break;
                }
            }
            BlockRole::Plain => {}
        }
    }

    found.reverse();
    found
}

type Tagged = (BlockTarget, BlockRole, Range<usize>);

/// The virtual inline level: the node next to the position, or failing
/// that the first of its marks that carries a role.
fn adjacent_tagged(schema: &Schema, rpos: &ResolvedPos, side: Side) -> Option<Tagged> {
    let node = rpos.node_on(side)?;
    let range = rpos.adjacent_range(side)?;

    let role = schema.node_role(node.kind());
    if role.is_tagged() {
        return Some((BlockTarget::Node(node), role.clone(), range));
    }

    node.marks().iter().find_map(|mark| {
        let role = schema.mark_role(mark.kind());
        role.is_tagged().then(|| {
            let extent = rpos.mark_extent(mark, side).unwrap_or_else(|| range.clone());
            (BlockTarget::Mark(mark.clone()), role.clone(), extent)
        })
    })
}

fn ancestor_tagged(schema: &Schema, rpos: &ResolvedPos, level: usize) -> Option<Tagged> {
    let node = rpos.node(level);
    let role = schema.node_role(node.kind());
    role.is_tagged()
        .then(|| (BlockTarget::Node(node.clone()), role.clone(), rpos.range(level)))
}
