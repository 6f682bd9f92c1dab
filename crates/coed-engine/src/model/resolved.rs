use std::ops::Range;

use super::ModelError;
use super::node::{Mark, Node};

/// Which side of a position to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

#[derive(Clone)]
struct Level {
    node: Node,
    index: usize,
    /// Absolute position where child `index` of `node` starts.
    offset: usize,
}

/// A position resolved against one tree snapshot.
///
/// Holds the ancestor chain from the document (level 0) down to the
/// innermost node containing the position. Only meaningful for the tree it
/// was computed from; edits produce new trees and need new resolutions.
#[derive(Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<Level>,
    parent_offset: usize,
}

impl Node {
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, ModelError> {
        let size = self.content_size();
        if pos > size {
            return Err(ModelError::PositionOutOfRange { pos, size });
        }

        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = self.clone();
        loop {
            let (index, offset) = node.content().find_index(parent_offset);
            let rem = parent_offset - offset;
            path.push(Level {
                node: node.clone(),
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = match node.child(index) {
                Some(child) if child.is_branch() => child.clone(),
                _ => break,
            };
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }

        Ok(ResolvedPos {
            pos,
            path,
            parent_offset,
        })
    }
}

impl ResolvedPos {
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn doc(&self) -> &Node {
        &self.path[0].node
    }

    /// Ancestor at `level`; levels above `depth` clamp to the parent.
    pub fn node(&self, level: usize) -> &Node {
        &self.path[level.min(self.depth())].node
    }

    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    pub fn index(&self, level: usize) -> usize {
        self.path[level.min(self.depth())].index
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Start of the content of the ancestor at `level`.
    pub fn start(&self, level: usize) -> usize {
        if level == 0 {
            0
        } else {
            self.path[level.min(self.depth()) - 1].offset + 1
        }
    }

    pub fn end(&self, level: usize) -> usize {
        self.start(level) + self.node(level).content_size()
    }

    /// Position before the ancestor at `level`. The document has none.
    pub fn before(&self, level: usize) -> Option<usize> {
        (level > 0).then(|| self.start(level) - 1)
    }

    pub fn after(&self, level: usize) -> Option<usize> {
        (level > 0).then(|| self.end(level) + 1)
    }

    /// Full range covered by the ancestor at `level` (content range for the document).
    pub fn range(&self, level: usize) -> Range<usize> {
        match (self.before(level), self.after(level)) {
            (Some(from), Some(to)) => from..to,
            _ => 0..self.doc().content_size(),
        }
    }

    /// Offset of the position into the text node it falls in, zero on boundaries.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.child(index)?;
        let offset = self.text_offset();
        if offset > 0 {
            Some(child.cut_text(offset, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return parent.child(index).map(|child| child.cut_text(0, offset));
        }
        index.checked_sub(1).and_then(|i| parent.child(i)).cloned()
    }

    pub fn node_on(&self, side: Side) -> Option<Node> {
        match side {
            Side::Before => self.node_before(),
            Side::After => self.node_after(),
        }
    }

    /// Marks of the node on `side` of the position.
    pub fn marks(&self, side: Side) -> Vec<Mark> {
        self.node_on(side)
            .map(|node| node.marks().to_vec())
            .unwrap_or_default()
    }

    /// Range of the adjacent node on `side`, in absolute positions.
    pub fn adjacent_range(&self, side: Side) -> Option<Range<usize>> {
        let node = self.node_on(side)?;
        Some(match side {
            Side::Before => self.pos - node.node_size()..self.pos,
            Side::After => self.pos..self.pos + node.node_size(),
        })
    }

    /// Contiguous run of siblings around the adjacent node that carry `mark`.
    pub fn mark_extent(&self, mark: &Mark, side: Side) -> Option<Range<usize>> {
        let parent = self.parent();
        let depth = self.depth();
        let index = match side {
            Side::After => self.index(depth),
            Side::Before if self.text_offset() > 0 => self.index(depth),
            Side::Before => self.index(depth).checked_sub(1)?,
        };
        if !parent.child(index)?.has_mark(mark) {
            return None;
        }

        let children = parent.content().children();
        let mut first = index;
        while first > 0 && children[first - 1].has_mark(mark) {
            first -= 1;
        }
        let mut last = index;
        while last + 1 < children.len() && children[last + 1].has_mark(mark) {
            last += 1;
        }

        let start = self.start(depth);
        let from = start + children[..first].iter().map(Node::node_size).sum::<usize>();
        let to = from + children[first..=last].iter().map(Node::node_size).sum::<usize>();
        Some(from..to)
    }
}

impl std::fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<&str> = self.path.iter().map(|l| l.node.kind()).collect();
        f.debug_struct("ResolvedPos")
            .field("pos", &self.pos)
            .field("path", &kinds)
            .field("parent_offset", &self.parent_offset)
            .finish()
    }
}
