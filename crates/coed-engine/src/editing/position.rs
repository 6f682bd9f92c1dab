use crate::editing::EditError;
use crate::model::{Node, ResolvedPos};

/// External reference to a node: the child index at every level from the
/// document root down, the way a DOM node is located by counting its
/// preceding siblings and ascending to the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomHandle {
    path: Vec<usize>,
}

impl DomHandle {
    pub fn new(path: Vec<usize>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Handle of the node starting at `pos`.
    pub fn at(doc: &Node, pos: usize) -> Result<Self, EditError> {
        let rpos = doc.resolve(pos)?;
        if rpos.text_offset() > 0 || rpos.node_after().is_none() {
            return Err(EditError::NotFound(format!("no node starts at {pos}")));
        }
        Ok(Self {
            path: (0..=rpos.depth()).map(|level| rpos.index(level)).collect(),
        })
    }

    /// Position before the referenced node.
    pub fn to_pos(&self, doc: &Node) -> Result<usize, EditError> {
        let not_found = || EditError::NotFound(format!("handle {:?} is not in this document", self.path));
        if self.path.is_empty() {
            return Err(not_found());
        }

        let mut node = doc;
        let mut pos = 0;
        for (depth, &index) in self.path.iter().enumerate() {
            let children = node.content().children();
            let child = children.get(index).ok_or_else(not_found)?;
            pos += children[..index].iter().map(Node::node_size).sum::<usize>();
            if depth + 1 < self.path.len() {
                if !child.is_branch() {
                    return Err(not_found());
                }
                pos += 1;
                node = child;
            }
        }
        Ok(pos)
    }
}

/// Anything a caller may address the tree with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coordinate {
    Pos(usize),
    Handle(DomHandle),
}

impl From<usize> for Coordinate {
    fn from(pos: usize) -> Self {
        Coordinate::Pos(pos)
    }
}

impl From<DomHandle> for Coordinate {
    fn from(handle: DomHandle) -> Self {
        Coordinate::Handle(handle)
    }
}

impl Coordinate {
    pub fn to_pos(&self, doc: &Node) -> Result<usize, EditError> {
        match self {
            Coordinate::Pos(pos) if *pos <= doc.content_size() => Ok(*pos),
            Coordinate::Pos(pos) => Err(EditError::NotFound(format!(
                "position {pos} is past the end of the document"
            ))),
            Coordinate::Handle(handle) => handle.to_pos(doc),
        }
    }
}

/// Resolve a coordinate against one tree snapshot. Never touches the tree.
pub fn resolve(doc: &Node, coordinate: &Coordinate) -> Result<ResolvedPos, EditError> {
    let pos = coordinate.to_pos(doc)?;
    Ok(doc.resolve(pos)?)
}
