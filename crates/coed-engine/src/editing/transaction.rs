use std::ops::Range;

use crate::editing::EditError;
use crate::model::{Fragment, Mark, Node};

/// One recorded edit, in positions of the tree it was applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Replace { range: Range<usize>, inserted: usize },
    AddMark { range: Range<usize> },
    RemoveMark { range: Range<usize> },
}

/// A batch of edits against one tree snapshot.
///
/// Every step produces a new tree; `base` stays the snapshot the batch was
/// started from so the editor can refuse batches built on an older tree.
#[derive(Debug, Clone)]
pub struct Transaction {
    base: Node,
    doc: Node,
    steps: Vec<Step>,
}

impl Transaction {
    pub fn new(doc: &Node) -> Self {
        Self {
            base: doc.clone(),
            doc: doc.clone(),
            steps: Vec::new(),
        }
    }

    pub fn base(&self) -> &Node {
        &self.base
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn replace_with(&mut self, from: usize, to: usize, content: Fragment) -> Result<&mut Self, EditError> {
        self.doc = self.doc.replace(from, to, &content)?;
        self.steps.push(Step::Replace {
            range: from..to,
            inserted: content.size(),
        });
        Ok(self)
    }

    pub fn insert(&mut self, pos: usize, content: Fragment) -> Result<&mut Self, EditError> {
        self.replace_with(pos, pos, content)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, EditError> {
        self.replace_with(from, to, Fragment::empty())
    }

    pub fn add_mark(&mut self, from: usize, to: usize, mark: &Mark) -> Result<&mut Self, EditError> {
        self.doc = self.doc.add_mark(from, to, mark)?;
        self.steps.push(Step::AddMark { range: from..to });
        Ok(self)
    }

    pub fn remove_mark(&mut self, from: usize, to: usize, mark: &Mark) -> Result<&mut Self, EditError> {
        self.doc = self.doc.remove_mark(from, to, mark)?;
        self.steps.push(Step::RemoveMark { range: from..to });
        Ok(self)
    }

    /// Ranges of the current tree touched by the steps so far.
    pub fn changed(&self) -> Vec<Range<usize>> {
        let mut ranges: Vec<Range<usize>> = Vec::new();
        for step in &self.steps {
            let (range, delta) = match step {
                Step::Replace { range, inserted } => {
                    (range.start..range.start + inserted, *inserted as isize - range.len() as isize)
                }
                Step::AddMark { range } | Step::RemoveMark { range } => (range.clone(), 0),
            };
            for earlier in &mut ranges {
                *earlier = shift(earlier, range.start, delta);
            }
            ranges.push(range);
        }
        ranges
    }
}

fn shift(range: &Range<usize>, at: usize, delta: isize) -> Range<usize> {
    let move_pos = |pos: usize| {
        if pos < at {
            pos
        } else {
            pos.saturating_add_signed(delta).max(at)
        }
    };
    move_pos(range.start)..move_pos(range.end)
}
