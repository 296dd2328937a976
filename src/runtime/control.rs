//! Label stack for structured control flow
//!
//! Each active `block`, `loop` or `if` (and the function body itself) pushes a
//! label recording how many values a branch to it carries and how deep the
//! operand stack was on entry. Branch instructions unwind to those labels.

/// How a sequence of instructions finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEnd {
    /// Ran off the end of the sequence
    Normal,
    /// Branch to the label `n` levels out from the current one
    Branch(u32),
    /// `return` executed; unwinds every label of the function
    Return,
}

impl BlockEnd {
    /// Outcome seen by the enclosing sequence once the innermost label has
    /// been left: a branch to it is consumed, outer branches lose one level.
    pub fn exit_label(self) -> BlockEnd {
        match self {
            BlockEnd::Branch(0) => BlockEnd::Normal,
            BlockEnd::Branch(depth) => BlockEnd::Branch(depth - 1),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelType {
    /// Function body; a branch here returns
    Function,
    Block,
    /// Branches target the start of the loop
    Loop,
    If,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub label_type: LabelType,
    /// Values a branch to this label carries
    pub arity: usize,
    /// Operand stack height when the label was entered
    pub stack_height: usize,
}

#[derive(Debug, Default)]
pub struct LabelStack {
    labels: Vec<Label>,
}

impl LabelStack {
    pub fn new() -> Self {
        LabelStack { labels: Vec::new() }
    }

    pub fn push(&mut self, label: Label) {
        self.labels.push(label);
    }

    pub fn pop(&mut self) -> Option<Label> {
        self.labels.pop()
    }

    /// The `depth`-th label counting from the innermost (0).
    pub fn get(&self, depth: u32) -> Option<&Label> {
        let len = self.labels.len();
        if depth as usize >= len {
            return None;
        }
        self.labels.get(len - 1 - depth as usize)
    }

    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
