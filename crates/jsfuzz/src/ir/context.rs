use std::ops::{BitAnd, BitOr};

/// The semantic environments an op may require or open.
///
/// Modeled as a plain bitset over a fixed, closed set of flags (rather than
/// an external `bitflags` dependency) since the set never grows at runtime
/// and the whole point is cheap subset checks during `append`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Context(u16);

impl Context {
    pub const EMPTY: Self = Self(0);
    pub const SCRIPT: Self = Self(1 << 0);
    pub const SUBROUTINE: Self = Self(1 << 1);
    pub const GENERATOR_FUNCTION: Self = Self(1 << 2);
    pub const ASYNC_FUNCTION: Self = Self(1 << 3);
    pub const LOOP: Self = Self(1 << 4);
    pub const SWITCH_BLOCK: Self = Self(1 << 5);
    pub const SWITCH_CASE: Self = Self(1 << 6);
    pub const CLASS_DEFINITION: Self = Self(1 << 7);
    pub const WITH: Self = Self(1 << 8);

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub fn remove(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for Context {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for Context {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Stack of contexts opened by enclosing blocks, maintained by `ContextAnalyzer`.
#[derive(Debug, Clone, Default)]
pub struct ContextStack {
    frames: Vec<Context>,
}

impl ContextStack {
    #[must_use]
    pub fn new() -> Self {
        Self { frames: vec![Context::SCRIPT] }
    }

    #[must_use]
    pub fn current(&self) -> Context {
        self.frames.iter().fold(Context::EMPTY, |acc, &c| acc.union(c))
    }

    pub fn push(&mut self, opened: Context) {
        self.frames.push(opened);
    }

    /// Pops the most recently opened context frame.
    ///
    /// # Panics
    /// Panics if called with no open frames beyond the root `SCRIPT` frame;
    /// that indicates an unbalanced block end, a structural (abort) error.
    pub fn pop(&mut self) {
        assert!(self.frames.len() > 1, "context stack underflow: unbalanced block end");
        self.frames.pop();
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
