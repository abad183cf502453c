//! Stack effects: how many values an operation (or a run of operations)
//! takes from the stack and how many it leaves behind.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `(consumed, produced)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StackEffect {
    #[serde(rename = "numConsumed")]
    pub consumed: u32,
    #[serde(rename = "numProduced")]
    pub produced: u32,
}

impl StackEffect {
    pub const NONE: StackEffect = StackEffect::new(0, 0);

    pub const fn new(consumed: u32, produced: u32) -> Self {
        StackEffect { consumed, produced }
    }

    /// Effect of running `self` and then `next`.
    ///
    /// Excess production on the left cancels consumption on the right, unit
    /// for unit; whatever `next` still needs is taken from below.
    pub fn then(self, next: StackEffect) -> StackEffect {
        let cancelled = self.produced.min(next.consumed);
        StackEffect {
            consumed: self.consumed.saturating_add(next.consumed - cancelled),
            produced: (self.produced - cancelled).saturating_add(next.produced),
        }
    }

    /// Sequential composition of a whole run. The empty run is `NONE`.
    pub fn sequence<I: IntoIterator<Item = StackEffect>>(effects: I) -> StackEffect {
        effects.into_iter().fold(StackEffect::NONE, StackEffect::then)
    }

    /// Component-wise maximum, used for conditional branches.
    pub fn max(self, other: StackEffect) -> StackEffect {
        StackEffect {
            consumed: self.consumed.max(other.consumed),
            produced: self.produced.max(other.produced),
        }
    }

    /// `consumed + produced`.
    pub fn arity(self) -> u32 {
        self.consumed + self.produced
    }
}

impl fmt::Display for StackEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.consumed, self.produced)
    }
}
