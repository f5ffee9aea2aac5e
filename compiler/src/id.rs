// id.rs — Stable identifiers for variables and coefficient contributions
//
// A coefficient contribution is keyed either by a real variable handle or by
// an explicit constant marker. The marker is its own enum case, never a
// reserved magic value, so it cannot collide with a legitimate variable id.

use serde::{Deserialize, Serialize};

/// Stable identifier for an unknown variable declared in the expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

/// Identifier of one additive coefficient contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoeffId {
    /// Contribution multiplying the named variable's vectorized value.
    Variable(VarId),
    /// Contribution to the aggregate constant term.
    Constant,
}

impl CoeffId {
    pub fn is_constant(&self) -> bool {
        matches!(self, CoeffId::Constant)
    }
}

/// Allocator for variable ids. Produces monotonically increasing ids in
/// allocation order, ensuring deterministic assignment by the tree builder.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_var: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_var(&mut self) -> VarId {
        let id = VarId(self.next_var);
        self.next_var += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_sequential() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_var(), VarId(0));
        assert_eq!(alloc.alloc_var(), VarId(1));
    }

    #[test]
    fn constant_marker_never_matches_a_variable() {
        assert!(CoeffId::Constant.is_constant());
        assert!(!CoeffId::Variable(VarId(0)).is_constant());
        assert_ne!(CoeffId::Constant, CoeffId::Variable(VarId(0)));
    }

    #[test]
    fn ids_round_trip_through_json() {
        let id = CoeffId::Variable(VarId(7));
        let json = serde_json::to_string(&id).unwrap();
        let back: CoeffId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
