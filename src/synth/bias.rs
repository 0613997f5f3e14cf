use std::fmt::Debug;

use crate::{
    expr::{ExprArena, NodeId},
    grammar::VarClass,
};

pub const DEFAULT_TIMES_VAR_CAP: u32 = 4;

/// Domain preferences layered on top of the canonical-form rules. A
/// bias only narrows the enumeration, it never affects which of the
/// remaining programs is correct.
pub trait Bias: Debug {
    /// Whether `a < b` is worth growing.
    fn admits_lt(&self, arena: &ExprArena, a: NodeId, b: NodeId) -> bool;

    /// Whether `a * b` is worth growing.
    fn admits_times(&self, arena: &ExprArena, a: NodeId, b: NodeId) -> bool;

    /// Whether a variable of this class is a leaf when synthesizing a
    /// term. Predicates always get every declared variable.
    fn admits_term_leaf(&self, class: VarClass) -> bool;
}

/// Comparisons relate a boundary to a source, and products stay small.
/// Term synthesis only builds on boundary variables.
#[derive(Debug, Clone)]
pub struct DomainBias {
    pub times_var_cap: u32,
}

impl Default for DomainBias {
    fn default() -> Self {
        Self { times_var_cap: DEFAULT_TIMES_VAR_CAP }
    }
}

impl Bias for DomainBias {
    fn admits_lt(&self, arena: &ExprArena, a: NodeId, b: NodeId) -> bool {
        let exactly_one = |class| arena.has_class(a, class) != arena.has_class(b, class);

        exactly_one(VarClass::Boundary) && exactly_one(VarClass::Source)
    }

    fn admits_times(&self, arena: &ExprArena, a: NodeId, b: NodeId) -> bool {
        arena.var_count(a) + arena.var_count(b) <= self.times_var_cap
    }

    fn admits_term_leaf(&self, class: VarClass) -> bool {
        class == VarClass::Boundary
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoBias;

impl Bias for NoBias {
    fn admits_lt(&self, _arena: &ExprArena, _a: NodeId, _b: NodeId) -> bool {
        true
    }

    fn admits_times(&self, _arena: &ExprArena, _a: NodeId, _b: NodeId) -> bool {
        true
    }

    fn admits_term_leaf(&self, _class: VarClass) -> bool {
        true
    }
}
