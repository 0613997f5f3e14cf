use log::debug;

use crate::{
    expr::{Expr, ExprArena, Generation, NodeId},
    grammar::{BoolOp, Grammar, IntOp, Op},
};

use super::{prune::Pruner, SearchState};

/// Builds the node for an already validated production. Two numerals
/// fold into their product.
fn build(arena: &mut ExprArena, op: Op, operands: &[NodeId]) -> NodeId {
    let num = |i: usize| arena.expr(operands[i]).as_num();

    if op == Op::Times {
        if let (Some(x), Some(y)) = (num(0), num(1)) {
            return arena.add(Expr::Num(x.wrapping_mul(y)), Generation::Constant);
        }
    }

    let expr = match (op, operands) {
        (Op::Plus, &[a, b]) => Expr::Plus(a, b),
        (Op::Minus, &[a, b]) => Expr::Minus(a, b),
        (Op::Times, &[a, b]) => Expr::Times(a, b),
        (Op::Leftshift, &[a, b]) => Expr::Leftshift(a, b),
        (Op::Rightshift, &[a, b]) => Expr::Rightshift(a, b),
        (Op::Lt, &[a, b]) => Expr::Lt(a, b),
        (Op::And, &[a, b]) => Expr::And(a, b),
        (Op::Not, &[a]) => Expr::Not(a),
        (Op::Ite, &[c, t, e]) => Expr::Ite(c, t, e),
        // NOTE: the pruner checks arity before we get here
        _ => unreachable!("{op} applied to {} operands", operands.len()),
    };

    arena.add(expr, Generation::Pending)
}

struct Round<'a, 'p> {
    pruner: &'a Pruner<'p>,
    generation: u32,
    snapshot: Vec<NodeId>,
    added: Vec<NodeId>,
}

impl Round<'_, '_> {
    fn attempt(&mut self, arena: &mut ExprArena, op: Op, operands: &[NodeId]) {
        if self.pruner.is_grow_rule_satisfied(arena, operands, op, self.generation) {
            self.added.push(build(arena, op, operands));
        }
    }

    fn unary(&mut self, arena: &mut ExprArena, op: Op) {
        for i in 0..self.snapshot.len() {
            let a = self.snapshot[i];
            self.attempt(arena, op, &[a]);
        }
    }

    fn binary(&mut self, arena: &mut ExprArena, op: Op) {
        let n = self.snapshot.len();

        for i in 0..n {
            for j in 0..n {
                let (a, b) = (self.snapshot[i], self.snapshot[j]);
                self.attempt(arena, op, &[a, b]);
            }
        }
    }

    fn ternary(&mut self, arena: &mut ExprArena, op: Op) {
        let n = self.snapshot.len();

        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let (a, b, c) = (self.snapshot[i], self.snapshot[j], self.snapshot[k]);
                    self.attempt(arena, op, &[a, b, c]);
                }
            }
        }
    }
}

/// Grows one generation. Every production is validated against the
/// candidates as they were before the round started; the new nodes are
/// stamped with the round's generation only once all of them exist.
/// Returns how many candidates were added.
pub fn grow(
    mut state: SearchState,
    pruner: &Pruner,
    grammar: &Grammar,
    generation: u32,
) -> (SearchState, usize) {
    let mut round = Round {
        pruner,
        generation,
        snapshot: state.candidates.clone(),
        added: Vec::new(),
    };
    let arena = &mut state.arena;

    for op in &grammar.int_ops {
        let before = round.added.len();

        match op {
            IntOp::Ite => round.ternary(arena, Op::Ite),
            op => round.binary(arena, Op::from(*op)),
        }

        debug!("Generation {generation}: {op:?} grew {}", round.added.len() - before);
    }

    for op in &grammar.bool_ops {
        let before = round.added.len();

        match op {
            // Seeded as a leaf, nothing to grow
            BoolOp::F => continue,
            BoolOp::Not => round.unary(arena, Op::Not),
            BoolOp::And => round.binary(arena, Op::And),
            BoolOp::Lt => round.binary(arena, Op::Lt),
        }

        debug!("Generation {generation}: {op:?} grew {}", round.added.len() - before);
    }

    for id in &round.added {
        if arena.expr(*id).as_num().is_none() {
            arena.stamp(*id, Generation::Round(generation));
        }
    }

    let added = round.added.len();
    state.candidates.extend(round.added);

    (state, added)
}
