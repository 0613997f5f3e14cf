use std::cmp::Ordering;

use log::{debug, trace};

use crate::{
    eval::Evaluator,
    expr::{Category, ExprArena, NodeId},
    grammar::VarClass,
    oracle::Oracle,
};

use super::SearchState;

/// Two programs are observationally equal when they share a category
/// and agree on every example.
pub fn observationally_equal(
    eval: &mut Evaluator,
    arena: &ExprArena,
    oracle: &Oracle,
    a: NodeId,
    b: NodeId,
) -> bool {
    if arena.category(a) != arena.category(b) {
        return false;
    }

    (0..oracle.len()).all(|ex| eval.evaluate(arena, oracle, a, ex) == eval.evaluate(arena, oracle, b, ex))
}

fn fewer_symbols(arena: &ExprArena, pi: NodeId, pj: NodeId) -> NodeId {
    if arena.symbol_count(pj) < arena.symbol_count(pi) {
        pj
    } else {
        pi
    }
}

fn pick(ord: Ordering, pi: NodeId, pj: NodeId) -> NodeId {
    match ord {
        Ordering::Greater => pj,
        _ => pi,
    }
}

/// Picks which of two equivalent programs survives. Ties keep `pi`.
pub fn keep_policy(arena: &ExprArena, pi: NodeId, pj: NodeId, is_pred: bool) -> NodeId {
    let has = |p, class| arena.has_class(p, class);

    match (has(pi, VarClass::Boundary), has(pj, VarClass::Boundary)) {
        (true, true) if is_pred => predicate_policy(arena, pi, pj),
        (true, true) => term_policy(arena, pi, pj),
        (true, false) => pi,
        (false, true) => pj,
        (false, false) => fewer_symbols(arena, pi, pj),
    }
}

/// Both reference a boundary. Predicates favour mentioning a source but
/// not a sink, then the lowest source and boundary degrees.
fn predicate_policy(arena: &ExprArena, pi: NodeId, pj: NodeId) -> NodeId {
    use VarClass::*;

    let has = |p, class| arena.has_class(p, class);

    match (has(pi, Source), has(pj, Source)) {
        (true, true) => match (has(pi, Sink), has(pj, Sink)) {
            (true, true) => fewer_symbols(arena, pi, pj),
            (true, false) => pj,
            (false, true) => pi,
            (false, false) => {
                let ord = arena.exponent(pi, Source).cmp(&arena.exponent(pj, Source))
                    .then(arena.exponent(pi, Boundary).cmp(&arena.exponent(pj, Boundary)))
                    .then(arena.symbol_count(pi).cmp(&arena.symbol_count(pj)));

                pick(ord, pi, pj)
            },
        },
        (true, false) => pi,
        (false, true) => pj,
        (false, false) => {
            let ord = arena.class_count(pi, Boundary).cmp(&arena.class_count(pj, Boundary))
                .then(arena.symbol_count(pi).cmp(&arena.symbol_count(pj)));

            pick(ord, pi, pj)
        },
    }
}

/// Both reference a boundary. Terms favour staying clear of the source
/// and, once both use it, keeping the sink.
fn term_policy(arena: &ExprArena, pi: NodeId, pj: NodeId) -> NodeId {
    use VarClass::*;

    let has = |p, class| arena.has_class(p, class);

    match (has(pi, Source), has(pj, Source)) {
        (true, true) => match (has(pi, Sink), has(pj, Sink)) {
            (true, false) => pi,
            (false, true) => pj,
            _ => fewer_symbols(arena, pi, pj),
        },
        (true, false) => pj,
        (false, true) => pi,
        (false, false) => fewer_symbols(arena, pi, pj),
    }
}

/// Collapses every observational-equivalence class to one
/// representative. Variables are always kept and never absorbed.
pub fn eliminate_equivalents(mut state: SearchState, oracle: &Oracle, is_pred: bool) -> SearchState {
    let SearchState { arena, candidates, eval } = &mut state;
    let n = candidates.len();
    let mut matched = vec![false; n];
    let mut keep = Vec::with_capacity(n);
    let is_var = |id| arena.expr(id).as_var().is_some();

    for i in 0..n {
        if matched[i] {
            continue;
        }

        let pi = candidates[i];
        if is_var(pi) {
            keep.push(pi);
            continue;
        }

        let mut rep = pi;
        let mut class = vec![pi];
        for j in (i + 1)..n {
            let pj = candidates[j];
            if matched[j] || is_var(pj) || !observationally_equal(eval, arena, oracle, pi, pj) {
                continue;
            }

            matched[j] = true;
            class.push(pj);

            let kept = keep_policy(arena, rep, pj, is_pred);
            let dropped = if kept == rep { pj } else { rep };

            trace!("Equivalent: {} and {}, keeping the former", arena.display(kept), arena.display(dropped));

            rep = kept;
        }

        // Members were compared against `pi`, purge only once the class is complete
        for id in class.into_iter().filter(|x| *x != rep) {
            eval.forget(id, oracle.len());
        }

        keep.push(rep);
    }

    debug!("Equivalence reduction: {n} -> {}", keep.len());

    *candidates = keep;
    state
}

/// Drops integer programs that overshoot a non-zero expected output.
pub fn eliminate_out_of_bounds(mut state: SearchState, oracle: &Oracle) -> SearchState {
    let SearchState { arena, candidates, eval } = &mut state;
    let before = candidates.len();

    candidates.retain(|&id| {
        if arena.category(id) != Category::Int {
            return true;
        }

        let overshoots = (0..oracle.len()).any(|ex| {
            let out = oracle.output(ex);
            out != 0 && eval.evaluate_int(arena, oracle, id, ex) > out
        });

        if overshoots {
            eval.forget(id, oracle.len());
        }

        !overshoots
    });

    debug!("Bound reduction: {before} -> {}", candidates.len());

    state
}
