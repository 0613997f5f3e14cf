use crate::{
    expr::{Category, Expr, ExprArena, ExprVal, NodeId},
    grammar::{Op, RuleSet},
};

use super::bias::Bias;

/// The grow-rule pipeline. A candidate production is only materialized
/// when every enabled rule accepts it; any single rule is a veto.
#[derive(Debug)]
pub struct Pruner<'a> {
    depth_bound: u32,
    rules: RuleSet,
    bias: &'a dyn Bias,
}

impl<'a> Pruner<'a> {
    pub fn new(depth_bound: u32, rules: RuleSet, bias: &'a dyn Bias) -> Self {
        Self { depth_bound, rules, bias }
    }

    pub fn is_grow_rule_satisfied(
        &self,
        arena: &ExprArena,
        operands: &[NodeId],
        op: Op,
        generation: u32,
    ) -> bool {
        // NOTE: an arity mismatch is a bug in the enumerator
        debug_assert_eq!(operands.len(), op.arity());

        self.depth_rule(arena, operands)
            && type_rule(arena, operands, op)
            && generation_rule(arena, operands, generation)
            && (!self.rules.canonical || canonical_rule(arena, operands, op))
            && (!self.rules.bias || self.bias_rule(arena, operands, op))
    }

    fn depth_rule(&self, arena: &ExprArena, operands: &[NodeId]) -> bool {
        operands.iter().all(|x| arena.depth(*x) < self.depth_bound)
    }

    fn bias_rule(&self, arena: &ExprArena, operands: &[NodeId], op: Op) -> bool {
        match (op, operands) {
            (Op::Lt, &[a, b]) => self.bias.admits_lt(arena, a, b),
            (Op::Times, &[a, b]) => self.bias.admits_times(arena, a, b),
            _ => true,
        }
    }
}

pub fn type_rule(arena: &ExprArena, operands: &[NodeId], op: Op) -> bool {
    use Category::*;

    let expected: &[Category] = match op {
        Op::Plus | Op::Minus | Op::Times | Op::Leftshift | Op::Rightshift | Op::Lt => &[Int, Int],
        Op::Not => &[Bool],
        Op::And => &[Bool, Bool],
        Op::Ite => &[Bool, Int, Int],
    };

    expected.len() == operands.len()
        && operands.iter()
            .zip(expected)
            .all(|(x, cat)| arena.category(*x) == *cat)
}

/// The production must land exactly one generation above its
/// youngest operand.
pub fn generation_rule(arena: &ExprArena, operands: &[NodeId], generation: u32) -> bool {
    let youngest = operands.iter()
        .map(|x| arena.generation(*x).rank())
        .max()
        .unwrap_or(0);

    youngest + 1 == generation
}

/// Rejects shapes that have a cheaper normal form the enumerator
/// already produces.
pub fn canonical_rule(arena: &ExprArena, operands: &[NodeId], op: Op) -> bool {
    let a = operands[0];
    let b = operands.get(1).copied();
    let a_num = arena.expr(a).as_num();
    let b_num = b.and_then(|b| arena.expr(b).as_num());

    // Constants only fold through multiplication
    if let (Some(x), Some(y)) = (a_num, b_num) {
        return op == Op::Times
            && x >= 2
            && y >= 2
            && x.wrapping_mul(y) >= 2;
    }

    if let Some(x) = a_num {
        if op == Op::Times && x < 2 {
            return false;
        }
        if op == Op::Plus && x == 0 {
            return false;
        }
    }

    // Constants go on the left
    if b_num.is_some() && matches!(op, Op::Times | Op::Plus) {
        return false;
    }

    match (op, b) {
        (Op::Times, Some(b)) => times_form(arena, a, b),
        (Op::Plus, Some(b)) => plus_form(arena, a, b),
        (Op::Lt, Some(b)) => lt_form(arena, a, b),
        (Op::And, Some(b)) => and_form(arena, a, b),
        (Op::Not, _) => matches!(arena.expr(a), Expr::And(..)),
        _ => true,
    }
}

fn lex_less(arena: &ExprArena, a: NodeId, b: NodeId) -> bool {
    arena.lexical_order(a) < arena.lexical_order(b)
}

fn is_monomial(e: Expr) -> bool {
    matches!(e, Expr::Var(_) | Expr::Times(..))
}

/// `num * var`, `var * var` or `x * (y * ...)` with factors in
/// ascending variable order and the coefficient up front.
fn times_form(arena: &ExprArena, a: NodeId, b: NodeId) -> bool {
    let (ea, eb) = (arena.expr(a), arena.expr(b));

    if !matches!(ea, Expr::Var(_) | Expr::Num(_)) {
        return false;
    }
    if !matches!(eb, Expr::Var(_) | Expr::Times(..)) {
        return false;
    }

    if let (Expr::Var(x), Expr::Var(y)) = (ea, eb) {
        if x > y {
            return false;
        }
    }

    if let Expr::Times(l, _) = eb {
        let el = arena.expr(l);

        if el.as_num().is_some() {
            return false;
        }
        if let (Expr::Var(x), Expr::Var(y)) = (ea, el) {
            if x > y {
                return false;
            }
        }
    }

    true
}

/// Sums are right-leaning chains of distinct monomials in strictly
/// increasing lexical order, with at most a leading constant.
fn plus_form(arena: &ExprArena, a: NodeId, b: NodeId) -> bool {
    let (ea, eb) = (arena.expr(a), arena.expr(b));

    if !matches!(ea, Expr::Num(_) | Expr::Var(_) | Expr::Times(..)) {
        return false;
    }
    if !matches!(eb, Expr::Var(_) | Expr::Times(..) | Expr::Plus(..)) {
        return false;
    }

    if is_monomial(ea) && is_monomial(eb) && !lex_less(arena, a, b) {
        return false;
    }

    if let Expr::Plus(l, _) = eb {
        if !lex_less(arena, a, l) {
            return false;
        }
    }

    true
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }

    a
}

fn coefficient(arena: &ExprArena, times: NodeId) -> Option<ExprVal> {
    match arena.expr(times) {
        Expr::Times(l, _) => arena.expr(l).as_num(),
        _ => None,
    }
}

fn leads_with_num(arena: &ExprArena, plus: NodeId) -> bool {
    match arena.expr(plus) {
        Expr::Plus(l, _) => arena.expr(l).as_num().is_some(),
        _ => false,
    }
}

fn coprime_with(arena: &ExprArena, num: ExprVal, times: NodeId) -> bool {
    coefficient(arena, times)
        .map_or(true, |c| gcd(num.unsigned_abs(), c.unsigned_abs()) == 1)
}

/// Drops comparisons that are constant, trivially reducible, or share
/// a factor/term between both sides.
fn lt_form(arena: &ExprArena, a: NodeId, b: NodeId) -> bool {
    let (ea, eb) = (arena.expr(a), arena.expr(b));

    match (ea, eb) {
        (Expr::Num(_), Expr::Num(_)) => false,
        (Expr::Num(_), Expr::Plus(..)) => !leads_with_num(arena, b),
        (Expr::Plus(..), Expr::Num(_)) => !leads_with_num(arena, a),
        (Expr::Num(x), Expr::Times(..)) => coprime_with(arena, x, b),
        (Expr::Times(..), Expr::Num(x)) => coprime_with(arena, x, a),
        (Expr::Var(x), Expr::Var(y)) => x != y,
        (Expr::Var(_), Expr::Times(..)) => !arena.contains_shape(&arena.factors(b), a),
        (Expr::Times(..), Expr::Var(_)) => !arena.contains_shape(&arena.factors(a), b),
        (Expr::Var(_), Expr::Plus(..)) => !arena.contains_shape(&arena.terms(b), a),
        (Expr::Plus(..), Expr::Var(_)) => !arena.contains_shape(&arena.terms(a), b),
        (Expr::Times(..), Expr::Times(..)) => {
            let fb = arena.factors(b);

            !arena.factors(a).into_iter().any(|x| arena.contains_shape(&fb, x))
        },
        (Expr::Times(..), Expr::Plus(..)) => {
            !arena.contains_shape(&arena.terms(b), arena.monomial(a))
        },
        (Expr::Plus(..), Expr::Times(..)) => {
            !arena.contains_shape(&arena.terms(a), arena.monomial(b))
        },
        (Expr::Plus(..), Expr::Plus(..)) => {
            if leads_with_num(arena, a) && leads_with_num(arena, b) {
                return false;
            }

            let tb = arena.terms(b);

            !arena.terms(a).into_iter().any(|x| arena.contains_shape(&tb, x))
        },
        _ => true,
    }
}

/// Conjunctions are chains `lt && (lt && ...)` sorted by the
/// comparisons' lexical order.
fn and_form(arena: &ExprArena, a: NodeId, b: NodeId) -> bool {
    let (ea, eb) = (arena.expr(a), arena.expr(b));

    if matches!(ea, Expr::F) || matches!(eb, Expr::F) {
        return false;
    }
    if !matches!(ea, Expr::Lt(..)) {
        return false;
    }
    if !matches!(eb, Expr::And(..) | Expr::Not(_) | Expr::Lt(..)) {
        return false;
    }

    let right = match eb {
        Expr::And(_, r) => r,
        _ => b,
    };

    lex_less(arena, a, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::Generation,
        grammar::{VarClassifier, VarId, VarTable},
        synth::bias::{DomainBias, NoBias},
    };

    struct Fixture {
        ar: ExprArena,
        x: NodeId,
        y: NodeId,
        n0: NodeId,
        n1: NodeId,
        n2: NodeId,
        n3: NodeId,
        n4: NodeId,
    }

    impl Fixture {
        fn new() -> Self {
            let vars = VarTable::new(["x".to_string(), "y".to_string()], &VarClassifier::default());
            let mut ar = ExprArena::new(vars);
            let x = ar.add(Expr::Var(VarId(0)), Generation::Round(1));
            let y = ar.add(Expr::Var(VarId(1)), Generation::Round(1));
            let [n0, n1, n2, n3, n4] = [0, 1, 2, 3, 4]
                .map(|c| ar.add(Expr::Num(c), Generation::Constant));

            Self { ar, x, y, n0, n1, n2, n3, n4 }
        }

        fn add(&mut self, e: Expr) -> NodeId {
            self.ar.add(e, Generation::Round(2))
        }

        fn ok(&self, op: Op, operands: &[NodeId]) -> bool {
            canonical_rule(&self.ar, operands, op)
        }
    }

    #[test]
    fn constant_folding() {
        let f = Fixture::new();

        assert!(f.ok(Op::Times, &[f.n2, f.n3]));
        assert!(!f.ok(Op::Times, &[f.n1, f.n3]));
        assert!(!f.ok(Op::Plus, &[f.n2, f.n3]));
        assert!(!f.ok(Op::Lt, &[f.n2, f.n3]));
    }

    #[test]
    fn folding_wraps_like_evaluation() {
        let mut f = Fixture::new();
        let big = f.ar.add(Expr::Num(65537), Generation::Constant);
        let half = f.ar.add(Expr::Num(1 << 16), Generation::Constant);

        // 65537 * 65537 wraps to 131073
        assert!(f.ok(Op::Times, &[big, big]));
        assert!(!f.ok(Op::Times, &[half, half]));
    }

    #[test]
    fn constants_stay_left() {
        let f = Fixture::new();

        assert!(f.ok(Op::Times, &[f.n2, f.x]));
        assert!(!f.ok(Op::Times, &[f.x, f.n2]));
        assert!(!f.ok(Op::Times, &[f.n1, f.x]));
        assert!(!f.ok(Op::Times, &[f.n0, f.x]));
        assert!(!f.ok(Op::Plus, &[f.x, f.n1]));
        assert!(!f.ok(Op::Plus, &[f.n0, f.x]));
        assert!(f.ok(Op::Plus, &[f.n1, f.x]));
        assert!(f.ok(Op::Minus, &[f.x, f.n1]));
    }

    #[test]
    fn times_chains_are_sorted() {
        let mut f = Fixture::new();
        let xy = f.add(Expr::Times(f.x, f.y));
        let yy = f.add(Expr::Times(f.y, f.y));
        let two_y = f.add(Expr::Times(f.n2, f.y));

        assert!(f.ok(Op::Times, &[f.x, f.y]));
        assert!(f.ok(Op::Times, &[f.x, f.x]));
        assert!(!f.ok(Op::Times, &[f.y, f.x]));
        assert!(f.ok(Op::Times, &[f.x, yy]));
        assert!(!f.ok(Op::Times, &[f.y, xy]));
        assert!(f.ok(Op::Times, &[f.n2, xy]));
        assert!(!f.ok(Op::Times, &[f.x, two_y]));
        assert!(!f.ok(Op::Times, &[xy, f.x]));
    }

    #[test]
    fn plus_chains_are_sorted() {
        let mut f = Fixture::new();
        let xy = f.add(Expr::Times(f.x, f.y));
        let x_plus_xy = f.add(Expr::Plus(f.x, xy));

        // [0, 1] < [1, 0] < [1, 1]
        assert!(f.ok(Op::Plus, &[f.y, f.x]));
        assert!(!f.ok(Op::Plus, &[f.x, f.y]));
        assert!(!f.ok(Op::Plus, &[f.x, f.x]));
        assert!(f.ok(Op::Plus, &[f.x, xy]));
        assert!(f.ok(Op::Plus, &[f.y, x_plus_xy]));
        assert!(!f.ok(Op::Plus, &[f.x, x_plus_xy]));
        assert!(f.ok(Op::Plus, &[f.n2, x_plus_xy]));
        assert!(!f.ok(Op::Plus, &[x_plus_xy, f.y]));
    }

    #[test]
    fn lt_rejects_reducible_comparisons() {
        let mut f = Fixture::new();
        let two_x = f.add(Expr::Times(f.n2, f.x));
        let three_x = f.add(Expr::Times(f.n3, f.x));
        let xy = f.add(Expr::Times(f.x, f.y));
        let one_plus_x = f.add(Expr::Plus(f.n1, f.x));
        let two_plus_y = f.add(Expr::Plus(f.n2, f.y));
        let y_plus_xy = f.add(Expr::Plus(f.y, xy));
        let y_plus_two_x = f.add(Expr::Plus(f.y, two_x));
        let y_plus_x = f.add(Expr::Plus(f.y, f.x));

        assert!(f.ok(Op::Lt, &[f.x, f.y]));
        assert!(!f.ok(Op::Lt, &[f.x, f.x]));
        assert!(!f.ok(Op::Lt, &[f.n3, one_plus_x]));
        assert!(!f.ok(Op::Lt, &[one_plus_x, f.n3]));
        assert!(f.ok(Op::Lt, &[f.n3, two_x]));
        assert!(!f.ok(Op::Lt, &[f.n4, two_x]));
        assert!(!f.ok(Op::Lt, &[two_x, f.n4]));
        assert!(!f.ok(Op::Lt, &[f.x, xy]));
        assert!(!f.ok(Op::Lt, &[xy, f.y]));
        assert!(f.ok(Op::Lt, &[f.y, two_x]));
        assert!(!f.ok(Op::Lt, &[f.x, one_plus_x]));
        assert!(!f.ok(Op::Lt, &[one_plus_x, f.x]));
        assert!(f.ok(Op::Lt, &[f.y, one_plus_x]));
        assert!(!f.ok(Op::Lt, &[two_x, three_x]));
        assert!(!f.ok(Op::Lt, &[xy, y_plus_xy]));
        assert!(!f.ok(Op::Lt, &[three_x, y_plus_x]));
        assert!(f.ok(Op::Lt, &[three_x, y_plus_two_x]));
        assert!(f.ok(Op::Lt, &[three_x, y_plus_xy]));
        assert!(!f.ok(Op::Lt, &[one_plus_x, two_plus_y]));
        assert!(!f.ok(Op::Lt, &[y_plus_xy, y_plus_two_x]));
    }

    #[test]
    fn and_chains_are_sorted() {
        let mut f = Fixture::new();
        let fls = f.ar.add(Expr::F, Generation::Round(1));
        let x_lt_2 = f.add(Expr::Lt(f.x, f.n2));
        let y_lt_2 = f.add(Expr::Lt(f.y, f.n2));
        let x_lt_y = f.add(Expr::Lt(f.x, f.y));
        let conj = f.add(Expr::And(y_lt_2, x_lt_y));
        let neg = f.add(Expr::Not(conj));

        assert!(f.ok(Op::And, &[y_lt_2, x_lt_2]));
        assert!(!f.ok(Op::And, &[x_lt_2, y_lt_2]));
        assert!(!f.ok(Op::And, &[x_lt_2, x_lt_2]));
        assert!(!f.ok(Op::And, &[fls, x_lt_2]));
        assert!(!f.ok(Op::And, &[conj, x_lt_2]));
        assert!(f.ok(Op::And, &[y_lt_2, conj]));
        assert!(!f.ok(Op::And, &[x_lt_y, conj]));
        assert!(f.ok(Op::And, &[y_lt_2, neg]));
        assert!(f.ok(Op::Not, &[conj]));
        assert!(!f.ok(Op::Not, &[x_lt_y]));
    }

    #[test]
    fn pipeline_checks_depth_type_and_generation() {
        let mut f = Fixture::new();
        let xy = f.add(Expr::Times(f.x, f.y));
        let lt = f.add(Expr::Lt(f.x, f.y));
        let bias = NoBias;
        let pruner = Pruner::new(2, RuleSet::default(), &bias);

        assert!(pruner.is_grow_rule_satisfied(&f.ar, &[f.n2, f.x], Op::Times, 2));
        // generation 3 would need an operand from round 2
        assert!(!pruner.is_grow_rule_satisfied(&f.ar, &[f.n2, f.x], Op::Times, 3));
        // depth bound reached
        assert!(!pruner.is_grow_rule_satisfied(&f.ar, &[f.n2, xy], Op::Times, 3));
        assert!(!pruner.is_grow_rule_satisfied(&f.ar, &[lt, f.x], Op::Plus, 2));
        assert!(!pruner.is_grow_rule_satisfied(&f.ar, &[f.x], Op::Not, 2));

        let deep = Pruner::new(5, RuleSet::default(), &bias);
        assert!(deep.is_grow_rule_satisfied(&f.ar, &[f.n2, xy], Op::Times, 3));
    }

    #[test]
    fn rules_can_be_switched_off() {
        let f = Fixture::new();
        let bias = DomainBias::default();
        let strict = Pruner::new(4, RuleSet::default(), &bias);
        let loose = Pruner::new(4, RuleSet::none(), &bias);

        // x < y has no boundary/source pair and y * x is unsorted
        assert!(!strict.is_grow_rule_satisfied(&f.ar, &[f.x, f.y], Op::Lt, 2));
        assert!(loose.is_grow_rule_satisfied(&f.ar, &[f.x, f.y], Op::Lt, 2));
        assert!(!strict.is_grow_rule_satisfied(&f.ar, &[f.y, f.x], Op::Times, 2));
        assert!(loose.is_grow_rule_satisfied(&f.ar, &[f.y, f.x], Op::Times, 2));
    }
}
