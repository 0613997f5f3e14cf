use std::collections::HashMap;

use crate::{
    expr::{Category, ExprArena, ExprVal, NodeId, Value},
    oracle::Oracle,
};

/// Memoized interpreter. Results are keyed by (node, example index),
/// one table per semantic category.
#[derive(Debug, Default)]
pub struct Evaluator {
    ints: HashMap<(NodeId, usize), ExprVal>,
    bools: HashMap<(NodeId, usize), bool>,
    hits: usize,
    misses: usize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(
        &mut self,
        arena: &ExprArena,
        oracle: &Oracle,
        id: NodeId,
        example: usize,
    ) -> Value {
        let key = (id, example);
        let cached = match arena.category(id) {
            Category::Int => self.ints.get(&key).map(|x| Value::Int(*x)),
            Category::Bool => self.bools.get(&key).map(|x| Value::Bool(*x)),
        };

        if let Some(val) = cached {
            self.hits += 1;
            return val;
        }
        self.misses += 1;

        let val = arena.expr(id).compute(
            |c| self.evaluate(arena, oracle, c, example),
            |v| oracle.input(example, v),
        );
        debug_assert_eq!(val.category(), arena.category(id));

        match val {
            Value::Int(x) => {
                self.ints.insert(key, x);
            },
            Value::Bool(x) => {
                self.bools.insert(key, x);
            },
        }

        val
    }

    pub fn evaluate_int(
        &mut self,
        arena: &ExprArena,
        oracle: &Oracle,
        id: NodeId,
        example: usize,
    ) -> ExprVal {
        self.evaluate(arena, oracle, id, example).as_int()
    }

    pub fn evaluate_bool(
        &mut self,
        arena: &ExprArena,
        oracle: &Oracle,
        id: NodeId,
        example: usize,
    ) -> bool {
        self.evaluate(arena, oracle, id, example).as_bool()
    }

    /// Drops every cached result of `id`.
    pub fn forget(&mut self, id: NodeId, example_count: usize) {
        for example in 0..example_count {
            self.ints.remove(&(id, example));
            self.bools.remove(&(id, example));
        }
    }

    pub fn is_cached(&self, id: NodeId, example: usize) -> bool {
        self.ints.contains_key(&(id, example)) || self.bools.contains_key(&(id, example))
    }

    pub fn len(&self) -> usize {
        self.ints.len() + self.bools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::{Expr, Generation},
        grammar::{VarClassifier, VarId, VarTable},
        oracle::parse_example,
    };

    fn setup() -> (ExprArena, Oracle) {
        let vars = VarTable::new(["x".to_string(), "y".to_string()], &VarClassifier::default());
        let oracle = Oracle::new(
            [
                parse_example("x=1,y=2,_out=0").unwrap(),
                parse_example("x=5,y=3,_out=0").unwrap(),
            ],
            &vars,
        ).unwrap();

        (ExprArena::new(vars), oracle)
    }

    #[test]
    fn cached_matches_fresh() {
        let (mut ar, oracle) = setup();
        let x = ar.add(Expr::Var(VarId(0)), Generation::Round(1));
        let y = ar.add(Expr::Var(VarId(1)), Generation::Round(1));
        let three = ar.add(Expr::Num(3), Generation::Constant);
        let t = ar.add(Expr::Times(three, y), Generation::Round(2));
        let p = ar.add(Expr::Plus(x, t), Generation::Round(3));
        let lt = ar.add(Expr::Lt(x, y), Generation::Round(2));
        let mut ev = Evaluator::new();

        for ex in 0..oracle.len() {
            let env = |v: VarId| oracle.input(ex, v);
            let first = ev.evaluate(&ar, &oracle, p, ex);
            let second = ev.evaluate(&ar, &oracle, p, ex);

            assert_eq!(first, second);
            assert_eq!(first, ar.interpret(p, &env));
            assert_eq!(ev.evaluate(&ar, &oracle, lt, ex), ar.interpret(lt, &env));
        }

        assert_eq!(ev.evaluate_int(&ar, &oracle, p, 0), 7);
        assert_eq!(ev.evaluate_int(&ar, &oracle, p, 1), 14);
        assert!(ev.evaluate_bool(&ar, &oracle, lt, 0));
        assert!(!ev.evaluate_bool(&ar, &oracle, lt, 1));
        assert!(ev.hits() > 0);
    }

    #[test]
    fn forget_only_touches_one_node() {
        let (mut ar, oracle) = setup();
        let x = ar.add(Expr::Var(VarId(0)), Generation::Round(1));
        let y = ar.add(Expr::Var(VarId(1)), Generation::Round(1));
        let p = ar.add(Expr::Plus(x, y), Generation::Round(2));
        let mut ev = Evaluator::new();

        assert!(ev.is_empty());
        ev.evaluate(&ar, &oracle, p, 0);
        ev.evaluate(&ar, &oracle, p, 1);
        assert_eq!(ev.len(), 6);
        ev.forget(p, oracle.len());
        assert_eq!(ev.len(), 4);

        assert!(!ev.is_cached(p, 0));
        assert!(!ev.is_cached(p, 1));
        assert!(ev.is_cached(x, 0));
        assert!(ev.is_cached(y, 1));
    }
}
