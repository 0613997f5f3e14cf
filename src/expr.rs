use std::fmt;

use crate::grammar::{VarClass, VarId, VarTable};

pub const BITS_PER_VAL: u32 = 32;
pub type ExprVal = i32;

/// Index of a node inside an [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl From<usize> for NodeId {
    fn from(n: usize) -> NodeId {
        NodeId(n as u32)
    }
}

impl From<NodeId> for usize {
    fn from(id: NodeId) -> usize {
        id.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Int,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Int(ExprVal),
    Bool(bool),
}

impl Value {
    pub fn category(self) -> Category {
        match self {
            Value::Int(_) => Category::Int,
            Value::Bool(_) => Category::Bool,
        }
    }

    pub fn as_int(self) -> ExprVal {
        match self {
            Value::Int(x) => x,
            // NOTE: the type rule never lets this happen
            Value::Bool(_) => panic!("Bool value used as Int"),
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Value::Bool(x) => x,
            Value::Int(_) => panic!("Int value used as Bool"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expr {
    Var(VarId),
    Num(ExprVal),
    F,
    Plus(NodeId, NodeId),
    Minus(NodeId, NodeId),
    Times(NodeId, NodeId),
    Leftshift(NodeId, NodeId),
    Rightshift(NodeId, NodeId),
    Ite(NodeId, NodeId, NodeId),
    Not(NodeId),
    And(NodeId, NodeId),
    Lt(NodeId, NodeId),
}

impl Expr {
    pub fn category(&self) -> Category {
        match self {
            Expr::Var(_)
            | Expr::Num(_)
            | Expr::Plus(..)
            | Expr::Minus(..)
            | Expr::Times(..)
            | Expr::Leftshift(..)
            | Expr::Rightshift(..)
            | Expr::Ite(..) => Category::Int,
            Expr::F | Expr::Not(_) | Expr::And(..) | Expr::Lt(..) => Category::Bool,
        }
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> {
        let slots = match *self {
            Expr::Var(_) | Expr::Num(_) | Expr::F => [None, None, None],
            Expr::Not(a) => [Some(a), None, None],
            Expr::Plus(a, b)
            | Expr::Minus(a, b)
            | Expr::Times(a, b)
            | Expr::Leftshift(a, b)
            | Expr::Rightshift(a, b)
            | Expr::And(a, b)
            | Expr::Lt(a, b) => [Some(a), Some(b), None],
            Expr::Ite(c, t, e) => [Some(c), Some(t), Some(e)],
        };

        slots.into_iter().flatten()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Expr::Var(_) | Expr::Num(_) | Expr::F)
    }

    pub fn as_num(&self) -> Option<ExprVal> {
        match self {
            Expr::Num(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Expr::Var(x) => Some(*x),
            _ => None,
        }
    }

    /// Computes this node's own operator given its operands' values.
    /// `child` is only queried for the operands the operator needs.
    pub fn compute<C, V>(&self, mut child: C, mut var: V) -> Value
    where
        C: FnMut(NodeId) -> Value,
        V: FnMut(VarId) -> ExprVal,
    {
        match *self {
            Expr::Var(v) => Value::Int(var(v)),
            Expr::Num(x) => Value::Int(x),
            Expr::F => Value::Bool(false),
            Expr::Plus(a, b) => Value::Int(child(a).as_int().wrapping_add(child(b).as_int())),
            Expr::Minus(a, b) => Value::Int(child(a).as_int().wrapping_sub(child(b).as_int())),
            Expr::Times(a, b) => Value::Int(child(a).as_int().wrapping_mul(child(b).as_int())),
            Expr::Leftshift(a, b) => {
                let (l, r) = (child(a).as_int(), child(b).as_int());
                Value::Int(l.wrapping_shl(r as u32 & (BITS_PER_VAL - 1)))
            },
            Expr::Rightshift(a, b) => {
                let (l, r) = (child(a).as_int(), child(b).as_int());
                Value::Int(((l as u32) >> (r as u32 & (BITS_PER_VAL - 1))) as ExprVal)
            },
            Expr::Lt(a, b) => Value::Bool(child(a).as_int() < child(b).as_int()),
            Expr::Ite(c, t, e) => {
                if child(c).as_bool() {
                    child(t)
                } else {
                    child(e)
                }
            },
            Expr::Not(a) => Value::Bool(!child(a).as_bool()),
            Expr::And(a, b) => Value::Bool(child(a).as_bool() && child(b).as_bool()),
        }
    }
}

/// When a node was created. Constants sit outside the round
/// numbering so they can pair with nodes of any round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    Constant,
    Pending,
    Round(u32),
}

impl Generation {
    /// The round number the generation rule sees.
    pub fn rank(self) -> u32 {
        match self {
            Generation::Constant => 1,
            Generation::Pending => 0,
            Generation::Round(x) => x,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    expr: Expr,
    depth: u32,
    generation: Generation,
    ops: u32,
    lex: Box<[u32]>,
}

impl Node {
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Owns every node created during one search run. Nodes refer to
/// their operands by [`NodeId`] and are never mutated, except for the
/// generation stamp applied at the end of a round.
#[derive(Debug, Clone, Default)]
pub struct ExprArena {
    vars: VarTable,
    nodes: Vec<Node>,
}

impl ExprArena {
    pub fn new(vars: VarTable) -> Self {
        Self {
            vars,
            nodes: Vec::new(),
        }
    }

    pub fn vars(&self) -> &VarTable {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add(&mut self, expr: Expr, generation: Generation) -> NodeId {
        let mut lex = vec![0; self.vars.len()].into_boxed_slice();
        let mut depth = 0;
        let mut ops = u32::from(!expr.is_leaf());

        if let Expr::Var(v) = expr {
            lex[v.0] = 1;
        }

        for child in expr.children() {
            let child = self.node(child);

            depth = depth.max(child.depth);
            ops += child.ops;
            lex.iter_mut()
                .zip(child.lex.iter())
                .for_each(|(x, y)| *x += *y);
        }

        let id = NodeId::from(self.nodes.len());
        self.nodes.push(Node {
            expr,
            depth: depth + 1,
            generation,
            ops,
            lex,
        });

        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[usize::from(id)]
    }

    pub fn expr(&self, id: NodeId) -> Expr {
        self.node(id).expr
    }

    pub fn depth(&self, id: NodeId) -> u32 {
        self.node(id).depth
    }

    pub fn generation(&self, id: NodeId) -> Generation {
        self.node(id).generation
    }

    pub fn stamp(&mut self, id: NodeId, generation: Generation) {
        self.nodes[usize::from(id)].generation = generation;
    }

    pub fn category(&self, id: NodeId) -> Category {
        self.node(id).expr.category()
    }

    /// Occurrence count of every variable, in order-table order.
    pub fn lexical_order(&self, id: NodeId) -> &[u32] {
        &self.node(id).lex
    }

    pub fn var_count(&self, id: NodeId) -> u32 {
        self.node(id).lex.iter().sum()
    }

    pub fn class_count(&self, id: NodeId, class: VarClass) -> u32 {
        self.node(id).lex.iter()
            .zip(self.vars.ids())
            .filter(|(_, v)| self.vars.class(*v) == class)
            .map(|(x, _)| *x)
            .sum()
    }

    pub fn has_class(&self, id: NodeId, class: VarClass) -> bool {
        self.class_count(id, class) > 0
    }

    pub fn op_count(&self, id: NodeId) -> u32 {
        self.node(id).ops
    }

    /// Variables plus operators.
    pub fn symbol_count(&self, id: NodeId) -> u32 {
        self.var_count(id) + self.op_count(id)
    }

    /// Highest degree that variables of `class` reach inside a single
    /// multiplicative term of the node.
    pub fn exponent(&self, id: NodeId, class: VarClass) -> u32 {
        match self.expr(id) {
            Expr::Var(v) => u32::from(self.vars.class(v) == class),
            Expr::Num(_) | Expr::F => 0,
            Expr::Times(a, b) => self.exponent(a, class) + self.exponent(b, class),
            e => e.children()
                .map(|x| self.exponent(x, class))
                .max()
                .unwrap_or(0),
        }
    }

    /// Flattened operands of a `Times` chain. A non-`Times` node is its
    /// own single factor.
    pub fn factors(&self, id: NodeId) -> Vec<NodeId> {
        let mut res = Vec::new();
        let mut cur = id;

        while let Expr::Times(a, b) = self.expr(cur) {
            res.push(a);
            cur = b;
        }
        res.push(cur);

        res
    }

    /// Flattened operands of a `Plus` chain.
    pub fn terms(&self, id: NodeId) -> Vec<NodeId> {
        let mut res = Vec::new();
        let mut cur = id;

        while let Expr::Plus(a, b) = self.expr(cur) {
            res.push(a);
            cur = b;
        }
        res.push(cur);

        res
    }

    /// A `Times` node without its numeric coefficient.
    pub fn monomial(&self, id: NodeId) -> NodeId {
        match self.expr(id) {
            Expr::Times(a, b) if self.expr(a).as_num().is_some() => b,
            _ => id,
        }
    }

    /// Structural equality: same operators over the same variables and
    /// numerals, regardless of which arena slots hold them.
    pub fn same_shape(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }

        let (ea, eb) = (self.expr(a), self.expr(b));
        match (ea, eb) {
            (Expr::Var(x), Expr::Var(y)) => x == y,
            (Expr::Num(x), Expr::Num(y)) => x == y,
            (Expr::F, Expr::F) => true,
            _ if std::mem::discriminant(&ea) == std::mem::discriminant(&eb) => {
                ea.children()
                    .zip(eb.children())
                    .all(|(x, y)| self.same_shape(x, y))
            },
            _ => false,
        }
    }

    pub fn contains_shape(&self, haystack: &[NodeId], needle: NodeId) -> bool {
        haystack.iter().any(|x| self.same_shape(*x, needle))
    }

    /// Plain recursive interpretation, bypassing any cache.
    pub fn interpret<V>(&self, id: NodeId, var: &V) -> Value
    where
        V: Fn(VarId) -> ExprVal,
    {
        self.expr(id).compute(|c| self.interpret(c, var), var)
    }

    pub fn display(&self, id: NodeId) -> Rendered<'_> {
        Rendered { arena: self, id }
    }
}

pub struct Rendered<'a> {
    arena: &'a ExprArena,
    id: NodeId,
}

impl Rendered<'_> {
    fn sub(&self, id: NodeId) -> Rendered<'_> {
        self.arena.display(id)
    }

    fn binop(&self, f: &mut fmt::Formatter<'_>, a: NodeId, op: &str, b: NodeId) -> fmt::Result {
        write!(f, "({} {op} {})", self.sub(a), self.sub(b))
    }
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arena.expr(self.id) {
            Expr::Var(v) => f.write_str(self.arena.vars.name(v)),
            Expr::Num(x) => write!(f, "{x}"),
            Expr::F => f.write_str("F"),
            Expr::Plus(a, b) => self.binop(f, a, "+", b),
            Expr::Minus(a, b) => self.binop(f, a, "-", b),
            Expr::Times(a, b) => self.binop(f, a, "*", b),
            Expr::Leftshift(a, b) => self.binop(f, a, "<<", b),
            Expr::Rightshift(a, b) => self.binop(f, a, ">>", b),
            Expr::Lt(a, b) => self.binop(f, a, "<", b),
            Expr::And(a, b) => self.binop(f, a, "&&", b),
            Expr::Not(a) => write!(f, "!({})", self.sub(a)),
            Expr::Ite(c, t, e) => write!(f, "ite({}, {}, {})", self.sub(c), self.sub(t), self.sub(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::VarClassifier;

    fn arena(names: &[&str]) -> ExprArena {
        let vars = VarTable::new(
            names.iter().map(|x| x.to_string()),
            &VarClassifier::default(),
        );

        ExprArena::new(vars)
    }

    #[test]
    fn depth_and_counts() {
        let mut ar = arena(&["x", "b0"]);
        let x = ar.add(Expr::Var(VarId(0)), Generation::Round(1));
        let b = ar.add(Expr::Var(VarId(1)), Generation::Round(1));
        let two = ar.add(Expr::Num(2), Generation::Constant);
        let xb = ar.add(Expr::Times(x, b), Generation::Round(2));
        let t = ar.add(Expr::Times(two, xb), Generation::Round(3));
        let p = ar.add(Expr::Plus(x, t), Generation::Round(4));

        assert_eq!(ar.depth(x), 1);
        assert_eq!(ar.depth(t), 3);
        assert_eq!(ar.depth(p), 4);
        assert_eq!(ar.lexical_order(p), &[2, 1]);
        assert_eq!(ar.op_count(p), 3);
        assert_eq!(ar.symbol_count(p), 6);
        assert_eq!(ar.class_count(p, VarClass::Boundary), 1);
        assert_eq!(ar.exponent(p, VarClass::Generic), 1);
        assert_eq!(ar.exponent(xb, VarClass::Generic), 1);
        assert_eq!(ar.factors(t), vec![two, x, b]);
        assert_eq!(ar.terms(p), vec![x, t]);
        assert_eq!(ar.monomial(t), xb);
        assert_eq!(ar.display(p).to_string(), "(x + (2 * (x * b0)))");
    }

    #[test]
    fn shape_ignores_slots() {
        let mut ar = arena(&["x"]);
        let x = ar.add(Expr::Var(VarId(0)), Generation::Round(1));
        let two_a = ar.add(Expr::Num(2), Generation::Constant);
        let two_b = ar.add(Expr::Num(2), Generation::Constant);
        let l = ar.add(Expr::Times(two_a, x), Generation::Round(2));
        let r = ar.add(Expr::Times(two_b, x), Generation::Round(2));
        let other = ar.add(Expr::Plus(two_b, x), Generation::Round(2));

        assert!(ar.same_shape(l, r));
        assert!(!ar.same_shape(l, other));
    }

    #[test]
    fn operator_semantics() {
        let mut ar = arena(&["x", "y"]);
        let x = ar.add(Expr::Var(VarId(0)), Generation::Round(1));
        let y = ar.add(Expr::Var(VarId(1)), Generation::Round(1));
        let shl = ar.add(Expr::Leftshift(x, y), Generation::Round(2));
        let shr = ar.add(Expr::Rightshift(x, y), Generation::Round(2));
        let lt = ar.add(Expr::Lt(x, y), Generation::Round(2));
        let ite = ar.add(Expr::Ite(lt, x, y), Generation::Round(3));
        let env = |v: VarId| if v.0 == 0 { -8 } else { 1 };

        assert_eq!(ar.interpret(shl, &env), Value::Int(-16));
        assert_eq!(ar.interpret(shr, &env), Value::Int(0x7fff_fffc));
        assert_eq!(ar.interpret(lt, &env), Value::Bool(true));
        assert_eq!(ar.interpret(ite, &env), Value::Int(-8));
    }
}
