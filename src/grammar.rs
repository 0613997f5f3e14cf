use std::{fmt, str::FromStr};

use crate::{error::SynthError, expr::ExprVal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntOp {
    Plus,
    Minus,
    Times,
    Leftshift,
    Rightshift,
    Ite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    F,
    Not,
    And,
    Lt,
}

/// Every production the enumerator can attempt. `F` is not here: it
/// has no operands, so it is seeded as a leaf instead of grown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Plus,
    Minus,
    Times,
    Leftshift,
    Rightshift,
    Ite,
    Not,
    And,
    Lt,
}

impl Op {
    pub fn arity(self) -> usize {
        match self {
            Op::Not => 1,
            Op::Ite => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Plus => "PLUS",
            Op::Minus => "MINUS",
            Op::Times => "TIMES",
            Op::Leftshift => "LEFTSHIFT",
            Op::Rightshift => "RIGHTSHIFT",
            Op::Ite => "ITE",
            Op::Not => "NOT",
            Op::And => "AND",
            Op::Lt => "LT",
        };

        f.write_str(s)
    }
}

impl From<IntOp> for Op {
    fn from(op: IntOp) -> Op {
        match op {
            IntOp::Plus => Op::Plus,
            IntOp::Minus => Op::Minus,
            IntOp::Times => Op::Times,
            IntOp::Leftshift => Op::Leftshift,
            IntOp::Rightshift => Op::Rightshift,
            IntOp::Ite => Op::Ite,
        }
    }
}

impl FromStr for IntOp {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLUS" => Ok(IntOp::Plus),
            "MINUS" => Ok(IntOp::Minus),
            "TIMES" => Ok(IntOp::Times),
            "LEFTSHIFT" => Ok(IntOp::Leftshift),
            "RIGHTSHIFT" => Ok(IntOp::Rightshift),
            "ITE" => Ok(IntOp::Ite),
            _ => Err(SynthError::UnknownOperator(s.to_string())),
        }
    }
}

impl FromStr for BoolOp {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "F" => Ok(BoolOp::F),
            "NOT" => Ok(BoolOp::Not),
            "AND" => Ok(BoolOp::And),
            "LT" => Ok(BoolOp::Lt),
            _ => Err(SynthError::UnknownOperator(s.to_string())),
        }
    }
}

/// Role of a variable in the target domain, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarClass {
    Boundary,
    Source,
    Sink,
    Generic,
}

/// Classifies variables by name prefix (case-insensitive).
#[derive(Debug, Clone)]
pub struct VarClassifier {
    pub boundary_prefix: String,
    pub source_prefix: String,
    pub sink_prefix: String,
}

impl Default for VarClassifier {
    fn default() -> Self {
        Self {
            boundary_prefix: "b".to_string(),
            source_prefix: "isrc".to_string(),
            sink_prefix: "isnk".to_string(),
        }
    }
}

impl VarClassifier {
    pub fn classify(&self, name: &str) -> VarClass {
        let name = name.to_ascii_lowercase();
        let has = |prefix: &str| !prefix.is_empty() && name.starts_with(&prefix.to_ascii_lowercase());

        if has(&self.source_prefix) {
            VarClass::Source
        } else if has(&self.sink_prefix) {
            VarClass::Sink
        } else if has(&self.boundary_prefix) {
            VarClass::Boundary
        } else {
            VarClass::Generic
        }
    }
}

/// Position of a variable in the order table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

impl VarId {
    /// The 1-based order index.
    pub fn order(self) -> usize {
        self.0 + 1
    }
}

/// The variable order table: names in declaration order, with their class.
#[derive(Debug, Clone, Default)]
pub struct VarTable {
    names: Vec<String>,
    classes: Vec<VarClass>,
}

impl VarTable {
    pub fn new(
        names: impl IntoIterator<Item = String>,
        classifier: &VarClassifier,
    ) -> Self {
        let names = names.into_iter().collect::<Vec<_>>();
        let classes = names.iter().map(|x| classifier.classify(x)).collect();

        Self { names, classes }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, var: VarId) -> &str {
        &self.names[var.0]
    }

    pub fn class(&self, var: VarId) -> VarClass {
        self.classes[var.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.names.len()).map(VarId)
    }
}

/// The optional members of the pruning pipeline. Depth, type and
/// generation checks can't be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSet {
    pub canonical: bool,
    pub bias: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self { canonical: true, bias: true }
    }
}

impl RuleSet {
    pub fn none() -> Self {
        Self { canonical: false, bias: false }
    }

    /// Parses rule names (`canonical`, `bias`). The always-on rules
    /// are accepted and ignored.
    pub fn parse<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Result<Self, SynthError> {
        let mut res = Self::none();

        for name in names {
            match name.as_ref().trim().to_ascii_lowercase().as_str() {
                "canonical" | "elimination_free" => res.canonical = true,
                "bias" | "form_bias" => res.bias = true,
                "depth" | "type" | "generation" => (),
                other => return Err(SynthError::UnknownRule(other.to_string())),
            }
        }

        Ok(res)
    }
}

/// The language the search enumerates over.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub depth_bound: u32,
    pub int_ops: Vec<IntOp>,
    pub bool_ops: Vec<BoolOp>,
    pub vars: Vec<String>,
    pub constants: Vec<ExprVal>,
    pub is_pred: bool,
}

impl Grammar {
    /// Builds a grammar from its textual description.
    pub fn parse<A, B, C, D>(
        depth_bound: u32,
        int_ops: impl IntoIterator<Item = A>,
        bool_ops: impl IntoIterator<Item = B>,
        vars: impl IntoIterator<Item = C>,
        constants: impl IntoIterator<Item = D>,
        is_pred: bool,
    ) -> Result<Self, SynthError>
    where
        A: AsRef<str>,
        B: AsRef<str>,
        C: Into<String>,
        D: AsRef<str>,
    {
        if depth_bound == 0 {
            return Err(SynthError::InvalidDepthBound(depth_bound));
        }

        let int_ops = int_ops.into_iter()
            .map(|x| x.as_ref().parse())
            .collect::<Result<Vec<IntOp>, _>>()?;
        let bool_ops = bool_ops.into_iter()
            .map(|x| x.as_ref().parse())
            .collect::<Result<Vec<BoolOp>, _>>()?;
        let constants = constants.into_iter()
            .map(|x| {
                let x = x.as_ref().trim();
                x.parse::<ExprVal>().map_err(|_| SynthError::BadConstant(x.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            depth_bound,
            int_ops,
            bool_ops,
            vars: vars.into_iter().map(Into::into).collect(),
            constants,
            is_pred,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_prefix() {
        let c = VarClassifier::default();

        assert_eq!(c.classify("b0"), VarClass::Boundary);
        assert_eq!(c.classify("Bound"), VarClass::Boundary);
        assert_eq!(c.classify("isrc1"), VarClass::Source);
        assert_eq!(c.classify("isnk"), VarClass::Sink);
        assert_eq!(c.classify("x"), VarClass::Generic);
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let res = Grammar::parse(3, ["PLUS", "DIV"], Vec::<&str>::new(), ["x"], ["1"], false);

        assert_eq!(res.unwrap_err(), SynthError::UnknownOperator("DIV".to_string()));
    }

    #[test]
    fn constants_are_parsed() {
        let g = Grammar::parse(3, ["times"], ["lt"], ["x"], ["2", " -3 "], true).unwrap();

        assert_eq!(g.constants, vec![2, -3]);
        assert_eq!(g.int_ops, vec![IntOp::Times]);
        assert_eq!(g.bool_ops, vec![BoolOp::Lt]);
        assert!(Grammar::parse(3, ["PLUS"], ["LT"], ["x"], ["two"], true).is_err());
    }
}
