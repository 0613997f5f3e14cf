use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthError {
    #[error("example #{example} has no `_out` entry")]
    MissingOutput { example: usize },
    #[error("example #{example} has no value for variable `{var}`")]
    MissingInput { example: usize, var: String },
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("unknown pruning rule: {0}")]
    UnknownRule(String),
    #[error("constant is not an integer: {0}")]
    BadConstant(String),
    #[error("malformed example: {0}")]
    BadExample(String),
    #[error("no examples were given")]
    EmptyExamples,
    #[error("depth bound must be positive, got {0}")]
    InvalidDepthBound(u32),
}
