pub mod error;
pub mod eval;
pub mod expr;
pub mod grammar;
pub mod oracle;
pub mod search;
pub mod synth;
