pub mod bias;
pub mod grow;
pub mod prune;
pub mod reduce;

use log::{log_enabled, trace, Level};

use crate::{
    eval::Evaluator,
    expr::{ExprArena, NodeId},
};

/// Everything one search run owns. The state is moved into each stage
/// of a round and handed back once the stage is done with it.
#[derive(Debug, Default)]
pub struct SearchState {
    pub arena: ExprArena,
    /// Programs still in play, in the order they were grown.
    pub candidates: Vec<NodeId>,
    pub eval: Evaluator,
}

impl SearchState {
    pub fn new(arena: ExprArena) -> Self {
        Self {
            arena,
            candidates: Vec::new(),
            eval: Evaluator::new(),
        }
    }

    pub fn live(&self) -> usize {
        self.candidates.len()
    }

    pub fn dump(&self, stage: &str) {
        if !log_enabled!(Level::Trace) {
            return;
        }

        trace!("Candidates after {stage}:");
        for id in &self.candidates {
            trace!("  [{}] {}", self.arena.depth(*id), self.arena.display(*id));
        }
    }
}
