use log::{debug, info};

use crate::{
    error::SynthError,
    expr::{Category, Expr, ExprArena, Generation, NodeId},
    grammar::{BoolOp, Grammar, RuleSet, VarClassifier, VarId, VarTable},
    oracle::{ExampleRecord, Oracle},
    synth::{
        bias::{Bias, DomainBias},
        grow::grow,
        prune::Pruner,
        reduce::{eliminate_equivalents, eliminate_out_of_bounds},
        SearchState,
    },
};

/// Everything a search run needs besides the examples.
#[derive(Debug)]
pub struct SearchConfig {
    pub grammar: Grammar,
    pub rules: RuleSet,
    pub bias: Box<dyn Bias>,
    pub classifier: VarClassifier,
    /// Give up after this many rounds. `None` searches until the depth
    /// bound runs the language dry.
    pub max_rounds: Option<u32>,
}

impl SearchConfig {
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            rules: RuleSet::default(),
            bias: Box::new(DomainBias::default()),
            classifier: VarClassifier::default(),
            max_rounds: None,
        }
    }

    pub fn with_bias(mut self, bias: impl Bias + 'static) -> Self {
        self.bias = Box::new(bias);
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_classifier(mut self, classifier: VarClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }
}

/// How an accepted program relates to the examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Direct,
    /// The program is wrong on every example, so its negation is right.
    Negated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// The accepted program. Already wrapped in `Not` when the raw
    /// candidate matched with [`Acceptance::Negated`].
    pub program: NodeId,
    pub negated: bool,
    pub round: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep {
    /// A round finished without a match.
    Grown {
        round: u32,
        added: usize,
        live: usize,
    },
    Found(Solution),
    /// The last round left nothing to build on.
    Exhausted { rounds: u32 },
    /// The round limit was hit.
    Abandoned { rounds: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Solution),
    Exhausted { rounds: u32 },
    Abandoned { rounds: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub rounds: u32,
    pub nodes: usize,
    pub live: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// Bottom-up enumerative search. Each [`step`](Self::step) runs one
/// round: grow a generation, reduce, then look for an accepted program
/// among the candidates of that generation.
#[derive(Debug)]
pub struct BottomUpSearch {
    config: SearchConfig,
    oracle: Oracle,
    state: SearchState,
    round: u32,
    /// First arena index created by the current round.
    round_start: usize,
    done: bool,
}

impl BottomUpSearch {
    pub fn new(
        config: SearchConfig,
        records: impl IntoIterator<Item = ExampleRecord>,
    ) -> Result<Self, SynthError> {
        let grammar = &config.grammar;
        let vars = VarTable::new(grammar.vars.iter().cloned(), &config.classifier);
        let oracle = Oracle::new(records, &vars)?;
        let mut state = SearchState::new(ExprArena::new(vars));

        info!("Depth bound: {}", grammar.depth_bound);
        info!("Mode: {}", if grammar.is_pred { "predicate" } else { "term" });
        info!("Int ops: {:?}", grammar.int_ops);
        info!("Bool ops: {:?}", grammar.bool_ops);
        info!("Variables: {:?}", grammar.vars);
        info!("Constants: {:?}", grammar.constants);

        Self::seed(&config, &mut state);
        debug!("Seeded {} leaves", state.live());

        Ok(Self {
            config,
            oracle,
            state,
            round: 0,
            round_start: 0,
            done: false,
        })
    }

    fn seed(config: &SearchConfig, state: &mut SearchState) {
        let grammar = &config.grammar;
        let filter_leaves = !grammar.is_pred && config.rules.bias;

        for v in 0..grammar.vars.len() {
            let var = VarId(v);
            let class = state.arena.vars().class(var);

            if filter_leaves && !config.bias.admits_term_leaf(class) {
                debug!("Not a term leaf: {}", state.arena.vars().name(var));
                continue;
            }

            let id = state.arena.add(Expr::Var(var), Generation::Round(1));
            state.candidates.push(id);
        }

        for c in &grammar.constants {
            let id = state.arena.add(Expr::Num(*c), Generation::Constant);
            state.candidates.push(id);
        }

        if grammar.bool_ops.contains(&BoolOp::F) {
            let id = state.arena.add(Expr::F, Generation::Round(1));
            state.candidates.push(id);
        }
    }

    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    pub fn arena(&self) -> &ExprArena {
        &self.state.arena
    }

    pub fn candidates(&self) -> &[NodeId] {
        &self.state.candidates
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn stats(&self) -> SearchStats {
        SearchStats {
            rounds: self.round,
            nodes: self.state.arena.len(),
            live: self.state.live(),
            cache_hits: self.state.eval.hits(),
            cache_misses: self.state.eval.misses(),
        }
    }

    /// Checks a program against every example.
    pub fn is_correct(&mut self, id: NodeId) -> Option<Acceptance> {
        let SearchState { arena, eval, .. } = &mut self.state;
        let oracle = &self.oracle;

        if !self.config.grammar.is_pred {
            if arena.category(id) != Category::Int {
                return None;
            }

            return (0..oracle.len())
                .all(|ex| eval.evaluate_int(arena, oracle, id, ex) == oracle.output(ex))
                .then_some(Acceptance::Direct);
        }

        if arena.category(id) != Category::Bool {
            return None;
        }

        let mut all_true = true;
        let mut all_false = true;

        for ex in 0..oracle.len() {
            let expected = match oracle.output(ex) {
                0 => false,
                1 => true,
                _ => return None,
            };
            let matches = eval.evaluate_bool(arena, oracle, id, ex) == expected;

            all_true &= matches;
            all_false &= !matches;

            if !all_true && !all_false {
                return None;
            }
        }

        match (all_true, all_false) {
            (true, _) => Some(Acceptance::Direct),
            (false, true) => Some(Acceptance::Negated),
            (false, false) => None,
        }
    }

    /// Looks for an accepted program among the candidates of the current
    /// depth and anything created this round, folded numerals included.
    fn accept(&mut self) -> Option<Solution> {
        let round = self.round;
        let round_start = self.round_start;
        let current = self.state.candidates.iter()
            .copied()
            .filter(|id| self.state.arena.depth(*id) == round || usize::from(*id) >= round_start)
            .collect::<Vec<_>>();
        let found = current.into_iter()
            .find_map(|id| self.is_correct(id).map(|acc| (id, acc)))?;

        let (program, negated) = match found {
            (id, Acceptance::Direct) => (id, false),
            (id, Acceptance::Negated) => {
                let not = self.state.arena.add(Expr::Not(id), Generation::Round(round + 1));
                (not, true)
            },
        };
        let text = self.state.arena.display(program).to_string();

        info!("Found at round {round}: {text}");

        Some(Solution { program, negated, round, text })
    }

    /// Runs one round. Returns `None` once the search has concluded.
    pub fn step(&mut self) -> Option<SearchStep> {
        if self.done {
            return None;
        }

        let (added, fresh) = if self.round == 0 {
            self.round = 1;
            (self.state.live(), true)
        } else {
            if let Some(max) = self.config.max_rounds {
                if self.round >= max {
                    info!("Giving up after {} rounds", self.round);
                    self.done = true;
                    return Some(SearchStep::Abandoned { rounds: self.round });
                }
            }

            self.round += 1;
            self.advance()
        };

        if let Some(sol) = self.accept() {
            self.done = true;
            return Some(SearchStep::Found(sol));
        }

        if !fresh {
            info!("Nothing left to grow after {} rounds", self.round);
            self.done = true;
            return Some(SearchStep::Exhausted { rounds: self.round });
        }

        Some(SearchStep::Grown {
            round: self.round,
            added,
            live: self.state.live(),
        })
    }

    /// Grows and reduces one generation. Also reports whether any
    /// program of the new generation survived, since every later
    /// production needs one as an operand.
    fn advance(&mut self) -> (usize, bool) {
        let round = self.round;
        let grammar = &self.config.grammar;
        let pruner = Pruner::new(grammar.depth_bound, self.config.rules, &*self.config.bias);

        let state = std::mem::take(&mut self.state);
        self.round_start = state.arena.len();
        let (state, added) = grow(state, &pruner, grammar, round);
        debug!("Round {round}: grew {added}, {} live", state.live());
        state.dump("grow");

        let state = if grammar.is_pred {
            eliminate_equivalents(state, &self.oracle, true)
        } else {
            eliminate_out_of_bounds(state, &self.oracle)
        };
        state.dump("reduction");

        let fresh = state.candidates.iter()
            .any(|x| state.arena.generation(*x) == Generation::Round(round));
        self.state = state;

        (added, fresh)
    }

    /// Steps until the search concludes.
    pub fn run(&mut self) -> SearchOutcome {
        loop {
            match self.step() {
                Some(SearchStep::Grown { .. }) => (),
                Some(SearchStep::Found(sol)) => return SearchOutcome::Found(sol),
                Some(SearchStep::Exhausted { rounds }) => return SearchOutcome::Exhausted { rounds },
                Some(SearchStep::Abandoned { rounds }) => return SearchOutcome::Abandoned { rounds },
                // NOTE: only reachable when `run` is called on a finished search
                None => return SearchOutcome::Abandoned { rounds: self.round },
            }
        }
    }
}
