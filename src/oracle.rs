use std::collections::HashMap;

use log::debug;

use crate::{error::SynthError, expr::ExprVal, grammar::{VarId, VarTable}};

/// Reserved key holding an example's expected output.
pub const OUTPUT_KEY: &str = "_out";

/// An input/output record as handed over by the caller.
pub type ExampleRecord = HashMap<String, ExprVal>;

/// One example, with the inputs laid out in variable-order-table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub input: Vec<ExprVal>,
    pub output: ExprVal,
}

/// The fixed set of examples every accepted program must reproduce.
#[derive(Debug, Clone)]
pub struct Oracle {
    examples: Vec<Example>,
}

impl Oracle {
    pub fn new(
        records: impl IntoIterator<Item = ExampleRecord>,
        vars: &VarTable,
    ) -> Result<Self, SynthError> {
        let examples = records.into_iter()
            .enumerate()
            .map(|(idx, rec)| Self::resolve(idx, &rec, vars))
            .collect::<Result<Vec<_>, _>>()?;

        if examples.is_empty() {
            return Err(SynthError::EmptyExamples);
        }

        debug!("Loaded {} examples", examples.len());

        Ok(Self { examples })
    }

    fn resolve(
        idx: usize,
        rec: &ExampleRecord,
        vars: &VarTable,
    ) -> Result<Example, SynthError> {
        let output = *rec.get(OUTPUT_KEY)
            .ok_or(SynthError::MissingOutput { example: idx })?;
        let input = vars.ids()
            .map(|v| {
                let name = vars.name(v);
                rec.get(name)
                    .copied()
                    .ok_or_else(|| SynthError::MissingInput {
                        example: idx,
                        var: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Example { input, output })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn input(&self, example: usize, var: VarId) -> ExprVal {
        self.examples[example].input[var.0]
    }

    pub fn output(&self, example: usize) -> ExprVal {
        self.examples[example].output
    }
}

/// Parses a `name=value,name=value` example, e.g. `x=1,y=2,_out=1`.
pub fn parse_example(s: &str) -> Result<ExampleRecord, SynthError> {
    s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(|pair| -> Result<(String, ExprVal), SynthError> {
            let (name, val) = pair.split_once('=')
                .ok_or_else(|| SynthError::BadExample(pair.to_string()))?;
            let val = val.trim()
                .parse::<ExprVal>()
                .map_err(|_| SynthError::BadExample(pair.to_string()))?;

            Ok((name.trim().to_string(), val))
        })
        .collect()
}
