use thiserror::Error;

use crate::math::Rule;

/// Why a math expression produced no value
#[derive(Debug, Error)]
pub enum MathError {
    #[error("invalid expression: {0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("`{name}` takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("`{0}` is not a number")]
    NotANumber(String),
    #[error("{value} is out of range for `{function}`")]
    OutOfRange { function: &'static str, value: f64 },
    #[error("result is not a finite number")]
    NonFinite,
}
