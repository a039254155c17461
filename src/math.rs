use std::fmt;
use std::sync::LazyLock;

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::error::MathError;
use crate::numbers;

#[derive(Parser)]
#[grammar = "src/math.pest"]
pub struct MathParser;

static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left) | Op::infix(Rule::div, Assoc::Left))
        .op(Op::prefix(Rule::neg) | Op::prefix(Rule::pos))
        .op(Op::infix(Rule::pow, Assoc::Right))
});

/// Result of an expression: formatting functions yield text
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    fn number(&self) -> Result<f64, MathError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Text(s) => Err(MathError::NotANumber(s.clone())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip form; integers carry no fraction and `-0` prints as `0`.
///
/// Magnitudes of at least 1e21 or below 1e-6 use exponent notation with an
/// explicit sign, e.g. `1e+21` and `1.5e-7`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    n.to_string()
}

/// Evaluate a restricted arithmetic expression.
pub fn evaluate(input: &str) -> Result<Value, MathError> {
    let mut pairs = MathParser::parse(Rule::formula, input).map_err(Box::new)?;
    let expr = pairs
        .next()
        .ok_or_else(|| MathError::NotANumber(input.to_string()))?;
    match eval_expr(expr.into_inner())? {
        Value::Number(n) if !n.is_finite() => Err(MathError::NonFinite),
        value => Ok(value),
    }
}

fn eval_expr(pairs: Pairs<Rule>) -> Result<Value, MathError> {
    PRATT
        .map_primary(|primary| match primary.as_rule() {
            Rule::number => primary
                .as_str()
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| MathError::NotANumber(primary.as_str().to_string())),
            Rule::call => eval_call(primary),
            Rule::expr => eval_expr(primary.into_inner()),
            _ => Err(MathError::UnknownVariable(primary.as_str().to_string())),
        })
        .map_prefix(|op, rhs| {
            let rhs = rhs?.number()?;
            Ok(Value::Number(match op.as_rule() {
                Rule::neg => -rhs,
                _ => rhs,
            }))
        })
        .map_infix(|lhs, op, rhs| {
            let (lhs, rhs) = (lhs?.number()?, rhs?.number()?);
            Ok(Value::Number(match op.as_rule() {
                Rule::add => lhs + rhs,
                Rule::sub => lhs - rhs,
                Rule::mul => lhs * rhs,
                Rule::div => lhs / rhs,
                _ => lhs.powf(rhs),
            }))
        })
        .parse(pairs)
}

fn eval_call(pair: Pair<Rule>) -> Result<Value, MathError> {
    let mut inner = pair.into_inner();
    let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
    let args = inner
        .next()
        .map(|args| {
            args.into_inner()
                .map(|arg| eval_expr(arg.into_inner()))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();
    call_function(name, args)
}

/// Names callable from an expression; anything else is rejected
const FUNCTIONS: &[&str] = &[
    "round",
    "floor",
    "ceil",
    "abs",
    "sign",
    "signed",
    "toRomans",
    "toRomansUpper",
    "toRomansLower",
    "toChar",
    "toCharUpper",
    "toCharLower",
    "toWords",
    "toWordsUpper",
    "toWordsLower",
    "toWordsCaps",
];

fn call_function(name: &str, args: Vec<Value>) -> Result<Value, MathError> {
    if !FUNCTIONS.contains(&name) {
        return Err(MathError::UnknownFunction(name.to_string()));
    }
    let [arg] = <[Value; 1]>::try_from(args).map_err(|args| MathError::Arity {
        name: name.to_string(),
        expected: 1,
        found: args.len(),
    })?;
    let x = arg.number()?;

    let value = match name {
        "round" => Value::Number(js_round(x)),
        "floor" => Value::Number(x.floor()),
        "ceil" => Value::Number(x.ceil()),
        "abs" => Value::Number(x.abs()),
        "sign" => Value::Text(if x >= 0.0 { "+" } else { "-" }.to_string()),
        "signed" if x >= 0.0 => Value::Text(format!("+{}", format_number(x))),
        "signed" => Value::Text(format_number(x)),
        "toRomans" | "toRomansLower" => Value::Text(numbers::to_roman(x)?.to_lowercase()),
        "toRomansUpper" => Value::Text(numbers::to_roman(x)?),
        "toChar" | "toCharUpper" | "toCharLower" if x <= 0.0 => Value::Number(x),
        "toChar" | "toCharUpper" => Value::Text(numbers::to_alpha(x)?),
        "toCharLower" => Value::Text(numbers::to_alpha(x)?.to_lowercase()),
        "toWords" | "toWordsLower" => Value::Text(numbers::to_words(x)?),
        "toWordsUpper" => Value::Text(numbers::to_words(x)?.to_uppercase()),
        "toWordsCaps" => Value::Text(numbers::capitalize_words(&numbers::to_words(x)?)),
        _ => return Err(MathError::UnknownFunction(name.to_string())),
    };
    Ok(value)
}

/// Round half toward positive infinity
fn js_round(x: f64) -> f64 {
    (x + 0.5).floor()
}
