//! Deterministic expression evaluator behind the `Math` capability.
//!
//! Expressions combine numeric and string literals, variables bound to
//! scalars or finite sets, set literals, the four arithmetic operators and a
//! small vocabulary of one-argument functions:
//!
//! | Function  | Empty set       | Notes                                   |
//! |-----------|-----------------|-----------------------------------------|
//! | `count`   | `0`             | Never inspects element types            |
//! | `sum`     | `0`             | Elements coerced to numbers             |
//! | `average` | `EmptyDomain`   | Elements coerced to numbers             |
//! | `max`     | `EmptyDomain`   | Elements coerced to numbers             |
//! | `min`     | `EmptyDomain`   | Elements coerced to numbers             |
//! | `abs`     | empty set       | Element-wise; non-numeric text kept     |
//!
//! Evaluation is pure: the same expression and bindings always give the same
//! value, and any failure aborts the whole evaluation. Expressions nested
//! deeper than [`MAX_DEPTH`] are rejected as syntax errors.

mod executor;
mod lexer;
mod parser;
mod value;

use std::collections::HashMap;

use reasoner_core::{Error, Result};

pub use executor::MathExecutor;
pub use parser::{parse, BinaryOp, Expr, Function, MAX_DEPTH};
pub use value::{FiniteSet, MathValue, Scalar};

/// Variable name to value.
pub type Bindings = HashMap<String, MathValue>;

/// Parse and evaluate `expression` against `bindings`.
pub fn evaluate(expression: &str, bindings: &Bindings) -> Result<MathValue> {
    let expr = parse(expression)?;
    eval(&expr, bindings)
}

/// Evaluate an already parsed expression.
pub fn eval(expr: &Expr, bindings: &Bindings) -> Result<MathValue> {
    match expr {
        Expr::Number(n) => Ok(MathValue::number(*n)),
        Expr::Str(s) => Ok(MathValue::text(s.clone())),
        Expr::Var(name) => bindings
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnboundVariable(name.clone())),
        Expr::Set(elements) => {
            let mut set = FiniteSet::new();
            for element in elements {
                // Nested sets are flattened into the enclosing literal.
                for scalar in eval(element, bindings)?.into_set() {
                    set.insert(scalar);
                }
            }
            Ok(MathValue::Set(set))
        }
        Expr::Negate(inner) => Ok(MathValue::number(-eval(inner, bindings)?.to_operand()?)),
        Expr::Positive(inner) => Ok(MathValue::number(eval(inner, bindings)?.to_operand()?)),
        Expr::Binary(op, lhs, rhs) => {
            let a = eval(lhs, bindings)?.to_operand()?;
            let b = eval(rhs, bindings)?.to_operand()?;
            let n = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(Error::DivisionByZero);
                    }
                    a / b
                }
            };
            Ok(MathValue::number(n))
        }
        Expr::Call(function, argument) => apply(*function, eval(argument, bindings)?),
    }
}

fn apply(function: Function, argument: MathValue) -> Result<MathValue> {
    if function == Function::Abs {
        return Ok(abs(argument));
    }

    let set = argument.into_set();
    if function == Function::Count {
        return Ok(MathValue::number(set.len() as f64));
    }

    let numbers = set
        .iter()
        .map(|s| s.coerce(function.name()))
        .collect::<Result<Vec<f64>>>()?;

    if numbers.is_empty() {
        return match function {
            Function::Sum => Ok(MathValue::number(0.0)),
            _ => Err(Error::EmptyDomain(function.name().to_string())),
        };
    }

    let n = match function {
        Function::Sum => numbers.iter().sum(),
        Function::Average => numbers.iter().sum::<f64>() / numbers.len() as f64,
        Function::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Function::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        Function::Count | Function::Abs => unreachable!("handled above"),
    };
    Ok(MathValue::number(n))
}

fn abs(argument: MathValue) -> MathValue {
    fn abs_scalar(scalar: Scalar) -> Scalar {
        match scalar.as_number() {
            Some(n) => Scalar::Number(n.abs()),
            None => scalar,
        }
    }

    match argument {
        MathValue::Scalar(s) => MathValue::Scalar(abs_scalar(s)),
        MathValue::Set(set) => MathValue::Set(set.into_iter().map(abs_scalar).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn texts(items: &[&str]) -> MathValue {
        MathValue::set(items.iter().map(|s| Scalar::Text(s.to_string())))
    }

    fn numbers(items: &[f64]) -> MathValue {
        MathValue::set(items.iter().map(|n| Scalar::Number(*n)))
    }

    fn bindings(pairs: Vec<(&str, MathValue)>) -> Bindings {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_count_plus_constant() {
        let b = bindings(vec![("A", texts(&["x", "y", "z", "w", "v"]))]);
        assert_eq!(evaluate("count(A) + 100", &b).unwrap().to_json(), json!(105));
    }

    #[test]
    fn test_empty_domain() {
        let b = bindings(vec![("A", MathValue::Set(FiniteSet::new()))]);
        for f in ["average", "max", "min"] {
            assert!(matches!(
                evaluate(&format!("{}(A)", f), &b),
                Err(Error::EmptyDomain(name)) if name == f
            ));
        }
        assert_eq!(evaluate("count(A)", &b).unwrap(), MathValue::number(0.0));
        assert_eq!(evaluate("sum(A)", &b).unwrap(), MathValue::number(0.0));
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(
            evaluate(&deep, &Bindings::new()),
            Err(Error::ExpressionSyntax { .. })
        ));
        let negated = format!("{}5", "-".repeat(100));
        assert_eq!(evaluate(&negated, &Bindings::new()).unwrap().to_json(), json!(5));
    }

    #[test]
    fn test_unsupported_function() {
        let b = bindings(vec![("A", numbers(&[1.0, 2.0]))]);
        assert!(matches!(
            evaluate("unknownfn(A)", &b),
            Err(Error::UnsupportedFunction(name)) if name == "unknownfn"
        ));
    }

    #[test]
    fn test_aggregates() {
        let b = bindings(vec![
            ("A", numbers(&[4.0, -2.0, 10.0])),
            ("S", MathValue::set(vec![Scalar::Text("3".into()), Scalar::Number(5.0)])),
        ]);
        assert_eq!(evaluate("sum(A)", &b).unwrap(), MathValue::number(12.0));
        assert_eq!(evaluate("Average(A)", &b).unwrap(), MathValue::number(4.0));
        assert_eq!(evaluate("max(A) - min(A)", &b).unwrap(), MathValue::number(12.0));
        assert_eq!(evaluate("sum(S)", &b).unwrap(), MathValue::number(8.0));
        assert_eq!(evaluate("max(7)", &b).unwrap(), MathValue::number(7.0));
    }

    #[test]
    fn test_aggregate_rejects_text() {
        let b = bindings(vec![("A", texts(&["x", "y"]))]);
        assert!(matches!(evaluate("sum(A)", &b), Err(Error::TypeMismatch(_))));
        assert_eq!(evaluate("count(A)", &b).unwrap(), MathValue::number(2.0));
    }

    #[test]
    fn test_abs_elementwise() {
        let b = bindings(vec![(
            "A",
            MathValue::set(vec![
                Scalar::Number(-3.0),
                Scalar::Text("name".into()),
                Scalar::Number(3.0),
                Scalar::Number(-1.5),
            ]),
        )]);
        assert_eq!(
            evaluate("abs(A)", &b).unwrap().to_json(),
            json!([3, "name", 1.5])
        );
        assert_eq!(evaluate("abs(-4)", &b).unwrap(), MathValue::number(4.0));
    }

    #[test]
    fn test_arithmetic_errors() {
        let b = bindings(vec![("A", numbers(&[1.0, 2.0])), ("one", numbers(&[6.0]))]);
        assert!(matches!(evaluate("1 / (2 - 2)", &b), Err(Error::DivisionByZero)));
        assert!(matches!(evaluate("A + 1", &b), Err(Error::TypeMismatch(_))));
        assert!(matches!(evaluate("'abc' * 2", &b), Err(Error::TypeMismatch(_))));
        assert!(matches!(
            evaluate("missing + 1", &b),
            Err(Error::UnboundVariable(name)) if name == "missing"
        ));
        assert_eq!(evaluate("one * 2", &b).unwrap(), MathValue::number(12.0));
    }

    #[test]
    fn test_unary_and_grouping() {
        let b = Bindings::new();
        assert_eq!(evaluate("-(2 + 3) * 2", &b).unwrap(), MathValue::number(-10.0));
        assert_eq!(evaluate("--4", &b).unwrap(), MathValue::number(4.0));
        assert_eq!(evaluate("30 + 6 + '4'", &b).unwrap().to_json(), json!(40));
        assert_eq!(evaluate("7 / 2", &b).unwrap().to_json(), json!(3.5));
    }

    #[test]
    fn test_set_literals_dedupe_and_flatten() {
        let b = bindings(vec![("A", numbers(&[1.0, 2.0]))]);
        assert_eq!(evaluate("count({1, 1, 2})", &b).unwrap(), MathValue::number(2.0));
        assert_eq!(
            evaluate("{A, 3, 2}", &b).unwrap().to_json(),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn test_dotted_identifiers() {
        let b = bindings(vec![("film.cast", texts(&["a", "b"]))]);
        assert_eq!(evaluate("count(film.cast)", &b).unwrap(), MathValue::number(2.0));
    }
}
