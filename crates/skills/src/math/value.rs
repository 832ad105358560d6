//! Runtime values of the expression evaluator.

use serde_json::{Number, Value};
use std::fmt;

use reasoner_core::{render_value, Error, Result};

/// A single number or piece of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view, parsing numeric text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    pub(crate) fn coerce(&self, context: &str) -> Result<f64> {
        self.as_number().ok_or_else(|| {
            Error::type_mismatch(format!("{} expects numbers, got text '{}'", context, self))
        })
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(Self::Number)
                .unwrap_or_else(|| Self::Text(n.to_string())),
            other => Self::Text(render_value(other)),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => number_to_json(*n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered collection of distinct scalars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiniteSet {
    elements: Vec<Scalar>,
}

impl FiniteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless an equal element is already present.
    pub fn insert(&mut self, element: Scalar) -> bool {
        if self.elements.contains(&element) {
            return false;
        }
        self.elements.push(element);
        true
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scalar> {
        self.elements.iter()
    }
}

impl FromIterator<Scalar> for FiniteSet {
    fn from_iter<I: IntoIterator<Item = Scalar>>(iter: I) -> Self {
        let mut set = FiniteSet::new();
        for element in iter {
            set.insert(element);
        }
        set
    }
}

impl IntoIterator for FiniteSet {
    type Item = Scalar;
    type IntoIter = std::vec::IntoIter<Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

/// Value bound to a variable or produced by an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum MathValue {
    Scalar(Scalar),
    Set(FiniteSet),
}

impl MathValue {
    pub fn number(n: f64) -> Self {
        Self::Scalar(Scalar::Number(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Text(s.into()))
    }

    pub fn set(elements: impl IntoIterator<Item = Scalar>) -> Self {
        Self::Set(elements.into_iter().collect())
    }

    /// Numeric value for arithmetic. Singleton sets are unwrapped.
    pub(crate) fn to_operand(&self) -> Result<f64> {
        match self {
            Self::Scalar(s) => s.coerce("arithmetic"),
            Self::Set(set) if set.len() == 1 => set.elements[0].coerce("arithmetic"),
            Self::Set(set) => Err(Error::type_mismatch(format!(
                "arithmetic on a set of {} elements",
                set.len()
            ))),
        }
    }

    /// Elements seen by an aggregate. Scalars become singletons.
    pub(crate) fn into_set(self) -> FiniteSet {
        match self {
            Self::Scalar(s) => std::iter::once(s).collect(),
            Self::Set(set) => set,
        }
    }

    /// Convert a JSON value: arrays become sets, everything else a scalar.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Set(items.iter().map(Scalar::from_json).collect()),
            other => Self::Scalar(Scalar::from_json(other)),
        }
    }

    /// Convert back to JSON. Integral numbers become JSON integers.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(s) => s.to_json(),
            Self::Set(set) => Value::Array(set.iter().map(Scalar::to_json).collect()),
        }
    }
}

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}
