//! Thresholds used to condition verification pairs
//!
//! A threshold combines a logical [`Operator`] with real values, probabilities, or
//! both. A threshold with both is a quantile: the real value is the climatological
//! quantile at the given probability.
//!
//! # Example
//!
//! ```rust
//! use hydroverify::threshold::{Operator, Threshold};
//!
//! let flood = Threshold::value(Operator::GreaterEqual, 1.0).unwrap();
//! assert!(flood.test(1.5));
//! assert!(!flood.test(0.5));
//! assert_eq!(flood.to_string(), ">= 1");
//!
//! assert!(Threshold::all_data().test(f64::MIN));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::DataError;

/// Tolerance applied by [`Operator::Equal`]
const EQUALITY_TOLERANCE: f64 = 1e-8;

/// Logical condition of a threshold
///
/// The declaration order is the ordering used for thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    /// Strictly less than
    Less,
    /// Strictly greater than
    Greater,
    /// Less than or equal
    LessEqual,
    /// Greater than or equal
    GreaterEqual,
    /// Equal within a small tolerance
    Equal,
    /// Half-open interval `[lower, upper)`
    Between,
}

impl Operator {
    /// Symbol used in display strings
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Equal => "=",
            Operator::Between => ">= && <",
        }
    }
}

/// Lower bound plus the upper bound of a between condition
#[derive(Debug, Clone, Copy)]
struct Bounds {
    lower: f64,
    upper: Option<f64>,
}

impl Bounds {
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.lower.total_cmp(&other.lower).then_with(|| match (self.upper, other.upper) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (a, b) => a.is_some().cmp(&b.is_some()),
        })
    }

    fn hash_bits<H: Hasher>(&self, state: &mut H) {
        self.lower.to_bits().hash(state);
        self.upper.map(f64::to_bits).hash(state);
    }

    fn is_finite(&self) -> bool {
        self.lower.is_finite() && self.upper.map_or(true, f64::is_finite)
    }
}

/// A threshold condition
///
/// Equality, ordering and hashing compare floating-point bounds by their total order,
/// so thresholds can key ordered and hashed maps.
#[derive(Debug, Clone)]
pub struct Threshold {
    operator: Operator,
    values: Option<Bounds>,
    probabilities: Option<Bounds>,
    label: Option<Arc<str>>,
}

impl Threshold {
    /// Start a builder for the given operator
    pub fn builder(operator: Operator) -> ThresholdBuilder {
        ThresholdBuilder {
            operator,
            values: None,
            probabilities: None,
            label: None,
        }
    }

    /// One-sided threshold on a real value
    pub fn value(operator: Operator, value: f64) -> Result<Self, DataError> {
        Self::builder(operator).values(value, None).build()
    }

    /// One-sided threshold on a probability
    pub fn probability(operator: Operator, probability: f64) -> Result<Self, DataError> {
        Self::builder(operator).probabilities(probability, None).build()
    }

    /// One-sided quantile threshold: a real value with the probability it corresponds to
    pub fn quantile(operator: Operator, value: f64, probability: f64) -> Result<Self, DataError> {
        Self::builder(operator)
            .values(value, None)
            .probabilities(probability, None)
            .build()
    }

    /// Two-sided threshold `[lower, upper)` on real values
    pub fn between_values(lower: f64, upper: f64) -> Result<Self, DataError> {
        Self::builder(Operator::Between)
            .values(lower, Some(upper))
            .build()
    }

    /// Two-sided threshold `[lower, upper)` on probabilities
    pub fn between_probabilities(lower: f64, upper: f64) -> Result<Self, DataError> {
        Self::builder(Operator::Between)
            .probabilities(lower, Some(upper))
            .build()
    }

    /// Threshold that admits every value: `> -inf`
    pub fn all_data() -> Self {
        Self {
            operator: Operator::Greater,
            values: Some(Bounds {
                lower: f64::NEG_INFINITY,
                upper: None,
            }),
            probabilities: None,
            label: None,
        }
    }

    /// Copy of this threshold carrying a label
    ///
    /// # Errors
    ///
    /// Non-finite thresholds cannot be labelled.
    pub fn with_label(self, label: impl Into<Arc<str>>) -> Result<Self, DataError> {
        ThresholdBuilder {
            operator: self.operator,
            values: self.values,
            probabilities: self.probabilities,
            label: None,
        }
        .label(label)
        .build()
    }

    /// Logical condition
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Lower (or only) real value
    pub fn lower_value(&self) -> Option<f64> {
        self.values.map(|b| b.lower)
    }

    /// Upper real value of a between condition
    pub fn upper_value(&self) -> Option<f64> {
        self.values.and_then(|b| b.upper)
    }

    /// Lower (or only) probability
    pub fn lower_probability(&self) -> Option<f64> {
        self.probabilities.map(|b| b.lower)
    }

    /// Upper probability of a between condition
    pub fn upper_probability(&self) -> Option<f64> {
        self.probabilities.and_then(|b| b.upper)
    }

    /// Optional label
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether real values are defined
    pub fn has_values(&self) -> bool {
        self.values.is_some()
    }

    /// Whether probabilities are defined
    pub fn has_probabilities(&self) -> bool {
        self.probabilities.is_some()
    }

    /// Both real values and probabilities are defined
    pub fn is_quantile(&self) -> bool {
        self.has_values() && self.has_probabilities()
    }

    /// Every defined bound is finite
    pub fn is_finite(&self) -> bool {
        self.values.map_or(true, |b| b.is_finite())
            && self.probabilities.map_or(true, |b| b.is_finite())
    }

    /// The `> -inf` threshold that admits every value
    pub fn is_all_data(&self) -> bool {
        self.operator == Operator::Greater
            && (self.lower_value() == Some(f64::NEG_INFINITY)
                || self.lower_probability() == Some(f64::NEG_INFINITY))
    }

    /// Apply the condition to a value
    ///
    /// Real values are canonical: probabilities are only tested when no real value
    /// is defined.
    pub fn test(&self, value: f64) -> bool {
        let Some(bounds) = self.values.or(self.probabilities) else {
            return false;
        };
        let lower = bounds.lower;

        match self.operator {
            Operator::Greater => value > lower,
            Operator::Less => value < lower,
            Operator::GreaterEqual => value >= lower,
            Operator::LessEqual => value <= lower,
            Operator::Between => value >= lower && bounds.upper.map_or(false, |upper| value < upper),
            Operator::Equal => (value - lower).abs() < EQUALITY_TOLERANCE,
        }
    }

    /// Display string with operators and whitespace replaced, suitable for file names
    pub fn to_safe_string(&self) -> String {
        self.to_string()
            .replace(">=", "GTE")
            .replace("<=", "LTE")
            .replace('>', "GT")
            .replace('<', "LT")
            .replace("Pr = ", "Pr=")
            .replace("Pr ", "Pr_")
            .replace(' ', "_")
            .replace(['[', ']', '(', ')'], "")
    }
}

impl PartialEq for Threshold {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Threshold {}

impl PartialOrd for Threshold {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Threshold {
    fn cmp(&self, other: &Self) -> Ordering {
        self.operator
            .cmp(&other.operator)
            .then_with(|| self.has_values().cmp(&other.has_values()))
            .then_with(|| self.has_probabilities().cmp(&other.has_probabilities()))
            .then_with(|| self.label.is_some().cmp(&other.label.is_some()))
            .then_with(|| match (&self.values, &other.values) {
                (Some(a), Some(b)) => a.total_cmp(b),
                _ => Ordering::Equal,
            })
            .then_with(|| match (&self.probabilities, &other.probabilities) {
                (Some(a), Some(b)) => a.total_cmp(b),
                _ => Ordering::Equal,
            })
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl Hash for Threshold {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.operator.hash(state);
        if let Some(values) = &self.values {
            values.hash_bits(state);
        }
        if let Some(probabilities) = &self.probabilities {
            probabilities.hash_bits(state);
        }
        self.label.hash(state);
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all_data() {
            return f.write_str("All data");
        }

        let symbol = self.operator.symbol();
        match (&self.values, &self.probabilities) {
            (Some(v), Some(p)) => match (v.upper, p.upper) {
                (Some(vu), Some(pu)) => write!(
                    f,
                    ">= {} [Pr = {}] && < {} [Pr = {}]",
                    v.lower, p.lower, vu, pu
                )?,
                _ => write!(f, "{} {} [Pr = {}]", symbol, v.lower, p.lower)?,
            },
            (Some(v), None) => match v.upper {
                Some(upper) => write!(f, ">= {} && < {}", v.lower, upper)?,
                None => write!(f, "{} {}", symbol, v.lower)?,
            },
            (None, Some(p)) => match p.upper {
                Some(upper) => write!(f, "Pr >= {} && < {}", p.lower, upper)?,
                None => write!(f, "Pr {} {}", symbol, p.lower)?,
            },
            (None, None) => f.write_str(symbol)?,
        }

        if let Some(label) = &self.label {
            write!(f, " ({})", label)?;
        }
        Ok(())
    }
}

/// Builder for [`Threshold`]
#[derive(Debug, Clone)]
pub struct ThresholdBuilder {
    operator: Operator,
    values: Option<Bounds>,
    probabilities: Option<Bounds>,
    label: Option<Arc<str>>,
}

impl ThresholdBuilder {
    /// Real value bounds; `upper` only for a between condition
    pub fn values(mut self, lower: f64, upper: Option<f64>) -> Self {
        self.values = Some(Bounds { lower, upper });
        self
    }

    /// Probability bounds; `upper` only for a between condition
    pub fn probabilities(mut self, lower: f64, upper: Option<f64>) -> Self {
        self.probabilities = Some(Bounds { lower, upper });
        self
    }

    /// Label
    pub fn label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<Threshold, DataError> {
        if self.values.is_none() && self.probabilities.is_none() {
            return Err(DataError::InvalidThreshold(
                "specify one or more values for the threshold".to_string(),
            ));
        }

        if let Some(p) = self.probabilities {
            if p.lower != f64::NEG_INFINITY && !(0.0..=1.0).contains(&p.lower) {
                return Err(DataError::InvalidThreshold(format!(
                    "the threshold probability is out of bounds [0,1]: {}",
                    p.lower
                )));
            }
            if let Some(upper) = p.upper {
                if upper != f64::INFINITY && upper > 1.0 {
                    return Err(DataError::InvalidThreshold(format!(
                        "the upper threshold probability is out of bounds [0,1]: {}",
                        upper
                    )));
                }
            }
        }

        let between = self.operator == Operator::Between;
        for (name, bounds) in [("value", &self.values), ("probability", &self.probabilities)] {
            let Some(b) = bounds else { continue };
            match (between, b.upper) {
                (true, None) => {
                    return Err(DataError::InvalidThreshold(format!(
                        "a between condition requires an upper {name}"
                    )))
                },
                (false, Some(_)) => {
                    return Err(DataError::InvalidThreshold(format!(
                        "an upper {name} requires a between condition"
                    )))
                },
                (true, Some(upper)) if upper <= b.lower => {
                    return Err(DataError::InvalidThreshold(format!(
                        "the upper {name} must be greater than the lower {name}: [{},{}]",
                        b.lower, upper
                    )))
                },
                _ => {},
            }
        }

        let threshold = Threshold {
            operator: self.operator,
            values: self.values,
            probabilities: self.probabilities,
            label: self.label,
        };

        if !threshold.is_finite() && threshold.label.is_some() {
            return Err(DataError::InvalidThreshold(
                "cannot label a non-finite threshold".to_string(),
            ));
        }
        Ok(threshold)
    }
}
