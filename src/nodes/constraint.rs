//! Numeric bounds and stepping for editable properties

use serde::{Deserialize, Serialize};

/// One side of a numeric range
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Bound {
    #[default]
    Unbounded,
    Inclusive(f64),
    Exclusive(f64),
}

/// How a slide or nudge changes the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepKind {
    /// new = old ± step
    #[default]
    Add,
    /// new = old × step or old ÷ step
    Multiply,
}

/// Bounds, stepping and integer flag attached to a numeric property.
///
/// When `clamp` is false the bounds are hints for editors only and
/// [`ValueConstraint::check`] accepts anything finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueConstraint {
    pub min: Bound,
    pub max: Bound,
    pub clamp: bool,
    pub integer: bool,
    pub step: f64,
    pub step_kind: StepKind,
}

impl Default for ValueConstraint {
    fn default() -> Self {
        Self {
            min: Bound::Unbounded,
            max: Bound::Unbounded,
            clamp: true,
            integer: false,
            step: 1.0,
            step_kind: StepKind::Add,
        }
    }
}

impl ValueConstraint {
    /// Parse a single range like `[0 .. 1]`, `( .. 0]` or `[.1 .. ]`.
    /// Square brackets are inclusive, parentheses exclusive, an empty side
    /// is unbounded.
    pub fn parse_range(text: &str) -> Option<ValueConstraint> {
        let text = text.trim();
        let mut chars = text.chars();
        let open = chars.next()?;
        let close = chars.next_back()?;
        let body = chars.as_str();
        let (low, high) = body.split_once("..")?;

        let side = |raw: &str, inclusive: bool| -> Option<Bound> {
            let raw = raw.trim();
            if raw.is_empty() {
                return Some(Bound::Unbounded);
            }
            let v = raw.parse::<f64>().ok()?;
            Some(if inclusive {
                Bound::Inclusive(v)
            } else {
                Bound::Exclusive(v)
            })
        };

        let min = match open {
            '[' => side(low, true)?,
            '(' => side(low, false)?,
            _ => return None,
        };
        let max = match close {
            ']' => side(high, true)?,
            ')' => side(high, false)?,
            _ => return None,
        };

        Some(ValueConstraint {
            min,
            max,
            ..Default::default()
        })
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn hint_only(mut self) -> Self {
        self.clamp = false;
        self
    }

    pub fn with_step(mut self, step: f64, kind: StepKind) -> Self {
        self.step = step;
        self.step_kind = kind;
        self
    }

    /// Validate `value`, correcting it when possible. Inclusive bounds clamp,
    /// exclusive bounds cannot be corrected and reject the value.
    pub fn check(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let mut v = if self.integer { value.round() } else { value };
        if !self.clamp {
            return Some(v);
        }

        match self.min {
            Bound::Inclusive(min) if v < min => v = min,
            Bound::Exclusive(min) if v <= min => return None,
            _ => {}
        }
        match self.max {
            Bound::Inclusive(max) if v > max => v = max,
            Bound::Exclusive(max) if v >= max => return None,
            _ => {}
        }
        Some(v)
    }

    /// Move `value` by `steps` steps (negative steps go down). A result
    /// that cannot be corrected leaves the value where it was.
    pub fn nudge(&self, value: f64, steps: i32) -> f64 {
        let next = match self.step_kind {
            StepKind::Add => value + self.step * steps as f64,
            StepKind::Multiply => value * self.step.powi(steps),
        };
        self.check(next).unwrap_or(value)
    }
}
