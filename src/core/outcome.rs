//! Tagged results for pipeline stages that can degrade instead of failing.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage a degradation originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Seasonal linear model.
    Linear,
    /// Sequence learner over linear residuals.
    Residual,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Linear => write!(f, "linear"),
            Stage::Residual => write!(f, "residual"),
        }
    }
}

/// A recoverable problem that replaced part of a result with a placeholder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Degradation {
    /// The stage had too little data to fit or predict.
    #[error("{stage} stage: insufficient data (need {needed}, got {got})")]
    InsufficientData {
        stage: Stage,
        needed: usize,
        got: usize,
    },

    /// Fitting did not produce a usable model.
    #[error("{stage} stage: fit failed: {reason}")]
    FitFailed { stage: Stage, reason: String },

    /// Prediction produced an unusable result and was replaced.
    #[error("{stage} stage: inference failed: {reason}")]
    InferenceFailed { stage: Stage, reason: String },

    /// The stage is not fitted, so its contribution is neutral.
    #[error("{stage} stage: not fitted")]
    Unfitted { stage: Stage },
}

impl Degradation {
    /// Stage this degradation belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Degradation::InsufficientData { stage, .. }
            | Degradation::FitFailed { stage, .. }
            | Degradation::InferenceFailed { stage, .. }
            | Degradation::Unfitted { stage } => *stage,
        }
    }
}

/// A value that is either complete or a degraded placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(T),
    Degraded { value: T, reason: Degradation },
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: Degradation) -> Self {
        Outcome::Degraded { value, reason }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete(_))
    }

    pub fn is_degraded(&self) -> bool {
        !self.is_complete()
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    /// The degradation, if any.
    pub fn reason(&self) -> Option<&Degradation> {
        match self {
            Outcome::Complete(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    /// Split into the value and the optional degradation.
    pub fn into_parts(self) -> (T, Option<Degradation>) {
        match self {
            Outcome::Complete(value) => (value, None),
            Outcome::Degraded { value, reason } => (value, Some(reason)),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Complete(value) => Outcome::Complete(f(value)),
            Outcome::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}
