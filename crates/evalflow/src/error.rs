//! Error types for evalflow operations
//!
//! Every failure an evaluation can hit maps onto one of a small set of
//! variants so callers can tell apart "the judge answered, but not in the
//! shape the contract demands" ([`EvalError::ContractViolation`]) from "the
//! judge could not be reached at all" ([`EvalError::Judge`]).
//!
//! # Recovery
//!
//! | Variant | Retryable | Recovery |
//! |---------|-----------|----------|
//! | `ContractViolation` | No (within a run) | Inspect the judge output; tighten the model/temperature |
//! | `Judge` | Yes | Retry at the call site, check credentials/network |
//! | `Timeout` | Yes | Raise the metric's `with_judge_timeout`, retry |
//! | `InvalidInput` | No | Fix the test case |
//! | `Configuration` | No | Fix builder parameters |
//!
//! A `ContractViolation` aborts the evaluation of that test case. There is
//! no automatic retry inside the pipeline; retry policy belongs to the
//! judge implementation or the caller.

use thiserror::Error;

/// Result type alias for evalflow operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// The pipeline stage a failure occurred in.
///
/// Carried by [`EvalError::ContractViolation`] and [`EvalError::Timeout`] so
/// reports can say *where* an evaluation died, not just that it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Decomposing the actual output into atomic statements/claims/opinions
    Extraction,
    /// Judging each extracted item against the input
    Classification,
    /// Composing the human-readable explanation for the score
    Synthesis,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Extraction => "extraction",
            Stage::Classification => "classification",
            Stage::Synthesis => "synthesis",
        };
        f.write_str(name)
    }
}

/// Error type for evaluation failures.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EvalError {
    /// The judge model responded, but the response fails schema validation:
    /// not JSON, missing the expected key, a verdict value outside
    /// `{yes, no, idk}`, a verdict/statement count mismatch, or a `no`
    /// verdict without a reason.
    ///
    /// Fatal for the current evaluation. Never coerced into a score.
    #[error("judge contract violation during {stage}: {detail}")]
    ContractViolation {
        /// Pipeline stage whose response failed validation
        stage: Stage,
        /// What exactly was wrong with the response
        detail: String,
    },

    /// The judge model call itself failed (transport error, auth, rate
    /// limit, provider outage). Distinct from [`EvalError::ContractViolation`]
    /// so callers can tell "model refused to answer correctly" from "model
    /// unreachable".
    #[error("judge model failure: {0}")]
    Judge(String),

    /// A judge call exceeded its deadline. Treated as a stage failure,
    /// equivalent in effect to a contract violation.
    #[error("judge call timed out during {stage} after {timeout:?}")]
    Timeout {
        /// Pipeline stage whose judge call timed out
        stage: Stage,
        /// The deadline that was exceeded
        timeout: std::time::Duration,
    },

    /// The test case is missing data the metric requires (e.g. faithfulness
    /// without a retrieval context).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid metric or runner configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EvalError {
    /// Build a contract violation for the given stage.
    pub fn contract(stage: Stage, detail: impl Into<String>) -> Self {
        EvalError::ContractViolation {
            stage,
            detail: detail.into(),
        }
    }

    /// True if this is a schema/contract failure from the judge.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, EvalError::ContractViolation { .. })
    }

    /// True if the judge was unreachable or timed out - the failure is
    /// environmental and the same evaluation may succeed on retry.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, EvalError::Judge(_) | EvalError::Timeout { .. })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_contract_violation_display_names_stage() {
        let err = EvalError::contract(Stage::Classification, "missing 'verdicts' key");
        let msg = err.to_string();
        assert!(msg.contains("classification"));
        assert!(msg.contains("missing 'verdicts' key"));
        assert!(err.is_contract_violation());
        assert!(!err.is_upstream());
    }

    #[test]
    fn test_upstream_classification() {
        assert!(EvalError::Judge("connection refused".into()).is_upstream());
        assert!(EvalError::Timeout {
            stage: Stage::Extraction,
            timeout: Duration::from_secs(30),
        }
        .is_upstream());
        assert!(!EvalError::InvalidInput("empty".into()).is_upstream());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Extraction.to_string(), "extraction");
        assert_eq!(Stage::Classification.to_string(), "classification");
        assert_eq!(Stage::Synthesis.to_string(), "synthesis");
    }
}
