//! The metric capability.
//!
//! Anything that can take an [`LLMTestCase`] and produce a scored, explained
//! result is a metric - no base class, no registration, just the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::test_case::LLMTestCase;

/// Outcome of measuring one test case with one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Score in `[0, 1]`
    pub score: f64,
    /// Whether the score clears the metric's threshold
    pub success: bool,
    /// Human-readable explanation of the score. Never empty.
    pub reason: String,
}

impl MetricResult {
    /// Build a result, deriving `success` from a higher-is-better threshold.
    #[must_use]
    pub fn scored(score: f64, threshold: f64, reason: String) -> Self {
        Self {
            score,
            success: score >= threshold,
            reason,
        }
    }

    /// Build a result for a lower-is-better metric (bias, toxicity).
    #[must_use]
    pub fn scored_lower_is_better(score: f64, threshold: f64, reason: String) -> Self {
        Self {
            score,
            success: score <= threshold,
            reason,
        }
    }
}

/// An evaluation metric.
///
/// Implementations judge a test case and return a [`MetricResult`]; any
/// stage failure (contract violation, judge failure, timeout) propagates as
/// an error - a failed evaluation never yields a partial score.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use evalflow::error::Result;
/// use evalflow::metric::{Metric, MetricResult};
/// use evalflow::test_case::LLMTestCase;
///
/// struct LengthMetric {
///     threshold: f64,
/// }
///
/// #[async_trait]
/// impl Metric for LengthMetric {
///     async fn measure(&self, test_case: &LLMTestCase) -> Result<MetricResult> {
///         let score = (test_case.actual_output.len() as f64 / 100.0).min(1.0);
///         Ok(MetricResult::scored(score, self.threshold, "length check".to_string()))
///     }
///
///     fn name(&self) -> &str {
///         "length"
///     }
///
///     fn threshold(&self) -> f64 {
///         self.threshold
///     }
/// }
/// ```
#[async_trait]
pub trait Metric: Send + Sync {
    /// Score the test case. Errors are terminal for this test case.
    async fn measure(&self, test_case: &LLMTestCase) -> Result<MetricResult>;

    /// Metric name, for logs and reports.
    fn name(&self) -> &str;

    /// The configured success threshold.
    fn threshold(&self) -> f64;
}
