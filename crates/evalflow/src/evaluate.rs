//! Batch evaluation runner.
//!
//! Runs many test cases against a set of metrics with bounded concurrency.
//! Evaluations share no mutable state - each test case gets its own
//! pipeline run - so parallelism needs no synchronization beyond the
//! concurrency bound itself.
//!
//! A metric failure (contract violation, judge failure, timeout) is recorded
//! verbatim on that test case's outcome. It is never converted into a
//! degraded score.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::metric::{Metric, MetricResult};
use crate::test_case::LLMTestCase;

/// Configuration for a batch evaluation run.
///
/// Explicit and passed in - there is no process-wide evaluation state.
/// Per-judge-call timeouts are configured on the metrics themselves
/// (`with_judge_timeout`).
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Maximum number of test cases evaluated in parallel
    pub max_concurrency: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { max_concurrency: 5 }
    }
}

impl EvalConfig {
    /// Set the number of test cases evaluated in parallel.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }
}

/// One metric's outcome on one test case: a result or an error, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricOutcome {
    /// Metric name
    pub metric: String,
    /// The scored result, if the pipeline completed
    pub result: Option<MetricResult>,
    /// The terminal error, if it did not
    pub error: Option<String>,
}

impl MetricOutcome {
    /// True if the metric completed and cleared its threshold.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.success)
    }
}

/// All metric outcomes for one test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResult {
    /// The input of the evaluated test case
    pub input: String,
    /// One outcome per metric, in metric order
    pub outcomes: Vec<MetricOutcome>,
}

impl TestCaseResult {
    /// True if every metric completed and passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(MetricOutcome::passed)
    }

    /// True if any metric ended in an error.
    #[must_use]
    pub fn errored(&self) -> bool {
        self.outcomes.iter().any(|o| o.error.is_some())
    }
}

/// Report for a batch evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Per-case results, in input order
    pub results: Vec<TestCaseResult>,
    /// Number of test cases where every metric passed
    pub passed: usize,
    /// Number of test cases where some metric completed below threshold
    pub failed: usize,
    /// Number of test cases where some metric ended in an error
    pub errored: usize,
}

impl EvalReport {
    /// Total number of evaluated test cases.
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Fraction of test cases that passed, 0.0 for an empty run.
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.passed as f64 / self.results.len() as f64
    }
}

/// Evaluate every test case with every metric.
///
/// Test cases run concurrently up to `config.max_concurrency`; the metrics
/// for a single test case run sequentially. Results come back in input
/// order regardless of completion order.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use evalflow::evaluate::{evaluate, EvalConfig};
/// use evalflow::metric::Metric;
/// use evalflow::metrics::AnswerRelevancyMetric;
/// use evalflow::test_case::LLMTestCase;
/// # async fn example(judge: Arc<dyn evalflow::judge::JudgeModel>) {
/// let metrics: Vec<Arc<dyn Metric>> =
///     vec![Arc::new(AnswerRelevancyMetric::new(judge).with_threshold(0.7))];
/// let cases = vec![LLMTestCase::new("What is Rust?", "Rust is a systems language.")];
///
/// let report = evaluate(&cases, &metrics, &EvalConfig::default()).await;
/// println!("pass rate: {:.0}%", report.pass_rate() * 100.0);
/// # }
/// ```
pub async fn evaluate(
    test_cases: &[LLMTestCase],
    metrics: &[Arc<dyn Metric>],
    config: &EvalConfig,
) -> EvalReport {
    let started_at = Utc::now();
    let start = Instant::now();

    let mut indexed: Vec<(usize, TestCaseResult)> = stream::iter(test_cases.iter().enumerate())
        .map(|(idx, case)| async move {
            let result = evaluate_case(case, metrics).await;
            (idx, result)
        })
        .buffer_unordered(config.max_concurrency.max(1))
        .collect()
        .await;
    indexed.sort_by_key(|(idx, _)| *idx);
    let results: Vec<TestCaseResult> = indexed.into_iter().map(|(_, r)| r).collect();

    let passed = results.iter().filter(|r| r.passed()).count();
    let errored = results.iter().filter(|r| r.errored()).count();
    let failed = results.len() - passed - errored;

    let report = EvalReport {
        started_at,
        finished_at: Utc::now(),
        duration: start.elapsed(),
        results,
        passed,
        failed,
        errored,
    };
    tracing::info!(
        total = report.total(),
        passed = report.passed,
        failed = report.failed,
        errored = report.errored,
        "evaluation run complete"
    );
    report
}

async fn evaluate_case(case: &LLMTestCase, metrics: &[Arc<dyn Metric>]) -> TestCaseResult {
    let mut outcomes = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let outcome = match metric.measure(case).await {
            Ok(result) => MetricOutcome {
                metric: metric.name().to_string(),
                result: Some(result),
                error: None,
            },
            Err(err) => {
                tracing::warn!(metric = metric.name(), error = %err, "metric errored");
                MetricOutcome {
                    metric: metric.name().to_string(),
                    result: None,
                    error: Some(err.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }
    TestCaseResult {
        input: case.input.clone(),
        outcomes,
    }
}
