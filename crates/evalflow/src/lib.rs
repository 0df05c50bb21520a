//! # evalflow
//!
//! LLM-output evaluation using the LLM-as-judge pattern: given an input, an
//! actual output, and optionally an expected output and retrieval context,
//! score the output along dimensions such as answer relevancy, faithfulness,
//! bias, and toxicity.
//!
//! # Key Types
//!
//! - [`test_case::LLMTestCase`] - one evaluation scenario
//! - [`metric::Metric`] - the scoring capability: `measure(test case) ->
//!   { score, success, reason }`
//! - [`judge::JudgeModel`] - the single external dependency, a "prompt in,
//!   completion out" capability (OpenAI implementation in `evalflow-openai`,
//!   scripted doubles in `evalflow-testing`)
//! - [`evaluate::evaluate`] - batch runner with bounded concurrency
//!
//! # Contract enforcement
//!
//! Every judge call inside a metric demands a specific JSON shape back and
//! re-verifies it before the next stage runs: expected keys present, verdict
//! values inside the allowed set, one verdict per statement, reasons exactly
//! where the contract puts them. Any deviation is a typed
//! [`error::EvalError::ContractViolation`] that aborts the evaluation of
//! that test case - there are no partial or degraded scores.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use evalflow::metric::Metric;
//! use evalflow::metrics::AnswerRelevancyMetric;
//! use evalflow::test_case::LLMTestCase;
//!
//! # async fn example(judge: Arc<dyn evalflow::judge::JudgeModel>) -> evalflow::error::Result<()> {
//! let metric = AnswerRelevancyMetric::new(judge).with_threshold(0.7);
//!
//! let case = LLMTestCase::new(
//!     "What should I do if there is an earthquake?",
//!     "Duck and hide under a table.",
//! );
//!
//! let result = metric.measure(&case).await?;
//! assert!(result.score >= 0.0 && result.score <= 1.0);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod evaluate;
pub mod judge;
pub mod metric;
pub mod metrics;
pub mod schema;
pub mod test_case;

pub use error::{EvalError, Result, Stage};
pub use evaluate::{evaluate, EvalConfig, EvalReport, MetricOutcome, TestCaseResult};
pub use judge::JudgeModel;
pub use metric::{Metric, MetricResult};
pub use metrics::{AnswerRelevancyMetric, BiasMetric, FaithfulnessMetric, ToxicityMetric};
pub use schema::{Verdict, VerdictItem};
pub use test_case::LLMTestCase;
