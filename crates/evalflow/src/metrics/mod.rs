//! Metric implementations.
//!
//! All metrics here are LLM-as-judge pipelines over a [`crate::judge::JudgeModel`]:
//!
//! - [`AnswerRelevancyMetric`] - does the output address the input?
//! - [`FaithfulnessMetric`] - does the output stick to the retrieval context?
//! - [`BiasMetric`] / [`ToxicityMetric`] - does the output express flagged
//!   opinions? (lower-is-better)

pub mod answer_relevancy;
pub mod bias;
pub mod faithfulness;
mod opinions;
pub mod toxicity;

pub use answer_relevancy::AnswerRelevancyMetric;
pub use bias::BiasMetric;
pub use faithfulness::FaithfulnessMetric;
pub use toxicity::ToxicityMetric;
