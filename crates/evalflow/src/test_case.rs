//! Test case types for LLM evaluation.
//!
//! An [`LLMTestCase`] bundles everything a metric needs to judge one model
//! interaction: the user input, the model's actual output, and optionally a
//! reference output and the retrieval context the model saw. Test cases are
//! built once and never mutated; metrics borrow them.

use serde::{Deserialize, Serialize};

/// A single evaluation scenario: one input, one actual output, optional
/// reference data.
///
/// # Example
///
/// ```
/// use evalflow::test_case::LLMTestCase;
///
/// let case = LLMTestCase::new(
///     "What should I do if there is an earthquake?",
///     "Shoes can be refunded at no extra cost. Duck and hide under a table.",
/// )
/// .with_retrieval_context(vec![
///     "In the unlikely event of an earthquake, duck and hide under a table.".to_string(),
/// ]);
///
/// assert!(case.expected_output.is_none());
/// assert_eq!(case.retrieval_context.as_ref().map(Vec::len), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMTestCase {
    /// The input/query the model was given
    pub input: String,

    /// The model output under evaluation
    pub actual_output: String,

    /// Reference output, if one exists (used by reference-based metrics)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,

    /// Retrieval context the model had available. Advisory for relevancy
    /// judging, required for faithfulness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_context: Option<Vec<String>>,
}

impl LLMTestCase {
    /// Create a test case from input and actual output.
    pub fn new(input: impl Into<String>, actual_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            actual_output: actual_output.into(),
            expected_output: None,
            retrieval_context: None,
        }
    }

    /// Attach a reference output.
    #[must_use]
    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    /// Attach the retrieval context the model saw.
    #[must_use]
    pub fn with_retrieval_context(mut self, context: Vec<String>) -> Self {
        self.retrieval_context = Some(context);
        self
    }

    /// The retrieval context as a slice, empty if none was attached.
    #[must_use]
    pub fn context(&self) -> &[String] {
        self.retrieval_context.as_deref().unwrap_or(&[])
    }
}
