//! Scripted judge doubles for metric pipeline tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use evalflow::error::{EvalError, Result};
use evalflow::judge::JudgeModel;

/// A judge that replays canned responses in order and records every prompt.
///
/// Running out of scripted responses fails the call with
/// [`EvalError::Judge`], which makes a pipeline issuing more calls than the
/// test scripted an immediate, visible failure.
///
/// # Example
///
/// ```rust
/// use evalflow_testing::ScriptedJudge;
///
/// let judge = ScriptedJudge::new(vec![
///     r#"{"statements": ["Shoes."]}"#.to_string(),
///     r#"{"verdicts": [{"verdict": "no", "reason": "off-topic"}]}"#.to_string(),
/// ]);
/// assert_eq!(judge.calls(), 0);
/// ```
pub struct ScriptedJudge {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    /// Create a judge that will return `responses` in order.
    #[must_use]
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor from string literals.
    #[must_use]
    pub fn from_responses(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| (*r).to_string()).collect())
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Every prompt received, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of scripted responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl JudgeModel for ScriptedJudge {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EvalError::Judge("scripted judge has no responses left".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A judge that always fails, for exercising upstream-failure handling.
pub struct FailingJudge {
    message: String,
}

impl FailingJudge {
    /// Create a judge that fails every call with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingJudge {
    fn default() -> Self {
        Self::new("judge unavailable")
    }
}

#[async_trait]
impl JudgeModel for FailingJudge {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(EvalError::Judge(self.message.clone()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}
