//! Judge model abstraction.
//!
//! Metrics consume exactly one external capability: "given a prompt string,
//! return a text completion". [`JudgeModel`] is that capability as an
//! object-safe trait, so production code can inject an OpenAI-backed judge
//! while tests inject a scripted one.
//!
//! Schema validation of what comes back is deliberately *not* the judge's
//! job - the metric owning the prompt owns the contract, and enforces it via
//! [`crate::schema`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EvalError, Result, Stage};

/// A text-completion capability used to extract statements, classify
/// verdicts, and synthesize explanations.
///
/// Implementations must be `Send + Sync`; a single judge instance is shared
/// across concurrently running evaluations.
#[async_trait]
pub trait JudgeModel: Send + Sync {
    /// Return a completion for the given prompt.
    ///
    /// Transport, auth, and provider failures map to [`EvalError::Judge`].
    /// Implementations should not attempt to validate or reshape the model
    /// output.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Name of the underlying model, for logs and reports.
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: JudgeModel + ?Sized> JudgeModel for std::sync::Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Call the judge with a per-call deadline.
///
/// A timeout is a stage failure: the evaluation of the current test case
/// aborts, same as a contract violation would.
pub async fn complete_with_timeout(
    judge: &dyn JudgeModel,
    prompt: &str,
    timeout: Duration,
    stage: Stage,
) -> Result<String> {
    tracing::debug!(
        model = judge.model_name(),
        %stage,
        prompt_len = prompt.len(),
        "calling judge model"
    );
    match tokio::time::timeout(timeout, judge.complete(prompt)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(model = judge.model_name(), %stage, ?timeout, "judge call timed out");
            Err(EvalError::Timeout { stage, timeout })
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use super::*;

    struct SlowJudge;

    #[async_trait]
    impl JudgeModel for SlowJudge {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    struct EchoJudge;

    #[async_trait]
    impl JudgeModel for EchoJudge {
        async fn complete(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_stage_failure() {
        let err = complete_with_timeout(
            &SlowJudge,
            "p",
            Duration::from_millis(100),
            Stage::Extraction,
        )
        .await
        .unwrap_err();

        match err {
            EvalError::Timeout { stage, timeout } => {
                assert_eq!(stage, Stage::Extraction);
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_completion_within_deadline_passes_through() {
        let out = complete_with_timeout(
            &EchoJudge,
            "hello",
            Duration::from_secs(5),
            Stage::Synthesis,
        )
        .await
        .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_arc_judge_is_a_judge() {
        let judge: std::sync::Arc<dyn JudgeModel> = std::sync::Arc::new(EchoJudge);
        assert_eq!(judge.complete("x").await.unwrap(), "x");
        assert_eq!(judge.model_name(), "echo");
    }
}
