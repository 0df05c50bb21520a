//! Faithfulness metric - does the actual output stick to the retrieval
//! context?
//!
//! Same pipeline shape as answer relevancy, applied to factual grounding:
//! extract the claims the output makes, then judge each claim against the
//! retrieval context. `no` means the claim contradicts the context (with a
//! reason); `idk` means the context does not mention it, which is not
//! penalized - only contradiction is.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EvalError, Result, Stage};
use crate::judge::{complete_with_timeout, JudgeModel};
use crate::metric::{Metric, MetricResult};
use crate::metrics::answer_relevancy::{DEFAULT_JUDGE_TIMEOUT, DEFAULT_THRESHOLD};
use crate::schema::{
    ensure_reasons_well_formed, ensure_verdict_count, irrelevancy_reasons, parse_judge_response,
    ClaimsPayload, VerdictItem, VerdictsPayload,
};
use crate::test_case::LLMTestCase;

/// LLM-as-judge faithfulness metric. Requires a retrieval context on the
/// test case.
pub struct FaithfulnessMetric {
    judge: Arc<dyn JudgeModel>,
    threshold: f64,
    include_reason: bool,
    judge_timeout: Duration,
}

impl FaithfulnessMetric {
    /// Create the metric with default threshold, reason synthesis enabled.
    #[must_use]
    pub fn new(judge: Arc<dyn JudgeModel>) -> Self {
        Self {
            judge,
            threshold: DEFAULT_THRESHOLD,
            include_reason: true,
            judge_timeout: DEFAULT_JUDGE_TIMEOUT,
        }
    }

    /// Set the success threshold (`score >= threshold` passes).
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Disable the reason-synthesis judge call.
    #[must_use]
    pub fn with_include_reason(mut self, include_reason: bool) -> Self {
        self.include_reason = include_reason;
        self
    }

    /// Set the per-judge-call deadline.
    #[must_use]
    pub fn with_judge_timeout(mut self, timeout: Duration) -> Self {
        self.judge_timeout = timeout;
        self
    }

    async fn extract_claims(&self, actual_output: &str) -> Result<Vec<String>> {
        let prompt = build_claims_prompt(actual_output);
        let response =
            complete_with_timeout(&*self.judge, &prompt, self.judge_timeout, Stage::Extraction)
                .await?;
        let payload: ClaimsPayload = parse_judge_response(&response, Stage::Extraction)?;
        tracing::debug!(count = payload.claims.len(), "extracted claims");
        Ok(payload.claims)
    }

    async fn classify_claims(
        &self,
        retrieval_context: &[String],
        claims: &[String],
    ) -> Result<Vec<VerdictItem>> {
        let prompt = build_faithfulness_verdicts_prompt(retrieval_context, claims)?;
        let response = complete_with_timeout(
            &*self.judge,
            &prompt,
            self.judge_timeout,
            Stage::Classification,
        )
        .await?;
        let payload: VerdictsPayload = parse_judge_response(&response, Stage::Classification)?;
        ensure_verdict_count(&payload.verdicts, claims.len())?;
        ensure_reasons_well_formed(&payload.verdicts)?;
        Ok(payload.verdicts)
    }

    async fn synthesize_reason(&self, score: f64, contradictions: &[String]) -> Result<String> {
        if !self.include_reason {
            return Ok(format!("Faithfulness score: {score:.2}"));
        }
        let prompt = build_faithfulness_reason_prompt(score, contradictions);
        let response =
            complete_with_timeout(&*self.judge, &prompt, self.judge_timeout, Stage::Synthesis)
                .await?;
        let reason = response.trim().to_string();
        if reason.is_empty() {
            return Err(EvalError::contract(
                Stage::Synthesis,
                "judge produced an empty explanation",
            ));
        }
        Ok(reason)
    }
}

#[async_trait]
impl Metric for FaithfulnessMetric {
    async fn measure(&self, test_case: &LLMTestCase) -> Result<MetricResult> {
        let context = test_case.context();
        if context.is_empty() {
            return Err(EvalError::InvalidInput(
                "faithfulness requires a retrieval context on the test case".to_string(),
            ));
        }

        let claims = self.extract_claims(&test_case.actual_output).await?;
        let verdicts = if claims.is_empty() {
            Vec::new()
        } else {
            self.classify_claims(context, &claims).await?
        };

        let score = faithfulness_score(&verdicts);
        let contradictions = irrelevancy_reasons(&verdicts);
        let reason = self.synthesize_reason(score, &contradictions).await?;

        tracing::info!(
            metric = self.name(),
            score,
            claims = claims.len(),
            contradictions = contradictions.len(),
            "measured test case"
        );
        Ok(MetricResult::scored(score, self.threshold, reason))
    }

    fn name(&self) -> &str {
        "faithfulness"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Fraction of claims that do not contradict the context. Zero claims score
/// 1.0 - an output that claims nothing contradicts nothing.
#[must_use]
pub fn faithfulness_score(verdicts: &[VerdictItem]) -> f64 {
    if verdicts.is_empty() {
        return 1.0;
    }
    let faithful = verdicts.iter().filter(|v| !v.verdict.is_penalized()).count();
    faithful as f64 / verdicts.len() as f64
}

fn build_claims_prompt(actual_output: &str) -> String {
    format!(
        r#"Given the text, extract a list of the factual claims it makes. Opinions and pleasantries are not claims.

Example text: Einstein won the Nobel Prize in 1968. He was born in Germany.

Example JSON:
{{
    "claims": ["Einstein won the Nobel Prize in 1968.", "Einstein was born in Germany."]
}}
===== END OF EXAMPLE =====

Text:
{actual_output}

**
IMPORTANT: Return ONLY a JSON object with the "claims" key as a list of strings. No other words or explanation.
**

JSON:
"#
    )
}

fn build_faithfulness_verdicts_prompt(
    retrieval_context: &[String],
    claims: &[String],
) -> Result<String> {
    let claims_json = serde_json::to_string(claims)
        .map_err(|e| EvalError::Configuration(format!("failed to encode claims: {e}")))?;
    let context_json = serde_json::to_string(retrieval_context)
        .map_err(|e| EvalError::Configuration(format!("failed to encode retrieval context: {e}")))?;
    Ok(format!(
        r#"For each claim in the provided list, decide whether it agrees with the retrieval context.
Return a JSON object with a 'verdicts' key: a list of JSON objects with two keys, `verdict` and `reason`.
The 'verdict' must STRICTLY be 'yes', 'no', or 'idk'. Answer 'yes' if the claim agrees with the retrieval context, 'no' if the claim CONTRADICTS the retrieval context, and 'idk' if the retrieval context does not mention the claim. Claims the context does not mention are NOT contradictions.
Provide a 'reason' quoting the contradicting part of the context ONLY when the verdict is 'no'.

**
IMPORTANT: Return ONLY the JSON object. The number of 'verdicts' MUST BE STRICTLY EQUAL to the number of claims.
**

Retrieval Context:
{context_json}

Claims:
{claims_json}

JSON:
"#
    ))
}

fn build_faithfulness_reason_prompt(score: f64, contradictions: &[String]) -> String {
    let contradictions_block = if contradictions.is_empty() {
        "None".to_string()
    } else {
        contradictions
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"Given the faithfulness score and the list of contradictions found between the actual output and the retrieval context, provide a CONCISE reason for the score.
If there are no contradictions, just say something positive with an upbeat, encouraging tone (don't overdo it).

Faithfulness Score:
{score:.2}

Contradictions:
{contradictions_block}

Example:
The score is <faithfulness_score> because <your_reason>.

Reason:
"#
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Verdict;

    fn item(verdict: Verdict, reason: Option<&str>) -> VerdictItem {
        VerdictItem {
            verdict,
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_unmentioned_claims_do_not_penalize() {
        let verdicts = vec![
            item(Verdict::Yes, None),
            item(Verdict::Idk, None),
            item(Verdict::No, Some("context says 1921, claim says 1968")),
        ];
        let score = faithfulness_score(&verdicts);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_claims_scores_one() {
        assert!((faithfulness_score(&[]) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_claims_prompt_states_contract() {
        let prompt = build_claims_prompt("Einstein won in 1968.");
        assert!(prompt.contains("\"claims\""));
        assert!(prompt.contains("Einstein won in 1968."));
    }

    #[test]
    fn test_verdicts_prompt_carries_context_and_claims() {
        let prompt = build_faithfulness_verdicts_prompt(
            &["Einstein won the Nobel Prize in 1921.".to_string()],
            &["Einstein won in 1968.".to_string()],
        )
        .unwrap();
        assert!(prompt.contains("Einstein won the Nobel Prize in 1921."));
        assert!(prompt.contains("Einstein won in 1968."));
        assert!(prompt.contains("STRICTLY EQUAL"));
        assert!(prompt.contains("CONTRADICTS"));
    }

    #[tokio::test]
    async fn test_missing_context_is_invalid_input() {
        struct NeverJudge;

        #[async_trait]
        impl JudgeModel for NeverJudge {
            async fn complete(&self, _prompt: &str) -> Result<String> {
                unreachable!("judge must not be called without a retrieval context")
            }

            fn model_name(&self) -> &str {
                "never"
            }
        }

        let metric = FaithfulnessMetric::new(Arc::new(NeverJudge));
        let case = LLMTestCase::new("q", "a");
        let err = metric.measure(&case).await.unwrap_err();
        assert!(matches!(err, EvalError::InvalidInput(_)));
    }
}
