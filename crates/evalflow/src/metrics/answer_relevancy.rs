//! Answer relevancy metric - how much of the actual output actually
//! addresses the input.
//!
//! Three judge calls, strictly sequential, each validated before the next
//! stage runs:
//!
//! 1. **Extract**: decompose the actual output into atomic statements.
//! 2. **Classify**: one `{yes, no, idk}` verdict per statement, positional,
//!    retrieval context advisory. `no` verdicts carry a reason.
//! 3. **Synthesize**: turn the score and the `no` reasons into a one-string
//!    explanation.
//!
//! Aggregation is local arithmetic between stages 2 and 3:
//! `score = (# verdicts != no) / total`. `yes` and `idk` are both
//! non-penalizing; an `idk` statement is supporting material, not noise.
//!
//! There is no retry and no partial result. The first contract violation,
//! judge failure, or timeout aborts the evaluation of that test case.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EvalError, Result, Stage};
use crate::judge::{complete_with_timeout, JudgeModel};
use crate::metric::{Metric, MetricResult};
use crate::schema::{
    ensure_reasons_well_formed, ensure_verdict_count, irrelevancy_reasons, parse_judge_response,
    StatementsPayload, VerdictItem, VerdictsPayload,
};
use crate::test_case::LLMTestCase;

/// Default success threshold for relevancy.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default deadline for each judge call.
pub const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_secs(30);

/// LLM-as-judge answer relevancy metric.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use evalflow::metric::Metric;
/// use evalflow::metrics::AnswerRelevancyMetric;
/// use evalflow::test_case::LLMTestCase;
/// # async fn example(judge: Arc<dyn evalflow::judge::JudgeModel>) -> evalflow::error::Result<()> {
/// let metric = AnswerRelevancyMetric::new(judge).with_threshold(0.7);
///
/// let case = LLMTestCase::new(
///     "What should I do if there is an earthquake?",
///     "Duck and hide under a table. Thanks for asking!",
/// );
///
/// let result = metric.measure(&case).await?;
/// println!("{} -> {:.3} ({})", metric.name(), result.score, result.reason);
/// # Ok(())
/// # }
/// ```
pub struct AnswerRelevancyMetric {
    judge: Arc<dyn JudgeModel>,
    threshold: f64,
    include_reason: bool,
    judge_timeout: Duration,
}

impl AnswerRelevancyMetric {
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

    /// Disable the reason-synthesis judge call; the result carries a short
    /// deterministic summary instead.
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

    /// Stage 1: decompose the actual output into atomic statements.
    async fn extract_statements(&self, actual_output: &str) -> Result<Vec<String>> {
        let prompt = build_statements_prompt(actual_output);
        let response =
            complete_with_timeout(&*self.judge, &prompt, self.judge_timeout, Stage::Extraction)
                .await?;
        let payload: StatementsPayload = parse_judge_response(&response, Stage::Extraction)?;
        tracing::debug!(count = payload.statements.len(), "extracted statements");
        Ok(payload.statements)
    }

    /// Stage 2: one verdict per statement, re-verified against the contract.
    async fn classify_statements(
        &self,
        input: &str,
        retrieval_context: &[String],
        statements: &[String],
    ) -> Result<Vec<VerdictItem>> {
        let prompt = build_verdicts_prompt(input, retrieval_context, statements)?;
        let response = complete_with_timeout(
            &*self.judge,
            &prompt,
            self.judge_timeout,
            Stage::Classification,
        )
        .await?;
        let payload: VerdictsPayload = parse_judge_response(&response, Stage::Classification)?;
        ensure_verdict_count(&payload.verdicts, statements.len())?;
        ensure_reasons_well_formed(&payload.verdicts)?;
        Ok(payload.verdicts)
    }

    /// Stage 4: explain the score. One non-empty string, always.
    async fn synthesize_reason(
        &self,
        score: f64,
        irrelevant_reasons: &[String],
        input: &str,
    ) -> Result<String> {
        if !self.include_reason {
            return Ok(format!("Answer relevancy score: {score:.2}"));
        }
        let prompt = build_reason_prompt(score, irrelevant_reasons, input);
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
impl Metric for AnswerRelevancyMetric {
    async fn measure(&self, test_case: &LLMTestCase) -> Result<MetricResult> {
        let statements = self.extract_statements(&test_case.actual_output).await?;

        // Zero statements means zero verdicts downstream; classification is
        // skipped rather than asking the judge to judge nothing.
        let verdicts = if statements.is_empty() {
            Vec::new()
        } else {
            self.classify_statements(&test_case.input, test_case.context(), &statements)
                .await?
        };

        let score = relevancy_score(&verdicts);
        let reasons = irrelevancy_reasons(&verdicts);
        let reason = self
            .synthesize_reason(score, &reasons, &test_case.input)
            .await?;

        tracing::info!(
            metric = self.name(),
            score,
            statements = statements.len(),
            irrelevant = reasons.len(),
            "measured test case"
        );
        Ok(MetricResult::scored(score, self.threshold, reason))
    }

    fn name(&self) -> &str {
        "answer_relevancy"
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Score aggregation: the fraction of verdicts that are not `no`.
///
/// Zero verdicts score 1.0 - nothing was said, so nothing said was
/// irrelevant. This keeps the empty-output edge well defined instead of
/// dividing by zero.
#[must_use]
pub fn relevancy_score(verdicts: &[VerdictItem]) -> f64 {
    if verdicts.is_empty() {
        return 1.0;
    }
    let relevant = verdicts.iter().filter(|v| !v.verdict.is_penalized()).count();
    relevant as f64 / verdicts.len() as f64
}

/// Prompt for the statement-extraction stage.
///
/// Contract: a JSON object with a `statements` key holding a list of
/// strings. Single words and fragments count as statements.
fn build_statements_prompt(actual_output: &str) -> String {
    format!(
        r#"Given the text, break it down into a list of the statements it makes. Ambiguous fragments and single words also count as statements.

Example text: Shoes. The shoes can be refunded at no extra cost. Thanks for asking the question!

Example JSON:
{{
    "statements": ["Shoes.", "Shoes can be refunded at no extra cost", "Thanks for asking the question!"]
}}
===== END OF EXAMPLE =====

Text:
{actual_output}

**
IMPORTANT: Return ONLY a JSON object with the "statements" key as a list of strings. No other words or explanation.
**

JSON:
"#
    )
}

/// Prompt for the verdict-classification stage.
///
/// Contract: a JSON object with a `verdicts` key holding one object per
/// statement, in order. `verdict` is strictly one of `yes`/`no`/`idk`;
/// `reason` appears only with `no`; the verdict count equals the statement
/// count. Retrieval context is advisory for borderline calls.
fn build_verdicts_prompt(
    input: &str,
    retrieval_context: &[String],
    statements: &[String],
) -> Result<String> {
    let statements_json = serde_json::to_string(statements)
        .map_err(|e| EvalError::Configuration(format!("failed to encode statements: {e}")))?;
    let context_json = serde_json::to_string(retrieval_context)
        .map_err(|e| EvalError::Configuration(format!("failed to encode retrieval context: {e}")))?;
    Ok(format!(
        r#"For each statement in the provided list, decide whether it is relevant to addressing the input.
Return a JSON object with a 'verdicts' key: a list of JSON objects with two keys, `verdict` and `reason`.
The 'verdict' must STRICTLY be 'yes', 'no', or 'idk'. Answer 'yes' if the statement is relevant to addressing the input, 'no' if it is irrelevant, and 'idk' if it is ambiguous (not directly relevant, but usable as a supporting point). You may use the retrieval context to decide borderline cases.
Provide a 'reason' explaining the irrelevance ONLY when the verdict is 'no'.

**
IMPORTANT: Return ONLY the JSON object. Since you produce one verdict per statement, the number of 'verdicts' MUST BE STRICTLY EQUAL to the number of statements.

Example statements: ["Shoes.", "Thanks for asking the question!", "Is there anything else I can help you with?", "Duck and hide"]
Example retrieval context: ["In the unlikely event of an earthquake, you should duck and hide under a table."]
Example input: What should I do if there is an earthquake?

Example JSON:
{{
    "verdicts": [
        {{
            "verdict": "no",
            "reason": "The 'Shoes.' statement is completely irrelevant to the input, which asks what to do in the event of an earthquake."
        }},
        {{
            "verdict": "idk"
        }},
        {{
            "verdict": "idk"
        }},
        {{
            "verdict": "yes"
        }}
    ]
}}
**

Retrieval Context:
{context_json}

Input:
{input}

Statements:
{statements_json}

JSON:
"#
    ))
}

/// Prompt for the reason-synthesis stage.
///
/// With no irrelevant statements the judge is told to stay positive and
/// upbeat without overdoing it; otherwise it justifies why the score is not
/// higher, referencing the supplied reasons.
fn build_reason_prompt(score: f64, irrelevant_reasons: &[String], input: &str) -> String {
    let reasons_block = if irrelevant_reasons.is_empty() {
        "None".to_string()
    } else {
        irrelevant_reasons
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"Given the answer relevancy score, the reasons why statements in the actual output were judged irrelevant to the input, and the input itself, provide a CONCISE reason for the score. Explain why the score is not higher, but also why it is at its current level.
If nothing was irrelevant, just say something positive with an upbeat, encouraging tone (don't overdo it, that gets annoying).

Answer Relevancy Score:
{score:.2}

Reasons why the score can't be higher:
{reasons_block}

Input:
{input}

Example:
The score is <answer_relevancy_score> because <your_reason>.

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
    fn test_score_two_thirds_scenario() {
        // ["Shoes.", "Thanks for asking!", "Duck and hide"]
        let verdicts = vec![
            item(Verdict::No, Some("irrelevant")),
            item(Verdict::Idk, None),
            item(Verdict::Yes, None),
        ];
        let score = relevancy_score(&verdicts);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_empty_verdicts_is_one() {
        assert!((relevancy_score(&[]) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_all_no_is_zero() {
        let verdicts = vec![
            item(Verdict::No, Some("a")),
            item(Verdict::No, Some("b")),
        ];
        assert!(relevancy_score(&verdicts).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_idk_does_not_penalize() {
        let verdicts = vec![item(Verdict::Idk, None), item(Verdict::Idk, None)];
        assert!((relevancy_score(&verdicts) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_monotone_in_no_count() {
        // Fixed count of 4, increasing number of 'no' verdicts.
        let mut last = f64::INFINITY;
        for nos in 0..=4usize {
            let verdicts: Vec<VerdictItem> = (0..4)
                .map(|i| {
                    if i < nos {
                        item(Verdict::No, Some("r"))
                    } else {
                        item(Verdict::Yes, None)
                    }
                })
                .collect();
            let score = relevancy_score(&verdicts);
            assert!(score <= last, "score must not increase as 'no' count grows");
            assert!((0.0..=1.0).contains(&score));
            last = score;
        }
    }

    #[test]
    fn test_statements_prompt_states_contract() {
        let prompt = build_statements_prompt("The shoes can be refunded.");
        assert!(prompt.contains("\"statements\""));
        assert!(prompt.contains("The shoes can be refunded."));
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn test_verdicts_prompt_carries_all_inputs() {
        let statements = vec!["Shoes.".to_string(), "Duck and hide".to_string()];
        let ctx = vec!["duck and hide under a table".to_string()];
        let prompt = build_verdicts_prompt("earthquake?", &ctx, &statements).unwrap();
        assert!(prompt.contains("'verdicts'"));
        assert!(prompt.contains("'yes', 'no', or 'idk'"));
        assert!(prompt.contains("STRICTLY EQUAL"));
        assert!(prompt.contains(r#"["Shoes.","Duck and hide"]"#));
        assert!(prompt.contains("duck and hide under a table"));
        assert!(prompt.contains("earthquake?"));
    }

    #[test]
    fn test_reason_prompt_lists_reasons() {
        let prompt = build_reason_prompt(
            0.67,
            &["Shoes are off-topic".to_string()],
            "earthquake?",
        );
        assert!(prompt.contains("0.67"));
        assert!(prompt.contains("- Shoes are off-topic"));
        assert!(prompt.contains("earthquake?"));
    }

    #[test]
    fn test_reason_prompt_empty_reasons_says_none() {
        let prompt = build_reason_prompt(1.0, &[], "q");
        assert!(prompt.contains("None"));
        assert!(prompt.contains("upbeat"));
    }
}
