//! Judge-response contracts and their enforcement.
//!
//! Every stage prompt tells the judge the exact JSON shape to return. This
//! module is the other half of that contract: typed payloads plus validators
//! that turn any deviation - non-JSON text, a missing key, a verdict value
//! outside `{yes, no, idk}`, a count mismatch, a `no` verdict without a
//! reason - into [`EvalError::ContractViolation`]. Nothing downstream ever
//! runs on an unvalidated response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result, Stage};

/// Relevance judgment for one extracted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Statement directly addresses the input
    Yes,
    /// Statement is irrelevant to the input; must carry a reason
    No,
    /// Ambiguous - not directly relevant but plausibly supporting
    Idk,
}

impl Verdict {
    /// Only `no` counts against the score.
    #[must_use]
    pub fn is_penalized(&self) -> bool {
        matches!(self, Verdict::No)
    }
}

/// One verdict as returned by the judge, positionally paired with the
/// statement it judges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictItem {
    /// The relevance judgment
    pub verdict: Verdict,
    /// Why the statement was judged irrelevant. Present exactly when the
    /// verdict is `no`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response shape of the statement-extraction stage.
#[derive(Debug, Deserialize)]
pub struct StatementsPayload {
    pub statements: Vec<String>,
}

/// Response shape of the verdict-classification stage.
#[derive(Debug, Deserialize)]
pub struct VerdictsPayload {
    pub verdicts: Vec<VerdictItem>,
}

/// Response shape of opinion extraction (bias/toxicity metrics).
#[derive(Debug, Deserialize)]
pub struct OpinionsPayload {
    pub opinions: Vec<String>,
}

/// Response shape of claim extraction (faithfulness metric).
#[derive(Debug, Deserialize)]
pub struct ClaimsPayload {
    pub claims: Vec<String>,
}

/// Strip markdown code fences a judge may wrap its JSON in.
///
/// Models frequently answer ```` ```json {...} ``` ```` despite being told
/// not to. The fence is formatting noise, not a schema deviation, so it is
/// removed before parsing. Anything else non-JSON still fails validation.
#[must_use]
pub fn strip_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parse a judge response into the expected payload type.
///
/// Invalid JSON and missing/mistyped keys both surface as
/// [`EvalError::ContractViolation`] naming the failing stage.
pub fn parse_judge_response<T: DeserializeOwned>(response: &str, stage: Stage) -> Result<T> {
    let cleaned = strip_fences(response);
    serde_json::from_str(cleaned).map_err(|e| {
        tracing::warn!(%stage, error = %e, "judge response failed schema validation");
        EvalError::contract(stage, format!("invalid judge JSON: {e}"))
    })
}

/// Enforce the count invariant: one verdict per statement, positionally.
///
/// The generating prompt states this invariant; the consumer re-verifies it.
/// A mismatch is fatal - verdicts are never truncated or padded.
pub fn ensure_verdict_count(verdicts: &[VerdictItem], statement_count: usize) -> Result<()> {
    if verdicts.len() != statement_count {
        return Err(EvalError::contract(
            Stage::Classification,
            format!(
                "verdict count {} does not match statement count {}",
                verdicts.len(),
                statement_count
            ),
        ));
    }
    Ok(())
}

/// Enforce the reason rule for an arbitrary flagged verdict: a non-empty
/// reason is present if and only if the verdict equals `flagged`.
/// Whitespace-only reasons count as missing.
///
/// Relevancy and faithfulness flag `no`; bias and toxicity flag `yes`.
pub fn ensure_reasons_accompany(verdicts: &[VerdictItem], flagged: Verdict) -> Result<()> {
    for (idx, item) in verdicts.iter().enumerate() {
        let reason = item
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());
        if item.verdict == flagged && reason.is_none() {
            return Err(EvalError::contract(
                Stage::Classification,
                format!("verdict {idx} is '{flagged:?}' but carries no reason"),
            ));
        }
        if item.verdict != flagged && reason.is_some() {
            return Err(EvalError::contract(
                Stage::Classification,
                format!(
                    "verdict {idx} is '{:?}' but carries a reason; reasons accompany '{flagged:?}' only",
                    item.verdict
                ),
            ));
        }
    }
    Ok(())
}

/// Enforce the reason rule for relevance-style verdicts: reason iff `no`.
pub fn ensure_reasons_well_formed(verdicts: &[VerdictItem]) -> Result<()> {
    ensure_reasons_accompany(verdicts, Verdict::No)
}

/// Collect the reasons attached to verdicts matching `flagged`, in order.
///
/// Call only on verdicts that passed [`ensure_reasons_accompany`].
#[must_use]
pub fn flagged_reasons(verdicts: &[VerdictItem], flagged: Verdict) -> Vec<String> {
    verdicts
        .iter()
        .filter(|v| v.verdict == flagged)
        .filter_map(|v| v.reason.clone())
        .collect()
}

/// Collect the reasons attached to `no` verdicts, in verdict order.
#[must_use]
pub fn irrelevancy_reasons(verdicts: &[VerdictItem]) -> Vec<String> {
    flagged_reasons(verdicts, Verdict::No)
}
