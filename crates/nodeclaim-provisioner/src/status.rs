//! NodeClaim status classification

use nodeclaim_common::crd::{Condition, NodeClaim, NodeClaimConditionType};

/// Fallback reason when the backend fails a launch without any text
const UNSPECIFIED_LAUNCH_FAILURE: &str = "node claim launch failed";

/// Where a NodeClaim stands, judged from one status snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimState {
    /// Not yet terminal; keep waiting
    Pending,
    /// The node is usable
    Ready,
    /// The backend gave up on this claim; not retried here
    Failed { reason: String },
}

/// Classify a NodeClaim by its latest status snapshot
pub fn classify(claim: &NodeClaim) -> ClaimState {
    classify_conditions(claim.conditions())
}

/// Classify a list of conditions.
///
/// Precedence is failed over ready over pending: a `Launched=False`
/// condition anywhere in the list yields `Failed` even when `Ready=True`
/// is also present.
pub fn classify_conditions(conditions: &[Condition]) -> ClaimState {
    if let Some(failed) = conditions
        .iter()
        .find(|c| c.is_false(&NodeClaimConditionType::Launched))
    {
        return ClaimState::Failed {
            reason: failure_reason(failed),
        };
    }

    if conditions
        .iter()
        .any(|c| c.is_true(&NodeClaimConditionType::Ready))
    {
        return ClaimState::Ready;
    }

    ClaimState::Pending
}

/// The condition's message, falling back to its machine reason
fn failure_reason(condition: &Condition) -> String {
    if !condition.message.is_empty() {
        condition.message.clone()
    } else if !condition.reason.is_empty() {
        condition.reason.clone()
    } else {
        UNSPECIFIED_LAUNCH_FAILURE.to_string()
    }
}
