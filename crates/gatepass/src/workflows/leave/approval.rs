//! Guarded approval transitions for a single leave record.
//!
//! Every function here is pure: it takes the record by value, checks the guard for
//! the requested action, and hands back the next state. Persisting the result (and
//! detecting concurrent writers) is the service's job.
//!
//! Both ways of reaching `approved` go through [`LeaveRequest::requirements_met`]:
//! the slot path moves an emergency leave to `approved` the moment parent and tutor
//! have both granted, and the final warden action refuses to run until the same
//! predicate holds. Security only acts once the final slot is granted as well, so
//! the warden's sign-off is always the last step before a gate event.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ActorId, ApprovalSlot, Decision, LeaveRequest, LeaveStatus, LeaveType,
};

/// Approval slot an actor is deciding on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    Parent,
    /// The warden acting as academic tutor.
    Tutor,
    /// The warden acting as final gatekeeper.
    Warden,
}

impl ApproverRole {
    pub const fn label(self) -> &'static str {
        match self {
            ApproverRole::Parent => "parent",
            ApproverRole::Tutor => "tutor",
            ApproverRole::Warden => "warden",
        }
    }
}

impl fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The approver's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Grant,
    Reject,
}

/// Action names used when reporting an illegal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Decide(ApproverRole, Verdict),
    FinalApprove,
    RecordExit,
    RecordReturn,
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionAction::Decide(role, Verdict::Grant) => write!(f, "record {role} grant"),
            TransitionAction::Decide(role, Verdict::Reject) => write!(f, "record {role} rejection"),
            TransitionAction::FinalApprove => f.write_str("give final warden approval"),
            TransitionAction::RecordExit => f.write_str("record exit"),
            TransitionAction::RecordReturn => f.write_str("record return"),
        }
    }
}

/// Why a requested action is not legal for the record's current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTransition {
    #[error("cannot {action} while leave is {status}")]
    FromStatus {
        action: TransitionAction,
        status: LeaveStatus,
    },
    #[error("{role} decision already recorded")]
    AlreadyDecided { role: ApproverRole },
    #[error("holiday leave has no tutor approval step")]
    NoTutorStep,
    #[error("leave has not received final warden approval")]
    AwaitingFinalApproval,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error(transparent)]
    Invalid(#[from] InvalidTransition),
    #[error("{missing} approval required before final warden approval")]
    PreconditionNotMet { missing: ApproverRole },
}

/// Apply a parent, tutor, or warden decision.
///
/// A warden `grant` is the final approval action and is delegated to [`final_approve`].
pub fn apply_decision(
    mut leave: LeaveRequest,
    role: ApproverRole,
    verdict: Verdict,
    actor: &ActorId,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, TransitionError> {
    if role == ApproverRole::Warden && verdict == Verdict::Grant {
        return final_approve(leave, actor, now);
    }

    let action = TransitionAction::Decide(role, verdict);
    let open = match role {
        // The warden's refusal mirrors the final approval and stays open until sign-off.
        ApproverRole::Warden => final_slot_open(&leave),
        ApproverRole::Parent | ApproverRole::Tutor => leave.status.accepts_decisions(),
    };
    if !open {
        return Err(InvalidTransition::FromStatus {
            action,
            status: leave.status,
        }
        .into());
    }

    match verdict {
        Verdict::Reject => {
            slot_mut(&mut leave, role).settle(Decision::Rejected, actor, now);
            leave.status = LeaveStatus::Rejected;
            leave.rejection_reason = reason
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty());
        }
        Verdict::Grant => {
            if role == ApproverRole::Tutor && leave.leave_type == LeaveType::Holiday {
                return Err(InvalidTransition::NoTutorStep.into());
            }
            let slot = slot_mut(&mut leave, role);
            if slot.decision != Decision::Undecided {
                return Err(InvalidTransition::AlreadyDecided { role }.into());
            }
            slot.settle(Decision::Granted, actor, now);
            leave.status = status_from_slots(&leave);
        }
    }

    leave.updated_at = now;
    Ok(leave)
}

/// The warden's final gatekeeping approval; the only action that unlocks the gate.
pub fn final_approve(
    mut leave: LeaveRequest,
    actor: &ActorId,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, TransitionError> {
    if !final_slot_open(&leave) {
        return Err(InvalidTransition::FromStatus {
            action: TransitionAction::FinalApprove,
            status: leave.status,
        }
        .into());
    }

    if let Some(missing) = missing_approval(&leave) {
        return Err(TransitionError::PreconditionNotMet { missing });
    }

    leave.final_approval.settle(Decision::Granted, actor, now);
    leave.status = LeaveStatus::Approved;
    leave.updated_at = now;
    Ok(leave)
}

/// First required approval that is still outstanding, tutor before parent.
pub fn missing_approval(leave: &LeaveRequest) -> Option<ApproverRole> {
    if leave.leave_type == LeaveType::Emergency && !leave.tutor_approval.is_granted() {
        return Some(ApproverRole::Tutor);
    }
    if !leave.parent_approval.is_granted() {
        return Some(ApproverRole::Parent);
    }
    None
}

fn final_slot_open(leave: &LeaveRequest) -> bool {
    let status_open = leave.status.accepts_decisions() || leave.status == LeaveStatus::Approved;
    status_open && leave.final_approval.decision == Decision::Undecided
}

fn status_from_slots(leave: &LeaveRequest) -> LeaveStatus {
    if leave.leave_type == LeaveType::Emergency && leave.requirements_met() {
        return LeaveStatus::Approved;
    }
    match (
        leave.parent_approval.is_granted(),
        leave.tutor_approval.is_granted(),
    ) {
        (true, _) => LeaveStatus::ParentApproved,
        (false, true) => LeaveStatus::WardenApproved,
        (false, false) => LeaveStatus::Pending,
    }
}

fn slot_mut(leave: &mut LeaveRequest, role: ApproverRole) -> &mut ApprovalSlot {
    match role {
        ApproverRole::Parent => &mut leave.parent_approval,
        ApproverRole::Tutor => &mut leave.tutor_approval,
        ApproverRole::Warden => &mut leave.final_approval,
    }
}
