use chrono::{DateTime, Utc};

use super::approval::{InvalidTransition, TransitionAction};
use super::domain::{ActorId, Decision, GatePresence, LeaveRequest, LeaveStatus};

/// Transition: approved → exited. Stamps the exit time and the officer on duty.
///
/// Refuses anything that is not a gate-cleared approved leave, including a second
/// exit on a leave that already left, so duplicate submissions never re-stamp.
pub fn record_exit(
    mut leave: LeaveRequest,
    security: &ActorId,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, InvalidTransition> {
    if leave.status != LeaveStatus::Approved {
        return Err(InvalidTransition::FromStatus {
            action: TransitionAction::RecordExit,
            status: leave.status,
        });
    }
    if !leave.final_approval.is_granted() {
        return Err(InvalidTransition::AwaitingFinalApproval);
    }

    leave.security.decision = Decision::Granted;
    leave.security.decided_at = Some(now);
    leave.security.decided_by = Some(security.clone());
    leave.security.exit_time = Some(now);
    leave.security.current_status = GatePresence::Exited;
    leave.status = LeaveStatus::Exited;
    leave.updated_at = now;
    Ok(leave)
}

/// Transition: exited → returned.
pub fn record_return(
    mut leave: LeaveRequest,
    security: &ActorId,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, InvalidTransition> {
    if leave.status != LeaveStatus::Exited {
        return Err(InvalidTransition::FromStatus {
            action: TransitionAction::RecordReturn,
            status: leave.status,
        });
    }

    leave.security.return_time = Some(now);
    leave.security.current_status = GatePresence::Returned;
    leave.security.received_by = Some(security.clone());
    leave.status = LeaveStatus::Returned;
    leave.updated_at = now;
    Ok(leave)
}

/// Presence implied by a leave status; gate fields must always agree with it.
pub fn presence_for(status: LeaveStatus) -> GatePresence {
    match status {
        LeaveStatus::Exited => GatePresence::Exited,
        LeaveStatus::Returned => GatePresence::Returned,
        _ => GatePresence::InHostel,
    }
}
