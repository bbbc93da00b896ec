use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{GatePresence, LeaveId, LeaveRequest, LeaveStatus, LeaveType};

/// Counts shown on the security dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSummary {
    /// Approved and signed off by the warden, waiting at the gate.
    pub approved: usize,
    pub exited: usize,
    pub returned: usize,
}

impl GateSummary {
    pub fn from_leaves<'a>(leaves: impl IntoIterator<Item = &'a LeaveRequest>) -> Self {
        leaves
            .into_iter()
            .fold(Self::default(), |mut summary, leave| {
                match leave.status {
                    LeaveStatus::Approved if leave.is_gate_cleared() => summary.approved += 1,
                    LeaveStatus::Exited => summary.exited += 1,
                    LeaveStatus::Returned => summary.returned += 1,
                    _ => {}
                }
                summary
            })
    }
}

/// Students currently outside, bucketed by the first day of their leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitAnalyticsRow {
    pub date: NaiveDate,
    pub count: usize,
}

pub fn exit_analytics<'a>(
    leaves: impl IntoIterator<Item = &'a LeaveRequest>,
) -> Vec<ExitAnalyticsRow> {
    let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for leave in leaves {
        if leave.security.current_status == GatePresence::Exited {
            *buckets.entry(leave.start_date).or_default() += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(date, count)| ExitAnalyticsRow { date, count })
        .collect()
}

/// What the gate officer sees after looking a student up by register number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePass {
    pub leave_id: LeaveId,
    pub register_number: String,
    pub full_name: String,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
    pub presence: GatePresence,
    pub cleared_for_exit: bool,
}

/// Most recent approved or exited leave; expects newest-first input.
pub fn active_pass<'a>(leaves: impl IntoIterator<Item = &'a LeaveRequest>) -> Option<ActivePass> {
    leaves
        .into_iter()
        .find(|leave| matches!(leave.status, LeaveStatus::Approved | LeaveStatus::Exited))
        .map(|leave| ActivePass {
            leave_id: leave.id.clone(),
            register_number: leave.student.register_number.clone(),
            full_name: leave.student.full_name.clone(),
            leave_type: leave.leave_type,
            start_date: leave.start_date,
            end_date: leave.end_date,
            status: leave.status,
            presence: leave.security.current_status,
            cleared_for_exit: leave.is_gate_cleared(),
        })
}

/// Work queues at the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateQueue {
    AwaitingExit,
    Outside,
    /// Every recorded exit, whether or not the student is back.
    History,
}

impl FromStr for GateQueue {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "awaiting_exit" => Ok(GateQueue::AwaitingExit),
            "outside" => Ok(GateQueue::Outside),
            "history" => Ok(GateQueue::History),
            other => Err(format!("unknown gate queue '{other}'")),
        }
    }
}

impl GateQueue {
    pub const fn statuses(self) -> &'static [LeaveStatus] {
        match self {
            GateQueue::AwaitingExit => &[LeaveStatus::Approved],
            GateQueue::Outside => &[LeaveStatus::Exited],
            GateQueue::History => &[LeaveStatus::Exited, LeaveStatus::Returned],
        }
    }

    /// Narrow and order scanned leaves for the queue.
    ///
    /// Outside and history are ordered by exit time, most recent first.
    pub fn arrange(self, leaves: impl IntoIterator<Item = LeaveRequest>) -> Vec<LeaveRequest> {
        if self == GateQueue::AwaitingExit {
            return leaves
                .into_iter()
                .filter(LeaveRequest::is_gate_cleared)
                .collect();
        }

        let statuses = self.statuses();
        let mut logged: Vec<LeaveRequest> = leaves
            .into_iter()
            .filter(|leave| statuses.contains(&leave.status))
            .collect();
        logged.sort_by(|a, b| b.security.exit_time.cmp(&a.security.exit_time));
        logged
    }
}
