use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for leave requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeaveId(pub String);

/// Identifier of the student who owns a leave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier of a staff member or parent acting on a leave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for LeaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Leave category; drives mandatory fields and the approval path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Holiday,
    Emergency,
}

impl LeaveType {
    pub const fn label(self) -> &'static str {
        match self {
            LeaveType::Holiday => "holiday",
            LeaveType::Emergency => "emergency",
        }
    }
}

impl FromStr for LeaveType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "holiday" => Ok(LeaveType::Holiday),
            "emergency" => Ok(LeaveType::Emergency),
            other => Err(format!(
                "unknown leave type '{other}' (expected holiday or emergency)"
            )),
        }
    }
}

/// Primary state-machine variable of a leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    ParentApproved,
    WardenApproved,
    Approved,
    Rejected,
    Exited,
    Returned,
}

impl LeaveStatus {
    pub const ALL: [LeaveStatus; 7] = [
        LeaveStatus::Pending,
        LeaveStatus::ParentApproved,
        LeaveStatus::WardenApproved,
        LeaveStatus::Approved,
        LeaveStatus::Rejected,
        LeaveStatus::Exited,
        LeaveStatus::Returned,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::ParentApproved => "parent_approved",
            LeaveStatus::WardenApproved => "warden_approved",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Exited => "exited",
            LeaveStatus::Returned => "returned",
        }
    }

    /// Statuses in which parent/tutor decisions may still be applied.
    pub const fn accepts_decisions(self) -> bool {
        matches!(
            self,
            LeaveStatus::Pending | LeaveStatus::ParentApproved | LeaveStatus::WardenApproved
        )
    }

    pub const fn is_gate_active(self) -> bool {
        matches!(self, LeaveStatus::Exited | LeaveStatus::Returned)
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LeaveStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        LeaveStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| format!("unknown leave status '{value}'"))
    }
}

/// Tri-state outcome of an approval slot. `Undecided` is the initial value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Undecided,
    Granted,
    Rejected,
}

impl Decision {
    pub const fn is_granted(self) -> bool {
        matches!(self, Decision::Granted)
    }
}

/// One approver's decision together with who made it and when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSlot {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<ActorId>,
}

impl ApprovalSlot {
    pub fn is_granted(&self) -> bool {
        self.decision.is_granted()
    }

    pub(crate) fn settle(&mut self, decision: Decision, actor: &ActorId, now: DateTime<Utc>) {
        self.decision = decision;
        self.decided_at = Some(now);
        self.decided_by = Some(actor.clone());
    }
}

/// Physical whereabouts recorded by security staff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePresence {
    #[default]
    InHostel,
    Exited,
    Returned,
}

impl GatePresence {
    pub const fn label(self) -> &'static str {
        match self {
            GatePresence::InHostel => "in_hostel",
            GatePresence::Exited => "exited",
            GatePresence::Returned => "returned",
        }
    }
}

/// Gate sub-record attached to every leave.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRecord {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_time: Option<DateTime<Utc>>,
    /// Officer who logged the return; `decided_by` keeps the one who let the student out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_by: Option<ActorId>,
    pub current_status: GatePresence,
}

/// Canonical gender partition used to route leaves to wardens and security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Case-insensitive parse of the free-form strings kept in staff and student rosters.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Student attributes captured from the directory when the leave is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub register_number: String,
    pub full_name: String,
    pub gender: Gender,
    pub hostel: String,
}

/// Student-provided request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveSubmission {
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

/// Persisted leave record; the store only ever replaces it as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveId,
    pub student_id: StudentId,
    pub student: StudentSnapshot,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub status: LeaveStatus,
    pub parent_approval: ApprovalSlot,
    pub tutor_approval: ApprovalSlot,
    pub final_approval: ApprovalSlot,
    pub security: GateRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub owner_route: ActorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl LeaveRequest {
    /// True once every approval this leave type requires has been granted.
    pub fn requirements_met(&self) -> bool {
        match self.leave_type {
            LeaveType::Emergency => {
                self.parent_approval.is_granted() && self.tutor_approval.is_granted()
            }
            LeaveType::Holiday => self.parent_approval.is_granted(),
        }
    }

    /// Approved and signed off by the warden; the only state security may act on.
    pub fn is_gate_cleared(&self) -> bool {
        self.status == LeaveStatus::Approved && self.final_approval.is_granted()
    }

    /// Date window overlap, inclusive on both ends.
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start_date <= to && self.end_date >= from
    }
}
