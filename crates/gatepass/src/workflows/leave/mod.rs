//! Hostel leave requests from submission to the student's return.
//!
//! A request moves through parent and tutor decisions, a final warden sign-off,
//! and two gate events recorded by security. Transitions are pure functions in
//! [`approval`] and [`gate`]; [`LeaveWorkflowService`] wraps them with the
//! visibility policy and a version-checked store write.

pub mod approval;
pub mod directory;
pub mod domain;
pub mod gate;
pub(crate) mod intake;
pub mod memory;
pub mod policy;
pub mod reports;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use approval::{ApproverRole, InvalidTransition, TransitionError, Verdict};
pub use directory::{Directory, DirectoryError, ParentProfile, StaffProfile, StudentProfile};
pub use domain::{
    ActorId, ApprovalSlot, Decision, GatePresence, GateRecord, Gender, LeaveId, LeaveRequest,
    LeaveStatus, LeaveSubmission, LeaveType, StudentId, StudentSnapshot,
};
pub use intake::SubmissionViolation;
pub use memory::{InMemoryDirectory, InMemoryLeaveRepository, Roster};
pub use policy::{AccessDenied, Actor, ActorRole, AuthenticatedIdentity, IdentityError};
pub use reports::{ActivePass, ExitAnalyticsRow, GateQueue, GateSummary};
pub use repository::{DateWindow, LeaveFilter, LeaveRepository, RepositoryError};
pub use router::{leave_router, DecisionRequest, ListQuery, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use service::{LeaveServiceError, LeaveWorkflowService};
