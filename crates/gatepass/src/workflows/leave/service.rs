use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::WorkflowConfig;

use super::approval::{self, ApproverRole, InvalidTransition, TransitionError, Verdict};
use super::directory::{Directory, DirectoryError};
use super::domain::{LeaveId, LeaveRequest, LeaveStatus, LeaveSubmission};
use super::gate;
use super::intake::{IntakeGuard, SubmissionViolation};
use super::policy::{
    self, AccessDenied, Actor, AuthenticatedIdentity, IdentityError, PolicyAction,
};
use super::reports::{self, ActivePass, ExitAnalyticsRow, GateQueue, GateSummary};
use super::repository::{LeaveFilter, LeaveRepository, RepositoryError};

/// Service composing the intake guard, visibility policy, state machine, and store.
///
/// Every mutation follows the same shape: read the record, check the actor against
/// it, run the pure transition, then write back guarded by the version that was
/// read. A lost race surfaces as [`LeaveServiceError::Conflict`] unless the
/// configured retry budget allows the whole sequence to run again on fresh state.
pub struct LeaveWorkflowService<R, D> {
    guard: IntakeGuard,
    repository: Arc<R>,
    directory: Arc<D>,
    config: WorkflowConfig,
}

static LEAVE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_leave_id() -> LeaveId {
    let id = LEAVE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LeaveId(format!("leave-{id:06}"))
}

impl<R, D> LeaveWorkflowService<R, D>
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>, config: WorkflowConfig) -> Self {
        Self {
            guard: IntakeGuard,
            repository,
            directory,
            config,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Scope an authenticated identity using the rosters.
    pub fn resolve(&self, identity: &AuthenticatedIdentity) -> Result<Actor, LeaveServiceError> {
        policy::resolve_actor(identity, self.directory.as_ref()).map_err(|error| {
            warn!(role = %identity.role, id = %identity.id, %error, "identity rejected");
            LeaveServiceError::Identity(error)
        })
    }

    /// Validate and store a new `pending` leave for the acting student.
    pub fn submit_leave(
        &self,
        actor: &Actor,
        submission: LeaveSubmission,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let student_id = match actor {
            Actor::Student { id } => id,
            _ => {
                return Err(self.denied(AccessDenied::RoleNotPermitted {
                    role: actor.role(),
                    action: PolicyAction::Submit,
                }))
            }
        };

        let profile = self.directory.student(student_id)?.ok_or_else(|| {
            LeaveServiceError::Identity(IdentityError::UnknownActor {
                role: actor.role(),
                id: student_id.0.clone(),
            })
        })?;

        let record =
            self.guard
                .leave_from_submission(next_leave_id(), &profile, submission, Utc::now())?;
        let stored = self.repository.insert(record)?;

        info!(
            leave_id = %stored.id,
            register_number = %stored.student.register_number,
            leave_type = stored.leave_type.label(),
            "leave submitted"
        );
        Ok(stored)
    }

    /// Record a parent, tutor, or warden decision.
    pub fn decide(
        &self,
        actor: &Actor,
        leave_id: &LeaveId,
        role: ApproverRole,
        verdict: Verdict,
        reason: Option<String>,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let action = match (role, verdict) {
            (ApproverRole::Warden, Verdict::Grant) => PolicyAction::FinalApprove,
            _ => PolicyAction::Decide(role),
        };
        let actor_id = actor.actor_id();

        let stored = self.mutate(actor, leave_id, action, |leave| {
            approval::apply_decision(leave, role, verdict, &actor_id, reason.clone(), Utc::now())
                .map_err(LeaveServiceError::from)
        })?;

        info!(
            leave_id = %stored.id,
            %role,
            verdict = ?verdict,
            status = %stored.status,
            actor = %actor_id,
            "decision recorded"
        );
        Ok(stored)
    }

    /// The warden's final gatekeeping approval.
    pub fn final_approve(
        &self,
        actor: &Actor,
        leave_id: &LeaveId,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let actor_id = actor.actor_id();
        let stored = self.mutate(actor, leave_id, PolicyAction::FinalApprove, |leave| {
            approval::final_approve(leave, &actor_id, Utc::now()).map_err(LeaveServiceError::from)
        })?;

        info!(leave_id = %stored.id, actor = %actor_id, "final approval granted");
        Ok(stored)
    }

    pub fn record_exit(
        &self,
        actor: &Actor,
        leave_id: &LeaveId,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let actor_id = actor.actor_id();
        let stored = self.mutate(actor, leave_id, PolicyAction::RecordGateEvent, |leave| {
            gate::record_exit(leave, &actor_id, Utc::now()).map_err(LeaveServiceError::from)
        })?;

        info!(leave_id = %stored.id, officer = %actor_id, "student exited");
        Ok(stored)
    }

    pub fn record_return(
        &self,
        actor: &Actor,
        leave_id: &LeaveId,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let actor_id = actor.actor_id();
        let stored = self.mutate(actor, leave_id, PolicyAction::RecordGateEvent, |leave| {
            gate::record_return(leave, &actor_id, Utc::now()).map_err(LeaveServiceError::from)
        })?;

        info!(leave_id = %stored.id, officer = %actor_id, "student returned");
        Ok(stored)
    }

    /// Fetch one leave the actor is allowed to see.
    pub fn get_leave(
        &self,
        actor: &Actor,
        leave_id: &LeaveId,
    ) -> Result<LeaveRequest, LeaveServiceError> {
        let leave = self.load(leave_id)?;
        policy::authorize(actor, PolicyAction::Read, &leave).map_err(|denied| self.denied(denied))?;
        Ok(leave)
    }

    /// Leaves matching `filter`, narrowed to what the actor may see. Newest first.
    pub fn list_leaves(
        &self,
        actor: &Actor,
        filter: &LeaveFilter,
    ) -> Result<impl Iterator<Item = LeaveRequest>, LeaveServiceError> {
        let scoped = policy::scope_filter(actor);
        let records = self.repository.scan(&scoped)?;
        let filter = filter.clone();
        let actor = actor.clone();
        Ok(records
            .into_iter()
            .filter(move |leave| filter.matches(leave) && policy::visible(&actor, leave)))
    }

    pub fn gate_summary(&self, actor: &Actor) -> Result<GateSummary, LeaveServiceError> {
        let leaves = self.report_scan(
            actor,
            PolicyAction::ViewGateReports,
            [LeaveStatus::Approved, LeaveStatus::Exited, LeaveStatus::Returned],
        )?;
        Ok(GateSummary::from_leaves(&leaves))
    }

    /// Leaves in the actor's partition still waiting on a decision.
    pub fn pending_count(&self, actor: &Actor) -> Result<usize, LeaveServiceError> {
        let leaves = self.report_scan(
            actor,
            PolicyAction::ViewWardenReports,
            LeaveStatus::ALL
                .into_iter()
                .filter(|status| status.accepts_decisions()),
        )?;
        Ok(leaves.len())
    }

    pub fn exit_analytics(
        &self,
        actor: &Actor,
    ) -> Result<Vec<ExitAnalyticsRow>, LeaveServiceError> {
        let leaves =
            self.report_scan(actor, PolicyAction::ViewWardenReports, [LeaveStatus::Exited])?;
        Ok(reports::exit_analytics(&leaves))
    }

    /// Gate lookup by register number. `None` when the student holds no live pass.
    pub fn active_pass(
        &self,
        actor: &Actor,
        register_number: &str,
    ) -> Result<Option<ActivePass>, LeaveServiceError> {
        policy::permits(actor, PolicyAction::ViewGateReports)
            .map_err(|denied| self.denied(denied))?;
        let filter = LeaveFilter {
            register_number: Some(register_number.trim().to_string()),
            ..policy::scope_filter(actor)
        }
        .with_statuses([LeaveStatus::Approved, LeaveStatus::Exited]);
        let leaves = self.repository.scan(&filter)?;
        Ok(reports::active_pass(&leaves))
    }

    pub fn gate_queue(
        &self,
        actor: &Actor,
        queue: GateQueue,
    ) -> Result<Vec<LeaveRequest>, LeaveServiceError> {
        let statuses = queue.statuses().iter().copied();
        let leaves = self.report_scan(actor, PolicyAction::ViewGateReports, statuses)?;
        Ok(queue.arrange(leaves))
    }

    fn report_scan(
        &self,
        actor: &Actor,
        action: PolicyAction,
        statuses: impl IntoIterator<Item = LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>, LeaveServiceError> {
        policy::permits(actor, action).map_err(|denied| self.denied(denied))?;
        let filter = policy::scope_filter(actor).with_statuses(statuses);
        Ok(self.repository.scan(&filter)?)
    }

    fn load(&self, leave_id: &LeaveId) -> Result<LeaveRequest, LeaveServiceError> {
        self.repository
            .fetch(leave_id)?
            .ok_or_else(|| LeaveServiceError::NotFound(leave_id.clone()))
    }

    fn mutate<F>(
        &self,
        actor: &Actor,
        leave_id: &LeaveId,
        action: PolicyAction,
        transition: F,
    ) -> Result<LeaveRequest, LeaveServiceError>
    where
        F: Fn(LeaveRequest) -> Result<LeaveRequest, LeaveServiceError>,
    {
        let mut attempt: u8 = 0;
        loop {
            let current = self.load(leave_id)?;
            policy::authorize(actor, action, &current).map_err(|denied| self.denied(denied))?;

            let expected_version = current.version;
            let next = transition(current)?;

            match self.repository.replace(next, expected_version) {
                Ok(stored) => return Ok(stored),
                Err(RepositoryError::StaleVersion { found, .. })
                    if attempt < self.config.conflict_retries =>
                {
                    attempt += 1;
                    debug!(
                        %leave_id,
                        expected_version,
                        found,
                        attempt,
                        "stale write, re-evaluating against fresh state"
                    );
                }
                Err(RepositoryError::StaleVersion { found, .. }) => {
                    warn!(%leave_id, expected_version, found, %action, "concurrent update lost");
                    return Err(LeaveServiceError::Conflict {
                        leave_id: leave_id.clone(),
                    });
                }
                Err(RepositoryError::NotFound) => {
                    return Err(LeaveServiceError::NotFound(leave_id.clone()))
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    fn denied(&self, denied: AccessDenied) -> LeaveServiceError {
        warn!(%denied, "access denied");
        LeaveServiceError::Authorization(denied)
    }
}

/// Error raised by the leave workflow service.
#[derive(Debug, thiserror::Error)]
pub enum LeaveServiceError {
    #[error(transparent)]
    Validation(#[from] SubmissionViolation),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("{missing} approval required before final warden approval")]
    PreconditionNotMet { missing: ApproverRole },
    #[error(transparent)]
    Authorization(#[from] AccessDenied),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("leave {leave_id} was modified concurrently; re-read and retry")]
    Conflict { leave_id: LeaveId },
    #[error("leave {0} not found")]
    NotFound(LeaveId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl LeaveServiceError {
    /// Whether re-issuing the same call against fresh state may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LeaveServiceError::Conflict { .. })
    }
}

impl From<TransitionError> for LeaveServiceError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::Invalid(invalid) => Self::InvalidTransition(invalid),
            TransitionError::PreconditionNotMet { missing } => Self::PreconditionNotMet { missing },
        }
    }
}
