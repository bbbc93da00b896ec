use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::WorkflowConfig;
use crate::workflows::leave::directory::{ParentProfile, StaffProfile, StudentProfile};
use crate::workflows::leave::domain::{
    ActorId, LeaveId, LeaveRequest, LeaveSubmission, LeaveType, StudentId,
};
use crate::workflows::leave::intake::IntakeGuard;
use crate::workflows::leave::memory::{InMemoryDirectory, InMemoryLeaveRepository, Roster};
use crate::workflows::leave::policy::{Actor, ActorRole, AuthenticatedIdentity};
use crate::workflows::leave::repository::{LeaveFilter, LeaveRepository, RepositoryError};
use crate::workflows::leave::LeaveWorkflowService;

pub(super) const RAVI: &str = "stu-ravi";
pub(super) const RAVI_REGISTER: &str = "21CS001";
pub(super) const VIKRAM: &str = "stu-vikram";
pub(super) const VIKRAM_REGISTER: &str = "21ME019";
pub(super) const MEERA: &str = "stu-meera";
pub(super) const MEERA_REGISTER: &str = "21CS044";
pub(super) const ARUN: &str = "wdn-arun";
pub(super) const LAKSHMI: &str = "wdn-lakshmi";
pub(super) const GATE_MALE: &str = "sec-north";
pub(super) const GATE_FEMALE: &str = "sec-south";
pub(super) const RAVI_PARENT: &str = "par-ravi";
pub(super) const MEERA_PARENT: &str = "par-meera";

pub(super) type MemoryService = LeaveWorkflowService<InMemoryLeaveRepository, InMemoryDirectory>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn ravi_profile() -> StudentProfile {
    StudentProfile {
        id: StudentId(RAVI.to_string()),
        register_number: RAVI_REGISTER.to_string(),
        full_name: "Ravi Kumar".to_string(),
        gender: "male".to_string(),
        hostel: "Kaveri".to_string(),
        warden_id: ActorId(ARUN.to_string()),
    }
}

pub(super) fn vikram_profile() -> StudentProfile {
    StudentProfile {
        id: StudentId(VIKRAM.to_string()),
        register_number: VIKRAM_REGISTER.to_string(),
        full_name: "Vikram Rao".to_string(),
        gender: "Male".to_string(),
        hostel: "Tungabhadra".to_string(),
        warden_id: ActorId(ARUN.to_string()),
    }
}

pub(super) fn meera_profile() -> StudentProfile {
    StudentProfile {
        id: StudentId(MEERA.to_string()),
        register_number: MEERA_REGISTER.to_string(),
        full_name: "Meera Iyer".to_string(),
        gender: "Female".to_string(),
        hostel: "Godavari".to_string(),
        warden_id: ActorId(LAKSHMI.to_string()),
    }
}

pub(super) fn staff(id: &str, name: &str, gender: &str) -> StaffProfile {
    StaffProfile {
        id: ActorId(id.to_string()),
        name: name.to_string(),
        gender: gender.to_string(),
        assigned_hostel: None,
    }
}

pub(super) fn roster() -> Roster {
    Roster {
        students: vec![ravi_profile(), vikram_profile(), meera_profile()],
        wardens: vec![
            staff(ARUN, "Arun Prakash", "MALE"),
            staff(LAKSHMI, "Lakshmi Narayanan", "female"),
        ],
        security: vec![
            staff(GATE_MALE, "North Gate", "Male"),
            staff(GATE_FEMALE, "South Gate", "Female"),
        ],
        parents: vec![
            ParentProfile {
                id: ActorId(RAVI_PARENT.to_string()),
                parent_name: "Suresh Kumar".to_string(),
                student_register_number: RAVI_REGISTER.to_string(),
            },
            ParentProfile {
                id: ActorId(MEERA_PARENT.to_string()),
                parent_name: "Anitha Iyer".to_string(),
                student_register_number: MEERA_REGISTER.to_string(),
            },
        ],
    }
}

pub(super) fn directory() -> InMemoryDirectory {
    InMemoryDirectory::from_roster(roster())
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryLeaveRepository>) {
    build_service_with(WorkflowConfig::default())
}

pub(super) fn build_service_with(
    config: WorkflowConfig,
) -> (MemoryService, Arc<InMemoryLeaveRepository>) {
    let repository = Arc::new(InMemoryLeaveRepository::default());
    let service = LeaveWorkflowService::new(repository.clone(), Arc::new(directory()), config);
    (service, repository)
}

pub(super) fn identity(role: ActorRole, id: &str) -> AuthenticatedIdentity {
    AuthenticatedIdentity {
        role,
        id: id.to_string(),
    }
}

pub(super) fn actor<R, D>(
    service: &LeaveWorkflowService<R, D>,
    role: ActorRole,
    id: &str,
) -> Actor
where
    R: LeaveRepository + 'static,
    D: crate::workflows::leave::Directory + 'static,
{
    service
        .resolve(&identity(role, id))
        .expect("actor resolves from roster")
}

pub(super) fn holiday_submission() -> LeaveSubmission {
    LeaveSubmission {
        leave_type: LeaveType::Holiday,
        start_date: date(2025, 3, 14),
        end_date: date(2025, 3, 17),
        reason: "Family function in Madurai".to_string(),
        emergency_contact: None,
        destination: None,
    }
}

pub(super) fn emergency_submission() -> LeaveSubmission {
    LeaveSubmission {
        leave_type: LeaveType::Emergency,
        start_date: date(2025, 3, 11),
        end_date: date(2025, 3, 12),
        reason: "Grandmother hospitalised".to_string(),
        emergency_contact: Some("+91 98400 12345".to_string()),
        destination: Some("Coimbatore".to_string()),
    }
}

/// A fresh `pending` record built without touching a store.
pub(super) fn pending_leave(submission: LeaveSubmission) -> LeaveRequest {
    IntakeGuard
        .leave_from_submission(
            LeaveId("leave-test".to_string()),
            &ravi_profile(),
            submission,
            at(8),
        )
        .expect("fixture submission is valid")
}

pub(super) fn officer(id: &str) -> ActorId {
    ActorId(id.to_string())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is valid json")
}

/// Store whose first `stale_writes` replaces lose a simulated race.
#[derive(Debug, Default)]
pub(super) struct RacingRepository {
    inner: InMemoryLeaveRepository,
    stale_writes: AtomicUsize,
}

impl RacingRepository {
    pub(super) fn losing(stale_writes: usize) -> Self {
        Self {
            inner: InMemoryLeaveRepository::default(),
            stale_writes: AtomicUsize::new(stale_writes),
        }
    }

    pub(super) fn remaining_stale_writes(&self) -> usize {
        self.stale_writes.load(Ordering::SeqCst)
    }
}

impl LeaveRepository for RacingRepository {
    fn insert(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn replace(
        &self,
        record: LeaveRequest,
        expected_version: u64,
    ) -> Result<LeaveRequest, RepositoryError> {
        let lost = self
            .stale_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if lost {
            return Err(RepositoryError::StaleVersion {
                expected: expected_version,
                found: expected_version + 1,
            });
        }
        self.inner.replace(record, expected_version)
    }

    fn scan(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        self.inner.scan(filter)
    }
}

#[derive(Debug, Default)]
pub(super) struct UnavailableRepository;

impl LeaveRepository for UnavailableRepository {
    fn insert(&self, _record: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("maintenance window".to_string()))
    }

    fn fetch(&self, _id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("maintenance window".to_string()))
    }

    fn replace(
        &self,
        _record: LeaveRequest,
        _expected_version: u64,
    ) -> Result<LeaveRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("maintenance window".to_string()))
    }

    fn scan(&self, _filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("maintenance window".to_string()))
    }
}

pub(super) fn racing_service(
    stale_writes: usize,
    config: WorkflowConfig,
) -> (
    LeaveWorkflowService<RacingRepository, InMemoryDirectory>,
    Arc<RacingRepository>,
) {
    let repository = Arc::new(RacingRepository::losing(stale_writes));
    let service = LeaveWorkflowService::new(repository.clone(), Arc::new(directory()), config);
    (service, repository)
}
