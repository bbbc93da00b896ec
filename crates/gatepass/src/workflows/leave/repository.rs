use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Gender, LeaveId, LeaveRequest, LeaveStatus, StudentId};

/// Inclusive calendar window; a leave matches when its range overlaps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Query over stored leaves. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveFilter {
    pub student_id: Option<StudentId>,
    pub register_number: Option<String>,
    pub gender: Option<Gender>,
    pub hostel: Option<String>,
    /// Empty means any status.
    pub statuses: Vec<LeaveStatus>,
    pub window: Option<DateWindow>,
}

impl LeaveFilter {
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = LeaveStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn within(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.window = Some(DateWindow { from, to });
        self
    }

    pub fn matches(&self, leave: &LeaveRequest) -> bool {
        if let Some(student_id) = &self.student_id {
            if leave.student_id != *student_id {
                return false;
            }
        }
        if let Some(register_number) = &self.register_number {
            if leave.student.register_number != *register_number {
                return false;
            }
        }
        if let Some(gender) = self.gender {
            if leave.student.gender != gender {
                return false;
            }
        }
        if let Some(hostel) = &self.hostel {
            if !leave.student.hostel.eq_ignore_ascii_case(hostel) {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&leave.status) {
            return false;
        }
        match self.window {
            Some(window) => leave.overlaps(window.from, window.to),
            None => true,
        }
    }
}

/// Storage abstraction for leave records.
///
/// Records are only ever replaced whole. `replace` is a compare-and-swap on the
/// record version: it succeeds only if the stored version still equals
/// `expected_version`, and stores the record with the version incremented.
pub trait LeaveRepository: Send + Sync {
    fn insert(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError>;
    fn fetch(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError>;
    fn replace(
        &self,
        record: LeaveRequest,
        expected_version: u64,
    ) -> Result<LeaveRequest, RepositoryError>;
    /// Matching records, most recently created first.
    fn scan(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("record changed concurrently (expected version {expected}, found {found})")]
    StaleVersion { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
