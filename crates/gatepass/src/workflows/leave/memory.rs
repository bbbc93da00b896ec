//! In-process adapters for the store and directory seams.
//!
//! Used by the demo binary, local development servers, and tests. State lives
//! only as long as the adapter does.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::directory::{Directory, DirectoryError, ParentProfile, StaffProfile, StudentProfile};
use super::domain::{ActorId, LeaveId, LeaveRequest, StudentId};
use super::repository::{LeaveFilter, LeaveRepository, RepositoryError};

#[derive(Debug, Default, Clone)]
pub struct InMemoryLeaveRepository {
    records: Arc<Mutex<HashMap<LeaveId, LeaveRequest>>>,
}

impl InMemoryLeaveRepository {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<LeaveId, LeaveRequest>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }

    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.is_empty())
    }
}

impl LeaveRepository for InMemoryLeaveRepository {
    fn insert(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Duplicate);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn replace(
        &self,
        mut record: LeaveRequest,
        expected_version: u64,
    ) -> Result<LeaveRequest, RepositoryError> {
        let mut guard = self.lock()?;
        let stored = guard.get(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::StaleVersion {
                expected: expected_version,
                found: stored.version,
            });
        }
        record.version = expected_version + 1;
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn scan(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        let guard = self.lock()?;
        let mut matches: Vec<LeaveRequest> = guard
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matches)
    }
}

/// Serializable roster used to seed [`InMemoryDirectory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub students: Vec<StudentProfile>,
    #[serde(default)]
    pub wardens: Vec<StaffProfile>,
    #[serde(default)]
    pub security: Vec<StaffProfile>,
    #[serde(default)]
    pub parents: Vec<ParentProfile>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectory {
    students: HashMap<StudentId, StudentProfile>,
    wardens: HashMap<ActorId, StaffProfile>,
    security: HashMap<ActorId, StaffProfile>,
    parents: HashMap<ActorId, ParentProfile>,
}

impl InMemoryDirectory {
    pub fn from_roster(roster: Roster) -> Self {
        Self {
            students: keyed(roster.students, |profile| profile.id.clone()),
            wardens: keyed(roster.wardens, |profile| profile.id.clone()),
            security: keyed(roster.security, |profile| profile.id.clone()),
            parents: keyed(roster.parents, |profile| profile.id.clone()),
        }
    }

    pub fn with_student(mut self, profile: StudentProfile) -> Self {
        self.students.insert(profile.id.clone(), profile);
        self
    }

    pub fn with_warden(mut self, profile: StaffProfile) -> Self {
        self.wardens.insert(profile.id.clone(), profile);
        self
    }

    pub fn with_security(mut self, profile: StaffProfile) -> Self {
        self.security.insert(profile.id.clone(), profile);
        self
    }

    pub fn with_parent(mut self, profile: ParentProfile) -> Self {
        self.parents.insert(profile.id.clone(), profile);
        self
    }
}

fn keyed<K, V>(values: Vec<V>, key: impl Fn(&V) -> K) -> HashMap<K, V>
where
    K: std::hash::Hash + Eq,
{
    values.into_iter().map(|value| (key(&value), value)).collect()
}

impl Directory for InMemoryDirectory {
    fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, DirectoryError> {
        Ok(self.students.get(id).cloned())
    }

    fn warden(&self, id: &ActorId) -> Result<Option<StaffProfile>, DirectoryError> {
        Ok(self.wardens.get(id).cloned())
    }

    fn security(&self, id: &ActorId) -> Result<Option<StaffProfile>, DirectoryError> {
        Ok(self.security.get(id).cloned())
    }

    fn parent(&self, id: &ActorId) -> Result<Option<ParentProfile>, DirectoryError> {
        Ok(self.parents.get(id).cloned())
    }
}
