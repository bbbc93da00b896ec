use serde::{Deserialize, Serialize};

use super::domain::{ActorId, StudentId};

/// Roster entry for a student, as maintained by the hostel administration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub register_number: String,
    pub full_name: String,
    /// Free-form roster value; normalized by `Gender::parse` at the policy boundary.
    pub gender: String,
    pub hostel: String,
    pub warden_id: ActorId,
}

/// Roster entry for wardens and security officers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub id: ActorId,
    pub name: String,
    pub gender: String,
    #[serde(default)]
    pub assigned_hostel: Option<String>,
}

/// Parent account linked to exactly one student by register number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentProfile {
    pub id: ActorId,
    pub parent_name: String,
    pub student_register_number: String,
}

/// Read-only lookup into the rosters owned by the administration services.
pub trait Directory: Send + Sync {
    fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, DirectoryError>;
    fn warden(&self, id: &ActorId) -> Result<Option<StaffProfile>, DirectoryError>;
    fn security(&self, id: &ActorId) -> Result<Option<StaffProfile>, DirectoryError>;
    fn parent(&self, id: &ActorId) -> Result<Option<ParentProfile>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}
