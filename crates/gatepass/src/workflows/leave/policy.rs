//! Routing and visibility rules.
//!
//! Wardens and security officers work a gender partition rather than a fixed
//! roster: any actor of the partition may see and act on any leave in it. Parents
//! are linked to one student by register number, students only ever see their own
//! requests. Every service call resolves its actor here and is checked here before
//! the state machine is consulted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::approval::ApproverRole;
use super::directory::{Directory, DirectoryError, StaffProfile};
use super::domain::{ActorId, Gender, LeaveId, LeaveRequest, StudentId};
use super::repository::LeaveFilter;

/// Role carried by the authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Student,
    Parent,
    Warden,
    Security,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Student => "student",
            ActorRole::Parent => "parent",
            ActorRole::Warden => "warden",
            ActorRole::Security => "security",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(ActorRole::Student),
            "parent" => Ok(ActorRole::Parent),
            "warden" => Ok(ActorRole::Warden),
            "security" => Ok(ActorRole::Security),
            other => Err(format!("unknown actor role '{other}'")),
        }
    }
}

/// Role and id as asserted by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub role: ActorRole,
    pub id: String,
}

/// An authenticated actor together with the scope it may operate in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Student {
        id: StudentId,
    },
    Parent {
        id: ActorId,
        student_register_number: String,
    },
    Warden {
        id: ActorId,
        partition: Gender,
    },
    Security {
        id: ActorId,
        partition: Gender,
    },
}

impl Actor {
    pub fn role(&self) -> ActorRole {
        match self {
            Actor::Student { .. } => ActorRole::Student,
            Actor::Parent { .. } => ActorRole::Parent,
            Actor::Warden { .. } => ActorRole::Warden,
            Actor::Security { .. } => ActorRole::Security,
        }
    }

    /// Identifier recorded in `decided_by` fields.
    pub fn actor_id(&self) -> ActorId {
        match self {
            Actor::Student { id } => ActorId(id.0.clone()),
            Actor::Parent { id, .. } | Actor::Warden { id, .. } | Actor::Security { id, .. } => {
                id.clone()
            }
        }
    }
}

/// Operation an actor is attempting, for role checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Submit,
    Read,
    Decide(ApproverRole),
    FinalApprove,
    RecordGateEvent,
    ViewGateReports,
    ViewWardenReports,
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyAction::Submit => f.write_str("submit leave"),
            PolicyAction::Read => f.write_str("read leave"),
            PolicyAction::Decide(role) => write!(f, "decide as {role}"),
            PolicyAction::FinalApprove => f.write_str("give final approval"),
            PolicyAction::RecordGateEvent => f.write_str("record gate events"),
            PolicyAction::ViewGateReports => f.write_str("view gate reports"),
            PolicyAction::ViewWardenReports => f.write_str("view warden reports"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("{role} actors cannot {action}")]
    RoleNotPermitted {
        role: ActorRole,
        action: PolicyAction,
    },
    #[error("leave {leave_id} is outside the actor's scope")]
    OutsideScope { leave_id: LeaveId },
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("unknown {role} '{id}'")]
    UnknownActor { role: ActorRole, id: String },
    #[error("{role} '{id}' has no recognised gender partition ('{raw}')")]
    Unroutable {
        role: ActorRole,
        id: String,
        raw: String,
    },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Turn an authenticated identity into a scoped actor using the rosters.
pub fn resolve_actor<D>(
    identity: &AuthenticatedIdentity,
    directory: &D,
) -> Result<Actor, IdentityError>
where
    D: Directory + ?Sized,
{
    let unknown = || IdentityError::UnknownActor {
        role: identity.role,
        id: identity.id.clone(),
    };
    let actor_id = ActorId(identity.id.clone());

    match identity.role {
        ActorRole::Student => {
            let id = StudentId(identity.id.clone());
            directory.student(&id)?.ok_or_else(unknown)?;
            Ok(Actor::Student { id })
        }
        ActorRole::Parent => {
            let parent = directory.parent(&actor_id)?.ok_or_else(unknown)?;
            Ok(Actor::Parent {
                id: parent.id,
                student_register_number: parent.student_register_number,
            })
        }
        ActorRole::Warden => {
            let staff = directory.warden(&actor_id)?.ok_or_else(unknown)?;
            let partition = partition_of(identity.role, &staff)?;
            Ok(Actor::Warden {
                id: staff.id,
                partition,
            })
        }
        ActorRole::Security => {
            let staff = directory.security(&actor_id)?.ok_or_else(unknown)?;
            let partition = partition_of(identity.role, &staff)?;
            Ok(Actor::Security {
                id: staff.id,
                partition,
            })
        }
    }
}

fn partition_of(role: ActorRole, staff: &StaffProfile) -> Result<Gender, IdentityError> {
    Gender::parse(&staff.gender).ok_or_else(|| IdentityError::Unroutable {
        role,
        id: staff.id.0.clone(),
        raw: staff.gender.clone(),
    })
}

/// Whether `actor` may see `leave` at all.
pub fn visible(actor: &Actor, leave: &LeaveRequest) -> bool {
    match actor {
        Actor::Student { id } => leave.student_id == *id,
        Actor::Parent {
            student_register_number,
            ..
        } => leave.student.register_number == *student_register_number,
        Actor::Warden { partition, .. } | Actor::Security { partition, .. } => {
            leave.student.gender == *partition
        }
    }
}

/// Role check that does not depend on any particular leave.
pub fn permits(actor: &Actor, action: PolicyAction) -> Result<(), AccessDenied> {
    let allowed = match (actor, action) {
        (_, PolicyAction::Read) => true,
        (Actor::Student { .. }, PolicyAction::Submit) => true,
        (Actor::Parent { .. }, PolicyAction::Decide(ApproverRole::Parent)) => true,
        // Wardens fill the tutor and final slots, and may log a parent's decision taken by phone.
        (Actor::Warden { .. }, PolicyAction::Decide(_)) => true,
        (Actor::Warden { .. }, PolicyAction::FinalApprove) => true,
        (Actor::Warden { .. }, PolicyAction::ViewWardenReports) => true,
        (Actor::Security { .. }, PolicyAction::RecordGateEvent) => true,
        (Actor::Security { .. } | Actor::Warden { .. }, PolicyAction::ViewGateReports) => true,
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AccessDenied::RoleNotPermitted {
            role: actor.role(),
            action,
        })
    }
}

/// Role check followed by the visibility check for a concrete leave.
pub fn authorize(
    actor: &Actor,
    action: PolicyAction,
    leave: &LeaveRequest,
) -> Result<(), AccessDenied> {
    permits(actor, action)?;
    if visible(actor, leave) {
        Ok(())
    } else {
        Err(AccessDenied::OutsideScope {
            leave_id: leave.id.clone(),
        })
    }
}

/// Store filter covering exactly the actor's scope.
pub fn scope_filter(actor: &Actor) -> LeaveFilter {
    match actor {
        Actor::Student { id } => LeaveFilter {
            student_id: Some(id.clone()),
            ..LeaveFilter::default()
        },
        Actor::Parent {
            student_register_number,
            ..
        } => LeaveFilter {
            register_number: Some(student_register_number.clone()),
            ..LeaveFilter::default()
        },
        Actor::Warden { partition, .. } | Actor::Security { partition, .. } => LeaveFilter {
            gender: Some(*partition),
            ..LeaveFilter::default()
        },
    }
}
