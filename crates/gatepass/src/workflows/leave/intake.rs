use chrono::{DateTime, Utc};

use super::directory::StudentProfile;
use super::domain::{
    ApprovalSlot, Gender, GateRecord, LeaveId, LeaveRequest, LeaveStatus, LeaveSubmission,
    LeaveType, StudentSnapshot,
};

/// Validation errors raised before a leave record exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionViolation {
    #[error("a reason is required")]
    MissingReason,
    #[error("emergency leave requires an emergency contact")]
    MissingEmergencyContact,
    #[error("emergency leave requires a destination")]
    MissingDestination,
    #[error("end date {end} is before start date {start}")]
    InvertedDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("student {register_number} has no recognised gender partition ('{raw}')")]
    UnroutableStudent { register_number: String, raw: String },
}

/// Guard responsible for turning a submission into a fresh `pending` record.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    /// Validate a submission and build the initial record for `student`.
    ///
    /// Emergency-only fields are discarded for holiday leave.
    pub fn leave_from_submission(
        &self,
        id: LeaveId,
        student: &StudentProfile,
        submission: LeaveSubmission,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, SubmissionViolation> {
        let reason = submission.reason.trim();
        if reason.is_empty() {
            return Err(SubmissionViolation::MissingReason);
        }

        if submission.end_date < submission.start_date {
            return Err(SubmissionViolation::InvertedDateRange {
                start: submission.start_date,
                end: submission.end_date,
            });
        }

        let (emergency_contact, destination) = match submission.leave_type {
            LeaveType::Emergency => {
                let contact = non_blank(submission.emergency_contact)
                    .ok_or(SubmissionViolation::MissingEmergencyContact)?;
                let destination = non_blank(submission.destination)
                    .ok_or(SubmissionViolation::MissingDestination)?;
                (Some(contact), Some(destination))
            }
            LeaveType::Holiday => (None, None),
        };

        let gender =
            Gender::parse(&student.gender).ok_or_else(|| SubmissionViolation::UnroutableStudent {
                register_number: student.register_number.clone(),
                raw: student.gender.clone(),
            })?;

        Ok(LeaveRequest {
            id,
            student_id: student.id.clone(),
            student: StudentSnapshot {
                register_number: student.register_number.clone(),
                full_name: student.full_name.clone(),
                gender,
                hostel: student.hostel.clone(),
            },
            leave_type: submission.leave_type,
            start_date: submission.start_date,
            end_date: submission.end_date,
            reason: reason.to_string(),
            emergency_contact,
            destination,
            status: LeaveStatus::Pending,
            parent_approval: ApprovalSlot::default(),
            tutor_approval: ApprovalSlot::default(),
            final_approval: ApprovalSlot::default(),
            security: GateRecord::default(),
            rejection_reason: None,
            owner_route: student.warden_id.clone(),
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
