use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use gatepass::config::WorkflowConfig;
use gatepass::workflows::leave::{
    AccessDenied, ActorId, ActorRole, ApproverRole, AuthenticatedIdentity, InMemoryDirectory,
    InMemoryLeaveRepository, InvalidTransition, LeaveRequest, LeaveServiceError, LeaveStatus,
    LeaveSubmission, LeaveType, LeaveWorkflowService, ParentProfile, StaffProfile, StudentId,
    StudentProfile, SubmissionViolation, Verdict,
};

type Service = LeaveWorkflowService<InMemoryLeaveRepository, InMemoryDirectory>;

fn campus() -> InMemoryDirectory {
    InMemoryDirectory::default()
        .with_student(StudentProfile {
            id: StudentId("stu-arjun".to_string()),
            register_number: "22ME017".to_string(),
            full_name: "Arjun Menon".to_string(),
            gender: "Male".to_string(),
            hostel: "Nilgiri".to_string(),
            warden_id: ActorId("wdn-joseph".to_string()),
        })
        .with_warden(StaffProfile {
            id: ActorId("wdn-joseph".to_string()),
            name: "Joseph Mathew".to_string(),
            gender: "male".to_string(),
            assigned_hostel: Some("Nilgiri".to_string()),
        })
        .with_warden(StaffProfile {
            id: ActorId("wdn-priya".to_string()),
            name: "Priya Raman".to_string(),
            gender: "female".to_string(),
            assigned_hostel: Some("Vaigai".to_string()),
        })
        .with_security(StaffProfile {
            id: ActorId("sec-main".to_string()),
            name: "Main Gate".to_string(),
            gender: "Male".to_string(),
            assigned_hostel: None,
        })
        .with_security(StaffProfile {
            id: ActorId("sec-annex".to_string()),
            name: "Annex Gate".to_string(),
            gender: "Male".to_string(),
            assigned_hostel: None,
        })
        .with_parent(ParentProfile {
            id: ActorId("par-menon".to_string()),
            parent_name: "Lata Menon".to_string(),
            student_register_number: "22ME017".to_string(),
        })
}

fn service() -> Service {
    LeaveWorkflowService::new(
        Arc::new(InMemoryLeaveRepository::default()),
        Arc::new(campus()),
        WorkflowConfig::default(),
    )
}

fn as_actor(service: &Service, role: ActorRole, id: &str) -> gatepass::workflows::leave::Actor {
    service
        .resolve(&AuthenticatedIdentity {
            role,
            id: id.to_string(),
        })
        .expect("identity resolves")
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn family_event() -> LeaveSubmission {
    LeaveSubmission {
        leave_type: LeaveType::Holiday,
        start_date: date(2024, 6, 1),
        end_date: date(2024, 6, 10),
        reason: "family event".to_string(),
        emergency_contact: None,
        destination: None,
    }
}

fn emergency() -> LeaveSubmission {
    LeaveSubmission {
        leave_type: LeaveType::Emergency,
        start_date: date(2024, 6, 3),
        end_date: date(2024, 6, 4),
        reason: "father admitted to hospital".to_string(),
        emergency_contact: Some("+91 94470 55555".to_string()),
        destination: Some("Kochi".to_string()),
    }
}

fn approved_holiday(service: &Service) -> LeaveRequest {
    let student = as_actor(service, ActorRole::Student, "stu-arjun");
    let parent = as_actor(service, ActorRole::Parent, "par-menon");
    let warden = as_actor(service, ActorRole::Warden, "wdn-joseph");

    let leave = service
        .submit_leave(&student, family_event())
        .expect("submission accepted");
    service
        .decide(&parent, &leave.id, ApproverRole::Parent, Verdict::Grant, None)
        .expect("parent grant");
    service
        .final_approve(&warden, &leave.id)
        .expect("final approval")
}

#[test]
fn holiday_leave_runs_from_submission_to_return() {
    let service = service();
    let gate = as_actor(&service, ActorRole::Security, "sec-main");

    let leave = approved_holiday(&service);
    assert_eq!(leave.status, LeaveStatus::Approved);
    assert_eq!(leave.start_date, date(2024, 6, 1));

    let exited = service.record_exit(&gate, &leave.id).expect("exit recorded");
    assert_eq!(exited.status, LeaveStatus::Exited);
    assert!(exited.security.exit_time.is_some());

    let returned = service
        .record_return(&gate, &leave.id)
        .expect("return recorded");
    assert_eq!(returned.status, LeaveStatus::Returned);
    assert!(returned.security.return_time.is_some());
    assert_eq!(returned.security.exit_time, exited.security.exit_time);
}

#[test]
fn emergency_without_contact_is_a_validation_error() {
    let service = service();
    let student = as_actor(&service, ActorRole::Student, "stu-arjun");
    let mut submission = emergency();
    submission.emergency_contact = None;

    match service.submit_leave(&student, submission) {
        Err(LeaveServiceError::Validation(SubmissionViolation::MissingEmergencyContact)) => {}
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn emergency_final_approval_waits_for_parent() {
    let service = service();
    let student = as_actor(&service, ActorRole::Student, "stu-arjun");
    let parent = as_actor(&service, ActorRole::Parent, "par-menon");
    let warden = as_actor(&service, ActorRole::Warden, "wdn-joseph");

    let leave = service
        .submit_leave(&student, emergency())
        .expect("submission accepted");
    service
        .decide(&warden, &leave.id, ApproverRole::Tutor, Verdict::Grant, None)
        .expect("tutor grant");

    match service.final_approve(&warden, &leave.id) {
        Err(LeaveServiceError::PreconditionNotMet {
            missing: ApproverRole::Parent,
        }) => {}
        other => panic!("expected precondition failure, got {other:?}"),
    }

    service
        .decide(&parent, &leave.id, ApproverRole::Parent, Verdict::Grant, None)
        .expect("parent grant");
    let signed = service
        .final_approve(&warden, &leave.id)
        .expect("final approval once both granted");
    assert_eq!(signed.status, LeaveStatus::Approved);
    assert!(signed.is_gate_cleared());
}

#[test]
fn rejection_closes_the_leave_for_every_role() {
    let rejecters = [
        ("par-menon", ActorRole::Parent, ApproverRole::Parent),
        ("wdn-joseph", ActorRole::Warden, ApproverRole::Tutor),
        ("wdn-joseph", ActorRole::Warden, ApproverRole::Warden),
    ];

    for (id, actor_role, approver) in rejecters {
        let service = service();
        let student = as_actor(&service, ActorRole::Student, "stu-arjun");
        let rejecter = as_actor(&service, actor_role, id);
        let parent = as_actor(&service, ActorRole::Parent, "par-menon");
        let gate = as_actor(&service, ActorRole::Security, "sec-main");

        let leave = service
            .submit_leave(&student, emergency())
            .expect("submission accepted");
        let rejected = service
            .decide(
                &rejecter,
                &leave.id,
                approver,
                Verdict::Reject,
                Some("medical concern".to_string()),
            )
            .expect("rejection recorded");
        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("medical concern"));

        assert!(matches!(
            service.decide(&parent, &leave.id, ApproverRole::Parent, Verdict::Grant, None),
            Err(LeaveServiceError::InvalidTransition(_))
        ));
        assert!(matches!(
            service.record_exit(&gate, &leave.id),
            Err(LeaveServiceError::InvalidTransition(_))
        ));
    }
}

#[test]
fn return_requires_a_prior_exit() {
    let service = service();
    let gate = as_actor(&service, ActorRole::Security, "sec-main");
    let leave = approved_holiday(&service);

    match service.record_return(&gate, &leave.id) {
        Err(LeaveServiceError::InvalidTransition(InvalidTransition::FromStatus {
            status: LeaveStatus::Approved,
            ..
        })) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn second_exit_never_restamps() {
    let service = service();
    let gate = as_actor(&service, ActorRole::Security, "sec-main");
    let other_gate = as_actor(&service, ActorRole::Security, "sec-annex");
    let leave = approved_holiday(&service);

    let first = service.record_exit(&gate, &leave.id).expect("first exit");
    assert!(matches!(
        service.record_exit(&other_gate, &leave.id),
        Err(LeaveServiceError::InvalidTransition(_))
    ));

    let stored = service.get_leave(&gate, &leave.id).expect("readable");
    assert_eq!(stored.security.exit_time, first.security.exit_time);
    assert_eq!(stored.security.decided_by, Some(ActorId("sec-main".to_string())));
}

#[test]
fn female_partition_warden_cannot_touch_male_leave() {
    let service = service();
    let student = as_actor(&service, ActorRole::Student, "stu-arjun");
    let priya = as_actor(&service, ActorRole::Warden, "wdn-priya");

    let leave = service
        .submit_leave(&student, emergency())
        .expect("submission accepted");

    assert!(matches!(
        service.decide(&priya, &leave.id, ApproverRole::Tutor, Verdict::Grant, None),
        Err(LeaveServiceError::Authorization(AccessDenied::OutsideScope { .. }))
    ));
    assert!(matches!(
        service.get_leave(&priya, &leave.id),
        Err(LeaveServiceError::Authorization(_))
    ));
    assert_eq!(
        service
            .list_leaves(&priya, &Default::default())
            .expect("list succeeds")
            .count(),
        0
    );
}

#[test]
fn concurrent_exits_admit_exactly_one() {
    let service = Arc::new(service());
    let leave = approved_holiday(&service);
    let officers = ["sec-main", "sec-annex", "sec-main", "sec-annex"];
    let barrier = Arc::new(Barrier::new(officers.len()));

    let handles: Vec<_> = officers
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            let leave_id = leave.id.clone();
            thread::spawn(move || {
                let gate = as_actor(&service, ActorRole::Security, id);
                barrier.wait();
                service.record_exit(&gate, &leave_id)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("exit thread completes"))
        .collect();

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1, "outcomes: {outcomes:?}");
    for outcome in &outcomes {
        match outcome {
            Ok(_)
            | Err(LeaveServiceError::Conflict { .. })
            | Err(LeaveServiceError::InvalidTransition(_)) => {}
            Err(other) => panic!("unexpected exit failure: {other}"),
        }
    }

    let gate = as_actor(&service, ActorRole::Security, "sec-main");
    let stored = service.get_leave(&gate, &leave.id).expect("readable");
    assert_eq!(stored.status, LeaveStatus::Exited);
    assert_eq!(stored.version, leave.version + 1);
}
