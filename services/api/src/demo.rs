use crate::infra::{parse_date, sample_roster};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use gatepass::config::WorkflowConfig;
use gatepass::error::AppError;
use gatepass::workflows::leave::{
    Actor, ActorRole, ApproverRole, AuthenticatedIdentity, GateQueue, InMemoryDirectory,
    InMemoryLeaveRepository, LeaveRequest, LeaveServiceError, LeaveSubmission, LeaveType,
    LeaveWorkflowService, Verdict,
};
use std::sync::Arc;

type DemoService = LeaveWorkflowService<InMemoryLeaveRepository, InMemoryDirectory>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First day of the holiday leave (YYYY-MM-DD). Defaults to tomorrow.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Only run the holiday scenario.
    #[arg(long)]
    pub(crate) skip_emergency: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = args
        .start
        .unwrap_or_else(|| Local::now().date_naive() + Duration::days(1));

    let service = LeaveWorkflowService::new(
        Arc::new(InMemoryLeaveRepository::default()),
        Arc::new(InMemoryDirectory::from_roster(sample_roster())),
        WorkflowConfig::default(),
    );

    println!("Gate pass demo");
    holiday_scenario(&service, start)?;
    if !args.skip_emergency {
        emergency_scenario(&service, start)?;
    }

    let gate = actor(&service, ActorRole::Security, "sec-east")?;
    let summary = service.gate_summary(&gate)?;
    println!(
        "\nEast gate summary: {} approved | {} outside | {} returned",
        summary.approved, summary.exited, summary.returned
    );
    Ok(())
}

fn holiday_scenario(service: &DemoService, start: NaiveDate) -> Result<(), LeaveServiceError> {
    println!("\nHoliday leave for Anjali Nair (Tunga)");
    let student = actor(service, ActorRole::Student, "stu-anjali")?;
    let parent = actor(service, ActorRole::Parent, "par-nair")?;
    let warden = actor(service, ActorRole::Warden, "wdn-deepa")?;
    let gate = actor(service, ActorRole::Security, "sec-west")?;

    let leave = service.submit_leave(
        &student,
        LeaveSubmission {
            leave_type: LeaveType::Holiday,
            start_date: start,
            end_date: start + Duration::days(9),
            reason: "family event".to_string(),
            emergency_contact: None,
            destination: Some("Thrissur".to_string()),
        },
    )?;
    step("submitted", &leave);

    let leave = service.decide(&parent, &leave.id, ApproverRole::Parent, Verdict::Grant, None)?;
    step("parent granted", &leave);

    match service.record_exit(&gate, &leave.id) {
        Err(LeaveServiceError::InvalidTransition(err)) => {
            println!("  - gate refused early exit: {err}");
        }
        Err(err) => return Err(err),
        Ok(leave) => step("exited without sign-off", &leave),
    }

    let leave = service.final_approve(&warden, &leave.id)?;
    step("warden signed", &leave);

    if let Some(pass) = service.active_pass(&gate, &leave.student.register_number)? {
        println!(
            "  - gate lookup {}: {} {} to {}, cleared {}",
            pass.register_number,
            pass.full_name,
            pass.start_date,
            pass.end_date,
            pass.cleared_for_exit
        );
    }

    let leave = service.record_exit(&gate, &leave.id)?;
    step("exited", &leave);
    let leave = service.record_return(&gate, &leave.id)?;
    step("returned", &leave);
    Ok(())
}

fn emergency_scenario(service: &DemoService, start: NaiveDate) -> Result<(), LeaveServiceError> {
    println!("\nEmergency leave for Kiran Das (Cauvery)");
    let student = actor(service, ActorRole::Student, "stu-kiran")?;
    let parent = actor(service, ActorRole::Parent, "par-das")?;
    let warden = actor(service, ActorRole::Warden, "wdn-suresh")?;
    let gate = actor(service, ActorRole::Security, "sec-east")?;

    let leave = service.submit_leave(
        &student,
        LeaveSubmission {
            leave_type: LeaveType::Emergency,
            start_date: start,
            end_date: start + Duration::days(2),
            reason: "grandmother hospitalised".to_string(),
            emergency_contact: Some("+91 98450 12345".to_string()),
            destination: Some("Mysuru".to_string()),
        },
    )?;
    step("submitted", &leave);

    let leave = service.decide(&warden, &leave.id, ApproverRole::Tutor, Verdict::Grant, None)?;
    step("tutor granted", &leave);

    match service.final_approve(&warden, &leave.id) {
        Err(LeaveServiceError::PreconditionNotMet { missing }) => {
            println!("  - sign-off held: {missing} approval outstanding");
        }
        Err(err) => return Err(err),
        Ok(leave) => step("warden signed early", &leave),
    }

    let leave = service.decide(&parent, &leave.id, ApproverRole::Parent, Verdict::Grant, None)?;
    step("parent granted", &leave);
    let leave = service.final_approve(&warden, &leave.id)?;
    step("warden signed", &leave);
    let leave = service.record_exit(&gate, &leave.id)?;
    step("exited", &leave);

    let outside = service.gate_queue(&gate, GateQueue::Outside)?;
    println!("  - {} student(s) currently outside", outside.len());
    Ok(())
}

fn actor(service: &DemoService, role: ActorRole, id: &str) -> Result<Actor, LeaveServiceError> {
    service.resolve(&AuthenticatedIdentity {
        role,
        id: id.to_string(),
    })
}

fn step(label: &str, leave: &LeaveRequest) {
    println!(
        "  - {label}: {} is {} (gate: {})",
        leave.id,
        leave.status,
        leave.security.current_status.label()
    );
}
