use chrono::NaiveDate;
use gatepass::error::AppError;
use gatepass::workflows::leave::{
    ActorId, InMemoryDirectory, ParentProfile, Roster, StaffProfile, StudentId, StudentProfile,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Read a JSON roster from disk into a directory.
pub(crate) fn load_directory(path: &Path) -> Result<InMemoryDirectory, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let roster: Roster = serde_json::from_str(&raw).map_err(|source| AppError::Roster {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(InMemoryDirectory::from_roster(roster))
}

/// Two hostels, one per partition, with a warden, a gate officer, and a student each.
pub(crate) fn sample_roster() -> Roster {
    Roster {
        students: vec![
            StudentProfile {
                id: StudentId("stu-kiran".to_string()),
                register_number: "23EC112".to_string(),
                full_name: "Kiran Das".to_string(),
                gender: "Male".to_string(),
                hostel: "Cauvery".to_string(),
                warden_id: ActorId("wdn-suresh".to_string()),
            },
            StudentProfile {
                id: StudentId("stu-anjali".to_string()),
                register_number: "23EC087".to_string(),
                full_name: "Anjali Nair".to_string(),
                gender: "Female".to_string(),
                hostel: "Tunga".to_string(),
                warden_id: ActorId("wdn-deepa".to_string()),
            },
        ],
        wardens: vec![
            StaffProfile {
                id: ActorId("wdn-suresh".to_string()),
                name: "Suresh Babu".to_string(),
                gender: "Male".to_string(),
                assigned_hostel: Some("Cauvery".to_string()),
            },
            StaffProfile {
                id: ActorId("wdn-deepa".to_string()),
                name: "Deepa Iyer".to_string(),
                gender: "Female".to_string(),
                assigned_hostel: Some("Tunga".to_string()),
            },
        ],
        security: vec![
            StaffProfile {
                id: ActorId("sec-east".to_string()),
                name: "East Gate".to_string(),
                gender: "Male".to_string(),
                assigned_hostel: None,
            },
            StaffProfile {
                id: ActorId("sec-west".to_string()),
                name: "West Gate".to_string(),
                gender: "Female".to_string(),
                assigned_hostel: None,
            },
        ],
        parents: vec![
            ParentProfile {
                id: ActorId("par-das".to_string()),
                parent_name: "Mohan Das".to_string(),
                student_register_number: "23EC112".to_string(),
            },
            ParentProfile {
                id: ActorId("par-nair".to_string()),
                parent_name: "Sheela Nair".to_string(),
                student_register_number: "23EC087".to_string(),
            },
        ],
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
