use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Display, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    #[display("scheduled")]
    Scheduled,
    #[display("completed")]
    Completed,
    #[display("cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Appointment {
    pub id: String,
    pub pet_id: String,
    pub appointment_date: DateTime<Utc>,
    pub service_type: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewAppointment {
    pub pet_id: String,
    pub appointment_date: DateTime<Utc>,
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: AppointmentStatus,
}

/// Partial appointment update, see [`crate::models::pet::UpdatePet`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateAppointment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

impl UpdateAppointment {
    pub fn with_status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
