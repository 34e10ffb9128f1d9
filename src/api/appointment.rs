use crate::{
    error::DataResult,
    models::appointment::{Appointment, AppointmentStatus, NewAppointment, UpdateAppointment},
    repo,
};
use tracing::Instrument;

/// Appointments of a pet ordered by date, earliest first.
pub async fn list_appointments_by_pet(
    repo: &repo::ImplPetRepo,
    pet_id: &str,
) -> DataResult<Vec<Appointment>> {
    repo.list_appointments_by_pet(pet_id)
        .instrument(logfire::span!("list_appointments_by_pet"))
        .await
}

pub async fn create_appointment(
    repo: &repo::ImplPetRepo,
    appointment: &NewAppointment,
) -> DataResult<Appointment> {
    repo.create_appointment(appointment)
        .instrument(logfire::span!("create_appointment"))
        .await
}

pub async fn update_appointment(
    repo: &repo::ImplPetRepo,
    id: &str,
    changes: &UpdateAppointment,
) -> DataResult<Appointment> {
    repo.update_appointment(id, changes)
        .instrument(logfire::span!("update_appointment"))
        .await
}

/// Moves an appointment to another status, e.g. marks it completed or
/// cancelled. Nothing else on the row changes.
pub async fn set_appointment_status(
    repo: &repo::ImplPetRepo,
    id: &str,
    status: AppointmentStatus,
) -> DataResult<Appointment> {
    update_appointment(repo, id, &UpdateAppointment::with_status(status)).await
}

pub async fn delete_appointment(repo: &repo::ImplPetRepo, id: &str) -> DataResult<()> {
    repo.delete_appointment(id)
        .instrument(logfire::span!("delete_appointment"))
        .await
}
