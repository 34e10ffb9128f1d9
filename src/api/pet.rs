//! # Pet API Module
//!
//! Pet CRUD plus the aggregate views built on top of it: creating several
//! pets at once, idempotent removal and the full pet profile.

use crate::{
    error::DataResult,
    models::{
        appointment::{Appointment, AppointmentStatus},
        pet::{NewPet, Pet, UpdatePet},
        photo::PetPhoto,
    },
    repo,
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::Instrument;

/// Lists every pet visible to the caller, newest first.
pub async fn list_pets(repo: &repo::ImplPetRepo) -> DataResult<Vec<Pet>> {
    repo.list_pets().instrument(logfire::span!("list_pets")).await
}

/// Retrieves a single pet.
///
/// # Errors
/// Returns a `NotFound` error when no visible pet has this id.
pub async fn get_pet(repo: &repo::ImplPetRepo, id: &str) -> DataResult<Pet> {
    repo.get_pet(id).instrument(logfire::span!("get_pet")).await
}

/// Creates a pet. The stored record comes back with its id and timestamps.
pub async fn create_pet(repo: &repo::ImplPetRepo, pet: &NewPet) -> DataResult<Pet> {
    repo.create_pet(pet)
        .instrument(logfire::span!("create_pet"))
        .await
}

/// Creates several pets concurrently, one request per pet.
///
/// There is no transaction: when one insert fails the error is returned and
/// the inserts that already succeeded stay in place.
///
/// # Returns
/// * `DataResult<Vec<Pet>>` - The stored pets, in the order they were given
pub async fn create_pets(repo: &repo::ImplPetRepo, pets: &[NewPet]) -> DataResult<Vec<Pet>> {
    try_join_all(pets.iter().map(|pet| repo.create_pet(pet)))
        .instrument(logfire::span!("create_pets"))
        .await
}

/// Applies a partial update. Only the supplied fields change, the backend
/// refreshes `updated_at`.
pub async fn update_pet(
    repo: &repo::ImplPetRepo,
    id: &str,
    changes: &UpdatePet,
) -> DataResult<Pet> {
    repo.update_pet(id, changes)
        .instrument(logfire::span!("update_pet"))
        .await
}

/// Hard-deletes a pet. Deleting an id that does not exist is a `NotFound`
/// error, see [`delete_pet_if_exists`] for the tolerant variant.
pub async fn delete_pet(repo: &repo::ImplPetRepo, id: &str) -> DataResult<()> {
    repo.delete_pet(id)
        .instrument(logfire::span!("delete_pet"))
        .await
}

/// Idempotent delete.
///
/// # Returns
/// * `DataResult<bool>` - `true` when a row was deleted, `false` when it was
///   already gone
pub async fn delete_pet_if_exists(repo: &repo::ImplPetRepo, id: &str) -> DataResult<bool> {
    match delete_pet(repo, id).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => {
            log::debug!("pet {id} was already deleted");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// A pet together with its appointments and photos.
#[derive(Debug, Clone, Serialize)]
pub struct PetProfile {
    pub pet: Pet,
    /// Earliest first
    pub appointments: Vec<Appointment>,
    /// Newest first
    pub photos: Vec<PetPhoto>,
}

impl PetProfile {
    /// Scheduled appointments at or after `now`.
    pub fn upcoming_appointments(&self, now: DateTime<Utc>) -> Vec<&Appointment> {
        self.appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Scheduled && a.appointment_date >= now)
            .collect()
    }

    pub fn cover_photo(&self) -> Option<&PetPhoto> {
        self.photos.first()
    }
}

/// Fetches a pet, its appointments and its photos concurrently.
///
/// # Errors
/// Fails with the first error among the three requests.
pub async fn get_pet_profile(repo: &repo::ImplPetRepo, id: &str) -> DataResult<PetProfile> {
    let (pet, appointments, photos) = async {
        futures::try_join!(
            repo.get_pet(id),
            repo.list_appointments_by_pet(id),
            repo.list_photos_by_pet(id),
        )
    }
    .instrument(logfire::span!("get_pet_profile"))
    .await
    .map_err(|e| {
        logfire::warn!(
            "Failed to load pet profile: {error}",
            error = e.to_string()
        );
        e
    })?;

    Ok(PetProfile {
        pet,
        appointments,
        photos,
    })
}
