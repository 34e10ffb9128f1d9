pub mod query;
pub mod supabase;

use crate::{
    error::DataResult,
    models::{
        appointment::{Appointment, NewAppointment, UpdateAppointment},
        pet::{NewPet, Pet, UpdatePet},
        photo::{NewPetPhoto, PetPhoto},
    },
};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Data-access contract: one method per backend operation, each awaiting a
/// single response.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PetRepo: Send + Sync {
    /// All visible pets, newest first.
    async fn list_pets(&self) -> DataResult<Vec<Pet>>;

    async fn get_pet(&self, id: &str) -> DataResult<Pet>;

    async fn create_pet(&self, pet: &NewPet) -> DataResult<Pet>;

    async fn update_pet(&self, id: &str, changes: &UpdatePet) -> DataResult<Pet>;

    async fn delete_pet(&self, id: &str) -> DataResult<()>;

    /// Appointments of one pet, earliest first.
    async fn list_appointments_by_pet(&self, pet_id: &str) -> DataResult<Vec<Appointment>>;

    async fn create_appointment(&self, appointment: &NewAppointment) -> DataResult<Appointment>;

    async fn update_appointment(
        &self,
        id: &str,
        changes: &UpdateAppointment,
    ) -> DataResult<Appointment>;

    async fn delete_appointment(&self, id: &str) -> DataResult<()>;

    /// Photos of one pet, newest first.
    async fn list_photos_by_pet(&self, pet_id: &str) -> DataResult<Vec<PetPhoto>>;

    async fn add_photo(&self, photo: &NewPetPhoto) -> DataResult<PetPhoto>;

    async fn delete_photo(&self, id: &str) -> DataResult<()>;
}

pub type ImplPetRepo = Box<dyn PetRepo>;
