use crate::{
    connection::Connection,
    error::DataResult,
    models::{
        Entity, Table,
        appointment::{Appointment, NewAppointment, UpdateAppointment},
        pet::{NewPet, Pet, UpdatePet},
        photo::{NewPetPhoto, PetPhoto},
    },
};
use async_trait::async_trait;

use super::{PetRepo, query::TableQuery};

#[derive(Clone, Debug)]
pub struct SupabaseRepo {
    pub connection: Connection,
}

impl SupabaseRepo {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    fn from_table(&self, table: Table) -> TableQuery<'_> {
        TableQuery::new(&self.connection, table)
    }

    async fn get_by_id<T: Entity>(&self, id: &str) -> DataResult<T> {
        self.from_table(T::TABLE).eq("id", id).single().select().await
    }

    async fn delete_by_id(&self, table: Table, id: &str) -> DataResult<()> {
        self.from_table(table).eq("id", id).delete().await
    }
}

#[async_trait]
impl PetRepo for SupabaseRepo {
    async fn list_pets(&self) -> DataResult<Vec<Pet>> {
        self.from_table(Table::Pets)
            .order("created_at", false)
            .select()
            .await
    }

    async fn get_pet(&self, id: &str) -> DataResult<Pet> {
        self.get_by_id(id).await
    }

    async fn create_pet(&self, pet: &NewPet) -> DataResult<Pet> {
        self.from_table(Table::Pets).insert(pet).await
    }

    async fn update_pet(&self, id: &str, changes: &UpdatePet) -> DataResult<Pet> {
        self.from_table(Table::Pets)
            .eq("id", id)
            .single()
            .update(changes)
            .await
    }

    async fn delete_pet(&self, id: &str) -> DataResult<()> {
        self.delete_by_id(Table::Pets, id).await
    }

    async fn list_appointments_by_pet(&self, pet_id: &str) -> DataResult<Vec<Appointment>> {
        self.from_table(Table::Appointments)
            .eq("pet_id", pet_id)
            .order("appointment_date", true)
            .select()
            .await
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> DataResult<Appointment> {
        self.from_table(Table::Appointments)
            .insert(appointment)
            .await
    }

    async fn update_appointment(
        &self,
        id: &str,
        changes: &UpdateAppointment,
    ) -> DataResult<Appointment> {
        self.from_table(Table::Appointments)
            .eq("id", id)
            .single()
            .update(changes)
            .await
    }

    async fn delete_appointment(&self, id: &str) -> DataResult<()> {
        self.delete_by_id(Table::Appointments, id).await
    }

    async fn list_photos_by_pet(&self, pet_id: &str) -> DataResult<Vec<PetPhoto>> {
        self.from_table(Table::PetPhotos)
            .eq("pet_id", pet_id)
            .order("created_at", false)
            .select()
            .await
    }

    async fn add_photo(&self, photo: &NewPetPhoto) -> DataResult<PetPhoto> {
        self.from_table(Table::PetPhotos).insert(photo).await
    }

    async fn delete_photo(&self, id: &str) -> DataResult<()> {
        self.delete_by_id(Table::PetPhotos, id).await
    }
}
