use crate::{
    error::DataResult,
    models::photo::{NewPetPhoto, PetPhoto},
    repo,
};
use tracing::Instrument;

/// Photos of a pet, newest first.
pub async fn list_photos_by_pet(
    repo: &repo::ImplPetRepo,
    pet_id: &str,
) -> DataResult<Vec<PetPhoto>> {
    repo.list_photos_by_pet(pet_id)
        .instrument(logfire::span!("list_photos_by_pet"))
        .await
}

pub async fn add_photo(repo: &repo::ImplPetRepo, photo: &NewPetPhoto) -> DataResult<PetPhoto> {
    repo.add_photo(photo)
        .instrument(logfire::span!("add_photo"))
        .await
}

pub async fn delete_photo(repo: &repo::ImplPetRepo, id: &str) -> DataResult<()> {
    repo.delete_photo(id)
        .instrument(logfire::span!("delete_photo"))
        .await
}
