use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Pet {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload to create a pet, the backend assigns id and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NewPet {
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub owner_id: String,
}

/// Partial pet update. `None` leaves the column untouched, `Some(None)` on a
/// nullable column clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdatePet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub pet_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<Option<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl UpdatePet {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl Pet {
    /// The caller-supplied part of the record.
    pub fn as_new(&self) -> NewPet {
        NewPet {
            name: self.name.clone(),
            pet_type: self.pet_type.clone(),
            breed: self.breed.clone(),
            age: self.age,
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            owner_id: self.owner_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pet_deserializes_backend_row() {
        let row = json!({
            "id": "6f1c1c9e-1a49-4c1f-9d0e-3b1f9f0b8a11",
            "name": "Buddy",
            "type": "dog",
            "breed": "Golden Retriever",
            "age": 3,
            "description": null,
            "image_url": null,
            "owner_id": "0b7c2d1e-5555-4444-8888-000000000001",
            "created_at": "2025-01-10T12:00:00.123456+00:00",
            "updated_at": "2025-01-10T12:00:00.123456+00:00"
        });

        let pet: Pet = serde_json::from_value(row).unwrap();

        assert_eq!(pet.pet_type, "dog");
        assert_eq!(pet.age, Some(3));
        assert!(pet.description.is_none());
        assert_eq!(pet.created_at, pet.updated_at);
    }

    #[test]
    fn test_new_pet_omits_unset_optional_fields() {
        let new_pet = NewPet {
            name: "Whiskers".into(),
            pet_type: "cat".into(),
            age: Some(2),
            owner_id: "owner-1".into(),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&new_pet).unwrap(),
            json!({"name": "Whiskers", "type": "cat", "age": 2, "owner_id": "owner-1"})
        );
    }

    #[test]
    fn test_update_pet_only_sends_supplied_fields() {
        let changes = UpdatePet {
            age: Some(Some(4)),
            description: Some(None),
            ..Default::default()
        };

        assert!(!changes.is_empty());
        assert!(UpdatePet::default().is_empty());
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            json!({"age": 4, "description": null})
        );
    }
}
