use httpmock::prelude::*;
use pet_care::{
    Connection, ErrorKind,
    connection::HealthStatus,
    models::{
        appointment::{AppointmentStatus, NewAppointment, UpdateAppointment},
        pet::{NewPet, UpdatePet},
        photo::NewPetPhoto,
    },
    repo::{PetRepo, supabase::SupabaseRepo},
};
use serde_json::{Value, json};

const ANON_KEY: &str = "anon-key";

fn repo_for(server: &MockServer) -> SupabaseRepo {
    SupabaseRepo::new(Connection::new(&server.base_url(), ANON_KEY).unwrap())
}

fn pet_json(id: &str, name: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "dog",
        "breed": "Labrador",
        "age": 3,
        "description": null,
        "image_url": null,
        "owner_id": "owner-1",
        "created_at": created_at,
        "updated_at": created_at
    })
}

fn appointment_json(id: &str, date: &str, status: &str) -> Value {
    json!({
        "id": id,
        "pet_id": "pet-1",
        "appointment_date": date,
        "service_type": "grooming",
        "notes": null,
        "status": status,
        "created_at": "2025-01-01T00:00:00+00:00",
        "updated_at": "2025-01-01T00:00:00+00:00"
    })
}

#[tokio::test]
async fn list_pets_orders_newest_first() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/pets")
                .query_param("select", "*")
                .query_param("order", "created_at.desc")
                .header("apikey", ANON_KEY)
                .header("authorization", format!("Bearer {ANON_KEY}"));
            then.status(200).json_body(json!([
                pet_json("pet-2", "Whiskers", "2025-01-02T00:00:00+00:00"),
                pet_json("pet-1", "Buddy", "2025-01-01T00:00:00+00:00"),
            ]));
        })
        .await;

    let pets = repo_for(&server).list_pets().await.unwrap();

    assert_eq!(pets.len(), 2);
    assert_eq!(pets[0].name, "Whiskers");
    assert_eq!(pets[1].pet_type, "dog");
    mock.assert_async().await;
}

#[tokio::test]
async fn get_pet_requests_a_single_object() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/pets")
                .query_param("id", "eq.pet-1")
                .header("accept", "application/vnd.pgrst.object+json");
            then.status(200)
                .json_body(pet_json("pet-1", "Buddy", "2025-01-01T00:00:00+00:00"));
        })
        .await;

    let pet = repo_for(&server).get_pet("pet-1").await.unwrap();

    assert_eq!(pet.id, "pet-1");
    assert_eq!(pet.breed.as_deref(), Some("Labrador"));
    assert_eq!(pet.age, Some(3));
    mock.assert_async().await;
}

#[tokio::test]
async fn get_missing_pet_is_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/pets");
            then.status(406).json_body(single_object_not_found());
        })
        .await;

    let error = repo_for(&server).get_pet("missing").await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(error.code(), Some("PGRST116"));
}

#[tokio::test]
async fn create_pet_returns_stored_record() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/pets")
                .header("prefer", "return=representation")
                .json_body(json!({
                    "name": "Buddy",
                    "type": "dog",
                    "breed": "Labrador",
                    "owner_id": "owner-1"
                }));
            then.status(201)
                .json_body(pet_json("pet-1", "Buddy", "2025-01-01T00:00:00+00:00"));
        })
        .await;

    let new_pet = NewPet {
        name: "Buddy".into(),
        pet_type: "dog".into(),
        breed: Some("Labrador".into()),
        owner_id: "owner-1".into(),
        ..Default::default()
    };
    let pet = repo_for(&server).create_pet(&new_pet).await.unwrap();

    assert_eq!(pet.id, "pet-1");
    assert_eq!(pet.created_at, pet.updated_at);
    mock.assert_async().await;
}

#[tokio::test]
async fn update_pet_sends_only_changed_fields() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/pets")
                .query_param("id", "eq.pet-1")
                .json_body(json!({"age": 4, "description": null}));
            let mut updated = pet_json("pet-1", "Buddy", "2025-01-01T00:00:00+00:00");
            updated["age"] = json!(4);
            updated["updated_at"] = json!("2025-01-05T00:00:00+00:00");
            then.status(200).json_body(updated);
        })
        .await;

    let changes = UpdatePet {
        age: Some(Some(4)),
        description: Some(None),
        ..Default::default()
    };
    let pet = repo_for(&server)
        .update_pet("pet-1", &changes)
        .await
        .unwrap();

    assert_eq!(pet.age, Some(4));
    assert_eq!(pet.name, "Buddy");
    assert!(pet.updated_at > pet.created_at);
    mock.assert_async().await;
}

fn single_object_not_found() -> Value {
    json!({
        "code": "PGRST116",
        "details": "The result contains 0 rows",
        "hint": null,
        "message": "JSON object requested, multiple (or no) rows returned"
    })
}

#[tokio::test]
async fn update_missing_pet_is_not_found() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/pets")
                .query_param("id", "eq.gone")
                .header("accept", "application/vnd.pgrst.object+json")
                .header("prefer", "return=representation");
            then.status(406).json_body(single_object_not_found());
        })
        .await;

    let changes = UpdatePet {
        name: Some("Rex".into()),
        ..Default::default()
    };
    let error = repo_for(&server)
        .update_pet("gone", &changes)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFound);
    mock.assert_async().await;
}

#[tokio::test]
async fn update_appointment_patches_one_row() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/appointments")
                .query_param("id", "eq.a-1")
                .query_param("select", "*")
                .header("accept", "application/vnd.pgrst.object+json")
                .header("prefer", "return=representation")
                .json_body(json!({"status": "cancelled"}));
            then.status(200).json_body(appointment_json(
                "a-1",
                "2025-02-01T09:00:00+00:00",
                "cancelled",
            ));
        })
        .await;

    let changes = UpdateAppointment::with_status(AppointmentStatus::Cancelled);
    let appointment = repo_for(&server)
        .update_appointment("a-1", &changes)
        .await
        .unwrap();

    assert_eq!(appointment.id, "a-1");
    assert_eq!(appointment.status, AppointmentStatus::Cancelled);
    mock.assert_async().await;
}

#[tokio::test]
async fn update_missing_appointment_is_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/appointments")
                .query_param("id", "eq.gone");
            then.status(406).json_body(single_object_not_found());
        })
        .await;

    let changes = UpdateAppointment::with_status(AppointmentStatus::Completed);
    let error = repo_for(&server)
        .update_appointment("gone", &changes)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(error.code(), Some("PGRST116"));
}

#[tokio::test]
async fn delete_appointment_and_photo_ask_for_deleted_rows() {
    let server = MockServer::start_async().await;
    let appointment = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/appointments")
                .query_param("id", "eq.a-1")
                .header("prefer", "return=representation");
            then.status(200).json_body(json!([appointment_json(
                "a-1",
                "2025-02-01T09:00:00+00:00",
                "scheduled",
            )]));
        })
        .await;
    let photo = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/pet_photos")
                .query_param("id", "eq.ph-1")
                .header("prefer", "return=representation");
            then.status(200).json_body(json!([{"id": "ph-1"}]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/pet_photos")
                .query_param("id", "eq.ph-2");
            then.status(200).json_body(json!([]));
        })
        .await;

    let repo = repo_for(&server);

    assert!(repo.delete_appointment("a-1").await.is_ok());
    assert!(repo.delete_photo("ph-1").await.is_ok());
    assert_eq!(
        repo.delete_photo("ph-2").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    appointment.assert_async().await;
    photo.assert_async().await;
}

#[tokio::test]
async fn delete_reports_missing_rows() {
    let server = MockServer::start_async().await;
    let deleted = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/pets")
                .query_param("id", "eq.pet-1");
            then.status(200)
                .json_body(json!([pet_json("pet-1", "Buddy", "2025-01-01T00:00:00+00:00")]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/pets")
                .query_param("id", "eq.pet-2");
            then.status(200).json_body(json!([]));
        })
        .await;

    let repo = repo_for(&server);

    assert!(repo.delete_pet("pet-1").await.is_ok());
    let error = repo.delete_pet("pet-2").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    deleted.assert_async().await;
}

#[tokio::test]
async fn appointments_are_filtered_by_pet_and_ordered_by_date() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/appointments")
                .query_param("pet_id", "eq.pet-1")
                .query_param("order", "appointment_date.asc");
            then.status(200).json_body(json!([
                appointment_json("a-1", "2025-02-01T09:00:00+00:00", "completed"),
                appointment_json("a-2", "2025-03-01T09:00:00+00:00", "scheduled"),
            ]));
        })
        .await;

    let appointments = repo_for(&server)
        .list_appointments_by_pet("pet-1")
        .await
        .unwrap();

    assert_eq!(appointments.len(), 2);
    assert_eq!(appointments[0].status, AppointmentStatus::Completed);
    assert!(appointments[0].appointment_date < appointments[1].appointment_date);
    mock.assert_async().await;
}

#[tokio::test]
async fn create_appointment_defaults_to_scheduled() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/appointments")
                .body_includes(r#""status":"scheduled""#);
            then.status(201).json_body(appointment_json(
                "a-1",
                "2025-02-01T09:00:00+00:00",
                "scheduled",
            ));
        })
        .await;

    let appointment: NewAppointment = serde_json::from_value(json!({
        "pet_id": "pet-1",
        "appointment_date": "2025-02-01T09:00:00Z",
        "service_type": "grooming"
    }))
    .unwrap();
    let stored = repo_for(&server)
        .create_appointment(&appointment)
        .await
        .unwrap();

    assert_eq!(stored.status, AppointmentStatus::Scheduled);
    mock.assert_async().await;
}

#[tokio::test]
async fn photos_are_listed_newest_first() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/pet_photos")
                .query_param("pet_id", "eq.pet-1")
                .query_param("order", "created_at.desc");
            then.status(200).json_body(json!([{
                "id": "ph-1",
                "pet_id": "pet-1",
                "photo_url": "https://cdn.example.com/1.jpg",
                "caption": null,
                "created_at": "2025-01-01T00:00:00+00:00"
            }]));
        })
        .await;

    let photos = repo_for(&server).list_photos_by_pet("pet-1").await.unwrap();

    assert_eq!(photos.len(), 1);
    assert!(photos[0].caption.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn row_level_security_rejection_is_authorization_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/pet_photos");
            then.status(403).json_body(json!({
                "code": "42501",
                "details": null,
                "hint": null,
                "message": "new row violates row-level security policy for table \"pet_photos\""
            }));
        })
        .await;

    let photo = NewPetPhoto {
        pet_id: "pet-1".into(),
        photo_url: "https://cdn.example.com/1.jpg".into(),
        caption: None,
    };
    let error = repo_for(&server).add_photo(&photo).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Authorization);
    assert!(error.message().contains("row-level security"));
}

#[tokio::test]
async fn health_check_reports_pet_count() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/pets")
                .query_param("limit", "0")
                .header("prefer", "count=exact");
            then.status(200)
                .header("content-range", "*/12")
                .json_body(json!([]));
        })
        .await;

    let connection = Connection::new(&server.base_url(), ANON_KEY).unwrap();

    assert_eq!(
        connection.check_health().await,
        HealthStatus::Connected {
            pet_count: Some(12)
        }
    );
}

#[tokio::test]
async fn health_check_detects_missing_schema() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/pets");
            then.status(404).json_body(json!({
                "code": "42P01",
                "details": null,
                "hint": null,
                "message": "relation \"public.pets\" does not exist"
            }));
        })
        .await;

    let connection = Connection::new(&server.base_url(), ANON_KEY).unwrap();

    assert!(matches!(
        connection.check_health().await,
        HealthStatus::SchemaMissing { .. }
    ));
}

#[tokio::test]
async fn placeholder_connection_fails_every_operation_with_configuration_error() {
    let repo = SupabaseRepo::new(Connection::placeholder());

    let new_pet = NewPet {
        name: "Buddy".into(),
        pet_type: "dog".into(),
        owner_id: "owner-1".into(),
        ..Default::default()
    };
    let appointment: NewAppointment = serde_json::from_value(json!({
        "pet_id": "pet-1",
        "appointment_date": "2025-02-01T09:00:00Z",
        "service_type": "grooming"
    }))
    .unwrap();
    let photo = NewPetPhoto {
        pet_id: "pet-1".into(),
        photo_url: "https://cdn.example.com/1.jpg".into(),
        caption: None,
    };
    let pet_changes = UpdatePet {
        age: Some(Some(4)),
        ..Default::default()
    };
    let appointment_changes = UpdateAppointment::with_status(AppointmentStatus::Completed);

    let errors = [
        repo.list_pets().await.unwrap_err(),
        repo.get_pet("pet-1").await.unwrap_err(),
        repo.create_pet(&new_pet).await.unwrap_err(),
        repo.update_pet("pet-1", &pet_changes).await.unwrap_err(),
        repo.delete_pet("pet-1").await.unwrap_err(),
        repo.list_appointments_by_pet("pet-1").await.unwrap_err(),
        repo.create_appointment(&appointment).await.unwrap_err(),
        repo.update_appointment("a-1", &appointment_changes)
            .await
            .unwrap_err(),
        repo.delete_appointment("a-1").await.unwrap_err(),
        repo.list_photos_by_pet("pet-1").await.unwrap_err(),
        repo.add_photo(&photo).await.unwrap_err(),
        repo.delete_photo("ph-1").await.unwrap_err(),
    ];

    assert!(errors.iter().all(|e| e.kind() == ErrorKind::Configuration));
}
