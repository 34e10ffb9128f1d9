//! # Change Subscription Registrar
//!
//! Subscribes callbacks to row changes of a table over the backend realtime
//! websocket.
//!
//! - [`RealtimeClient`] owns one socket, opened on the first subscription.
//! - Each table maps to one channel, `realtime:<table>_changes`, shared by
//!   every subscription to that table. Each subscription still receives every
//!   event.
//! - [`Subscription`] is the handle. Delivery stops when it is unsubscribed or
//!   dropped, and the channel is left once its last handle is gone.
//!
//! There is no reconnection: when the socket closes, channels move to
//! [`ChannelState::Errored`] and new subscriptions open a fresh socket.

pub mod channel;
pub mod client;
pub mod protocol;

pub use channel::ChannelState;
pub use client::{RealtimeClient, Subscription};

use crate::{
    error::{DataError, DataResult, ErrorKind},
    models::{Entity, Table},
};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    #[display("insert")]
    Insert,
    #[display("update")]
    Update,
    #[display("delete")]
    Delete,
}

/// One row change delivered to a subscription callback.
///
/// `new` is present for inserts and updates, `old` for deletes and, when the
/// table replicates full rows, for updates.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: Table,
    pub schema: String,
    pub commit_timestamp: Option<DateTime<Utc>>,
    pub new: Option<Map<String, Value>>,
    pub old: Option<Map<String, Value>>,
}

impl ChangeEvent {
    /// The new row image decoded as `T`.
    pub fn new_record<T: Entity>(&self) -> DataResult<Option<T>> {
        self.decode(self.new.as_ref())
    }

    /// The old row image decoded as `T`. With default replication only the
    /// primary key is present, so decoding a full entity fails.
    pub fn old_record<T: Entity>(&self) -> DataResult<Option<T>> {
        self.decode(self.old.as_ref())
    }

    /// Id of the changed row, from whichever image carries it.
    pub fn row_id(&self) -> Option<&str> {
        self.new
            .as_ref()
            .and_then(|row| row.get("id"))
            .or_else(|| self.old.as_ref().and_then(|row| row.get("id")))
            .and_then(Value::as_str)
    }

    fn decode<T: Entity>(&self, row: Option<&Map<String, Value>>) -> DataResult<Option<T>> {
        if T::TABLE != self.table {
            return Err(DataError::new(
                ErrorKind::Query,
                format!("change comes from {}, not from {}", self.table, T::TABLE),
            ));
        }

        row.map(|row| serde_json::from_value(Value::Object(row.clone())))
            .transpose()
            .map_err(|e| {
                DataError::new(
                    ErrorKind::Query,
                    format!("{} row does not match the expected shape: {e}", self.table),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{appointment::Appointment, pet::Pet};
    use serde_json::json;

    fn pet_row() -> Map<String, Value> {
        json!({
            "id": "pet-1",
            "name": "Buddy",
            "type": "dog",
            "breed": null,
            "age": 3,
            "description": null,
            "image_url": null,
            "owner_id": "owner-1",
            "created_at": "2025-01-10T12:00:00+00:00",
            "updated_at": "2025-01-10T12:00:00+00:00"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_new_record_decodes_entity() {
        let event = ChangeEvent {
            kind: ChangeKind::Insert,
            table: Table::Pets,
            schema: "public".into(),
            commit_timestamp: None,
            new: Some(pet_row()),
            old: None,
        };

        let pet: Pet = event.new_record().unwrap().unwrap();
        assert_eq!(pet.name, "Buddy");
        assert_eq!(event.row_id(), Some("pet-1"));
        assert!(event.old_record::<Pet>().unwrap().is_none());
    }

    #[test]
    fn test_decoding_as_another_table_fails() {
        let event = ChangeEvent {
            kind: ChangeKind::Update,
            table: Table::Pets,
            schema: "public".into(),
            commit_timestamp: None,
            new: Some(pet_row()),
            old: None,
        };

        let error = event.new_record::<Appointment>().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Query);
    }

    #[test]
    fn test_row_with_unexpected_shape_is_query_error() {
        let mut row = pet_row();
        row.remove("name");
        let event = ChangeEvent {
            kind: ChangeKind::Insert,
            table: Table::Pets,
            schema: "public".into(),
            commit_timestamp: None,
            new: Some(row),
            old: None,
        };

        let error = event.new_record::<Pet>().unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Query);
        assert!(error.message().contains("pets"));
    }

    #[test]
    fn test_delete_row_id_comes_from_old_image() {
        let event = ChangeEvent {
            kind: ChangeKind::Delete,
            table: Table::Pets,
            schema: "public".into(),
            commit_timestamp: None,
            new: None,
            old: json!({"id": "pet-9"}).as_object().cloned(),
        };

        assert_eq!(event.row_id(), Some("pet-9"));
        assert_eq!(event.kind.to_string(), "delete");
    }
}
