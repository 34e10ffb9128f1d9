//! Phoenix channel frames (protocol `vsn=1.0.0`, JSON objects).

use crate::{
    consts,
    error::{DataError, DataResult},
    models::Table,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{ChangeEvent, ChangeKind};

pub const PHX_JOIN: &str = "phx_join";
pub const PHX_LEAVE: &str = "phx_leave";
pub const PHX_REPLY: &str = "phx_reply";
pub const PHX_ERROR: &str = "phx_error";
pub const PHX_CLOSE: &str = "phx_close";
pub const HEARTBEAT: &str = "heartbeat";
pub const POSTGRES_CHANGES: &str = "postgres_changes";
pub const PHOENIX_TOPIC: &str = "phoenix";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

/// Channel topic for a table, `realtime:<table>_changes`.
pub fn topic_for(table: Table) -> String {
    format!("realtime:{}_changes", table.as_str())
}

impl PhoenixMessage {
    /// Join request listening to every change of `table` in the public schema.
    pub fn join(table: Table, access_token: &str, msg_ref: String) -> Self {
        Self {
            topic: topic_for(table),
            event: PHX_JOIN.to_string(),
            payload: json!({
                "config": {
                    "broadcast": {"ack": false, "self": false},
                    "presence": {"key": ""},
                    "postgres_changes": [{
                        "event": "*",
                        "schema": consts::REALTIME_SCHEMA,
                        "table": table.as_str(),
                    }],
                    "private": false,
                },
                "access_token": access_token,
            }),
            join_ref: Some(msg_ref.clone()),
            msg_ref: Some(msg_ref),
        }
    }

    pub fn leave(table: Table, join_ref: String, msg_ref: String) -> Self {
        Self {
            topic: topic_for(table),
            event: PHX_LEAVE.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref),
            join_ref: Some(join_ref),
        }
    }

    pub fn heartbeat(msg_ref: String) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: HEARTBEAT.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref),
            join_ref: None,
        }
    }

    pub fn to_json(&self) -> DataResult<String> {
        serde_json::to_string(self)
            .map_err(|e| DataError::connection(format!("cannot encode realtime frame: {e}")))
    }

    pub fn from_json(text: &str) -> DataResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Outcome of a `phx_reply`: `Ok` or the reason the server gave.
    pub fn reply_status(&self) -> Result<(), String> {
        match self.payload.get("status").and_then(Value::as_str) {
            Some("ok") => Ok(()),
            status => {
                let response = self.payload.get("response");
                let reason = response
                    .and_then(|r| r.get("reason"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| response.map(Value::to_string))
                    .unwrap_or_else(|| format!("join answered with status {status:?}"));
                Err(reason)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostgresChangesPayload {
    data: ChangeData,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: ChangeKind,
    schema: String,
    table: String,
    #[serde(default)]
    commit_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    record: Option<Map<String, Value>>,
    #[serde(default)]
    old_record: Option<Map<String, Value>>,
}

/// Decodes the payload of a `postgres_changes` frame. Empty row images are
/// reported as absent.
pub fn parse_change(payload: &Value) -> DataResult<ChangeEvent> {
    let PostgresChangesPayload { data } = PostgresChangesPayload::deserialize(payload)?;

    let table = data
        .table
        .parse::<Table>()
        .map_err(DataError::connection)?;

    Ok(ChangeEvent {
        kind: data.kind,
        table,
        schema: data.schema,
        commit_timestamp: data.commit_timestamp,
        new: data.record.filter(|row| !row.is_empty()),
        old: data.old_record.filter(|row| !row.is_empty()),
    })
}
