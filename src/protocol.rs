//! Wire protocol shared by the wasm client and the relay server.
//!
//! Messages are JSON objects discriminated by a `type` field with
//! camelCase names, e.g. `{"type":"moveUnit","unitId":...}`. Bulk
//! snapshot payloads carry raw JSON values so one malformed record
//! cannot poison the whole snapshot; callers decode each entry with
//! the `from_value` helpers and skip the ones that fail.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::Point;
use crate::CommandError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameMessage {
    #[serde(rename_all = "camelCase")]
    NewUnitCreated {
        /// Present once the relay has assigned an id; a freshly
        /// spawning client omits it.
        #[serde(skip_serializing_if = "Option::is_none")]
        server_id: Option<String>,
        position: Point,
        owner: String,
    },
    #[serde(rename_all = "camelCase")]
    MoveUnit {
        unit_id: String,
        current_position: Point,
        estimated_travel_time: f64,
        owner: String,
    },
    #[serde(rename_all = "camelCase")]
    RegionCaptured { region_id: String, new_owner: String },
    #[serde(rename_all = "camelCase")]
    BulkUnitsData { units: Vec<Value> },
    #[serde(rename_all = "camelCase")]
    BulkRegionsData { regions: Vec<Value> },
}

/// One unit entry in a bulk snapshot or the HTTP game-state document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UnitRecord {
    pub id: String,
    pub location: Point,
    pub owner: String,
}

/// One region entry in a bulk snapshot or the HTTP game-state document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegionRecord {
    pub id: String,
    pub owner: String,
    pub has_mine: bool,
}

/// A player account as served by the HTTP endpoints. Never carries the
/// password.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub id: String,
    pub username: String,
    pub color: String,
    pub gold: u64,
    pub steel: u64,
    pub ammo: u64,
}

impl UnitRecord {
    pub fn from_value(value: &Value) -> Result<UnitRecord, CommandError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CommandError::MalformedServerPayload(e.to_string()))
    }
}

impl RegionRecord {
    pub fn from_value(value: &Value) -> Result<RegionRecord, CommandError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CommandError::MalformedServerPayload(e.to_string()))
    }
}
