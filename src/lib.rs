//! Core simulation for the Frontline territorial strategy prototype.
//!
//! The crate compiles to wasm for the browser client (see the `wasm`
//! module) and links natively into the relay server and the test
//! suite. Rendering, info panels and pan/zoom chrome live in the
//! surrounding page; everything here is game truth: the map geometry,
//! region ownership, unit lifecycle, and movement integration.

use thiserror::Error;

pub mod geometry;
pub mod movement;
pub mod ownership;
pub mod protocol;
pub mod session;
pub mod units;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub type PlayerId = String;
pub type RegionId = String;
pub type UnitId = String;

/// Everything that can go wrong while executing a player command or
/// ingesting a server payload. All of these are recoverable: the UI
/// surfaces them as a notice and the command is aborted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unit belongs to another player")]
    NotOwner,
    #[error("no region, unit or destination at the requested target")]
    InvalidTarget,
    #[error("region is permanently unclaimable")]
    AlreadyUnclaimable,
    #[error("unit needs at least 10 health to capture")]
    InsufficientHealth,
    #[error("unit is already traveling")]
    AlreadyTraveling,
    #[error("malformed server payload: {0}")]
    MalformedServerPayload(String),
}
