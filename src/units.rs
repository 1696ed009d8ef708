//! Unit lifecycle: spawning, command authorization, the capture flow,
//! and destruction.
//!
//! Per-unit state machine: `Idle` -(move_to)-> `Traveling` -(arrival)->
//! `Idle`. Capture is only possible from `Idle`, and a traveling unit
//! rejects new destinations instead of queueing them.

use std::collections::HashMap;

use crate::geometry::{Point, WorldMap};
use crate::movement::TravelPlan;
use crate::ownership::{Owner, OwnershipStore};
use crate::{CommandError, PlayerId, RegionId, UnitId};

pub const MAX_HEALTH: u8 = 100;
pub const CAPTURE_COST: u8 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum TravelState {
    Idle,
    Traveling(TravelPlan),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: UnitId,
    pub owner: PlayerId,
    pub position: Point,
    /// 0..=100. Only ever decreases, by exactly `CAPTURE_COST` per
    /// successful capture attempt.
    pub health: u8,
    pub travel: TravelState,
}

impl Unit {
    pub fn is_traveling(&self) -> bool {
        matches!(self.travel, TravelState::Traveling(_))
    }
}

/// What a successful capture attempt did. The capture is recorded in
/// the ownership store even when the capturing unit died of the cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    pub region: RegionId,
    pub new_owner: PlayerId,
    pub remaining_health: u8,
    pub unit_destroyed: bool,
}

#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: HashMap<UnitId, Unit>,
    next_local: u64,
}

impl UnitRegistry {
    pub fn new() -> UnitRegistry {
        UnitRegistry::default()
    }

    pub fn get(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn traveling_ids(&self) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|u| u.is_traveling())
            .map(|u| u.id.clone())
            .collect()
    }

    /// Creates a unit at the region's centroid with full health.
    /// Silently a no-op when the region does not exist, matching the
    /// observed client.
    pub fn spawn(&mut self, owner: &str, region: &str, map: &WorldMap) -> Option<&Unit> {
        let position = map.centroid_of(region)?;
        self.next_local += 1;
        let id = format!("{}-unit-{}", region, self.next_local);
        let unit = Unit {
            id: id.clone(),
            owner: owner.to_string(),
            position,
            health: MAX_HEALTH,
            travel: TravelState::Idle,
        };
        self.units.insert(id.clone(), unit);
        self.units.get(&id)
    }

    /// Adopts a unit reported by the relay (bulk snapshot or
    /// `newUnitCreated`), overwriting any record with the same id.
    pub fn insert_remote(&mut self, id: &str, owner: &str, position: Point) -> &Unit {
        let unit = Unit {
            id: id.to_string(),
            owner: owner.to_string(),
            position,
            health: MAX_HEALTH,
            travel: TravelState::Idle,
        };
        self.units.insert(id.to_string(), unit);
        &self.units[id]
    }

    /// Authorizes a command on a unit: only the owning player may
    /// select or order it.
    pub fn authorize(&self, id: &str, requesting: &str) -> Result<&Unit, CommandError> {
        let unit = self.units.get(id).ok_or(CommandError::InvalidTarget)?;
        if unit.owner != requesting {
            return Err(CommandError::NotOwner);
        }
        Ok(unit)
    }

    /// Starts travel toward `destination`. Rejected, not queued, while
    /// the unit is already traveling.
    pub fn begin_travel(&mut self, id: &str, destination: Point) -> Result<(), CommandError> {
        let unit = self.units.get_mut(id).ok_or(CommandError::InvalidTarget)?;
        if unit.is_traveling() {
            return Err(CommandError::AlreadyTraveling);
        }
        unit.travel = TravelState::Traveling(TravelPlan::new(unit.position, destination));
        Ok(())
    }

    /// The capture flow. Preconditions: idle, standing on a claimable
    /// region, health >= `CAPTURE_COST`. On success the cost is
    /// deducted, the capture is recorded, and only then is the unit
    /// destroyed if its health fell below 1 — so a unit at exactly 10
    /// health captures the region and dies of it. The `< 10` attempt
    /// threshold and `< 1` death threshold are the observed pair;
    /// health 0 survives only the first check, never the second.
    pub fn capture_attempt(
        &mut self,
        id: &str,
        map: &WorldMap,
        ownership: &mut OwnershipStore,
    ) -> Result<CaptureOutcome, CommandError> {
        let unit = self.units.get_mut(id).ok_or(CommandError::InvalidTarget)?;
        if unit.is_traveling() {
            return Err(CommandError::AlreadyTraveling);
        }
        let region = map
            .region_at(unit.position)
            .ok_or(CommandError::InvalidTarget)?
            .to_string();
        if ownership.owner_of(&region) == Some(&Owner::Unclaimable) {
            return Err(CommandError::AlreadyUnclaimable);
        }
        if unit.health < CAPTURE_COST {
            return Err(CommandError::InsufficientHealth);
        }

        unit.health -= CAPTURE_COST;
        ownership.capture(&region, &unit.owner)?;

        let outcome = CaptureOutcome {
            region,
            new_owner: unit.owner.clone(),
            remaining_health: unit.health,
            unit_destroyed: unit.health < 1,
        };
        if outcome.unit_destroyed {
            self.units.remove(id);
        }
        Ok(outcome)
    }

    /// Removes the unit immediately. Returns it so the caller can
    /// clear any selection pointing at it.
    pub fn kill(&mut self, id: &str) -> Option<Unit> {
        self.units.remove(id)
    }
}
