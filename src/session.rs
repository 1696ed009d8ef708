//! One player's view of the game: the local oracles plus selection and
//! command handling.
//!
//! Commands return the [`GameMessage`] the caller should put on the
//! wire; inbound relay traffic goes through [`Session::apply_remote`].
//! The session never talks to a socket itself, which is what lets the
//! same type drive the wasm client, the native tests, and any headless
//! harness.

use crate::geometry::{Point, WorldMap};
use crate::movement::{self, Progress};
use crate::ownership::{Owner, OwnershipStore};
use crate::protocol::{GameMessage, RegionRecord, UnitRecord};
use crate::units::{CaptureOutcome, UnitRegistry};
use crate::{CommandError, PlayerId, UnitId};

pub struct Session {
    player: PlayerId,
    map: WorldMap,
    ownership: OwnershipStore,
    units: UnitRegistry,
    selected: Option<UnitId>,
    destination: Option<Point>,
}

impl Session {
    pub fn new(player: &str, map: WorldMap) -> Session {
        let ownership = OwnershipStore::from_map(&map);
        Session {
            player: player.to_string(),
            map,
            ownership,
            units: UnitRegistry::new(),
            selected: None,
            destination: None,
        }
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    pub fn ownership(&self) -> &OwnershipStore {
        &self.ownership
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Spawns a unit for the local player at the region's centroid and
    /// returns the announcement to broadcast. `InvalidTarget` when the
    /// region does not exist.
    pub fn spawn_unit(&mut self, region: &str) -> Result<GameMessage, CommandError> {
        let unit = self
            .units
            .spawn(&self.player, region, &self.map)
            .ok_or(CommandError::InvalidTarget)?;
        Ok(GameMessage::NewUnitCreated {
            server_id: Some(unit.id.clone()),
            position: unit.position,
            owner: unit.owner.clone(),
        })
    }

    /// Selects a unit for subsequent orders. Only the player's own
    /// units are selectable.
    pub fn select_unit(&mut self, id: &str) -> Result<(), CommandError> {
        self.units.authorize(id, &self.player)?;
        self.selected = Some(id.to_string());
        self.destination = None;
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selected = None;
        self.destination = None;
    }

    /// Stages a destination for the selected unit and returns the
    /// travel-time preview. The order is not issued until
    /// [`Session::begin_move`].
    pub fn set_destination(&mut self, destination: Point) -> Result<f64, CommandError> {
        let id = self.selected.clone().ok_or(CommandError::InvalidTarget)?;
        let unit = self.units.authorize(&id, &self.player)?;
        if unit.is_traveling() {
            return Err(CommandError::AlreadyTraveling);
        }
        let estimate = movement::estimate_travel_time(
            unit.position,
            destination,
            &self.player,
            &self.map,
            &self.ownership,
        );
        self.destination = Some(destination);
        Ok(estimate)
    }

    /// Issues the staged move order and returns the `moveUnit` message
    /// to broadcast.
    pub fn begin_move(&mut self) -> Result<GameMessage, CommandError> {
        let id = self.selected.clone().ok_or(CommandError::InvalidTarget)?;
        let destination = self.destination.take().ok_or(CommandError::InvalidTarget)?;
        let unit = self.units.authorize(&id, &self.player)?;
        let estimate = movement::estimate_travel_time(
            unit.position,
            destination,
            &self.player,
            &self.map,
            &self.ownership,
        );
        self.units.begin_travel(&id, destination)?;
        let unit = self.units.get(&id).ok_or(CommandError::InvalidTarget)?;
        Ok(GameMessage::MoveUnit {
            unit_id: unit.id.clone(),
            current_position: unit.position,
            estimated_travel_time: estimate,
            owner: unit.owner.clone(),
        })
    }

    /// Advances every traveling unit by `dt` seconds and returns the
    /// per-tick position reports to broadcast. Arrivals report a zero
    /// remaining time.
    pub fn tick(&mut self, dt: f64) -> Vec<GameMessage> {
        let mut reports = Vec::new();
        for id in self.units.traveling_ids() {
            let unit = match self.units.get_mut(&id) {
                Some(unit) => unit,
                None => continue,
            };
            let remaining = match movement::advance(unit, dt, &self.map, &self.ownership) {
                Progress::EnRoute { remaining_time } => remaining_time,
                Progress::Arrived => 0.0,
            };
            reports.push(GameMessage::MoveUnit {
                unit_id: unit.id.clone(),
                current_position: unit.position,
                estimated_travel_time: remaining,
                owner: unit.owner.clone(),
            });
        }
        reports
    }

    /// Orders the selected unit to capture the region under it. On
    /// success returns the outcome plus the `regionCaptured` broadcast;
    /// a unit that died of the capture cost is deselected.
    pub fn capture(&mut self) -> Result<(CaptureOutcome, GameMessage), CommandError> {
        let id = self.selected.clone().ok_or(CommandError::InvalidTarget)?;
        self.units.authorize(&id, &self.player)?;
        let outcome = self
            .units
            .capture_attempt(&id, &self.map, &mut self.ownership)?;
        if outcome.unit_destroyed {
            self.deselect();
        }
        let message = GameMessage::RegionCaptured {
            region_id: outcome.region.clone(),
            new_owner: outcome.new_owner.clone(),
        };
        Ok((outcome, message))
    }

    /// Removes one of the player's own units immediately.
    pub fn kill_unit(&mut self, id: &str) -> Result<(), CommandError> {
        self.units.authorize(id, &self.player)?;
        self.units.kill(id);
        if self.selected.as_deref() == Some(id) {
            self.deselect();
        }
        Ok(())
    }

    /// Ingests one relay message. Bulk snapshots are decoded leniently:
    /// malformed records are skipped and reported, the rest still
    /// apply. Traveling local units are never clobbered by snapshots
    /// or echoes of their own position reports.
    pub fn apply_remote(&mut self, message: &GameMessage) -> Vec<CommandError> {
        let mut problems = Vec::new();
        match message {
            GameMessage::NewUnitCreated {
                server_id,
                position,
                owner,
            } => match server_id {
                Some(id) => {
                    if self.units.get(id).is_none() {
                        self.units.insert_remote(id, owner, *position);
                    }
                }
                None => problems.push(CommandError::MalformedServerPayload(
                    "newUnitCreated without an assigned id".to_string(),
                )),
            },
            GameMessage::MoveUnit {
                unit_id,
                current_position,
                owner,
                ..
            } => match self.units.get_mut(unit_id) {
                Some(unit) if !unit.is_traveling() => unit.position = *current_position,
                Some(_) => {}
                None => {
                    self.units.insert_remote(unit_id, owner, *current_position);
                }
            },
            GameMessage::RegionCaptured {
                region_id,
                new_owner,
            } => {
                self.ownership
                    .apply_remote(region_id, Owner::from_wire(new_owner));
            }
            GameMessage::BulkUnitsData { units } => {
                for value in units {
                    match UnitRecord::from_value(value) {
                        Ok(record) => {
                            let traveling = self
                                .units
                                .get(&record.id)
                                .is_some_and(|u| u.is_traveling());
                            if !traveling {
                                self.units.insert_remote(
                                    &record.id,
                                    &record.owner,
                                    record.location,
                                );
                            }
                        }
                        Err(e) => problems.push(e),
                    }
                }
            }
            GameMessage::BulkRegionsData { regions } => {
                for value in regions {
                    match RegionRecord::from_value(value) {
                        Ok(record) => {
                            self.ownership
                                .apply_remote(&record.id, Owner::from_wire(&record.owner));
                        }
                        Err(e) => problems.push(e),
                    }
                }
            }
        }
        problems
    }
}
