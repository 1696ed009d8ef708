//! Region ownership as a pure data structure.
//!
//! The store is the single writer for the region→owner mapping; the
//! rendering layer observes it rather than the other way around, and
//! the movement simulator only reads it. Captures go through
//! [`OwnershipStore::capture`], which is the only local write path and
//! is itself reachable only through the unit registry's capture flow.

use std::collections::{HashMap, HashSet};

use crate::geometry::WorldMap;
use crate::{CommandError, PlayerId, RegionId};

/// Regions that can never change hands, matching the observed map.
pub const UNCLAIMABLE_REGIONS: [&str; 4] = [
    "Greenland_03",
    "Northwest_Territories_01",
    "Northwest_Territories_02",
    "Yakutsk_01",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Unclaimed,
    Unclaimable,
    Player(PlayerId),
}

impl Owner {
    /// The string form used on the wire and in snapshots.
    pub fn as_wire(&self) -> &str {
        match self {
            Owner::Unclaimed => "Unclaimed",
            Owner::Unclaimable => "Unclaimable",
            Owner::Player(id) => id,
        }
    }

    pub fn from_wire(s: &str) -> Owner {
        match s {
            "Unclaimed" => Owner::Unclaimed,
            "Unclaimable" => Owner::Unclaimable,
            id => Owner::Player(id.to_string()),
        }
    }

    pub fn is_enemy_of(&self, player: &str) -> bool {
        matches!(self, Owner::Player(p) if p != player)
    }

    pub fn is_owned_by(&self, player: &str) -> bool {
        matches!(self, Owner::Player(p) if p == player)
    }
}

#[derive(Debug)]
pub struct OwnershipStore {
    owners: HashMap<RegionId, Owner>,
    mines: HashSet<RegionId>,
}

impl OwnershipStore {
    /// Seeds every map region as unclaimed, except the fixed
    /// unclaimable set.
    pub fn from_map(map: &WorldMap) -> OwnershipStore {
        let mut owners = HashMap::new();
        let mut mines = HashSet::new();
        for id in map.region_ids() {
            let owner = if UNCLAIMABLE_REGIONS.contains(&id) {
                Owner::Unclaimable
            } else {
                Owner::Unclaimed
            };
            owners.insert(id.to_string(), owner);
            if map.has_mine(id) {
                mines.insert(id.to_string());
            }
        }
        OwnershipStore { owners, mines }
    }

    pub fn owner_of(&self, region: &str) -> Option<&Owner> {
        self.owners.get(region)
    }

    pub fn has_mine(&self, region: &str) -> bool {
        self.mines.contains(region)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Owner)> {
        self.owners.iter().map(|(id, o)| (id.as_str(), o))
    }

    /// Transfers the region to `by`. Last writer wins; there is no
    /// contest resolution. Fails for unknown regions and for the fixed
    /// unclaimable set.
    pub fn capture(&mut self, region: &str, by: &str) -> Result<&Owner, CommandError> {
        let slot = self
            .owners
            .get_mut(region)
            .ok_or(CommandError::InvalidTarget)?;
        if *slot == Owner::Unclaimable {
            return Err(CommandError::AlreadyUnclaimable);
        }
        *slot = Owner::Player(by.to_string());
        Ok(&*slot)
    }

    /// Mirrors a relay `regionCaptured` event. The unclaimable
    /// invariant holds against remote writes too; unknown regions are
    /// skipped. Returns whether the write was applied.
    pub fn apply_remote(&mut self, region: &str, owner: Owner) -> bool {
        match self.owners.get_mut(region) {
            Some(slot) if *slot != Owner::Unclaimable && owner != Owner::Unclaimable => {
                *slot = owner;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WorldMap;

    fn map() -> WorldMap {
        WorldMap::from_json(
            r#"{"regions":[
                {"id":"Jutland_01","path":"M 0 0 L 10 0 L 10 10 L 0 10 Z"},
                {"id":"Greenland_03","path":"M 20 0 L 30 0 L 30 10 L 20 10 Z"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn capture_is_last_writer_wins() {
        let mut store = OwnershipStore::from_map(&map());
        assert_eq!(store.owner_of("Jutland_01"), Some(&Owner::Unclaimed));
        store.capture("Jutland_01", "Player1").unwrap();
        store.capture("Jutland_01", "Player2").unwrap();
        assert_eq!(
            store.owner_of("Jutland_01"),
            Some(&Owner::Player("Player2".to_string()))
        );
    }

    #[test]
    fn unclaimable_region_never_changes_owner() {
        let mut store = OwnershipStore::from_map(&map());
        assert_eq!(
            store.capture("Greenland_03", "Player1"),
            Err(CommandError::AlreadyUnclaimable)
        );
        assert!(!store.apply_remote("Greenland_03", Owner::Player("Player1".into())));
        assert_eq!(store.owner_of("Greenland_03"), Some(&Owner::Unclaimable));
    }

    #[test]
    fn capture_of_unknown_region_is_invalid_target() {
        let mut store = OwnershipStore::from_map(&map());
        assert_eq!(
            store.capture("Atlantis_01", "Player1"),
            Err(CommandError::InvalidTarget)
        );
    }

    #[test]
    fn remote_capture_mirrors_known_regions_only() {
        let mut store = OwnershipStore::from_map(&map());
        assert!(store.apply_remote("Jutland_01", Owner::Player("Player2".into())));
        assert!(!store.apply_remote("Atlantis_01", Owner::Player("Player2".into())));
        assert_eq!(
            store.owner_of("Jutland_01"),
            Some(&Owner::Player("Player2".to_string()))
        );
    }

    #[test]
    fn wire_round_trip() {
        assert_eq!(Owner::from_wire("Unclaimed"), Owner::Unclaimed);
        assert_eq!(Owner::from_wire("Unclaimable"), Owner::Unclaimable);
        assert_eq!(
            Owner::from_wire("Player1"),
            Owner::Player("Player1".to_string())
        );
        assert_eq!(Owner::Player("Player1".into()).as_wire(), "Player1");
    }
}
