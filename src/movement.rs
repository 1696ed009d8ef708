//! Straight-line movement under a piecewise terrain-and-ownership
//! speed field.
//!
//! Integration is an explicit step function: any scheduler — an
//! animation frame callback, a fixed-timestep loop, or a test — calls
//! [`advance`] with the real elapsed seconds. The multiplier is
//! re-evaluated at the unit's current position every tick, so a border
//! crossing takes effect on the next step, not at path-planning time.
//! A stalled tick source loses no distance: whatever `dt` eventually
//! arrives is integrated as-is.

use crate::geometry::{Point, Terrain, WorldMap};
use crate::ownership::{Owner, OwnershipStore};
use crate::units::{TravelState, Unit};

pub const BASE_SPEED: f64 = 1.0;
pub const WATER_MULTIPLIER: f64 = 0.5;
pub const ENEMY_TERRITORY_MULTIPLIER: f64 = 1.0 / 3.0;
pub const OWNED_TERRITORY_MULTIPLIER: f64 = 2.0;

/// Sample count (minus one) for the travel-time preview.
pub const ESTIMATE_SEGMENTS: usize = 10;

/// A straight-line path in progress. `distance_traveled` is the only
/// mutable part; position and remaining time are derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelPlan {
    start: Point,
    destination: Point,
    total_distance: f64,
    distance_traveled: f64,
}

impl TravelPlan {
    pub fn new(start: Point, destination: Point) -> TravelPlan {
        TravelPlan {
            start,
            destination,
            total_distance: start.distance_to(destination),
            distance_traveled: 0.0,
        }
    }

    pub fn destination(&self) -> Point {
        self.destination
    }

    pub fn distance_left(&self) -> f64 {
        self.total_distance - self.distance_traveled
    }

    fn position(&self) -> Point {
        if self.total_distance == 0.0 {
            return self.destination;
        }
        self.start
            .lerp(self.destination, self.distance_traveled / self.total_distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    EnRoute { remaining_time: f64 },
    Arrived,
}

/// Speed multiplier at a point, in priority order: water, then enemy
/// territory, then friendly territory, then neutral land. A water
/// region owned by an enemy is still water. Points outside every
/// region count as open water.
pub fn speed_multiplier(
    point: Point,
    unit_owner: &str,
    map: &WorldMap,
    ownership: &OwnershipStore,
) -> f64 {
    let region = match map.region_at(point) {
        Some(region) => region,
        None => return WATER_MULTIPLIER,
    };
    if map.terrain_of(region) == Terrain::Water {
        return WATER_MULTIPLIER;
    }
    match ownership.owner_of(region) {
        Some(Owner::Player(p)) if p != unit_owner => ENEMY_TERRITORY_MULTIPLIER,
        Some(Owner::Player(_)) => OWNED_TERRITORY_MULTIPLIER,
        _ => 1.0,
    }
}

/// Advances a traveling unit by `dt` seconds. Distance accumulates
/// along the straight line and is clamped to the path length, so the
/// final position is the destination exactly, never past it. Idle
/// units report `Arrived` unchanged.
pub fn advance(
    unit: &mut Unit,
    dt: f64,
    map: &WorldMap,
    ownership: &OwnershipStore,
) -> Progress {
    let multiplier = speed_multiplier(unit.position, &unit.owner, map, ownership);
    let plan = match &mut unit.travel {
        TravelState::Traveling(plan) => plan,
        TravelState::Idle => return Progress::Arrived,
    };

    plan.distance_traveled =
        (plan.distance_traveled + BASE_SPEED * multiplier * dt).min(plan.total_distance);
    unit.position = plan.position();

    if plan.distance_left() <= 0.0 {
        unit.position = plan.destination;
        unit.travel = TravelState::Idle;
        Progress::Arrived
    } else {
        Progress::EnRoute {
            remaining_time: plan.distance_left() / (BASE_SPEED * multiplier),
        }
    }
}

/// Travel-time preview: samples `ESTIMATE_SEGMENTS + 1` evenly spaced
/// points (both endpoints inclusive) under the *current* ownership and
/// terrain state, averages the multipliers, and divides the distance
/// by the average speed. Not a contract on arrival time — ownership
/// can change en route and the field need not be uniform.
pub fn estimate_travel_time(
    start: Point,
    destination: Point,
    unit_owner: &str,
    map: &WorldMap,
    ownership: &OwnershipStore,
) -> f64 {
    let distance = start.distance_to(destination);
    let mut multiplier_sum = 0.0;
    for i in 0..=ESTIMATE_SEGMENTS {
        let t = i as f64 / ESTIMATE_SEGMENTS as f64;
        multiplier_sum += speed_multiplier(start.lerp(destination, t), unit_owner, map, ownership);
    }
    let average = multiplier_sum / (ESTIMATE_SEGMENTS + 1) as f64;
    distance / (BASE_SPEED * average)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitRegistry;

    fn flat_land() -> (WorldMap, OwnershipStore) {
        let map = WorldMap::from_json(
            r#"{"regions":[{"id":"Flatland_01","path":"M -5 -5 L 15 -5 L 15 15 L -5 15 Z"}]}"#,
        )
        .unwrap();
        let ownership = OwnershipStore::from_map(&map);
        (map, ownership)
    }

    fn unit_at(x: f64, y: f64) -> Unit {
        Unit {
            id: "u1".to_string(),
            owner: "Player1".to_string(),
            position: Point::new(x, y),
            health: 100,
            travel: TravelState::Idle,
        }
    }

    #[test]
    fn flat_land_scenario_matches_expected_times() {
        let (map, ownership) = flat_land();
        let mut unit = unit_at(0.0, 0.0);
        let dest = Point::new(10.0, 0.0);

        let estimate = estimate_travel_time(unit.position, dest, &unit.owner, &map, &ownership);
        assert!((estimate - 10.0).abs() < 1e-9);

        unit.travel = TravelState::Traveling(TravelPlan::new(unit.position, dest));
        match advance(&mut unit, 1.0, &map, &ownership) {
            Progress::EnRoute { remaining_time } => {
                assert!((remaining_time - 9.0).abs() < 1e-9);
            }
            Progress::Arrived => panic!("should still be en route"),
        }
        assert!((unit.position.x - 1.0).abs() < 1e-9);
        assert!(unit.position.y.abs() < 1e-9);
    }

    #[test]
    fn arrival_is_exact_with_no_overshoot() {
        let (map, ownership) = flat_land();
        let mut unit = unit_at(0.0, 0.0);
        let dest = Point::new(10.0, 0.0);
        unit.travel = TravelState::Traveling(TravelPlan::new(unit.position, dest));

        // Oversized final tick must clamp to the path length.
        let mut ticks = 0;
        loop {
            match advance(&mut unit, 3.0, &map, &ownership) {
                Progress::Arrived => break,
                Progress::EnRoute { .. } => ticks += 1,
            }
            assert!(ticks < 100, "never arrived");
        }
        assert_eq!(unit.position, dest);
        assert_eq!(unit.travel, TravelState::Idle);
    }

    #[test]
    fn zero_length_path_arrives_immediately() {
        let (map, ownership) = flat_land();
        let mut unit = unit_at(3.0, 3.0);
        unit.travel = TravelState::Traveling(TravelPlan::new(unit.position, unit.position));
        assert_eq!(advance(&mut unit, 0.016, &map, &ownership), Progress::Arrived);
        assert_eq!(unit.position, Point::new(3.0, 3.0));
    }

    #[test]
    fn multiplier_priority_water_beats_enemy_ownership() {
        let map = WorldMap::from_json(
            r#"{"regions":[
                {"id":"Sound_01","path":"M 0 0 L 10 0 L 10 10 L 0 10 Z","terrain":"water"},
                {"id":"Plain_01","path":"M 20 0 L 30 0 L 30 10 L 20 10 Z"}
            ]}"#,
        )
        .unwrap();
        let mut ownership = OwnershipStore::from_map(&map);
        ownership.capture("Sound_01", "Player2").unwrap();
        ownership.capture("Plain_01", "Player2").unwrap();

        let p_water = Point::new(5.0, 5.0);
        let p_land = Point::new(25.0, 5.0);
        assert_eq!(
            speed_multiplier(p_water, "Player1", &map, &ownership),
            WATER_MULTIPLIER
        );
        assert_eq!(
            speed_multiplier(p_land, "Player1", &map, &ownership),
            ENEMY_TERRITORY_MULTIPLIER
        );
        assert_eq!(
            speed_multiplier(p_land, "Player2", &map, &ownership),
            OWNED_TERRITORY_MULTIPLIER
        );
        // Off the map entirely: open water.
        assert_eq!(
            speed_multiplier(Point::new(-50.0, -50.0), "Player1", &map, &ownership),
            WATER_MULTIPLIER
        );
    }

    #[test]
    fn multiplier_is_re_evaluated_at_current_position() {
        // Friendly land for x < 5.5, neutral beyond: the first steps
        // run at 2x, later steps at 1x.
        let map = WorldMap::from_json(
            r#"{"regions":[
                {"id":"Home_01","path":"M -1 -1 L 5.5 -1 L 5.5 1 L -1 1 Z"},
                {"id":"March_01","path":"M 5.5 -1 L 12 -1 L 12 1 L 5.5 1 Z"}
            ]}"#,
        )
        .unwrap();
        let mut ownership = OwnershipStore::from_map(&map);
        ownership.capture("Home_01", "Player1").unwrap();

        let mut unit = unit_at(0.0, 0.0);
        unit.travel = TravelState::Traveling(TravelPlan::new(unit.position, Point::new(10.0, 0.0)));

        advance(&mut unit, 1.0, &map, &ownership);
        assert!((unit.position.x - 2.0).abs() < 1e-9, "2x on home soil");
        advance(&mut unit, 1.0, &map, &ownership);
        assert!((unit.position.x - 4.0).abs() < 1e-9);
        advance(&mut unit, 1.0, &map, &ownership);
        // Step began at x=4.0, still friendly, so another 2.0.
        assert!((unit.position.x - 6.0).abs() < 1e-9);
        advance(&mut unit, 1.0, &map, &ownership);
        // Now on neutral land: 1x.
        assert!((unit.position.x - 7.0).abs() < 1e-9);
    }

    #[test]
    fn estimate_averages_sampled_multipliers() {
        let map = WorldMap::from_json(
            r#"{"regions":[
                {"id":"Home_01","path":"M -1 -1 L 5.5 -1 L 5.5 1 L -1 1 Z"},
                {"id":"March_01","path":"M 5.5 -1 L 12 -1 L 12 1 L 5.5 1 Z"}
            ]}"#,
        )
        .unwrap();
        let mut ownership = OwnershipStore::from_map(&map);
        ownership.capture("Home_01", "Player1").unwrap();

        // Samples at x = 0..=10: six friendly (2x), five neutral (1x).
        let estimate = estimate_travel_time(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            "Player1",
            &map,
            &ownership,
        );
        let expected = 10.0 / ((6.0 * 2.0 + 5.0 * 1.0) / 11.0);
        assert!((estimate - expected).abs() < 1e-9);
    }

    // Registry-level integration: several units traveling as
    // independent loops over the same read-only oracles.
    #[test]
    fn concurrent_units_advance_independently() {
        let (map, ownership) = flat_land();
        let mut registry = UnitRegistry::new();
        let a = registry
            .spawn("Player1", "Flatland_01", &map)
            .unwrap()
            .id
            .clone();
        let b = registry
            .spawn("Player2", "Flatland_01", &map)
            .unwrap()
            .id
            .clone();
        registry
            .begin_travel(&a, Point::new(10.0, 5.0))
            .unwrap();
        registry.begin_travel(&b, Point::new(5.0, 10.0)).unwrap();

        for id in [&a, &b] {
            let unit = registry.get_mut(id).unwrap();
            advance(unit, 0.5, &map, &ownership);
        }
        assert!(registry.get(&a).unwrap().is_traveling());
        assert!(registry.get(&b).unwrap().is_traveling());
        assert!((registry.get(&a).unwrap().position.x - 5.5).abs() < 1e-9);
    }
}
