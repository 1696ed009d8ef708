//! Static map geometry and the terrain oracle.
//!
//! The map is a JSON document with a `regions` array; each entry has an
//! `id`, an SVG-style `path` describing the boundary, an optional
//! `terrain` string and an optional `hasMine` flag. The path parser
//! accepts the `M/L/H/V/Z` commands (absolute and relative), which is
//! the subset the observed map exports use. Everything here is loaded
//! once at startup and never mutated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::RegionId;

/// A continuous 2D point in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation toward `other`; `t` in `[0, 1]`.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    Land,
    Water,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("region {region}: bad path: {reason}")]
    Path { region: String, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct MapDocument {
    pub regions: Vec<RegionDef>,
}

#[derive(Debug, Deserialize)]
pub struct RegionDef {
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub terrain: Option<String>,
    #[serde(default, rename = "hasMine")]
    pub has_mine: bool,
}

#[derive(Debug)]
struct RegionShape {
    id: RegionId,
    rings: Vec<Vec<Point>>,
    terrain: Terrain,
    has_mine: bool,
    // Bounding box, for the cheap rejection test.
    min: Point,
    max: Point,
}

/// The fixed set of regions, indexed for containment queries.
#[derive(Debug)]
pub struct WorldMap {
    regions: Vec<RegionShape>,
    by_id: HashMap<RegionId, usize>,
}

impl WorldMap {
    pub fn from_json(text: &str) -> Result<WorldMap, MapError> {
        let doc: MapDocument = serde_json::from_str(text)?;
        WorldMap::from_document(doc)
    }

    pub fn from_document(doc: MapDocument) -> Result<WorldMap, MapError> {
        let mut regions = Vec::with_capacity(doc.regions.len());
        let mut by_id = HashMap::new();
        for def in doc.regions {
            let rings = parse_path(&def.path).map_err(|reason| MapError::Path {
                region: def.id.clone(),
                reason,
            })?;
            let (min, max) = bounds(&rings);
            let terrain = match def.terrain.as_deref() {
                Some("water") => Terrain::Water,
                _ => Terrain::Land,
            };
            by_id.insert(def.id.clone(), regions.len());
            regions.push(RegionShape {
                id: def.id,
                rings,
                terrain,
                has_mine: def.has_mine,
                min,
                max,
            });
        }
        Ok(WorldMap { regions, by_id })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn contains_region(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn region_ids(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.id.as_str())
    }

    /// The region whose boundary contains `point`, or `None` when the
    /// point lies outside every region (treated as open water).
    pub fn region_at(&self, point: Point) -> Option<&str> {
        self.regions
            .iter()
            .find(|r| r.contains(point))
            .map(|r| r.id.as_str())
    }

    /// Terrain classification; unknown regions default to land, which
    /// matches maps that omit the `terrain` field entirely.
    pub fn terrain_of(&self, id: &str) -> Terrain {
        match self.by_id.get(id) {
            Some(&i) => self.regions[i].terrain,
            None => Terrain::Land,
        }
    }

    pub fn has_mine(&self, id: &str) -> bool {
        match self.by_id.get(id) {
            Some(&i) => self.regions[i].has_mine,
            None => false,
        }
    }

    /// Bounding-box center, used as the spawn point for new units.
    pub fn centroid_of(&self, id: &str) -> Option<Point> {
        let &i = self.by_id.get(id)?;
        let r = &self.regions[i];
        Some(Point::new(
            (r.min.x + r.max.x) / 2.0,
            (r.min.y + r.max.y) / 2.0,
        ))
    }
}

impl RegionShape {
    fn contains(&self, p: Point) -> bool {
        if p.x < self.min.x || p.x > self.max.x || p.y < self.min.y || p.y > self.max.y {
            return false;
        }
        // Even-odd rule across all rings, so holes punch through.
        let mut inside = false;
        for ring in &self.rings {
            if ring_contains(ring, p) {
                inside = !inside;
            }
        }
        inside
    }
}

fn ring_contains(ring: &[Point], p: Point) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn bounds(rings: &[Vec<Point>]) -> (Point, Point) {
    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in rings.iter().flatten() {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Cmd(char),
    Num(f64),
}

fn tokenize(d: &str) -> Result<Vec<Tok>, String> {
    let mut toks = Vec::new();
    let bytes = d.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_alphabetic() {
            toks.push(Tok::Cmd(c));
            i += 1;
        } else if c.is_whitespace() || c == ',' {
            i += 1;
        } else if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() {
            let start = i;
            i += 1; // sign or first digit
            while i < bytes.len() {
                let b = bytes[i] as char;
                if b.is_ascii_digit() || b == '.' {
                    i += 1;
                } else if (b == 'e' || b == 'E')
                    && i + 1 < bytes.len()
                    && matches!(bytes[i + 1] as char, '-' | '+' | '0'..='9')
                {
                    i += 2;
                } else {
                    break;
                }
            }
            let text = &d[start..i];
            let n: f64 = text
                .parse()
                .map_err(|_| format!("bad number {:?}", text))?;
            toks.push(Tok::Num(n));
        } else {
            return Err(format!("unexpected character {:?}", c));
        }
    }
    Ok(toks)
}

/// Flattens an `M/L/H/V/Z` path into closed polygon rings. Subpaths
/// that end without an explicit `Z` are treated as closed anyway; the
/// containment test needs a boundary, not a stroke.
fn parse_path(d: &str) -> Result<Vec<Vec<Point>>, String> {
    let toks = tokenize(d)?;
    let mut rings: Vec<Vec<Point>> = Vec::new();
    let mut ring: Vec<Point> = Vec::new();
    let mut cursor = Point::new(0.0, 0.0);
    let mut cmd: Option<char> = None;
    let mut i = 0;

    let mut close_ring = |ring: &mut Vec<Point>, rings: &mut Vec<Vec<Point>>| {
        if ring.len() >= 3 {
            rings.push(std::mem::take(ring));
        } else {
            ring.clear();
        }
    };

    while i < toks.len() {
        match toks[i] {
            Tok::Cmd(c) => {
                cmd = Some(c);
                i += 1;
                if c == 'Z' || c == 'z' {
                    if let Some(first) = ring.first().copied() {
                        cursor = first;
                    }
                    close_ring(&mut ring, &mut rings);
                }
            }
            Tok::Num(_) => {
                let c = cmd.ok_or_else(|| "number before any command".to_string())?;
                let mut take = |i: &mut usize| -> Result<f64, String> {
                    match toks.get(*i) {
                        Some(Tok::Num(n)) => {
                            *i += 1;
                            Ok(*n)
                        }
                        _ => Err(format!("command {:?} is missing a coordinate", c)),
                    }
                };
                match c {
                    'M' | 'L' | 'm' | 'l' => {
                        let x = take(&mut i)?;
                        let y = take(&mut i)?;
                        let next = if c.is_ascii_lowercase() {
                            Point::new(cursor.x + x, cursor.y + y)
                        } else {
                            Point::new(x, y)
                        };
                        if c == 'M' || c == 'm' {
                            close_ring(&mut ring, &mut rings);
                            // Extra pairs after a moveto are implicit linetos.
                            cmd = Some(if c == 'M' { 'L' } else { 'l' });
                        }
                        cursor = next;
                        ring.push(cursor);
                    }
                    'H' | 'h' => {
                        let x = take(&mut i)?;
                        cursor.x = if c == 'h' { cursor.x + x } else { x };
                        ring.push(cursor);
                    }
                    'V' | 'v' => {
                        let y = take(&mut i)?;
                        cursor.y = if c == 'v' { cursor.y + y } else { y };
                        ring.push(cursor);
                    }
                    other => return Err(format!("unsupported path command {:?}", other)),
                }
            }
        }
    }
    close_ring(&mut ring, &mut rings);

    if rings.is_empty() {
        return Err("path has no closed ring".to_string());
    }
    Ok(rings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_map() -> WorldMap {
        WorldMap::from_json(
            r#"{"regions":[
                {"id":"Jutland_01","path":"M 0 0 L 10 0 L 10 10 L 0 10 Z"},
                {"id":"Kattegat_01","path":"M 20 0 L 30 0 L 30 10 L 20 10 Z","terrain":"water"},
                {"id":"Scania_01","path":"m 40 0 l 10 0 l 0 10 l -10 0 z","hasMine":true}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn region_at_finds_containing_region() {
        let map = square_map();
        assert_eq!(map.region_at(Point::new(5.0, 5.0)), Some("Jutland_01"));
        assert_eq!(map.region_at(Point::new(25.0, 5.0)), Some("Kattegat_01"));
        assert_eq!(map.region_at(Point::new(45.0, 5.0)), Some("Scania_01"));
    }

    #[test]
    fn region_at_returns_none_outside_all_boundaries() {
        let map = square_map();
        assert_eq!(map.region_at(Point::new(15.0, 5.0)), None);
        assert_eq!(map.region_at(Point::new(-3.0, -3.0)), None);
    }

    #[test]
    fn terrain_defaults_to_land_when_unspecified() {
        let map = square_map();
        assert_eq!(map.terrain_of("Jutland_01"), Terrain::Land);
        assert_eq!(map.terrain_of("Kattegat_01"), Terrain::Water);
        assert_eq!(map.terrain_of("nowhere"), Terrain::Land);
    }

    #[test]
    fn centroid_is_bbox_center() {
        let map = square_map();
        let c = map.centroid_of("Jutland_01").unwrap();
        assert_eq!((c.x, c.y), (5.0, 5.0));
        assert!(map.centroid_of("nowhere").is_none());
    }

    #[test]
    fn has_mine_flag_carries_through() {
        let map = square_map();
        assert!(map.has_mine("Scania_01"));
        assert!(!map.has_mine("Jutland_01"));
    }

    #[test]
    fn holes_use_even_odd_rule() {
        let map = WorldMap::from_json(
            r#"{"regions":[{"id":"Ring_01",
                "path":"M 0 0 L 10 0 L 10 10 L 0 10 Z M 4 4 L 6 4 L 6 6 L 4 6 Z"}]}"#,
        )
        .unwrap();
        assert_eq!(map.region_at(Point::new(2.0, 2.0)), Some("Ring_01"));
        assert_eq!(map.region_at(Point::new(5.0, 5.0)), None);
    }

    #[test]
    fn h_and_v_commands_parse() {
        let map = WorldMap::from_json(
            r#"{"regions":[{"id":"Box_01","path":"M0 0 H10 V10 H0 Z"}]}"#,
        )
        .unwrap();
        assert_eq!(map.region_at(Point::new(5.0, 5.0)), Some("Box_01"));
    }

    #[test]
    fn bad_path_is_reported_with_region_id() {
        let err = WorldMap::from_json(
            r#"{"regions":[{"id":"Broken_01","path":"M 0 0 Q 1 1 2 2 Z"}]}"#,
        )
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Broken_01"), "{text}");
    }
}
