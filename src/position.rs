/// Position resolver: classifies raw world coordinates into coarse map areas.
///
/// World coordinates run from -8192 to +8192 on both axes. Radiant's base is
/// in the south-west corner, Dire's in the north-east. The play area is cut
/// into a 16x16 grid of 1024-unit cells:
///
///   col 0  = west edge  (x = -8192)    row 0  = south edge (y = -8192)
///   col 15 = east edge  (x = +8192)    row 15 = north edge (y = +8192)
///
/// Each named region is a union of inclusive cell rectangles, which is enough
/// to express the L-shaped lanes. Everything here is pure and O(1); callers
/// evaluate it fresh on every tick rather than caching results.
use crate::error::PositionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAP_MIN:   f32 = -8192.0;
pub const MAP_MAX:   f32 = 8192.0;
pub const GRID_SIZE: u8  = 16;
const CELL_SIZE:     f32 = (MAP_MAX - MAP_MIN) / GRID_SIZE as f32;

// ---------------------------------------------------------------------------
// Team / position
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Radiant,
    Dire,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Radiant => Team::Dire,
            Team::Dire    => Team::Radiant,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Radiant => "radiant",
            Team::Dire    => "dire",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "radiant" => Ok(Team::Radiant),
            "dire"    => Ok(Team::Dire),
            other     => Err(format!("unknown team '{}'", other)),
        }
    }
}

/// Subject location in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPosition {
    pub x: f32,
    pub y: f32,
}

impl MapPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub col: u8,
    pub row: u8,
}

/// Map world coordinates onto the grid. Returns `None` outside the play area
/// (including NaN). The far edge (+8192) belongs to the last cell.
pub fn to_cell(x: f32, y: f32) -> Option<GridCell> {
    Some(GridCell { col: axis_cell(x)?, row: axis_cell(y)? })
}

fn axis_cell(v: f32) -> Option<u8> {
    if !(MAP_MIN..=MAP_MAX).contains(&v) {
        return None;
    }
    let idx = ((v - MAP_MIN) / CELL_SIZE) as u8;
    Some(idx.min(GRID_SIZE - 1))
}

/// Inclusive rectangle of grid cells.
#[derive(Debug, Clone, Copy)]
struct CellRect {
    col0: u8,
    col1: u8,
    row0: u8,
    row1: u8,
}

impl CellRect {
    const fn new(col0: u8, col1: u8, row0: u8, row1: u8) -> Self {
        Self { col0, col1, row0, row1 }
    }

    fn contains(&self, cell: GridCell) -> bool {
        (self.col0..=self.col1).contains(&cell.col) && (self.row0..=self.row1).contains(&cell.row)
    }
}

// West edge up to the Dire side, then along the north edge.
const TOP_LANE: &[CellRect] = &[
    CellRect::new(0, 2, 3, 15),
    CellRect::new(0, 12, 13, 15),
];

// Along the south edge, then up the east edge.
const BOTTOM_LANE: &[CellRect] = &[
    CellRect::new(3, 15, 0, 2),
    CellRect::new(13, 15, 0, 12),
];

// Radiant half (col + row < 15): the big camp block between mid and bottom
// lane plus the smaller block between top and mid.
const RADIANT_JUNGLE: &[CellRect] = &[
    CellRect::new(6, 9, 3, 5),
    CellRect::new(3, 5, 6, 8),
];

// Point mirror of the Radiant jungle through the map centre.
const DIRE_JUNGLE: &[CellRect] = &[
    CellRect::new(6, 9, 10, 12),
    CellRect::new(10, 12, 7, 9),
];

/// The four hand-authored regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    TopLane,
    BottomLane,
    RadiantJungle,
    DireJungle,
}

impl Region {
    fn cells(self) -> &'static [CellRect] {
        match self {
            Region::TopLane       => TOP_LANE,
            Region::BottomLane    => BOTTOM_LANE,
            Region::RadiantJungle => RADIANT_JUNGLE,
            Region::DireJungle    => DIRE_JUNGLE,
        }
    }

    pub fn contains(self, x: f32, y: f32) -> bool {
        match to_cell(x, y) {
            Some(cell) => self.cells().iter().any(|r| r.contains(cell)),
            None       => false,
        }
    }
}

pub fn is_top_lane(x: f32, y: f32) -> bool {
    Region::TopLane.contains(x, y)
}

pub fn is_bottom_lane(x: f32, y: f32) -> bool {
    Region::BottomLane.contains(x, y)
}

pub fn is_radiant_jungle(x: f32, y: f32) -> bool {
    Region::RadiantJungle.contains(x, y)
}

pub fn is_dire_jungle(x: f32, y: f32) -> bool {
    Region::DireJungle.contains(x, y)
}

// ---------------------------------------------------------------------------
// Area predicates (catalog-facing)
// ---------------------------------------------------------------------------

/// Area names usable in catalog position predicates. The team-relative
/// variants resolve against the subject's team at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    TopLane,
    BottomLane,
    RadiantJungle,
    DireJungle,
    SafeLane,
    OffLane,
    OwnJungle,
    EnemyJungle,
}

impl Area {
    pub fn resolve(self, team: Team) -> Region {
        match (self, team) {
            (Area::TopLane, _)       => Region::TopLane,
            (Area::BottomLane, _)    => Region::BottomLane,
            (Area::RadiantJungle, _) => Region::RadiantJungle,
            (Area::DireJungle, _)    => Region::DireJungle,

            (Area::SafeLane, Team::Radiant) | (Area::OffLane, Team::Dire)    => Region::BottomLane,
            (Area::SafeLane, Team::Dire)    | (Area::OffLane, Team::Radiant) => Region::TopLane,

            (Area::OwnJungle, Team::Radiant) | (Area::EnemyJungle, Team::Dire) => Region::RadiantJungle,
            (Area::OwnJungle, Team::Dire) | (Area::EnemyJungle, Team::Radiant) => Region::DireJungle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Area::TopLane       => "top_lane",
            Area::BottomLane    => "bottom_lane",
            Area::RadiantJungle => "radiant_jungle",
            Area::DireJungle    => "dire_jungle",
            Area::SafeLane      => "safe_lane",
            Area::OffLane       => "off_lane",
            Area::OwnJungle     => "own_jungle",
            Area::EnemyJungle   => "enemy_jungle",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_lane"       => Ok(Area::TopLane),
            "bottom_lane"    => Ok(Area::BottomLane),
            "radiant_jungle" => Ok(Area::RadiantJungle),
            "dire_jungle"    => Ok(Area::DireJungle),
            "safe_lane"      => Ok(Area::SafeLane),
            "off_lane"       => Ok(Area::OffLane),
            "own_jungle"     => Ok(Area::OwnJungle),
            "enemy_jungle"   => Ok(Area::EnemyJungle),
            other            => Err(format!("unknown area '{}'", other)),
        }
    }
}

/// "Subject is in `area`", optionally restricted to subjects on `team`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPredicate {
    pub area: Area,
    #[serde(default)]
    pub team: Option<Team>,
}

impl PositionPredicate {
    pub fn new(area: Area) -> Self {
        Self { area, team: None }
    }

    pub fn for_team(area: Area, team: Team) -> Self {
        Self { area, team: Some(team) }
    }

    /// Pure (x, y, team) form of the predicate.
    pub fn holds_at(&self, x: f32, y: f32, team: Team) -> bool {
        if self.team.is_some_and(|t| t != team) {
            return false;
        }
        self.area.resolve(team).contains(x, y)
    }

    /// Evaluate against the subject's latest position report.
    ///
    /// The team restriction is checked first, so a predicate for the other
    /// team is simply false even when no position is known.
    pub fn evaluate(&self, position: Option<MapPosition>, team: Team) -> Result<bool, PositionError> {
        if self.team.is_some_and(|t| t != team) {
            return Ok(false);
        }
        let pos = position.ok_or(PositionError::Missing)?;
        if !pos.x.is_finite() || !pos.y.is_finite() {
            return Err(PositionError::NonFinite { x: pos.x, y: pos.y });
        }
        Ok(self.area.resolve(team).contains(pos.x, pos.y))
    }
}
