//! Core types shared across the WasteBots workspace.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use std::ops::{Index, IndexMut};

pub mod config;
pub mod grid;
pub mod messaging;
pub mod perception;
pub mod resolve;
pub mod strategy;
pub mod world;

pub use config::{WastebotsConfig, WorldStateError};
pub use grid::{Entity, Grid, Zone, ZoneLayout};
pub use messaging::{Envelope, Mailbox, Message};
pub use perception::{
    CarriedWaste, DropCooldown, Knowledge, Navigation, PerceivedEntity, Percept, Perception,
};
pub use resolve::{Resolution, ResolutionFailure};
pub use strategy::{
    Deliberation, PeerEntry, Strategy, StrategyBinding, StrategyRegistry, StrategySeed,
};
pub use world::{Robot, TickEvents, TickSummary, WasteCounts, WorldState};

new_key_type! {
    /// Stable handle for waste items backed by a generational slot map.
    pub struct WasteId;
}

/// Contamination rank shared by zones, waste and robots.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Green,
    Yellow,
    Red,
}

impl Tier {
    /// All tiers ordered from lowest to highest.
    pub const ALL: [Tier; 3] = [Tier::Green, Tier::Yellow, Tier::Red];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Green => 0,
            Self::Yellow => 1,
            Self::Red => 2,
        }
    }

    /// Tier produced by fusing two items of this tier.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Green => Some(Self::Yellow),
            Self::Yellow => Some(Self::Red),
            Self::Red => None,
        }
    }

    #[must_use]
    pub const fn is_top(self) -> bool {
        matches!(self, Self::Red)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per tier, indexable by [`Tier`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PerTier<T> {
    pub green: T,
    pub yellow: T,
    pub red: T,
}

impl<T> PerTier<T> {
    #[must_use]
    pub const fn new(green: T, yellow: T, red: T) -> Self {
        Self { green, yellow, red }
    }

    /// Apply `f` to every tier's value.
    pub fn map<U>(self, mut f: impl FnMut(Tier, T) -> U) -> PerTier<U> {
        PerTier {
            green: f(Tier::Green, self.green),
            yellow: f(Tier::Yellow, self.yellow),
            red: f(Tier::Red, self.red),
        }
    }

    /// Iterate `(tier, value)` pairs from lowest to highest tier.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, &T)> {
        [
            (Tier::Green, &self.green),
            (Tier::Yellow, &self.yellow),
            (Tier::Red, &self.red),
        ]
        .into_iter()
    }
}

impl<T> Index<Tier> for PerTier<T> {
    type Output = T;

    fn index(&self, tier: Tier) -> &T {
        match tier {
            Tier::Green => &self.green,
            Tier::Yellow => &self.yellow,
            Tier::Red => &self.red,
        }
    }
}

impl<T> IndexMut<Tier> for PerTier<T> {
    fn index_mut(&mut self, tier: Tier) -> &mut T {
        match tier {
            Tier::Green => &mut self.green,
            Tier::Yellow => &mut self.yellow,
            Tier::Red => &mut self.red,
        }
    }
}

/// High level simulation clock (ticks processed since initialisation).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Integer grid coordinate. `y` grows upward.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Neighbouring cell one step in `direction`, if it stays inside `width x height`.
    #[must_use]
    pub fn step(self, direction: Direction, width: u32, height: u32) -> Option<Self> {
        let (dx, dy) = direction.delta();
        let x = i64::from(self.x) + i64::from(dx);
        let y = i64::from(self.y) + i64::from(dy);
        if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
            return None;
        }
        Some(Self::new(x as u32, y as u32))
    }

    /// Chebyshev distance between two cells.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

/// One of the four orthogonal moves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::Up => (0, 1),
            Self::Down => (0, -1),
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

/// Fixed action vocabulary a strategy may request each tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Move(Direction),
    Fusion,
    Collect,
    Drop,
    DoNothing,
}

impl Action {
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Move(direction) => Some(direction),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_move(self) -> bool {
        matches!(self, Self::Move(_))
    }
}

/// Sequential robot identifier assigned during initialisation.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct RobotId(pub u32);

impl RobotId {
    #[must_use]
    pub const fn is_even(self) -> bool {
        self.0 % 2 == 0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "robot#{}", self.0)
    }
}

/// Role fixed once per robot when the world is initialised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// First robot of its tier; merges waste delivered by sweepers.
    Anchor,
    TopSweeper,
    BottomSweeper,
}

/// Deliberation state shared by every strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Seeking,
    Carrying,
    CarryingSeekingUp,
    CarryingSeekingDown,
    PlacingFusion,
    PlacingTop,
    PlacingDown,
    ResearchingTop,
    ResearchingDown,
    Fusion,
    RedSeeking,
}

/// A waste token, either lying on the grid or carried by a robot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Waste {
    pub tier: Tier,
    pub carried: bool,
}

impl Waste {
    #[must_use]
    pub const fn loose(tier: Tier) -> Self {
        Self {
            tier,
            carried: false,
        }
    }
}

/// Sink for top-tier waste.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisposalSite {
    pub cell: Cell,
}
