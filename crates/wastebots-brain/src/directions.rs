//! Movement filtering shared by the built-in strategies.

use rand::RngCore;
use rand::seq::IndexedRandom;
use wastebots_core::{Cell, Direction, Knowledge, Perception, Tier};

/// Radioactivity gap between adjacent zone tolerances.
const ZONE_STEP: f32 = 1.0 / 3.0;
const EPSILON: f32 = 1e-4;

/// Set of orthogonal moves still open to a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moves {
    bits: u8,
}

impl Moves {
    const fn bit(direction: Direction) -> u8 {
        match direction {
            Direction::Left => 0b0001,
            Direction::Right => 0b0010,
            Direction::Up => 0b0100,
            Direction::Down => 0b1000,
        }
    }

    #[must_use]
    pub const fn none() -> Self {
        Self { bits: 0 }
    }

    #[must_use]
    pub const fn contains(self, direction: Direction) -> bool {
        self.bits & Self::bit(direction) != 0
    }

    #[must_use]
    pub const fn blocked(self, direction: Direction) -> bool {
        !self.contains(direction)
    }

    pub fn remove(&mut self, direction: Direction) {
        self.bits &= !Self::bit(direction);
    }

    pub fn insert(&mut self, direction: Direction) {
        self.bits |= Self::bit(direction);
    }

    /// True when at least one horizontal side is closed.
    #[must_use]
    pub const fn at_row_end(self) -> bool {
        self.blocked(Direction::Left) || self.blocked(Direction::Right)
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |direction| self.contains(*direction))
    }

    /// Uniform pick among the open moves.
    pub fn choose(self, rng: &mut dyn RngCore) -> Option<Direction> {
        let options: Vec<Direction> = self.iter().collect();
        options.choose(rng).copied()
    }
}

/// Moves a robot may attempt given what it currently sees.
///
/// A side with no observed cell is the grid boundary. Right closes as soon as any
/// visible cell is hotter than the robot tolerates. Robots above the lowest tier
/// stop moving left once they stand inside the next lower zone.
#[must_use]
pub fn possible_moves(perception: &Perception, knowledge: &Knowledge) -> Moves {
    let here = perception.position;
    let mut moves = Moves::none();
    for percept in &knowledge.neighbors {
        let cell = percept.cell;
        if cell.x < here.x {
            moves.insert(Direction::Left);
        }
        if cell.x > here.x {
            moves.insert(Direction::Right);
        }
        if cell.y > here.y {
            moves.insert(Direction::Up);
        }
        if cell.y < here.y {
            moves.insert(Direction::Down);
        }
    }

    if knowledge.max_radioactivity() > perception.tolerance + EPSILON {
        moves.remove(Direction::Right);
    }

    if perception.tier != Tier::Green
        && knowledge
            .radioactivity_at(here)
            .is_some_and(|level| level <= perception.tolerance - ZONE_STEP + EPSILON)
    {
        moves.remove(Direction::Left);
    }
    moves
}

/// First step from `from` toward `to`, closing the horizontal gap first.
#[must_use]
pub fn toward(from: Cell, to: Cell) -> Option<Direction> {
    if to.x != from.x {
        Some(if to.x < from.x {
            Direction::Left
        } else {
            Direction::Right
        })
    } else if to.y != from.y {
        Some(if to.y > from.y {
            Direction::Up
        } else {
            Direction::Down
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wastebots_core::{PerceivedEntity, Percept, RobotId, Role, Tick};

    fn perception(tier: Tier, tolerance: f32, position: Cell) -> Perception {
        Perception {
            tick: Tick::zero(),
            robot: RobotId(0),
            tier,
            role: Role::Anchor,
            tolerance,
            capacity: 2,
            position,
            carrying: Vec::new(),
        }
    }

    /// Radioactivity markers for a 3x3 block around `center`, clipped at zero.
    fn markers(center: Cell, level: impl Fn(u32) -> f32) -> Knowledge {
        let mut neighbors = Vec::new();
        for y in center.y.saturating_sub(1)..=center.y + 1 {
            for x in center.x.saturating_sub(1)..=center.x + 1 {
                neighbors.push(Percept {
                    cell: Cell::new(x, y),
                    entity: PerceivedEntity::Radioactivity(level(x)),
                });
            }
        }
        Knowledge {
            neighbors,
            ..Knowledge::default()
        }
    }

    #[test]
    fn grid_edges_close_moves() {
        let here = Cell::new(0, 0);
        let knowledge = markers(here, |_| 0.1);
        let moves = possible_moves(&perception(Tier::Green, 1.0 / 3.0, here), &knowledge);
        assert!(moves.blocked(Direction::Left));
        assert!(moves.blocked(Direction::Down));
        assert!(moves.contains(Direction::Right));
        assert!(moves.contains(Direction::Up));
    }

    #[test]
    fn hot_neighbours_close_the_right_side() {
        let here = Cell::new(2, 2);
        let knowledge = markers(here, |x| if x > 2 { 0.5 } else { 0.1 });
        let moves = possible_moves(&perception(Tier::Green, 1.0 / 3.0, here), &knowledge);
        assert!(moves.blocked(Direction::Right));
        assert_eq!(moves.iter().count(), 3);
    }

    #[test]
    fn upper_tiers_go_at_most_one_cell_into_the_lower_zone() {
        let here = Cell::new(3, 2);
        let knowledge = markers(here, |x| if x >= 4 { 0.5 } else { 0.1 });
        let moves = possible_moves(&perception(Tier::Yellow, 2.0 / 3.0, here), &knowledge);
        assert!(moves.blocked(Direction::Left));

        let inside = Cell::new(4, 2);
        let knowledge = markers(inside, |x| if x >= 4 { 0.5 } else { 0.1 });
        let moves = possible_moves(&perception(Tier::Yellow, 2.0 / 3.0, inside), &knowledge);
        assert!(moves.contains(Direction::Left));
    }

    #[test]
    fn toward_closes_x_before_y() {
        let from = Cell::new(2, 2);
        assert_eq!(toward(from, Cell::new(1, 3)), Some(Direction::Left));
        assert_eq!(toward(from, Cell::new(2, 3)), Some(Direction::Up));
        assert_eq!(toward(from, Cell::new(2, 1)), Some(Direction::Down));
        assert_eq!(toward(from, from), None);
    }
}
