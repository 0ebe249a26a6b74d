//! Local perception snapshots and the per-robot knowledge record.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::{Action, Cell, Mode, RobotId, Role, Tick, Tier, WasteId};

/// What a robot can tell about an entity in its neighbourhood.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum PerceivedEntity {
    Robot { id: RobotId, tier: Tier },
    Waste { id: WasteId, tier: Tier },
    Radioactivity(f32),
    Disposal,
}

/// Entity observed at a given cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Percept {
    pub cell: Cell,
    pub entity: PerceivedEntity,
}

/// Item held in a robot's carry list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarriedWaste {
    pub id: WasteId,
    pub tier: Tier,
}

/// Read-only view of the deliberating robot at the start of its turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Perception {
    pub tick: Tick,
    pub robot: RobotId,
    pub tier: Tier,
    pub role: Role,
    pub tolerance: f32,
    pub capacity: usize,
    pub position: Cell,
    pub carrying: Vec<CarriedWaste>,
}

impl Perception {
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.carrying.len() >= self.capacity
    }

    /// Carried items sharing the robot's own tier.
    #[must_use]
    pub fn carried_of(&self, tier: Tier) -> usize {
        self.carrying.iter().filter(|w| w.tier == tier).count()
    }
}

/// Reference to the item a robot dropped most recently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropCooldown {
    pub waste: WasteId,
    pub remaining: u32,
}

/// Optional navigation scratch state used by the sweep strategies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Navigation {
    /// Grid height learned by walking from one vertical edge to the other.
    pub known_height: Option<u32>,
    /// Column where the current sweep first hit its right boundary.
    pub x_excursion: Option<u32>,
    /// Row where the current sweep started.
    pub y_excursion: Option<u32>,
    /// Rows already swept end to end, in completion order.
    pub swept_rows: Vec<u32>,
    /// Most recent requested actions, oldest first.
    pub recent_actions: VecDeque<Action>,
}

impl Navigation {
    /// Append `action`, discarding the oldest entries beyond `capacity`.
    pub fn record_action(&mut self, action: Action, capacity: usize) {
        self.recent_actions.push_back(action);
        while self.recent_actions.len() > capacity {
            self.recent_actions.pop_front();
        }
    }

    #[must_use]
    pub fn last_action(&self) -> Option<Action> {
        self.recent_actions.back().copied()
    }

    /// Latest requested move matching `filter`.
    pub fn last_move_where(
        &self,
        filter: impl Fn(crate::Direction) -> bool,
    ) -> Option<crate::Direction> {
        self.recent_actions
            .iter()
            .rev()
            .filter_map(|action| action.direction())
            .find(|direction| filter(*direction))
    }

    /// Record `row` as swept unless it already is.
    pub fn mark_swept(&mut self, row: u32) -> bool {
        if self.swept_rows.contains(&row) {
            return false;
        }
        self.swept_rows.push(row);
        true
    }
}

/// Fixed-shape knowledge record owned by a single robot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Knowledge {
    /// Entities in the 3x3 neighbourhood, own cell included.
    pub neighbors: Vec<Percept>,
    /// Action rejected on the previous turn, if any.
    pub last_action_failed: Option<Action>,
    pub dropped_last: Option<DropCooldown>,
    pub mode: Mode,
    /// Set once a peer reports that the tier's sweep is complete.
    pub exploration_finished: bool,
    pub navigation: Navigation,
}

impl Knowledge {
    #[must_use]
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// True while `waste` is the item dropped within the cooldown window.
    #[must_use]
    pub fn is_cooling_down(&self, waste: WasteId) -> bool {
        self.dropped_last
            .is_some_and(|cooldown| cooldown.waste == waste && cooldown.remaining > 0)
    }

    /// Age the drop cooldown by one tick, clearing it once it expires.
    pub fn tick_cooldown(&mut self) {
        if let Some(cooldown) = &mut self.dropped_last {
            cooldown.remaining = cooldown.remaining.saturating_sub(1);
            if cooldown.remaining == 0 {
                self.dropped_last = None;
            }
        }
    }

    /// Waste of `tier` visible on `cell`, skipping the cooling-down item.
    pub fn wastes_at(
        &self,
        cell: Cell,
        tier: Tier,
    ) -> impl Iterator<Item = (Cell, WasteId)> + '_ {
        self.wastes_of(tier).filter(move |(seen, _)| *seen == cell)
    }

    /// Any visible waste of `tier`, skipping the cooling-down item.
    pub fn wastes_of(&self, tier: Tier) -> impl Iterator<Item = (Cell, WasteId)> + '_ {
        self.neighbors
            .iter()
            .filter_map(move |percept| match percept.entity {
                PerceivedEntity::Waste { id, tier: seen }
                    if seen == tier && !self.is_cooling_down(id) =>
                {
                    Some((percept.cell, id))
                }
                _ => None,
            })
    }

    #[must_use]
    pub fn has_waste_at(&self, cell: Cell, tier: Tier) -> bool {
        self.wastes_at(cell, tier).next().is_some()
    }

    /// Cell of the disposal site if it is within sight.
    #[must_use]
    pub fn disposal(&self) -> Option<Cell> {
        self.neighbors
            .iter()
            .find(|percept| matches!(percept.entity, PerceivedEntity::Disposal))
            .map(|percept| percept.cell)
    }

    /// Visible robots other than `me`.
    pub fn robots(&self, me: RobotId) -> impl Iterator<Item = (Cell, RobotId, Tier)> + '_ {
        self.neighbors.iter().filter_map(move |percept| match percept.entity {
            PerceivedEntity::Robot { id, tier } if id != me => Some((percept.cell, id, tier)),
            _ => None,
        })
    }

    /// Highest radioactivity visible in the neighbourhood.
    #[must_use]
    pub fn max_radioactivity(&self) -> f32 {
        self.neighbors
            .iter()
            .filter_map(|percept| match percept.entity {
                PerceivedEntity::Radioactivity(level) => Some(level),
                _ => None,
            })
            .fold(0.0, f32::max)
    }

    /// Radioactivity of the observed `cell`.
    #[must_use]
    pub fn radioactivity_at(&self, cell: Cell) -> Option<f32> {
        self.neighbors.iter().find_map(|percept| match percept.entity {
            PerceivedEntity::Radioactivity(level) if percept.cell == cell => Some(level),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn cooldown_expires_after_its_window() {
        let mut ids: SlotMap<WasteId, ()> = SlotMap::with_key();
        let waste = ids.insert(());
        let mut knowledge = Knowledge {
            dropped_last: Some(DropCooldown {
                waste,
                remaining: 2,
            }),
            ..Knowledge::default()
        };
        assert!(knowledge.is_cooling_down(waste));
        knowledge.tick_cooldown();
        assert!(knowledge.is_cooling_down(waste));
        knowledge.tick_cooldown();
        assert!(!knowledge.is_cooling_down(waste));
        assert!(knowledge.dropped_last.is_none());
    }

    #[test]
    fn cooling_down_waste_is_hidden_from_queries() {
        let mut ids: SlotMap<WasteId, ()> = SlotMap::with_key();
        let dropped = ids.insert(());
        let other = ids.insert(());
        let here = Cell::new(1, 1);
        let knowledge = Knowledge {
            neighbors: vec![
                Percept {
                    cell: here,
                    entity: PerceivedEntity::Waste {
                        id: dropped,
                        tier: Tier::Green,
                    },
                },
                Percept {
                    cell: Cell::new(2, 1),
                    entity: PerceivedEntity::Waste {
                        id: other,
                        tier: Tier::Green,
                    },
                },
            ],
            dropped_last: Some(DropCooldown {
                waste: dropped,
                remaining: 5,
            }),
            ..Knowledge::default()
        };
        assert!(!knowledge.has_waste_at(here, Tier::Green));
        let visible: Vec<_> = knowledge.wastes_of(Tier::Green).collect();
        assert_eq!(visible, vec![(Cell::new(2, 1), other)]);
    }

    #[test]
    fn action_history_is_bounded() {
        let mut nav = Navigation::default();
        for _ in 0..5 {
            nav.record_action(Action::Collect, 3);
        }
        nav.record_action(Action::Move(crate::Direction::Up), 3);
        assert_eq!(nav.recent_actions.len(), 3);
        assert_eq!(nav.last_action(), Some(Action::Move(crate::Direction::Up)));
        assert_eq!(
            nav.last_move_where(crate::Direction::is_vertical),
            Some(crate::Direction::Up)
        );
        assert!(nav.mark_swept(4));
        assert!(!nav.mark_swept(4));
    }
}
