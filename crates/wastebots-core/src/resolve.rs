//! Authoritative action resolution against the grid and waste registry.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use thiserror::Error;

use crate::grid::{Entity, Grid};
use crate::perception::DropCooldown;
use crate::world::Robot;
use crate::{Action, Cell, Direction, Tier, Waste, WasteId};

/// Successful outcome of one resolved action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Moved { from: Cell, to: Cell },
    Collected { waste: WasteId },
    /// Two same-tier items merged into one item of the next tier.
    Fused {
        consumed: [WasteId; 2],
        produced: WasteId,
        tier: Tier,
    },
    /// Top-tier robot holding a single item; nothing merges, the item is kept for disposal.
    Sealed { waste: WasteId },
    Dropped { waste: WasteId, cell: Cell },
    Disposed { waste: WasteId, tier: Tier },
    Idle,
}

/// Reason a requested action was rejected. State is left untouched.
#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionFailure {
    #[error("move {0:?} leaves the grid")]
    OutOfBounds(Direction),
    #[error("target radioactivity {level} exceeds tolerance {tolerance}")]
    TooRadioactive { level: f32, tolerance: f32 },
    #[error("no collectable waste on the current cell")]
    NothingToCollect,
    #[error("carry capacity reached")]
    CapacityReached,
    #[error("no pair of same-tier items to fuse")]
    NothingToFuse,
    #[error("nothing to drop")]
    EmptyHands,
}

/// Mutable view over the shared resources an action may touch.
pub(crate) struct Resolver<'w> {
    pub grid: &'w mut Grid,
    pub wastes: &'w mut SlotMap<WasteId, Waste>,
    pub disposal: Cell,
    pub drop_cooldown_ticks: u32,
}

impl Resolver<'_> {
    pub fn resolve(
        &mut self,
        robot: &mut Robot,
        action: Action,
    ) -> Result<Resolution, ResolutionFailure> {
        match action {
            Action::Move(direction) => self.move_robot(robot, direction),
            Action::Collect => self.collect(robot),
            Action::Fusion => self.fuse(robot),
            Action::Drop => self.drop_item(robot),
            Action::DoNothing => Ok(Resolution::Idle),
        }
    }

    fn move_robot(
        &mut self,
        robot: &mut Robot,
        direction: Direction,
    ) -> Result<Resolution, ResolutionFailure> {
        let from = robot.position;
        let to = from
            .step(direction, self.grid.width(), self.grid.height())
            .ok_or(ResolutionFailure::OutOfBounds(direction))?;
        let level = self
            .grid
            .radioactivity(to)
            .ok_or(ResolutionFailure::OutOfBounds(direction))?;
        if level > robot.tolerance {
            return Err(ResolutionFailure::TooRadioactive {
                level,
                tolerance: robot.tolerance,
            });
        }
        if !self.grid.relocate(from, to, Entity::Robot(robot.id)) {
            return Err(ResolutionFailure::OutOfBounds(direction));
        }
        robot.position = to;
        Ok(Resolution::Moved { from, to })
    }

    fn collect(&mut self, robot: &mut Robot) -> Result<Resolution, ResolutionFailure> {
        if robot.carrying.len() >= robot.capacity {
            return Err(ResolutionFailure::CapacityReached);
        }
        let waste = self
            .grid
            .contents(robot.position)
            .iter()
            .find_map(|entity| match entity {
                Entity::Waste(id)
                    if !robot.knowledge.is_cooling_down(*id)
                        && self
                            .wastes
                            .get(*id)
                            .is_some_and(|w| w.tier == robot.tier && !w.carried) =>
                {
                    Some(*id)
                }
                _ => None,
            })
            .ok_or(ResolutionFailure::NothingToCollect)?;

        self.grid.remove(robot.position, Entity::Waste(waste));
        if let Some(item) = self.wastes.get_mut(waste) {
            item.carried = true;
        }
        robot.carrying.push(waste);
        Ok(Resolution::Collected { waste })
    }

    fn fuse(&mut self, robot: &mut Robot) -> Result<Resolution, ResolutionFailure> {
        let tiers: Vec<Tier> = robot
            .carrying
            .iter()
            .filter_map(|id| self.wastes.get(*id).map(|w| w.tier))
            .collect();
        let pair_tier = Tier::ALL.into_iter().find(|tier| {
            tier.next().is_some() && tiers.iter().filter(|t| *t == tier).count() >= 2
        });

        let Some(tier) = pair_tier else {
            if robot.tier.is_top()
                && let [waste] = robot.carrying.as_slice()
            {
                return Ok(Resolution::Sealed { waste: *waste });
            }
            return Err(ResolutionFailure::NothingToFuse);
        };
        let Some(promoted) = tier.next() else {
            return Err(ResolutionFailure::NothingToFuse);
        };

        let consumed: Vec<WasteId> = robot
            .carrying
            .iter()
            .copied()
            .filter(|id| self.wastes.get(*id).is_some_and(|w| w.tier == tier))
            .take(2)
            .collect();
        let &[first, second] = consumed.as_slice() else {
            return Err(ResolutionFailure::NothingToFuse);
        };
        robot.carrying.retain(|id| *id != first && *id != second);
        self.wastes.remove(first);
        self.wastes.remove(second);
        let produced = self.wastes.insert(Waste {
            tier: promoted,
            carried: true,
        });
        robot.carrying.push(produced);
        Ok(Resolution::Fused {
            consumed: [first, second],
            produced,
            tier: promoted,
        })
    }

    fn drop_item(&mut self, robot: &mut Robot) -> Result<Resolution, ResolutionFailure> {
        let waste = robot.carrying.pop().ok_or(ResolutionFailure::EmptyHands)?;
        let cell = robot.position;
        if cell == self.disposal {
            let tier = self
                .wastes
                .remove(waste)
                .map_or(robot.tier, |item| item.tier);
            return Ok(Resolution::Disposed { waste, tier });
        }
        if let Some(item) = self.wastes.get_mut(waste) {
            item.carried = false;
        }
        self.grid.place(cell, Entity::Waste(waste));
        if self.drop_cooldown_ticks > 0 {
            robot.knowledge.dropped_last = Some(DropCooldown {
                waste,
                remaining: self.drop_cooldown_ticks,
            });
        }
        Ok(Resolution::Dropped { waste, cell })
    }
}
