//! Random-walk collector with occasional littering.

use rand::Rng;
use wastebots_core::{Action, Deliberation, Direction, Mode, Strategy, StrategySeed};

use crate::directions::{possible_moves, toward};

/// Wanders until it finds waste of its tier, fuses full loads and pushes them right.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    litter_probability: f64,
}

impl RandomWalk {
    #[must_use]
    pub fn new(litter_probability: f64) -> Self {
        Self { litter_probability }
    }

    #[must_use]
    pub fn from_seed(seed: &StrategySeed) -> Box<dyn Strategy> {
        Box::new(Self::new(seed.litter_probability))
    }

    fn seeking(&self, ctx: &mut Deliberation<'_>) -> Action {
        let perception = ctx.perception;
        if perception.carrying.len() == 1
            && !perception.tier.is_top()
            && ctx.rng.random::<f64>() < self.litter_probability
        {
            return Action::Drop;
        }

        if perception.is_full() {
            ctx.knowledge.mode = Mode::Carrying;
            return Action::Fusion;
        }

        let here = perception.position;
        if ctx.knowledge.has_waste_at(here, perception.tier) {
            return Action::Collect;
        }

        let moves = possible_moves(perception, ctx.knowledge);
        let chase = ctx
            .knowledge
            .wastes_of(perception.tier)
            .filter_map(|(cell, _)| toward(here, cell))
            .find(|direction| moves.contains(*direction));
        if let Some(direction) = chase {
            return Action::Move(direction);
        }

        moves
            .choose(ctx.rng)
            .map_or(Action::DoNothing, Action::Move)
    }

    fn carrying(&self, ctx: &mut Deliberation<'_>) -> Action {
        let perception = ctx.perception;
        if perception.carrying.is_empty() {
            ctx.knowledge.mode = Mode::Seeking;
            return Action::DoNothing;
        }

        if perception.tier.is_top() {
            if ctx.knowledge.last_action_failed == Some(Action::Move(Direction::Right)) {
                ctx.knowledge.mode = Mode::CarryingSeekingUp;
                return self.seeking_disposal(ctx);
            }
            return Action::Move(Direction::Right);
        }

        if ctx.knowledge.max_radioactivity() > perception.tolerance {
            ctx.knowledge.mode = Mode::Seeking;
            return Action::Drop;
        }
        Action::Move(Direction::Right)
    }

    /// Vertical search along the last column, flipping at each edge.
    fn seeking_disposal(&self, ctx: &mut Deliberation<'_>) -> Action {
        let perception = ctx.perception;
        if perception.carrying.is_empty() {
            ctx.knowledge.mode = Mode::Seeking;
            return Action::DoNothing;
        }
        if !perception.tier.is_top() {
            ctx.knowledge.mode = Mode::Carrying;
            return self.carrying(ctx);
        }

        let here = perception.position;
        if let Some(site) = ctx.knowledge.disposal() {
            return match toward(here, site) {
                None => {
                    ctx.knowledge.mode = Mode::Seeking;
                    Action::Drop
                }
                Some(direction) => Action::Move(direction),
            };
        }

        let moves = possible_moves(perception, ctx.knowledge);
        let heading = if ctx.knowledge.mode == Mode::CarryingSeekingDown {
            Direction::Down
        } else {
            Direction::Up
        };
        if moves.contains(heading) {
            return Action::Move(heading);
        }
        let reverse = heading.opposite();
        ctx.knowledge.mode = if reverse == Direction::Up {
            Mode::CarryingSeekingUp
        } else {
            Mode::CarryingSeekingDown
        };
        Action::Move(reverse)
    }
}

impl Strategy for RandomWalk {
    fn kind(&self) -> &'static str {
        "random"
    }

    fn deliberate(&mut self, ctx: &mut Deliberation<'_>) -> Action {
        match ctx.knowledge.mode {
            Mode::Carrying => self.carrying(ctx),
            Mode::CarryingSeekingUp | Mode::CarryingSeekingDown => self.seeking_disposal(ctx),
            _ => self.seeking(ctx),
        }
    }
}
