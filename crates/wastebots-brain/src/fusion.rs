//! Fusion-and-research sweep coordination, with an optional messaging layer.

use rand::Rng;
use tracing::debug;
use wastebots_core::{
    Action, Deliberation, Direction, Message, Mode, RobotId, Role, Strategy, StrategySeed, Tier,
};

use crate::directions::{Moves, possible_moves, toward};

/// One anchor per tier patrols the hand-off column and merges deliveries;
/// sweepers serpentine through their half of the zone and carry finds to it.
/// A top-tier anchor has nothing to merge and sweeps its zone for the disposal run instead.
#[derive(Debug, Clone)]
pub struct FusionResearch {
    role: Role,
    messaging: bool,
    /// Set once this robot has broadcast the end of exploration.
    announced: bool,
    /// Vertical step taken at each row end of the top-tier anchor sweep.
    row_heading: Direction,
}

impl FusionResearch {
    #[must_use]
    pub fn new(role: Role, messaging: bool) -> Self {
        Self {
            role,
            messaging,
            announced: false,
            row_heading: Direction::Up,
        }
    }

    #[must_use]
    pub fn from_seed(seed: &StrategySeed) -> Box<dyn Strategy> {
        Box::new(Self::new(seed.role, false))
    }

    #[must_use]
    pub fn communicating(seed: &StrategySeed) -> Box<dyn Strategy> {
        Box::new(Self::new(seed.role, true))
    }

    fn is_anchor(&self) -> bool {
        self.role == Role::Anchor
    }

    fn sweeps_for_disposal(&self, tier: Tier) -> bool {
        self.is_anchor() && tier.is_top()
    }

    /// Mode resumed once the carry list is empty again.
    fn home_mode(&self, tier: Tier, finished: bool) -> Mode {
        if self.sweeps_for_disposal(tier) {
            Mode::RedSeeking
        } else if self.is_anchor() {
            Mode::PlacingFusion
        } else {
            self.research_mode(finished)
        }
    }

    /// Sweep mode a sweeper returns to after a delivery.
    fn research_mode(&self, finished: bool) -> Mode {
        if finished {
            return Mode::RedSeeking;
        }
        match self.role {
            Role::Anchor => Mode::Fusion,
            Role::TopSweeper => Mode::ResearchingTop,
            Role::BottomSweeper => Mode::ResearchingDown,
        }
    }

    fn communicate(&mut self, ctx: &mut Deliberation<'_>) {
        let me = ctx.perception.robot;
        let tier = ctx.perception.tier;
        let here = ctx.perception.position;

        if !self.is_anchor()
            && !matches!(ctx.knowledge.mode, Mode::PlacingTop | Mode::PlacingDown)
            && !ctx.knowledge.exploration_finished
        {
            let same_row: Vec<RobotId> = ctx
                .knowledge
                .robots(me)
                .filter(|(cell, _, seen)| *seen == tier && cell.y == here.y)
                .map(|(_, id, _)| id)
                .collect();
            for peer in same_row {
                ctx.send(
                    peer,
                    Message::Identify {
                        role: self.role,
                        tier,
                    },
                );
            }
        }

        let mut met_counterpart = false;
        let mut informed = false;
        for envelope in ctx.inbox {
            match envelope.message {
                Message::Identify { role, tier: from } => {
                    if !self.is_anchor() && from == tier && role != self.role {
                        met_counterpart = true;
                    }
                }
                Message::ExplorationFinished => informed = true,
            }
        }

        if met_counterpart && !self.announced {
            self.announced = true;
            let peers: Vec<RobotId> = ctx
                .tier_peers()
                .map(|peer| peer.id)
                .filter(|id| *id != me)
                .collect();
            debug!(robot = %me, %tier, peers = peers.len(), "announcing end of exploration");
            for peer in peers {
                ctx.send(peer, Message::ExplorationFinished);
            }
            informed = true;
        }

        if informed && !self.is_anchor() && !ctx.knowledge.exploration_finished {
            debug!(robot = %me, %tier, mode = ?ctx.knowledge.mode, "exploration finished");
            ctx.knowledge.exploration_finished = true;
            ctx.knowledge.mode = Mode::RedSeeking;
        }
    }

    fn own_waste_here(ctx: &Deliberation<'_>) -> bool {
        ctx.knowledge
            .has_waste_at(ctx.perception.position, ctx.perception.tier)
    }

    fn on_disposal(ctx: &Deliberation<'_>) -> bool {
        ctx.knowledge.disposal() == Some(ctx.perception.position)
    }

    /// Head for the assigned lane edge, collecting along the way.
    fn placing(&mut self, ctx: &mut Deliberation<'_>, heading: Direction) -> Action {
        if !ctx.perception.is_full() && Self::own_waste_here(ctx) {
            return Action::Collect;
        }
        let moves = possible_moves(ctx.perception, ctx.knowledge);
        if moves.contains(heading) {
            return Action::Move(heading);
        }
        let here = ctx.perception.position;
        match heading {
            Direction::Right | Direction::Left if self.sweeps_for_disposal(ctx.perception.tier) => {
                self.turn_row(ctx, Mode::RedSeeking)
            }
            Direction::Right | Direction::Left => {
                ctx.knowledge.mode = Mode::Fusion;
                Action::Move(Direction::Up)
            }
            Direction::Up => {
                ctx.knowledge.navigation.y_excursion = Some(here.y);
                ctx.knowledge.mode = Mode::ResearchingTop;
                Action::Move(Direction::Left)
            }
            Direction::Down => {
                ctx.knowledge.navigation.y_excursion = Some(here.y);
                ctx.knowledge.mode = Mode::ResearchingDown;
                Action::Move(Direction::Left)
            }
        }
    }

    /// Serpentine sweep advancing one row toward `advance` at each row end.
    fn research(&self, ctx: &mut Deliberation<'_>, advance: Direction, flip: Mode) -> Action {
        let last = ctx.knowledge.navigation.last_action();
        if last == Some(Action::Drop) {
            return Action::Move(Direction::Left);
        }
        if !ctx.perception.carrying.is_empty() {
            ctx.knowledge.mode = Mode::Carrying;
            return Action::Move(Direction::Right);
        }
        if Self::own_waste_here(ctx) {
            ctx.knowledge.mode = Mode::Carrying;
            return Action::Collect;
        }

        let here = ctx.perception.position;
        let moves = possible_moves(ctx.perception, ctx.knowledge);
        let nav = &mut ctx.knowledge.navigation;
        if nav.x_excursion.is_none() && moves.blocked(Direction::Right) {
            nav.x_excursion = Some(here.x);
        }

        if last == Some(Action::Move(advance)) {
            return Action::Move(if moves.contains(Direction::Left) {
                Direction::Left
            } else {
                Direction::Right
            });
        }
        if moves.blocked(advance) && moves.at_row_end() {
            ctx.knowledge.mode = flip;
            return Action::Move(advance.opposite());
        }
        if moves.at_row_end() {
            nav.mark_swept(here.y);
            return Action::Move(advance);
        }
        let lateral = nav
            .last_move_where(|direction| !direction.is_vertical())
            .unwrap_or(Direction::Left);
        Action::Move(lateral)
    }

    /// Carry finds right to the hand-off column.
    fn carrying(&self, ctx: &mut Deliberation<'_>) -> Action {
        let perception = ctx.perception;
        let finished = ctx.knowledge.exploration_finished;
        let Some(first) = perception.carrying.first() else {
            ctx.knowledge.mode = self.home_mode(perception.tier, finished);
            return Action::DoNothing;
        };

        if perception.tier.is_top() && Self::on_disposal(ctx) {
            return Action::Drop;
        }
        if first.tier == perception.tier
            && !perception.tier.is_top()
            && !perception.is_full()
            && Self::own_waste_here(ctx)
        {
            return Action::Collect;
        }
        if !perception.tier.is_top() && perception.carried_of(perception.tier) >= 2 {
            return Action::Fusion;
        }

        let moves = possible_moves(perception, ctx.knowledge);
        if moves.blocked(Direction::Right) {
            if perception.tier.is_top() {
                ctx.knowledge.mode = Mode::CarryingSeekingUp;
                return self.seeking_disposal(ctx);
            }
            ctx.knowledge.mode = self.research_mode(finished);
            return Action::Drop;
        }
        Action::Move(Direction::Right)
    }

    /// Walk the last column until the disposal site comes into view.
    fn seeking_disposal(&self, ctx: &mut Deliberation<'_>) -> Action {
        let perception = ctx.perception;
        if perception.carrying.is_empty() {
            ctx.knowledge.mode =
                self.home_mode(perception.tier, ctx.knowledge.exploration_finished);
            return Action::DoNothing;
        }
        if let Some(site) = ctx.knowledge.disposal() {
            return toward(perception.position, site).map_or(Action::Drop, Action::Move);
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
        ctx.knowledge.mode = if heading == Direction::Up {
            Mode::CarryingSeekingDown
        } else {
            Mode::CarryingSeekingUp
        };
        Action::Move(heading.opposite())
    }

    /// Step to the next row of the top-tier anchor sweep, then continue as `next`.
    fn turn_row(&mut self, ctx: &mut Deliberation<'_>, next: Mode) -> Action {
        if !ctx.perception.carrying.is_empty() {
            ctx.knowledge.mode = Mode::Carrying;
            return self.carrying(ctx);
        }
        ctx.knowledge.mode = next;
        let moves = possible_moves(ctx.perception, ctx.knowledge);
        if moves.blocked(self.row_heading) {
            self.row_heading = self.row_heading.opposite();
        }
        Action::Move(self.row_heading)
    }

    /// Anchor patrol of the hand-off column.
    fn fusion(&self, ctx: &mut Deliberation<'_>) -> Action {
        let perception = ctx.perception;
        let tier = perception.tier;
        if !tier.is_top() && perception.carried_of(tier) >= 2 {
            return Action::Fusion;
        }
        if let [only] = perception.carrying.as_slice()
            && Some(only.tier) == tier.next()
        {
            return Action::Drop;
        }
        if !perception.is_full() && Self::own_waste_here(ctx) {
            return Action::Collect;
        }

        let here = perception.position;
        let moves = possible_moves(perception, ctx.knowledge);
        let nav = &mut ctx.knowledge.navigation;
        if moves.blocked(Direction::Down) {
            return Action::Move(Direction::Up);
        }
        if moves.blocked(Direction::Up) {
            if nav.known_height.is_none() {
                nav.known_height = Some(here.y + 1);
            }
            return Action::Move(Direction::Down);
        }
        Action::Move(
            nav.last_move_where(Direction::is_vertical)
                .unwrap_or(Direction::Up),
        )
    }

    /// Left-biased sweep used once exploration is over, and by a top-tier anchor.
    fn red_seeking(&mut self, ctx: &mut Deliberation<'_>) -> Action {
        if !ctx.perception.carrying.is_empty() {
            ctx.knowledge.mode = Mode::Carrying;
            return Action::Move(Direction::Right);
        }
        if Self::own_waste_here(ctx) {
            ctx.knowledge.mode = Mode::Carrying;
            return Action::Collect;
        }

        let here = ctx.perception.position;
        let tier = ctx.perception.tier;
        let moves = possible_moves(ctx.perception, ctx.knowledge);
        let chase = ctx
            .knowledge
            .wastes_of(tier)
            .filter_map(|(cell, _)| toward(here, cell))
            .find(|direction| moves.contains(*direction));
        if let Some(direction) = chase {
            return Action::Move(direction);
        }
        if moves.contains(Direction::Left) {
            return Action::Move(Direction::Left);
        }
        if self.sweeps_for_disposal(tier) {
            return self.turn_row(ctx, Mode::PlacingFusion);
        }
        let nav = &ctx.knowledge.navigation;
        if nav.last_action() == Some(Action::Move(Direction::Left)) {
            let vertical = if ctx.rng.random_bool(0.5) {
                Direction::Up
            } else {
                Direction::Down
            };
            return Action::Move(vertical);
        }
        if moves.blocked(Direction::Down) {
            return Action::Move(Direction::Up);
        }
        if moves.blocked(Direction::Up) {
            return Action::Move(Direction::Down);
        }
        Action::Move(
            nav.last_move_where(Direction::is_vertical)
                .unwrap_or(Direction::Up),
        )
    }

    fn wander(ctx: &mut Deliberation<'_>) -> Action {
        let moves: Moves = possible_moves(ctx.perception, ctx.knowledge);
        moves
            .choose(ctx.rng)
            .map_or(Action::DoNothing, Action::Move)
    }
}

impl Strategy for FusionResearch {
    fn kind(&self) -> &'static str {
        if self.messaging {
            "fusion_research_comms"
        } else {
            "fusion_research"
        }
    }

    fn initial_mode(&self) -> Mode {
        match self.role {
            Role::Anchor => Mode::PlacingFusion,
            Role::TopSweeper => Mode::PlacingTop,
            Role::BottomSweeper => Mode::PlacingDown,
        }
    }

    fn deliberate(&mut self, ctx: &mut Deliberation<'_>) -> Action {
        if self.messaging {
            self.communicate(ctx);
        }
        let finished = ctx.knowledge.exploration_finished;
        let top_anchor = self.sweeps_for_disposal(ctx.perception.tier);
        match ctx.knowledge.mode {
            Mode::Fusion if finished || top_anchor => self.red_seeking(ctx),
            Mode::Fusion => self.fusion(ctx),
            Mode::RedSeeking => self.red_seeking(ctx),
            Mode::Carrying => self.carrying(ctx),
            Mode::ResearchingTop | Mode::ResearchingDown if finished => self.red_seeking(ctx),
            Mode::ResearchingTop => self.research(ctx, Direction::Down, Mode::ResearchingDown),
            Mode::ResearchingDown => self.research(ctx, Direction::Up, Mode::ResearchingTop),
            Mode::PlacingFusion => self.placing(ctx, Direction::Right),
            Mode::PlacingTop => self.placing(ctx, Direction::Up),
            Mode::PlacingDown => self.placing(ctx, Direction::Down),
            Mode::CarryingSeekingUp | Mode::CarryingSeekingDown => self.seeking_disposal(ctx),
            Mode::Seeking => Self::wander(ctx),
        }
    }
}
