//! World state and the per-tick step driver.

use rand::{Rng, rngs::SmallRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::config::{WastebotsConfig, WorldStateError};
use crate::grid::{Entity, Grid, Zone, ZoneLayout};
use crate::messaging::{Envelope, Mailbox};
use crate::perception::{CarriedWaste, Knowledge, PerceivedEntity, Percept, Perception};
use crate::resolve::{Resolution, ResolutionFailure, Resolver};
use crate::strategy::{Deliberation, PeerEntry, StrategyBinding, StrategyRegistry, StrategySeed};
use crate::{Action, Cell, DisposalSite, PerTier, RobotId, Role, Tick, Tier, Waste, WasteId};

/// Mobile collector agent.
#[derive(Debug)]
pub struct Robot {
    pub id: RobotId,
    pub tier: Tier,
    pub role: Role,
    /// Highest radioactivity this robot may enter.
    pub tolerance: f32,
    pub capacity: usize,
    pub position: Cell,
    /// Carried items, most recently acquired last.
    pub carrying: Vec<WasteId>,
    pub knowledge: Knowledge,
    pub strategy: StrategyBinding,
}

/// Waste totals derived by scanning the world.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WasteCounts {
    pub per_tier: PerTier<usize>,
    pub on_grid: usize,
    pub carried: usize,
}

impl WasteCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.on_grid + self.carried
    }
}

/// Events produced by a single tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickEvents {
    pub tick: Tick,
    pub fusions: usize,
    pub disposals: usize,
    pub failed_actions: usize,
    pub messages_sent: usize,
}

/// Summary retained in the bounded tick history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: Tick,
    pub waste: PerTier<usize>,
    pub total_waste: usize,
    pub fusions: usize,
    pub disposals: usize,
    pub failed_actions: usize,
}

/// Aggregate world state: grid, entities, message queue and history.
#[derive(Debug)]
pub struct WorldState {
    config: WastebotsConfig,
    tick: Tick,
    rng: SmallRng,
    grid: Grid,
    wastes: SlotMap<WasteId, Waste>,
    robots: Vec<Robot>,
    roster: Vec<PeerEntry>,
    disposal: DisposalSite,
    mailbox: Mailbox,
    history: VecDeque<TickSummary>,
    activation: Vec<usize>,
}

impl WorldState {
    /// Instantiate a populated world. Deterministic when `config.rng_seed` is set.
    pub fn new(
        config: WastebotsConfig,
        registry: &StrategyRegistry,
    ) -> Result<Self, WorldStateError> {
        let widths = config.zone_widths()?;
        for tier in Tier::ALL {
            registry.ensure(config.strategy_for(tier))?;
        }
        let layout = ZoneLayout::new(widths, config.radioactivity);
        let grid = Grid::new(config.width, config.height, layout)?;
        let rng = config.seeded_rng();
        let history_capacity = config.history_capacity;
        let x = config.width - 1;
        let mut world = Self {
            config,
            tick: Tick::zero(),
            rng,
            grid,
            wastes: SlotMap::with_key(),
            robots: Vec::new(),
            roster: Vec::new(),
            disposal: DisposalSite {
                cell: Cell::new(x, 0),
            },
            mailbox: Mailbox::new(),
            history: VecDeque::with_capacity(history_capacity),
            activation: Vec::new(),
        };
        world.scatter_waste();
        world.place_disposal();
        world.spawn_robots(registry)?;
        info!(
            width = world.grid.width(),
            height = world.grid.height(),
            robots = world.robots.len(),
            waste = world.wastes.len(),
            disposal_y = world.disposal.cell.y,
            "initialised wastebots world"
        );
        Ok(world)
    }

    fn clamped_count(zone: &Zone, requested: u32, what: &'static str) -> u32 {
        if zone.is_empty() && requested > 0 {
            warn!(
                tier = %zone.tier,
                requested,
                what,
                "zone has zero width; clamping count to zero"
            );
            0
        } else {
            requested
        }
    }

    fn random_cell_in(&mut self, zone: Zone) -> Cell {
        let x = self.rng.random_range(zone.start..zone.end());
        let y = self.rng.random_range(0..self.grid.height());
        Cell::new(x, y)
    }

    fn scatter_waste(&mut self) {
        for tier in Tier::ALL {
            let zone = *self.grid.zones().zone(tier);
            let count = Self::clamped_count(&zone, self.config.waste[tier], "waste");
            for _ in 0..count {
                let cell = self.random_cell_in(zone);
                let id = self.wastes.insert(Waste::loose(tier));
                self.grid.place(cell, Entity::Waste(id));
            }
        }
    }

    fn place_disposal(&mut self) {
        let y = self.rng.random_range(0..self.grid.height());
        self.disposal.cell.y = y;
        if let Some(zone) = self.grid.zones().zone_at(self.disposal.cell.x)
            && !zone.tier.is_top()
        {
            warn!(
                tier = %zone.tier,
                x = self.disposal.cell.x,
                "top-tier zone has zero width; disposal site placed in a lower zone"
            );
        }
        self.grid.place(self.disposal.cell, Entity::Disposal);
    }

    /// Role assignment: first robot of each tier anchors, the rest split by id parity.
    fn role_for(index_in_tier: u32, id: RobotId) -> Role {
        if index_in_tier == 0 {
            Role::Anchor
        } else if id.is_even() {
            Role::TopSweeper
        } else {
            Role::BottomSweeper
        }
    }

    fn spawn_robots(&mut self, registry: &StrategyRegistry) -> Result<(), WorldStateError> {
        let mut next_id = 0;
        for tier in Tier::ALL {
            let zone = *self.grid.zones().zone(tier);
            let count = Self::clamped_count(&zone, self.config.robots[tier], "robots");
            let name = self.config.strategy_for(tier).to_string();
            for index_in_tier in 0..count {
                let id = RobotId(next_id);
                next_id += 1;
                let role = Self::role_for(index_in_tier, id);
                let seed = StrategySeed {
                    robot: id,
                    tier,
                    role,
                    litter_probability: self.config.litter_probability,
                };
                let strategy = StrategyBinding::from_registry(registry, &name, &seed)?;
                let position = self.random_cell_in(zone);
                self.grid.place(position, Entity::Robot(id));
                debug!(robot = %id, %tier, ?role, strategy = %name, "assigned robot role");
                self.roster.push(PeerEntry { id, tier, role });
                self.robots.push(Robot {
                    id,
                    tier,
                    role,
                    tolerance: self.config.tolerance[tier],
                    capacity: self.config.capacity[tier],
                    position,
                    carrying: Vec::new(),
                    knowledge: Knowledge::with_mode(strategy.initial_mode()),
                    strategy,
                });
            }
        }
        Ok(())
    }

    /// Advance one full round: every robot perceives, deliberates and acts once.
    pub fn step(&mut self) -> TickEvents {
        let tick = self.tick.next();
        let mut events = TickEvents {
            tick,
            ..TickEvents::default()
        };
        let mut order = std::mem::take(&mut self.activation);
        order.clear();
        order.extend(0..self.robots.len());
        order.shuffle(&mut self.rng);
        for &idx in &order {
            self.run_turn(idx, tick, &mut events);
        }
        self.activation = order;
        self.tick = tick;
        self.record_summary(&events);
        events
    }

    fn run_turn(&mut self, idx: usize, tick: Tick, events: &mut TickEvents) {
        self.robots[idx].knowledge.tick_cooldown();
        let position = self.robots[idx].position;
        let neighbors = self.neighbors(position, 1, true);
        let perception = self.perception_for(idx, tick);
        let inbox = self.mailbox.take_for(perception.robot);
        let mut outbox: Vec<Envelope> = Vec::new();

        let robot = &mut self.robots[idx];
        robot.knowledge.neighbors = neighbors;
        let action = {
            let mut ctx = Deliberation::new(
                &perception,
                &mut robot.knowledge,
                &inbox,
                &mut outbox,
                &self.roster,
                &mut self.rng,
            );
            robot.strategy.deliberate(&mut ctx)
        };
        robot
            .knowledge
            .navigation
            .record_action(action, self.config.action_history_len);

        events.messages_sent += outbox.len();
        self.mailbox.post_all(outbox);

        match self.apply(idx, action) {
            Ok(Resolution::Fused { .. }) => events.fusions += 1,
            Ok(Resolution::Disposed { .. }) => events.disposals += 1,
            Ok(_) => {}
            Err(_) => events.failed_actions += 1,
        }
    }

    fn apply(&mut self, idx: usize, action: Action) -> Result<Resolution, ResolutionFailure> {
        let mut resolver = Resolver {
            grid: &mut self.grid,
            wastes: &mut self.wastes,
            disposal: self.disposal.cell,
            drop_cooldown_ticks: self.config.drop_cooldown_ticks,
        };
        let robot = &mut self.robots[idx];
        let outcome = resolver.resolve(robot, action);
        match &outcome {
            Ok(_) => robot.knowledge.last_action_failed = None,
            Err(failure) => {
                debug!(robot = %robot.id, ?action, %failure, "action rejected");
                robot.knowledge.last_action_failed = Some(action);
            }
        }
        outcome
    }

    /// Resolve `action` for robot `id` outside the step driver.
    ///
    /// Records the outcome in the robot's knowledge exactly as a tick would.
    /// Returns `None` when `id` names no robot.
    pub fn resolve(
        &mut self,
        id: RobotId,
        action: Action,
    ) -> Option<Result<Resolution, ResolutionFailure>> {
        (id.index() < self.robots.len()).then(|| self.apply(id.index(), action))
    }

    fn perception_for(&self, idx: usize, tick: Tick) -> Perception {
        let robot = &self.robots[idx];
        Perception {
            tick,
            robot: robot.id,
            tier: robot.tier,
            role: robot.role,
            tolerance: robot.tolerance,
            capacity: robot.capacity,
            position: robot.position,
            carrying: robot
                .carrying
                .iter()
                .filter_map(|id| {
                    self.wastes
                        .get(*id)
                        .map(|w| CarriedWaste { id: *id, tier: w.tier })
                })
                .collect(),
        }
    }

    /// Entities within Chebyshev `radius` of `position`, as a robot perceives them.
    #[must_use]
    pub fn neighbors(&self, position: Cell, radius: u32, include_center: bool) -> Vec<Percept> {
        self.grid
            .neighbors(position, radius, include_center)
            .filter_map(|(cell, entity)| {
                let entity = match entity {
                    Entity::Robot(id) => PerceivedEntity::Robot {
                        id,
                        tier: self.robots.get(id.index())?.tier,
                    },
                    Entity::Waste(id) => PerceivedEntity::Waste {
                        id,
                        tier: self.wastes.get(id)?.tier,
                    },
                    Entity::Radioactivity => {
                        PerceivedEntity::Radioactivity(self.grid.radioactivity(cell)?)
                    }
                    Entity::Disposal => PerceivedEntity::Disposal,
                };
                Some(Percept { cell, entity })
            })
            .collect()
    }

    fn record_summary(&mut self, events: &TickEvents) {
        let counts = self.waste_counts();
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(TickSummary {
            tick: events.tick,
            waste: counts.per_tier,
            total_waste: counts.total(),
            fusions: events.fusions,
            disposals: events.disposals,
            failed_actions: events.failed_actions,
        });
    }

    /// Remaining waste per tier, counting both loose and carried items.
    #[must_use]
    pub fn waste_counts(&self) -> WasteCounts {
        let mut counts = WasteCounts::default();
        for (_, waste) in &self.wastes {
            counts.per_tier[waste.tier] += 1;
            if waste.carried {
                counts.carried += 1;
            } else {
                counts.on_grid += 1;
            }
        }
        counts
    }

    /// True once no waste remains anywhere.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.wastes.is_empty()
    }

    /// Place a new loose waste item on `cell`.
    pub fn spawn_waste(&mut self, cell: Cell, tier: Tier) -> Result<WasteId, WorldStateError> {
        if !self.grid.in_bounds(cell) {
            return Err(WorldStateError::InvalidConfig("waste cell outside the grid"));
        }
        let id = self.wastes.insert(Waste::loose(tier));
        self.grid.place(cell, Entity::Waste(id));
        Ok(id)
    }

    /// Teleport robot `id` to `cell`, ignoring radioactivity. Used to stage scenarios.
    pub fn place_robot(&mut self, id: RobotId, cell: Cell) -> bool {
        let Some(robot) = self.robots.get_mut(id.index()) else {
            return false;
        };
        if !self.grid.relocate(robot.position, cell, Entity::Robot(id)) {
            return false;
        }
        robot.position = cell;
        true
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn config(&self) -> &WastebotsConfig {
        &self.config
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    #[must_use]
    pub fn robot(&self, id: RobotId) -> Option<&Robot> {
        self.robots.get(id.index())
    }

    /// Mutable robot access for staging scenarios.
    pub fn robot_mut(&mut self, id: RobotId) -> Option<&mut Robot> {
        self.robots.get_mut(id.index())
    }

    #[must_use]
    pub fn roster(&self) -> &[PeerEntry] {
        &self.roster
    }

    #[must_use]
    pub fn waste(&self, id: WasteId) -> Option<&Waste> {
        self.wastes.get(id)
    }

    pub fn wastes(&self) -> impl Iterator<Item = (WasteId, &Waste)> + '_ {
        self.wastes.iter()
    }

    #[must_use]
    pub const fn disposal(&self) -> DisposalSite {
        self.disposal
    }

    #[must_use]
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Recent tick summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> + '_ {
        self.history.iter()
    }

    #[must_use]
    pub fn last_summary(&self) -> Option<&TickSummary> {
        self.history.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;

    struct Still;

    impl Strategy for Still {
        fn kind(&self) -> &'static str {
            "still"
        }

        fn deliberate(&mut self, _ctx: &mut Deliberation<'_>) -> Action {
            Action::DoNothing
        }
    }

    fn registry() -> StrategyRegistry {
        let mut registry = StrategyRegistry::new();
        registry.register("still", |_| Box::new(Still));
        registry
    }

    fn config() -> WastebotsConfig {
        WastebotsConfig {
            width: 9,
            height: 4,
            robots: PerTier::new(3, 2, 1),
            waste: PerTier::new(4, 3, 2),
            strategy: "still".to_string(),
            rng_seed: Some(7),
            ..WastebotsConfig::default()
        }
    }

    #[test]
    fn initialisation_places_everything_in_its_zone() {
        let world = WorldState::new(config(), &registry()).expect("world");
        assert_eq!(world.robots().len(), 6);
        assert_eq!(world.waste_counts().per_tier, PerTier::new(4, 3, 2));
        for robot in world.robots() {
            let zone = world.grid().zones().zone(robot.tier);
            assert!(zone.contains_column(robot.position.x));
            assert!(
                world
                    .grid()
                    .contents(robot.position)
                    .contains(&Entity::Robot(robot.id))
            );
        }
        for (cell, contents) in world.grid().iter_cells() {
            for entity in contents {
                if let Entity::Waste(id) = entity {
                    let tier = world.waste(*id).expect("waste").tier;
                    assert_eq!(world.grid().zones().zone_at(cell.x).map(|z| z.tier), Some(tier));
                }
            }
        }
        assert_eq!(world.disposal().cell.x, 8);
    }

    #[test]
    fn roles_follow_tier_order_and_parity() {
        let world = WorldState::new(config(), &registry()).expect("world");
        let roles: Vec<Role> = world.robots().iter().map(|r| r.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::Anchor,
                Role::BottomSweeper,
                Role::TopSweeper,
                Role::Anchor,
                Role::TopSweeper,
                Role::Anchor,
            ]
        );
    }

    #[test]
    fn zero_width_zone_clamps_waste_and_robots() {
        let config = WastebotsConfig {
            zone_proportions: PerTier::new(0.5, 0.5, 0.0),
            width: 6,
            ..config()
        };
        let world = WorldState::new(config, &registry()).expect("world");
        assert_eq!(world.waste_counts().per_tier.red, 0);
        assert!(world.robots().iter().all(|r| r.tier != Tier::Red));
        let site = world.disposal().cell;
        assert_eq!(site.x, 5);
        let zone = world.grid().zones().zone_at(site.x).expect("zone");
        assert_eq!(zone.tier, Tier::Yellow);
        assert!(world.grid().contents(site).contains(&Entity::Disposal));
    }

    #[test]
    fn unknown_strategy_fails_fast() {
        let mut config = config();
        config
            .strategy_overrides
            .insert(Tier::Yellow, "telepathy".to_string());
        let err = WorldState::new(config, &registry()).expect_err("unknown strategy");
        assert!(matches!(
            err,
            WorldStateError::UnknownStrategy { ref name, .. } if name == "telepathy"
        ));
    }

    #[test]
    fn history_is_bounded() {
        let config = WastebotsConfig {
            history_capacity: 3,
            ..config()
        };
        let mut world = WorldState::new(config, &registry()).expect("world");
        for _ in 0..5 {
            world.step();
        }
        let ticks: Vec<u64> = world.history().map(|s| s.tick.0).collect();
        assert_eq!(ticks, vec![3, 4, 5]);
        assert_eq!(world.tick(), Tick(5));
        assert_eq!(world.last_summary().map(|s| s.total_waste), Some(9));
    }

    #[test]
    fn perception_sees_markers_and_self() {
        let world = WorldState::new(config(), &registry()).expect("world");
        let robot = &world.robots()[0];
        let seen = world.neighbors(robot.position, 1, true);
        assert!(seen.iter().any(|p| p.entity
            == PerceivedEntity::Robot {
                id: robot.id,
                tier: Tier::Green
            }));
        let markers = seen
            .iter()
            .filter(|p| matches!(p.entity, PerceivedEntity::Radioactivity(_)))
            .count();
        let cells = world.grid().neighborhood(robot.position, 1, true).count();
        assert_eq!(markers, cells);
    }
}
