use wastebots_brain::{FUSION_RESEARCH, FUSION_RESEARCH_COMMS, RANDOM, builtin_registry, initialize};
use wastebots_core::{Cell, Mode, PerTier, Role, Tier, WastebotsConfig, WorldState, WorldStateError};

fn config(strategy: &str, seed: u64) -> WastebotsConfig {
    WastebotsConfig {
        strategy: strategy.to_string(),
        rng_seed: Some(seed),
        ..WastebotsConfig::default()
    }
}

fn assert_invariants(world: &WorldState) {
    for robot in world.robots() {
        assert!(
            robot.carrying.len() <= robot.capacity,
            "{} carries {} items",
            robot.id,
            robot.carrying.len()
        );
        let level = world
            .grid()
            .radioactivity(robot.position)
            .expect("robot inside the grid");
        assert!(
            level <= robot.tolerance,
            "{} stands on radioactivity {level}",
            robot.id
        );
        for waste in &robot.carrying {
            assert!(world.waste(*waste).expect("carried waste exists").carried);
        }
    }
}

fn run_checked(strategy: &str, seed: u64, ticks: usize) -> WorldState {
    let mut world = initialize(config(strategy, seed)).expect("world");
    let mut previous = world.waste_counts().total();
    for _ in 0..ticks {
        let events = world.step();
        let total = world.waste_counts().total();
        assert!(total <= previous, "waste grew from {previous} to {total}");
        assert_eq!(previous - total, events.fusions + events.disposals);
        previous = total;
        assert_invariants(&world);
    }
    world
}

#[test]
fn random_walk_preserves_world_invariants() {
    run_checked(RANDOM, 1, 400);
}

#[test]
fn fusion_research_preserves_world_invariants() {
    run_checked(FUSION_RESEARCH, 2, 400);
}

#[test]
fn communicating_variant_preserves_world_invariants() {
    let world = run_checked(FUSION_RESEARCH_COMMS, 3, 400);
    let anchors_finished = world
        .robots()
        .iter()
        .filter(|r| r.role == Role::Anchor)
        .any(|r| r.knowledge.exploration_finished);
    assert!(!anchors_finished);
}

#[test]
fn mixed_strategies_per_tier() {
    let mut config = config(RANDOM, 4);
    config
        .strategy_overrides
        .insert(Tier::Red, FUSION_RESEARCH.to_string());
    let world = initialize(config).expect("world");
    for robot in world.robots() {
        let expected = if robot.tier == Tier::Red {
            FUSION_RESEARCH
        } else {
            RANDOM
        };
        assert_eq!(robot.strategy.name(), expected);
    }
}

#[test]
fn roles_and_initial_modes_are_assigned_once() {
    let world = initialize(config(FUSION_RESEARCH, 5)).expect("world");
    let roles: Vec<(Tier, Role, Mode)> = world
        .robots()
        .iter()
        .map(|r| (r.tier, r.role, r.knowledge.mode))
        .collect();
    assert_eq!(
        roles,
        vec![
            (Tier::Green, Role::Anchor, Mode::PlacingFusion),
            (Tier::Green, Role::BottomSweeper, Mode::PlacingDown),
            (Tier::Green, Role::TopSweeper, Mode::PlacingTop),
            (Tier::Yellow, Role::Anchor, Mode::PlacingFusion),
            (Tier::Yellow, Role::TopSweeper, Mode::PlacingTop),
            (Tier::Yellow, Role::BottomSweeper, Mode::PlacingDown),
            (Tier::Red, Role::Anchor, Mode::PlacingFusion),
            (Tier::Red, Role::BottomSweeper, Mode::PlacingDown),
            (Tier::Red, Role::TopSweeper, Mode::PlacingTop),
        ]
    );
}

#[test]
fn unknown_strategy_names_fail_fast() {
    let err = initialize(config("hill_climb", 6)).expect_err("must reject");
    let WorldStateError::UnknownStrategy { name, known } = err else {
        panic!("expected an unknown strategy error");
    };
    assert_eq!(name, "hill_climb");
    assert_eq!(known, "fusion_research, fusion_research_comms, random");
    assert_eq!(builtin_registry().names().count(), 3);
}

#[test]
fn same_seed_same_history() {
    let run = |seed| {
        let mut world = initialize(config(FUSION_RESEARCH_COMMS, seed)).expect("world");
        for _ in 0..150 {
            world.step();
        }
        (
            world.history().copied().collect::<Vec<_>>(),
            world
                .robots()
                .iter()
                .map(|r| (r.position, r.knowledge.mode))
                .collect::<Vec<_>>(),
        )
    };
    assert_eq!(run(99), run(99));
}

fn red_only(seed: u64) -> WastebotsConfig {
    WastebotsConfig {
        width: 6,
        height: 4,
        zone_proportions: PerTier::new(0.0, 0.0, 1.0),
        robots: PerTier::new(0, 0, 1),
        waste: PerTier::new(0, 0, 0),
        strategy: FUSION_RESEARCH.to_string(),
        rng_seed: Some(seed),
        ..WastebotsConfig::default()
    }
}

#[test]
fn red_only_world_disposes_through_the_anchor() {
    let mut world = initialize(red_only(8)).expect("world");
    let site = world.disposal().cell;
    world.spawn_waste(site, Tier::Red).expect("waste");
    let anchor = world.robots()[0].id;
    for _ in 0..200 {
        world.step();
        if world.is_clear() {
            break;
        }
    }
    assert!(world.is_clear(), "anchor {anchor} never disposed the item");
}

#[test]
fn lone_top_anchor_clears_waste_far_from_the_site() {
    for seed in [8, 9, 10, 11] {
        let mut world = initialize(red_only(seed)).expect("world");
        world.spawn_waste(Cell::new(1, 2), Tier::Red).expect("waste");
        let mut leftmost = u32::MAX;
        let mut disposals = 0;
        for _ in 0..2_000 {
            disposals += world.step().disposals;
            leftmost = leftmost.min(world.robots()[0].position.x);
            if world.is_clear() {
                break;
            }
        }
        assert!(world.is_clear(), "seed {seed}: interior waste left behind");
        assert_eq!(disposals, 1);
        assert!(leftmost <= 1, "seed {seed}: anchor never left the last columns");
    }
}
