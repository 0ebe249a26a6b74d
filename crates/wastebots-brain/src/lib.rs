//! Built-in deliberation strategies for WasteBots robots.

use wastebots_core::{StrategyRegistry, WastebotsConfig, WorldState, WorldStateError};

pub mod directions;
pub mod fusion;
pub mod random;

pub use fusion::FusionResearch;
pub use random::RandomWalk;

/// Registry name of [`RandomWalk`].
pub const RANDOM: &str = "random";
/// Registry name of [`FusionResearch`] without messaging.
pub const FUSION_RESEARCH: &str = "fusion_research";
/// Registry name of [`FusionResearch`] with the end-of-exploration protocol.
pub const FUSION_RESEARCH_COMMS: &str = "fusion_research_comms";

/// Register every built-in strategy on `registry`.
pub fn register_builtin(registry: &mut StrategyRegistry) {
    registry.register(RANDOM, RandomWalk::from_seed);
    registry.register(FUSION_RESEARCH, FusionResearch::from_seed);
    registry.register(FUSION_RESEARCH_COMMS, FusionResearch::communicating);
}

#[must_use]
pub fn builtin_registry() -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    register_builtin(&mut registry);
    registry
}

/// Build a populated world using the built-in strategies.
///
/// Unknown strategy names are rejected before anything is spawned.
pub fn initialize(config: WastebotsConfig) -> Result<WorldState, WorldStateError> {
    WorldState::new(config, &builtin_registry())
}
