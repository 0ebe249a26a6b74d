//! Strategy seam: trait, registry and per-robot binding.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::WorldStateError;
use crate::messaging::{Envelope, Message};
use crate::perception::{Knowledge, Perception};
use crate::{Action, Mode, RobotId, Role, Tier};

/// Construction parameters handed to a strategy factory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StrategySeed {
    pub robot: RobotId,
    pub tier: Tier,
    pub role: Role,
    pub litter_probability: f64,
}

/// Roster entry describing another robot of the world.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerEntry {
    pub id: RobotId,
    pub tier: Tier,
    pub role: Role,
}

/// Everything a strategy may read or write during one deliberation.
pub struct Deliberation<'a> {
    pub perception: &'a Perception,
    /// Knowledge owned by the deliberating robot.
    pub knowledge: &'a mut Knowledge,
    /// Messages delivered to this robot before its turn.
    pub inbox: &'a [Envelope],
    outbox: &'a mut Vec<Envelope>,
    pub peers: &'a [PeerEntry],
    pub rng: &'a mut dyn RngCore,
}

impl<'a> Deliberation<'a> {
    #[must_use]
    pub fn new(
        perception: &'a Perception,
        knowledge: &'a mut Knowledge,
        inbox: &'a [Envelope],
        outbox: &'a mut Vec<Envelope>,
        peers: &'a [PeerEntry],
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            perception,
            knowledge,
            inbox,
            outbox,
            peers,
            rng,
        }
    }

    /// Queue `message` for robot `to`.
    pub fn send(&mut self, to: RobotId, message: Message) {
        self.outbox
            .push(Envelope::new(self.perception.robot, to, message));
    }

    /// Roster entries sharing the deliberating robot's tier, itself included.
    pub fn tier_peers(&self) -> impl Iterator<Item = &PeerEntry> + '_ {
        let tier = self.perception.tier;
        self.peers.iter().filter(move |peer| peer.tier == tier)
    }
}

/// Pluggable finite-state policy turning a perception into one action.
pub trait Strategy: Send + Sync {
    /// Static identifier of the strategy implementation.
    fn kind(&self) -> &'static str;

    /// Mode the robot starts in; may depend on its role.
    fn initial_mode(&self) -> Mode {
        Mode::Seeking
    }

    /// Choose the action for this turn, updating the robot's own knowledge.
    fn deliberate(&mut self, ctx: &mut Deliberation<'_>) -> Action;
}

type StrategySpawner = Box<dyn Fn(&StrategySeed) -> Box<dyn Strategy> + Send + Sync + 'static>;

/// Registry of strategy factories keyed by name.
#[derive(Default)]
pub struct StrategyRegistry {
    entries: BTreeMap<Cow<'static, str>, StrategySpawner>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StrategyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy factory, replacing any previous one of the same name.
    pub fn register<F>(&mut self, name: impl Into<Cow<'static, str>>, factory: F)
    where
        F: Fn(&StrategySeed) -> Box<dyn Strategy> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Box::new(factory));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(AsRef::as_ref)
    }

    /// Fails fast on names no factory answers to.
    pub fn ensure(&self, name: &str) -> Result<(), WorldStateError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(self.unknown(name))
        }
    }

    /// Instantiate the strategy registered under `name`.
    pub fn spawn(
        &self,
        name: &str,
        seed: &StrategySeed,
    ) -> Result<Box<dyn Strategy>, WorldStateError> {
        match self.entries.get(name) {
            Some(factory) => Ok(factory(seed)),
            None => Err(self.unknown(name)),
        }
    }

    fn unknown(&self, name: &str) -> WorldStateError {
        WorldStateError::UnknownStrategy {
            name: name.to_string(),
            known: self.names().collect::<Vec<_>>().join(", "),
        }
    }
}

/// Strategy instance attached to a robot.
pub struct StrategyBinding {
    runner: Box<dyn Strategy>,
    name: String,
}

impl fmt::Debug for StrategyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyBinding")
            .field("name", &self.name)
            .field("kind", &self.runner.kind())
            .finish()
    }
}

impl StrategyBinding {
    /// Attach a strategy produced outside the registry.
    #[must_use]
    pub fn with_runner(runner: Box<dyn Strategy>) -> Self {
        let name = runner.kind().to_string();
        Self { runner, name }
    }

    /// Instantiate `name` from the registry.
    pub fn from_registry(
        registry: &StrategyRegistry,
        name: &str,
        seed: &StrategySeed,
    ) -> Result<Self, WorldStateError> {
        let runner = registry.spawn(name, seed)?;
        Ok(Self {
            runner,
            name: name.to_string(),
        })
    }

    /// Name the binding was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.runner.kind()
    }

    #[must_use]
    pub fn initial_mode(&self) -> Mode {
        self.runner.initial_mode()
    }

    pub fn deliberate(&mut self, ctx: &mut Deliberation<'_>) -> Action {
        self.runner.deliberate(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl Strategy for Idle {
        fn kind(&self) -> &'static str {
            "idle"
        }

        fn deliberate(&mut self, _ctx: &mut Deliberation<'_>) -> Action {
            Action::DoNothing
        }
    }

    fn seed() -> StrategySeed {
        StrategySeed {
            robot: RobotId(0),
            tier: Tier::Green,
            role: Role::Anchor,
            litter_probability: 0.0,
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut registry = StrategyRegistry::new();
        registry.register("idle", |_| Box::new(Idle));
        let err = registry.spawn("wander", &seed()).err();
        assert_eq!(
            err,
            Some(WorldStateError::UnknownStrategy {
                name: "wander".to_string(),
                known: "idle".to_string(),
            })
        );
    }

    #[test]
    fn binding_reports_registered_name() {
        let mut registry = StrategyRegistry::new();
        registry.register("lazy", |_| Box::new(Idle));
        let binding = StrategyBinding::from_registry(&registry, "lazy", &seed()).expect("spawn");
        assert_eq!(binding.name(), "lazy");
        assert_eq!(binding.kind(), "idle");
        assert_eq!(binding.initial_mode(), Mode::Seeking);
    }
}
