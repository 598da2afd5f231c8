#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn scheduler that drives the world, the enemy policy, and the portal
//! resolver on a single cooperative timeline.
//!
//! A turn starts with [`TurnScheduler::process_turn`], which hands every
//! enemy its step before any time passes. [`TurnScheduler::tick`] then
//! advances motions and the shared turn window. Once the window has lasted
//! one step duration the portal pass runs and the turn concludes, whether or
//! not every enemy has finished animating.

use std::time::Duration;

use gridturn_core::{
    AmbienceCue, AudioCues, CellCoord, Command, Event, StepOffset, Vec3, DEFAULT_PORTAL_OFFSET,
    DEFAULT_PORTAL_THRESHOLD, DEFAULT_STEP_DURATION,
};
use gridturn_system_enemy_policy::{self as enemy_policy, EnemyPolicy};
use gridturn_system_portals::{self as portals, PortalResolver};
use gridturn_world::{self as world, query, World};

/// Configuration parameters required to construct the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    step_duration: Duration,
    rng_seed: u64,
    portal_threshold: f32,
    portal_offset: f32,
}

impl Config {
    /// Creates a configuration with the default portal geometry.
    #[must_use]
    pub const fn new(step_duration: Duration, rng_seed: u64) -> Self {
        Self {
            step_duration,
            rng_seed,
            portal_threshold: DEFAULT_PORTAL_THRESHOLD,
            portal_offset: DEFAULT_PORTAL_OFFSET,
        }
    }

    /// Overrides the world-2 height threshold and the distance between worlds.
    #[must_use]
    pub const fn with_portals(mut self, threshold: f32, offset: f32) -> Self {
        self.portal_threshold = threshold;
        self.portal_offset = offset;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_DURATION, 0)
    }
}

/// Owns the world and its systems and pumps commands between them.
#[derive(Debug)]
pub struct TurnScheduler<A> {
    world: World,
    policy: EnemyPolicy,
    portals: PortalResolver,
    audio: A,
    events: Vec<Event>,
}

impl<A> TurnScheduler<A>
where
    A: AudioCues,
{
    /// Creates a scheduler over an empty world and starts the world-1 ambience.
    pub fn new(config: Config, audio: A) -> Self {
        let mut scheduler = Self {
            world: World::new(),
            policy: EnemyPolicy::new(enemy_policy::Config::new(config.rng_seed)),
            portals: PortalResolver::new(portals::Config::new(
                config.portal_threshold,
                config.portal_offset,
            )),
            audio,
            events: Vec::new(),
        };

        let _ = scheduler.submit(Command::ConfigureStepDuration {
            step_duration: config.step_duration,
        });
        scheduler.audio.play(AmbienceCue::WorldOne.name());
        scheduler
    }

    /// Replaces the set of blocked cells.
    pub fn configure_obstacles(&mut self, cells: Vec<CellCoord>) {
        let _ = self.submit(Command::ConfigureObstacles { cells });
    }

    /// Places the player at rest on `cell`. Ignored while the player moves.
    pub fn place_player(&mut self, cell: CellCoord) {
        let _ = self.submit(Command::PlacePlayer { cell });
        self.refresh_occupancy();
    }

    /// Adds an enemy resting on `cell`.
    pub fn spawn_enemy(&mut self, cell: CellCoord) {
        let _ = self.submit(Command::SpawnEnemy { cell });
    }

    /// Adds a portal on `cell`; one-shot portals vanish after first use.
    pub fn place_portal(&mut self, cell: CellCoord, one_shot: bool) {
        let _ = self.submit(Command::PlacePortal { cell, one_shot });
        self.refresh_occupancy();
    }

    /// Begins the player's own step. Returns `false` while a step is in flight.
    pub fn step_player(&mut self, offset: StepOffset) -> bool {
        self.submit(Command::StepPlayer { offset })
            .iter()
            .any(|event| matches!(event, Event::PlayerStepStarted { .. }))
    }

    /// Restores player health, clamped to the maximum.
    pub fn restore_player_health(&mut self, amount: u32) {
        let _ = self.submit(Command::RestoreHealth { amount });
    }

    /// Starts a turn targeting `player`.
    ///
    /// A request made while another turn is in flight is dropped and never
    /// retried.
    pub fn process_turn(&mut self, player: Vec3) {
        let started = self.submit(Command::ProcessTurn { player });
        if started.is_empty() {
            return;
        }

        let enemy_view = query::enemy_view(&self.world);
        let mut commands = Vec::new();
        self.policy.handle(
            &started,
            &enemy_view,
            query::obstacles(&self.world),
            &mut commands,
        );
        let _ = self.submit_all(commands);
    }

    /// Advances the simulation clock by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        let events = self.submit(Command::Tick { dt });

        if events.iter().any(|event| {
            matches!(
                event,
                Event::PlayerStepFinished { .. } | Event::PlayerTeleported { .. }
            )
        }) {
            self.refresh_occupancy();
        }

        if events
            .iter()
            .any(|event| matches!(event, Event::TurnWindowElapsed { .. }))
        {
            self.resolve_turn(&events);
        }
    }

    /// Reports whether the player may commit the next action.
    #[must_use]
    pub fn can_act(&self) -> bool {
        query::can_act(&self.world)
    }

    /// Number of enemies in the active collection.
    #[must_use]
    pub fn active_enemy_count(&self) -> usize {
        query::enemy_count(&self.world)
    }

    /// Number of turns completed so far.
    #[must_use]
    pub fn current_turn(&self) -> u64 {
        query::turn_state(&self.world).current_turn
    }

    /// Reports whether a turn is in flight.
    #[must_use]
    pub fn is_processing_turn(&self) -> bool {
        query::turn_state(&self.world).processing_turn
    }

    /// Read access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read access to the audio collaborator.
    #[must_use]
    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// Returns every world event recorded since the previous drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn resolve_turn(&mut self, events: &[Event]) {
        let portal_view = query::portal_view(&self.world);
        let player = query::player(&self.world).position;
        let mut commands = Vec::new();
        self.portals
            .handle(events, &portal_view, player, &mut self.audio, &mut commands);
        let resolved = self.submit_all(commands);

        for event in self.submit(Command::ConcludeTurn) {
            if let Event::TurnCompleted { turn } = event {
                tracing::info!(turn, enemies = self.active_enemy_count(), "turn completed");
            }
        }

        if resolved
            .iter()
            .any(|event| matches!(event, Event::PlayerTeleported { .. }))
        {
            self.refresh_occupancy();
        }
    }

    fn refresh_occupancy(&mut self) {
        let portal_view = query::portal_view(&self.world);
        let player_cell = query::player(&self.world).cell();
        let mut commands = Vec::new();
        self.portals
            .refresh_occupancy(&portal_view, player_cell, &mut commands);
        let _ = self.submit_all(commands);
    }

    fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.events.extend(events.iter().cloned());
        events
    }

    fn submit_all(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            events.extend(self.submit(command));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Mute;

    impl AudioCues for Mute {
        fn play(&mut self, _: &str) {}

        fn stop(&mut self, _: &str) {}

        fn is_playing(&self, _: &str) -> bool {
            false
        }
    }

    #[test]
    fn configured_step_duration_reaches_the_world() {
        let scheduler = TurnScheduler::new(Config::new(Duration::from_millis(350), 9), Mute);

        assert_eq!(
            query::step_duration(scheduler.world()),
            Duration::from_millis(350)
        );
    }

    #[test]
    fn drained_events_are_not_repeated() {
        let mut scheduler = TurnScheduler::new(Config::default(), Mute);
        scheduler.spawn_enemy(CellCoord::new(2, 0, 2));

        let first = scheduler.drain_events();
        let second = scheduler.drain_events();

        assert!(first
            .iter()
            .any(|event| matches!(event, Event::EnemySpawned { .. })));
        assert!(second.is_empty());
    }

    #[test]
    fn portal_under_resting_player_is_occupied_on_placement() {
        let mut scheduler = TurnScheduler::new(Config::default(), Mute);
        scheduler.place_portal(CellCoord::new(0, 0, 0), false);

        let portal = query::portal_view(scheduler.world()).into_vec()[0];
        assert!(portal.has_player);
    }
}
