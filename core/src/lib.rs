#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridturn engine.
//!
//! This crate defines the message surface that connects the turn scheduler,
//! the authoritative world, and pure systems. The scheduler submits
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! Collaborators the core consumes but does not own (obstacle queries and
//! audio playback) are expressed as the [`ObstacleQuery`] and [`AudioCues`]
//! traits.

use std::time::Duration;

pub use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Time a single tile step takes to animate unless configured otherwise.
pub const DEFAULT_STEP_DURATION: Duration = Duration::from_millis(200);

/// Vertical coordinate above which the player is considered to be in world 2.
pub const DEFAULT_PORTAL_THRESHOLD: f32 = 5.0;

/// Vertical distance separating world 1 from world 2.
pub const DEFAULT_PORTAL_OFFSET: f32 = 10.0;

/// Per-axis tolerance used when comparing a candidate cell with the player.
pub const ADJACENCY_TOLERANCE: f32 = 0.1;

/// Half extents of the box probed when testing whether a tile is blocked.
pub const TILE_HALF_EXTENTS: Vec3 = Vec3::splat(0.5);

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Updates the duration every tile step and turn window lasts.
    ConfigureStepDuration {
        /// Simulated time a single step takes to complete.
        step_duration: Duration,
    },
    /// Replaces the read-only obstacle mask consulted by enemy policies.
    ConfigureObstacles {
        /// Cells that block movement.
        cells: Vec<CellCoord>,
    },
    /// Places the player at rest on the provided cell.
    PlacePlayer {
        /// Cell the player occupies afterwards.
        cell: CellCoord,
    },
    /// Adds a new enemy to the active collection.
    SpawnEnemy {
        /// Cell the enemy occupies after spawning.
        cell: CellCoord,
    },
    /// Adds a new portal to the active collection.
    PlacePortal {
        /// Cell the portal occupies.
        cell: CellCoord,
        /// Whether the portal deactivates itself after its first use.
        one_shot: bool,
    },
    /// Records whether the player currently stands on a portal.
    SetPortalOccupancy {
        /// Portal whose occupancy changed.
        portal: PortalId,
        /// Whether the player occupies the portal.
        has_player: bool,
    },
    /// Starts the player's own step animation.
    StepPlayer {
        /// Offset of the step relative to the player's position.
        offset: StepOffset,
    },
    /// Requests that a new turn begins if none is in flight.
    ProcessTurn {
        /// Position of the player enemies react to during the turn.
        player: Vec3,
    },
    /// Starts an enemy's step animation for the current turn.
    StepEnemy {
        /// Enemy that should move.
        enemy: EnemyId,
        /// Offset chosen by the enemy's local move policy.
        offset: StepOffset,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Moves the player instantly by the provided offset.
    TeleportPlayer {
        /// Displacement applied to the player.
        offset: Vec3,
    },
    /// Removes a portal from the active collection.
    RemovePortal {
        /// Portal to remove.
        portal: PortalId,
    },
    /// Completes the turn whose window elapsed and returns to idle.
    ConcludeTurn,
    /// Restores player health, clamped to the player's maximum.
    RestoreHealth {
        /// Amount of health to restore.
        amount: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that the obstacle mask was replaced.
    ObstaclesConfigured {
        /// Number of distinct blocked cells in the new mask.
        blocked: usize,
    },
    /// Confirms that an enemy joined the active collection.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Cell the enemy occupies after spawning.
        cell: CellCoord,
    },
    /// Confirms that a portal joined the active collection.
    PortalPlaced {
        /// Identifier assigned to the portal.
        portal: PortalId,
        /// Cell the portal occupies.
        cell: CellCoord,
        /// Whether the portal is removed after its first use.
        one_shot: bool,
    },
    /// Reports that a portal's occupancy flag changed.
    PortalOccupancyChanged {
        /// Portal whose flag changed.
        portal: PortalId,
        /// Whether the player now occupies the portal.
        has_player: bool,
    },
    /// Announces that a portal left the active collection and must be torn down.
    PortalRemoved {
        /// Portal that was removed.
        portal: PortalId,
    },
    /// Announces that a new turn started.
    TurnStarted {
        /// Number of the turn in flight (the current counter value).
        turn: u64,
        /// Player position enemies react to.
        player: Vec3,
    },
    /// Reports that the turn's fixed wait window closed.
    TurnWindowElapsed {
        /// Number of the turn in flight.
        turn: u64,
    },
    /// Announces that a turn completed and the scheduler is idle again.
    TurnCompleted {
        /// Counter value after the increment.
        turn: u64,
    },
    /// Confirms that an enemy began a step.
    EnemyStepStarted {
        /// Enemy that is moving.
        enemy: EnemyId,
        /// Position the step departs from.
        from: Vec3,
        /// Position the step lands on.
        to: Vec3,
    },
    /// Confirms that an enemy's step animation completed.
    EnemyStepFinished {
        /// Enemy that stopped moving.
        enemy: EnemyId,
        /// Tile-aligned position the enemy snapped to.
        position: Vec3,
    },
    /// Confirms that the player began a step.
    PlayerStepStarted {
        /// Position the step departs from.
        from: Vec3,
        /// Position the step lands on.
        to: Vec3,
    },
    /// Confirms that the player's step animation completed.
    PlayerStepFinished {
        /// Tile-aligned position the player snapped to.
        position: Vec3,
    },
    /// Reports that the player was moved instantly.
    PlayerTeleported {
        /// Position before the teleport.
        from: Vec3,
        /// Position after the teleport.
        to: Vec3,
    },
    /// Reports a change in the player's health.
    PlayerHealthChanged {
        /// Health after the change.
        health: Health,
    },
}

/// Tile address within the grid. One tile spans one world unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
    z: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Column along the grid's right axis.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical level; world 2 sits above world 1.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Row along the grid's forward axis.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Snaps a world position to the nearest cell.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        let snapped = position.round();
        Self::new(snapped.x as i32, snapped.y as i32, snapped.z as i32)
    }

    /// World position of the cell's center.
    #[must_use]
    pub fn position(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    /// Cell reached by taking the provided step. Steps off the edge of the
    /// addressable grid stay on the boundary cell.
    #[must_use]
    pub fn step(self, offset: StepOffset) -> Self {
        let (dx, dz) = offset.grid_delta();
        Self::new(
            self.x.saturating_add(dx),
            self.y,
            self.z.saturating_add(dz),
        )
    }
}

/// Single grid step an entity may take in one turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOffset {
    /// Remain on the current tile for the duration of the step.
    Stay,
    /// Movement toward increasing z.
    Forward,
    /// Movement toward decreasing z.
    Back,
    /// Movement toward increasing x.
    Right,
    /// Movement toward decreasing x.
    Left,
}

impl StepOffset {
    /// Cardinal steps in the order enemies sample them.
    pub const CARDINALS: [StepOffset; 4] = [
        StepOffset::Forward,
        StepOffset::Back,
        StepOffset::Right,
        StepOffset::Left,
    ];

    /// Displacement of the step in world units.
    #[must_use]
    pub fn delta(self) -> Vec3 {
        match self {
            Self::Stay => Vec3::ZERO,
            Self::Forward => Vec3::Z,
            Self::Back => Vec3::NEG_Z,
            Self::Right => Vec3::X,
            Self::Left => Vec3::NEG_X,
        }
    }

    const fn grid_delta(self) -> (i32, i32) {
        match self {
            Self::Stay => (0, 0),
            Self::Forward => (0, 1),
            Self::Back => (0, -1),
            Self::Right => (1, 0),
            Self::Left => (-1, 0),
        }
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortalId(u32);

impl PortalId {
    /// Creates a new portal identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Hit points tracked for the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    /// Creates full health with the provided maximum.
    #[must_use]
    pub const fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Upper bound on hit points.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Returns the health after restoring `amount`, clamped to the maximum.
    #[must_use]
    pub fn restored(self, amount: u32) -> Self {
        Self {
            current: self.current.saturating_add(amount).min(self.max),
            max: self.max,
        }
    }
}

/// Looping ambience tracks associated with each world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AmbienceCue {
    /// Default ambience of the lower world.
    WorldOne,
    /// Default ambience of the upper world.
    WorldTwo,
}

impl AmbienceCue {
    /// Name under which the audio collaborator knows the cue.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WorldOne => "world01-default-ambience",
            Self::WorldTwo => "world02-default-ambience",
        }
    }
}

/// Result of probing the obstacle mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Occupancy {
    /// Nothing blocks the probed volume.
    Free,
    /// The probed volume overlaps an obstacle.
    Occupied,
    /// The query could not decide; callers treat this as blocked.
    Indeterminate,
}

impl Occupancy {
    /// Reports whether movement into the probed volume is allowed.
    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }
}

/// Read-only obstacle query consumed by enemy movement policies.
pub trait ObstacleQuery {
    /// Probes an oriented box centred on `center` for obstacles.
    fn probe(&self, center: Vec3, half_extents: Vec3, rotation: Quat) -> Occupancy;
}

impl<T: ObstacleQuery + ?Sized> ObstacleQuery for &T {
    fn probe(&self, center: Vec3, half_extents: Vec3, rotation: Quat) -> Occupancy {
        (**self).probe(center, half_extents, rotation)
    }
}

/// Persistent audio playback keyed by cue name.
///
/// Every operation is idempotent: playing a cue that already plays and
/// stopping a cue that is already stopped have no effect.
pub trait AudioCues {
    /// Starts playing the named cue.
    fn play(&mut self, name: &str);
    /// Stops the named cue.
    fn stop(&mut self, name: &str);
    /// Reports whether the named cue is playing.
    fn is_playing(&self, name: &str) -> bool;
}

/// Stage of the turn state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TurnPhase {
    /// No turn is in flight.
    Idle,
    /// Enemies were dispatched and the shared wait window is open.
    AwaitingWindow {
        /// Time accumulated since the turn started.
        elapsed: Duration,
    },
    /// The window closed and post-movement resolution is pending.
    Resolving,
}

/// Immutable representation of the turn state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnSnapshot {
    /// Number of completed turns.
    pub current_turn: u64,
    /// Whether a turn is in flight.
    pub processing_turn: bool,
    /// Current stage of the turn state machine.
    pub phase: TurnPhase,
}

/// Immutable representation of the player used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Current, possibly interpolated, position.
    pub position: Vec3,
    /// Whether the player's step animation is in flight.
    pub is_moving: bool,
    /// Current health.
    pub health: Health,
}

impl PlayerSnapshot {
    /// Cell nearest to the player's position.
    #[must_use]
    pub fn cell(&self) -> CellCoord {
        CellCoord::from_position(self.position)
    }
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Unique identifier assigned to the enemy.
    pub id: EnemyId,
    /// Current, possibly interpolated, position.
    pub position: Vec3,
    /// Whether the enemy's step animation is in flight.
    pub is_acting: bool,
}

/// Read-only snapshot describing all active enemies.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortalSnapshot {
    /// Identifier allocated to the portal by the world.
    pub id: PortalId,
    /// Cell the portal occupies.
    pub cell: CellCoord,
    /// Whether the player currently stands on the portal.
    pub has_player: bool,
    /// Whether the portal is removed after its first use.
    pub one_shot: bool,
}

/// Read-only snapshot describing all active portals.
#[derive(Clone, Debug, Default)]
pub struct PortalView {
    snapshots: Vec<PortalSnapshot>,
}

impl PortalView {
    /// Creates a new portal view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PortalSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured portal snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &PortalSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PortalSnapshot> {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::{CellCoord, EnemyId, Health, StepOffset, Vec3};
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn cell_coord_round_trips_through_bincode() {
        assert_round_trip(&CellCoord::new(-3, 10, 7));
    }

    #[test]
    fn enemy_id_round_trips_through_bincode() {
        assert_round_trip(&EnemyId::new(42));
    }

    #[test]
    fn cardinal_steps_move_one_tile_in_the_grid_plane() {
        let origin = CellCoord::new(2, 0, 2);
        assert_eq!(origin.step(StepOffset::Forward), CellCoord::new(2, 0, 3));
        assert_eq!(origin.step(StepOffset::Back), CellCoord::new(2, 0, 1));
        assert_eq!(origin.step(StepOffset::Right), CellCoord::new(3, 0, 2));
        assert_eq!(origin.step(StepOffset::Left), CellCoord::new(1, 0, 2));
        assert_eq!(origin.step(StepOffset::Stay), origin);

        for offset in StepOffset::CARDINALS {
            let expected = origin.step(offset).position();
            assert_eq!(origin.position() + offset.delta(), expected);
        }
    }

    #[test]
    fn steps_clamp_at_the_grid_boundary() {
        let corner = CellCoord::new(i32::MAX, 0, i32::MIN);
        assert_eq!(corner.step(StepOffset::Right), corner);
        assert_eq!(corner.step(StepOffset::Back), corner);
        assert_eq!(
            corner.step(StepOffset::Left),
            CellCoord::new(i32::MAX - 1, 0, i32::MIN)
        );
    }

    #[test]
    fn snapping_rounds_to_nearest_cell() {
        let cell = CellCoord::from_position(Vec3::new(0.49, 10.2, -1.6));
        assert_eq!(cell, CellCoord::new(0, 10, -2));
    }

    #[test]
    fn restoring_health_clamps_to_maximum() {
        let health = Health::full(100);
        let damaged = Health { current: 30, ..health };
        assert_eq!(damaged.restored(50).current(), 80);
        assert_eq!(damaged.restored(500).current(), 100);
        assert_eq!(health.restored(u32::MAX), health);
    }
}
