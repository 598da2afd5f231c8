#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Gridturn.
//!
//! The world owns the player, the active enemy and portal collections, the
//! obstacle mask, and the turn state machine. It is mutated exclusively
//! through [`apply`] and read through the [`query`] module.

mod obstacles;

use std::time::Duration;

use gridturn_core::{
    CellCoord, Command, EnemyId, Event, Health, PortalId, TurnPhase, Vec3, DEFAULT_STEP_DURATION,
};
use gridturn_system_motion::TileMotion;

pub use obstacles::ObstacleMask;

const PLAYER_MAX_HEALTH: u32 = 100;

/// Represents the authoritative Gridturn world state.
#[derive(Debug)]
pub struct World {
    step_duration: Duration,
    obstacles: ObstacleMask,
    player: Player,
    enemies: Vec<Enemy>,
    portals: Vec<Portal>,
    next_enemy_id: u32,
    next_portal_id: u32,
    turn: TurnState,
}

impl World {
    /// Creates an empty world with the player resting on the origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step_duration: DEFAULT_STEP_DURATION,
            obstacles: ObstacleMask::default(),
            player: Player::at(Vec3::ZERO),
            enemies: Vec::new(),
            portals: Vec::new(),
            next_enemy_id: 0,
            next_portal_id: 0,
            turn: TurnState::default(),
        }
    }

    fn enemy_mut(&mut self, enemy: EnemyId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|candidate| candidate.id == enemy)
    }

    fn portal_mut(&mut self, portal: PortalId) -> Option<&mut Portal> {
        self.portals.iter_mut().find(|candidate| candidate.id == portal)
    }

    fn advance_motions(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if let Some(finished) = self.player.motion.advance(dt) {
            out_events.push(Event::PlayerStepFinished {
                position: finished.target,
            });
        }

        for enemy in &mut self.enemies {
            if let Some(finished) = enemy.motion.advance(dt) {
                out_events.push(Event::EnemyStepFinished {
                    enemy: enemy.id,
                    position: finished.target,
                });
            }
        }
    }

    fn advance_turn_window(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let TurnPhase::AwaitingWindow { elapsed } = self.turn.phase else {
            return;
        };

        let elapsed = elapsed.saturating_add(dt);
        if elapsed < self.step_duration {
            self.turn.phase = TurnPhase::AwaitingWindow { elapsed };
            return;
        }

        self.turn.phase = TurnPhase::Resolving;
        tracing::trace!(turn = self.turn.current_turn, "turn window elapsed");
        out_events.push(Event::TurnWindowElapsed {
            turn: self.turn.current_turn,
        });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureStepDuration { step_duration } => {
            world.step_duration = step_duration;
        }
        Command::ConfigureObstacles { cells } => {
            world.obstacles = ObstacleMask::from_cells(cells);
            out_events.push(Event::ObstaclesConfigured {
                blocked: world.obstacles.len(),
            });
        }
        Command::PlacePlayer { cell } => {
            if world.player.motion.is_moving() {
                tracing::debug!(?cell, "player is moving; placement ignored");
                return;
            }
            world.player.motion = TileMotion::at(cell.position());
        }
        Command::SpawnEnemy { cell } => {
            let enemy = EnemyId::new(world.next_enemy_id);
            world.next_enemy_id = world.next_enemy_id.saturating_add(1);
            world.enemies.push(Enemy {
                id: enemy,
                motion: TileMotion::at(cell.position()),
            });
            out_events.push(Event::EnemySpawned { enemy, cell });
        }
        Command::PlacePortal { cell, one_shot } => {
            let portal = PortalId::new(world.next_portal_id);
            world.next_portal_id = world.next_portal_id.saturating_add(1);
            world.portals.push(Portal {
                id: portal,
                cell,
                has_player: false,
                one_shot,
            });
            out_events.push(Event::PortalPlaced {
                portal,
                cell,
                one_shot,
            });
        }
        Command::SetPortalOccupancy { portal, has_player } => {
            if let Some(entry) = world.portal_mut(portal) {
                if entry.has_player != has_player {
                    entry.has_player = has_player;
                    out_events.push(Event::PortalOccupancyChanged { portal, has_player });
                }
            }
        }
        Command::StepPlayer { offset } => {
            let from = world.player.motion.position();
            if world
                .player
                .motion
                .begin_step(offset.delta(), world.step_duration)
            {
                out_events.push(Event::PlayerStepStarted {
                    from,
                    to: world.player.motion.target(),
                });
            } else {
                tracing::debug!(?offset, "player already moving; step ignored");
            }
        }
        Command::ProcessTurn { player } => {
            if world.turn.is_processing() {
                tracing::debug!(
                    turn = world.turn.current_turn,
                    "turn already in flight; request ignored"
                );
                return;
            }
            world.turn.phase = TurnPhase::AwaitingWindow {
                elapsed: Duration::ZERO,
            };
            out_events.push(Event::TurnStarted {
                turn: world.turn.current_turn,
                player,
            });
        }
        Command::StepEnemy { enemy, offset } => {
            let step_duration = world.step_duration;
            let Some(entry) = world.enemy_mut(enemy) else {
                return;
            };
            let from = entry.motion.position();
            if entry.motion.begin_step(offset.delta(), step_duration) {
                out_events.push(Event::EnemyStepStarted {
                    enemy,
                    from,
                    to: entry.motion.target(),
                });
            } else {
                tracing::debug!(enemy = enemy.get(), "enemy already acting; step ignored");
            }
        }
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            world.advance_motions(dt, out_events);
            world.advance_turn_window(dt, out_events);
        }
        Command::TeleportPlayer { offset } => {
            let from = world.player.motion.position();
            world.player.motion.translate(offset);
            out_events.push(Event::PlayerTeleported {
                from,
                to: world.player.motion.position(),
            });
        }
        Command::RemovePortal { portal } => {
            if let Some(index) = world.portals.iter().position(|entry| entry.id == portal) {
                let _ = world.portals.remove(index);
                out_events.push(Event::PortalRemoved { portal });
            }
        }
        Command::ConcludeTurn => {
            if world.turn.phase != TurnPhase::Resolving {
                tracing::debug!(phase = ?world.turn.phase, "no turn awaiting conclusion");
                return;
            }
            world.turn.current_turn = world.turn.current_turn.saturating_add(1);
            world.turn.phase = TurnPhase::Idle;
            out_events.push(Event::TurnCompleted {
                turn: world.turn.current_turn,
            });
        }
        Command::RestoreHealth { amount } => {
            world.player.health = world.player.health.restored(amount);
            out_events.push(Event::PlayerHealthChanged {
                health: world.player.health,
            });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use gridturn_core::{
        EnemySnapshot, EnemyView, PlayerSnapshot, PortalSnapshot, PortalView, TurnSnapshot,
    };

    use super::{ObstacleMask, World};

    /// Duration every step and turn window lasts.
    #[must_use]
    pub fn step_duration(world: &World) -> Duration {
        world.step_duration
    }

    /// Provides read-only access to the obstacle mask.
    #[must_use]
    pub fn obstacles(world: &World) -> &ObstacleMask {
        &world.obstacles
    }

    /// Captures the player's position, motion flag, and health.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            position: world.player.motion.position(),
            is_moving: world.player.motion.is_moving(),
            health: world.player.health,
        }
    }

    /// Captures a read-only view of the active enemies.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .enemies
                .iter()
                .map(|enemy| EnemySnapshot {
                    id: enemy.id,
                    position: enemy.motion.position(),
                    is_acting: enemy.motion.is_moving(),
                })
                .collect(),
        )
    }

    /// Number of enemies in the active collection.
    #[must_use]
    pub fn enemy_count(world: &World) -> usize {
        world.enemies.len()
    }

    /// Captures a read-only view of the active portals.
    #[must_use]
    pub fn portal_view(world: &World) -> PortalView {
        PortalView::from_snapshots(
            world
                .portals
                .iter()
                .map(|portal| PortalSnapshot {
                    id: portal.id,
                    cell: portal.cell,
                    has_player: portal.has_player,
                    one_shot: portal.one_shot,
                })
                .collect(),
        )
    }

    /// Captures the turn counter and busy gate.
    #[must_use]
    pub fn turn_state(world: &World) -> TurnSnapshot {
        TurnSnapshot {
            current_turn: world.turn.current_turn,
            processing_turn: world.turn.is_processing(),
            phase: world.turn.phase,
        }
    }

    /// Reports whether the player or any enemy is animating a step.
    #[must_use]
    pub fn entities_moving(world: &World) -> bool {
        world.enemies.iter().any(|enemy| enemy.motion.is_moving())
            || world.player.motion.is_moving()
    }

    /// Reports whether the player may commit the next action.
    ///
    /// True only when no turn is in flight, no enemy is acting, and the
    /// player is not moving.
    #[must_use]
    pub fn can_act(world: &World) -> bool {
        !world.turn.is_processing() && !entities_moving(world)
    }
}

#[derive(Clone, Debug)]
struct Player {
    motion: TileMotion,
    health: Health,
}

impl Player {
    fn at(position: Vec3) -> Self {
        Self {
            motion: TileMotion::at(position),
            health: Health::full(PLAYER_MAX_HEALTH),
        }
    }
}

#[derive(Clone, Debug)]
struct Enemy {
    id: EnemyId,
    motion: TileMotion,
}

#[derive(Clone, Copy, Debug)]
struct Portal {
    id: PortalId,
    cell: CellCoord,
    has_player: bool,
    one_shot: bool,
}

#[derive(Clone, Copy, Debug)]
struct TurnState {
    current_turn: u64,
    phase: TurnPhase,
}

impl TurnState {
    fn is_processing(&self) -> bool {
        self.phase != TurnPhase::Idle
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            current_turn: 0,
            phase: TurnPhase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridturn_core::StepOffset;

    fn run(world: &mut World, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, command, &mut events);
        events
    }

    #[test]
    fn spawned_enemies_receive_sequential_ids() {
        let mut world = World::new();
        let first = run(
            &mut world,
            Command::SpawnEnemy {
                cell: CellCoord::new(0, 0, 0),
            },
        );
        let second = run(
            &mut world,
            Command::SpawnEnemy {
                cell: CellCoord::new(3, 0, 0),
            },
        );

        assert_eq!(
            first,
            vec![Event::EnemySpawned {
                enemy: EnemyId::new(0),
                cell: CellCoord::new(0, 0, 0),
            }]
        );
        assert_eq!(
            second,
            vec![Event::EnemySpawned {
                enemy: EnemyId::new(1),
                cell: CellCoord::new(3, 0, 0),
            }]
        );
        assert_eq!(query::enemy_count(&world), 2);
    }

    #[test]
    fn turn_window_closes_after_step_duration() {
        let mut world = World::new();
        let _ = run(
            &mut world,
            Command::ProcessTurn {
                player: Vec3::ZERO,
            },
        );

        let early = run(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(150),
            },
        );
        assert!(!early
            .iter()
            .any(|event| matches!(event, Event::TurnWindowElapsed { .. })));
        assert_eq!(
            world.turn.phase,
            TurnPhase::AwaitingWindow {
                elapsed: Duration::from_millis(150)
            }
        );

        let late = run(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(50),
            },
        );
        assert!(late.contains(&Event::TurnWindowElapsed { turn: 0 }));
        assert_eq!(world.turn.phase, TurnPhase::Resolving);
    }

    #[test]
    fn conclude_turn_outside_resolution_is_ignored() {
        let mut world = World::new();
        let events = run(&mut world, Command::ConcludeTurn);

        assert!(events.is_empty());
        assert_eq!(world.turn.current_turn, 0);
    }

    #[test]
    fn teleport_lands_in_flight_step_in_new_world() {
        let mut world = World::new();
        let _ = run(
            &mut world,
            Command::StepPlayer {
                offset: StepOffset::Right,
            },
        );
        let _ = run(
            &mut world,
            Command::TeleportPlayer {
                offset: Vec3::new(0.0, 10.0, 0.0),
            },
        );
        let _ = run(
            &mut world,
            Command::Tick {
                dt: DEFAULT_STEP_DURATION,
            },
        );

        assert_eq!(world.player.motion.position(), Vec3::new(1.0, 10.0, 0.0));
    }
}
