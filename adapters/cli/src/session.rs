use std::{fmt, time::Duration};

use gridturn_core::{CellCoord, Event, Health};
use gridturn_system_turns::{Config, TurnScheduler};
use gridturn_world::query;
use serde::Serialize;

use crate::{audio::LoggingAudio, scenario::Scenario};

/// State reported once every scripted move has been replayed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Summary {
    turns: u64,
    frames: u64,
    player: CellCoord,
    world: u8,
    health: Health,
    enemies: Vec<CellCoord>,
    portals: Vec<CellCoord>,
    ambience: Vec<String>,
}

impl Summary {
    fn capture(scheduler: &TurnScheduler<LoggingAudio>, frames: u64, threshold: f32) -> Self {
        let world = scheduler.world();
        let player = query::player(world);

        Self {
            turns: scheduler.current_turn(),
            frames,
            player: player.cell(),
            world: if player.position.y > threshold {
                2
            } else {
                1
            },
            health: player.health,
            enemies: query::enemy_view(world)
                .iter()
                .map(|enemy| CellCoord::from_position(enemy.position))
                .collect(),
            portals: query::portal_view(world)
                .iter()
                .map(|portal| portal.cell)
                .collect(),
            ambience: scheduler.audio().playing().map(str::to_owned).collect(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = |cell: &CellCoord| format!("({}, {}, {})", cell.x(), cell.y(), cell.z());

        writeln!(f, "turns completed: {} in {} frames", self.turns, self.frames)?;
        writeln!(
            f,
            "player: {} in world {} with {}/{} health",
            cell(&self.player),
            self.world,
            self.health.current(),
            self.health.max()
        )?;
        let enemies: Vec<String> = self.enemies.iter().map(cell).collect();
        writeln!(f, "enemies: [{}]", enemies.join(", "))?;
        let portals: Vec<String> = self.portals.iter().map(cell).collect();
        writeln!(f, "portals: [{}]", portals.join(", "))?;
        write!(f, "ambience: [{}]", self.ambience.join(", "))
    }
}

/// Replays the scenario's scripted moves, one turn per move.
///
/// `frame` must be non-zero; every turn is ticked until the player may act
/// again.
pub(crate) fn run(scenario: &Scenario, seed: u64, frame: Duration) -> Summary {
    let mut scheduler = TurnScheduler::new(
        Config::new(scenario.step_duration(), seed)
            .with_portals(scenario.portal_threshold(), scenario.portal_offset()),
        LoggingAudio::default(),
    );
    scheduler.configure_obstacles(scenario.obstacles.clone());
    scheduler.place_player(scenario.player.start);
    for enemy in &scenario.enemies {
        scheduler.spawn_enemy(enemy.cell);
    }
    for portal in &scenario.portals {
        scheduler.place_portal(portal.cell, portal.one_shot);
    }
    log_events(&scheduler.drain_events());

    let mut frames = 0_u64;
    for &offset in &scenario.moves {
        let target = query::player(scheduler.world()).cell().step(offset);
        if !scheduler.step_player(offset) {
            tracing::debug!(?offset, "player still moving; move skipped");
            continue;
        }
        scheduler.process_turn(target.position());

        while !scheduler.can_act() {
            scheduler.tick(frame);
            frames += 1;
            log_events(&scheduler.drain_events());
        }
    }

    Summary::capture(&scheduler, frames, scenario.portal_threshold())
}

fn log_events(events: &[Event]) {
    for event in events {
        match event {
            Event::PlayerTeleported { from, to } => {
                tracing::info!(?from, ?to, "player teleported");
            }
            Event::PortalRemoved { portal } => {
                tracing::info!(portal = portal.get(), "portal torn down");
            }
            Event::EnemySpawned { enemy, cell } => {
                tracing::debug!(enemy = enemy.get(), ?cell, "enemy spawned");
            }
            Event::EnemyStepStarted { enemy, to, .. } => {
                tracing::debug!(enemy = enemy.get(), ?to, "enemy stepping");
            }
            Event::TurnStarted { turn, player } => {
                tracing::debug!(turn, ?player, "turn started");
            }
            other => tracing::trace!(event = ?other),
        }
    }
}
