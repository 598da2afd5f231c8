#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Local movement policy that picks a single grid step for every enemy.
//!
//! Enemies do not plan paths. Each turn an enemy samples its four cardinal
//! neighbours, discards blocked cells, stays put when a legal neighbour
//! coincides with the player, and otherwise picks uniformly at random among
//! the legal moves. Distance-based chase or flee ordering is deliberately
//! absent.

use gridturn_core::{
    Command, EnemyView, Event, ObstacleQuery, Quat, StepOffset, Vec3, ADJACENCY_TOLERANCE,
    TILE_HALF_EXTENTS,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the policy system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration seeding the tie-break random source.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that answers every started turn with one step per enemy.
#[derive(Debug)]
pub struct EnemyPolicy {
    rng: ChaCha8Rng,
}

impl EnemyPolicy {
    /// Creates a new policy system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Consumes world events and immutable views to emit enemy step commands.
    ///
    /// Every `TurnStarted` event yields one `StepEnemy` command per idle
    /// enemy. Enemies still animating a previous step are skipped.
    pub fn handle<O>(
        &mut self,
        events: &[Event],
        enemy_view: &EnemyView,
        obstacles: &O,
        out: &mut Vec<Command>,
    ) where
        O: ObstacleQuery + ?Sized,
    {
        for event in events {
            let Event::TurnStarted { turn, player } = event else {
                continue;
            };

            for enemy in enemy_view.iter() {
                if enemy.is_acting {
                    tracing::debug!(enemy = enemy.id.get(), turn, "enemy still acting; skipped");
                    continue;
                }

                let offset = choose_step(enemy.position, *player, obstacles, &mut self.rng);
                tracing::debug!(enemy = enemy.id.get(), turn, ?offset, "enemy chose step");
                out.push(Command::StepEnemy {
                    enemy: enemy.id,
                    offset,
                });
            }
        }
    }
}

/// Picks the step an enemy at `position` takes this turn.
///
/// Cells whose probe is not conclusively free are treated as blocked. A
/// legal neighbour within [`ADJACENCY_TOLERANCE`] of the player on every
/// axis ends the evaluation with [`StepOffset::Stay`]. Remaining legal moves
/// are shuffled and the first is taken; with none left the enemy stays.
pub fn choose_step<O, R>(position: Vec3, player: Vec3, obstacles: &O, rng: &mut R) -> StepOffset
where
    O: ObstacleQuery + ?Sized,
    R: Rng + ?Sized,
{
    let mut candidates: Vec<StepOffset> = Vec::with_capacity(StepOffset::CARDINALS.len());

    for offset in StepOffset::CARDINALS {
        let destination = position + offset.delta();
        let occupancy = obstacles.probe(destination, TILE_HALF_EXTENTS, Quat::IDENTITY);
        if !occupancy.is_free() {
            continue;
        }

        if is_adjacent(destination, player) {
            return StepOffset::Stay;
        }

        candidates.push(offset);
    }

    candidates.shuffle(rng);
    candidates.first().copied().unwrap_or(StepOffset::Stay)
}

fn is_adjacent(destination: Vec3, player: Vec3) -> bool {
    (destination - player)
        .abs()
        .cmple(Vec3::splat(ADJACENCY_TOLERANCE))
        .all()
}
