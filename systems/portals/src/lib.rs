#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Post-movement pass that moves the player between worlds through portals.

use gridturn_core::{
    AmbienceCue, AudioCues, CellCoord, Command, Event, PortalId, PortalView, Vec3,
    DEFAULT_PORTAL_OFFSET, DEFAULT_PORTAL_THRESHOLD,
};

/// Configuration parameters required to construct the resolver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    threshold: f32,
    offset: f32,
}

impl Config {
    /// Creates a configuration with an explicit world-2 threshold and the
    /// vertical distance between worlds.
    #[must_use]
    pub const fn new(threshold: f32, offset: f32) -> Self {
        Self { threshold, offset }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_PORTAL_THRESHOLD, DEFAULT_PORTAL_OFFSET)
    }
}

/// Pure system that resolves portal traversals once a turn's window closes.
#[derive(Clone, Debug, Default)]
pub struct PortalResolver {
    config: Config,
}

impl PortalResolver {
    /// Creates a new resolver using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs [`PortalResolver::resolve`] once for every `TurnWindowElapsed` event.
    pub fn handle<A>(
        &self,
        events: &[Event],
        portal_view: &PortalView,
        player: Vec3,
        audio: &mut A,
        out: &mut Vec<Command>,
    ) where
        A: AudioCues + ?Sized,
    {
        for event in events {
            if let Event::TurnWindowElapsed { .. } = event {
                self.resolve(portal_view, player, audio, out);
            }
        }
    }

    /// Teleports the player for every occupied portal and swaps ambience.
    ///
    /// Portals are visited in ascending id order and each sees the player's
    /// height as left by the previous one. At most one portal is removed per
    /// pass: the last triggered one-shot portal.
    pub fn resolve<A>(
        &self,
        portal_view: &PortalView,
        player: Vec3,
        audio: &mut A,
        out: &mut Vec<Command>,
    ) where
        A: AudioCues + ?Sized,
    {
        let mut height = player.y;
        let mut to_remove: Option<PortalId> = None;

        for portal in portal_view.iter().filter(|portal| portal.has_player) {
            let (offset, from, to) = if height > self.config.threshold {
                (-self.config.offset, AmbienceCue::WorldTwo, AmbienceCue::WorldOne)
            } else {
                (self.config.offset, AmbienceCue::WorldOne, AmbienceCue::WorldTwo)
            };

            height += offset;
            out.push(Command::TeleportPlayer {
                offset: Vec3::new(0.0, offset, 0.0),
            });
            swap_ambience(audio, from, to);
            tracing::info!(portal = portal.id.get(), cue = to.name(), "player traversed portal");

            if portal.one_shot {
                to_remove = Some(portal.id);
            }
        }

        if let Some(portal) = to_remove {
            out.push(Command::RemovePortal { portal });
        }
    }

    /// Emits occupancy updates so every portal reflects whether the player
    /// stands on its cell. Portals only see the player in their own world.
    pub fn refresh_occupancy(
        &self,
        portal_view: &PortalView,
        player_cell: CellCoord,
        out: &mut Vec<Command>,
    ) {
        for portal in portal_view.iter() {
            let has_player = portal.cell == player_cell;
            if has_player != portal.has_player {
                out.push(Command::SetPortalOccupancy {
                    portal: portal.id,
                    has_player,
                });
            }
        }
    }
}

fn swap_ambience<A>(audio: &mut A, from: AmbienceCue, to: AmbienceCue)
where
    A: AudioCues + ?Sized,
{
    if audio.is_playing(from.name()) {
        audio.stop(from.name());
    }
    audio.play(to.name());
}
