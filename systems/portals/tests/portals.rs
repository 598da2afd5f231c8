use std::collections::BTreeSet;

use gridturn_core::{
    AmbienceCue, AudioCues, CellCoord, Command, Event, PortalId, PortalSnapshot, PortalView, Vec3,
};
use gridturn_system_portals::{Config, PortalResolver};
use gridturn_world::{self as world, query, World};

#[derive(Debug, Default)]
struct RecordingAudio {
    playing: BTreeSet<String>,
    log: Vec<String>,
}

impl RecordingAudio {
    fn playing(cue: AmbienceCue) -> Self {
        let mut audio = Self::default();
        let _ = audio.playing.insert(cue.name().to_owned());
        audio
    }
}

impl AudioCues for RecordingAudio {
    fn play(&mut self, name: &str) {
        let _ = self.playing.insert(name.to_owned());
        self.log.push(format!("play {name}"));
    }

    fn stop(&mut self, name: &str) {
        let _ = self.playing.remove(name);
        self.log.push(format!("stop {name}"));
    }

    fn is_playing(&self, name: &str) -> bool {
        self.playing.contains(name)
    }
}

fn portal(id: u32, cell: (i32, i32, i32), has_player: bool, one_shot: bool) -> PortalSnapshot {
    PortalSnapshot {
        id: PortalId::new(id),
        cell: CellCoord::new(cell.0, cell.1, cell.2),
        has_player,
        one_shot,
    }
}

fn teleports(commands: &[Command]) -> Vec<f32> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::TeleportPlayer { offset } => Some(offset.y),
            _ => None,
        })
        .collect()
}

fn removals(commands: &[Command]) -> Vec<PortalId> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::RemovePortal { portal } => Some(*portal),
            _ => None,
        })
        .collect()
}

#[test]
fn player_in_first_world_is_lifted_into_the_second() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![portal(0, (1, 0, 1), true, false)]);
    let mut audio = RecordingAudio::playing(AmbienceCue::WorldOne);
    let mut commands = Vec::new();

    resolver.resolve(&view, Vec3::new(1.0, 0.0, 1.0), &mut audio, &mut commands);

    assert_eq!(teleports(&commands), vec![10.0]);
    assert!(removals(&commands).is_empty());
    assert_eq!(
        audio.log,
        vec![
            format!("stop {}", AmbienceCue::WorldOne.name()),
            format!("play {}", AmbienceCue::WorldTwo.name()),
        ]
    );
}

#[test]
fn player_in_second_world_is_dropped_into_the_first() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![portal(0, (1, 0, 1), true, false)]);
    let mut audio = RecordingAudio::playing(AmbienceCue::WorldTwo);
    let mut commands = Vec::new();

    resolver.resolve(&view, Vec3::new(1.0, 10.0, 1.0), &mut audio, &mut commands);

    assert_eq!(teleports(&commands), vec![-10.0]);
    assert!(audio.is_playing(AmbienceCue::WorldOne.name()));
    assert!(!audio.is_playing(AmbienceCue::WorldTwo.name()));
}

#[test]
fn silent_cue_is_not_stopped_before_swapping() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![portal(0, (0, 0, 0), true, false)]);
    let mut audio = RecordingAudio::default();
    let mut commands = Vec::new();

    resolver.resolve(&view, Vec3::ZERO, &mut audio, &mut commands);

    assert_eq!(
        audio.log,
        vec![format!("play {}", AmbienceCue::WorldTwo.name())]
    );
}

#[test]
fn threshold_is_exclusive() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![portal(0, (0, 5, 0), true, false)]);
    let mut audio = RecordingAudio::default();
    let mut commands = Vec::new();

    resolver.resolve(&view, Vec3::new(0.0, 5.0, 0.0), &mut audio, &mut commands);

    assert_eq!(teleports(&commands), vec![10.0]);
}

#[test]
fn unoccupied_portals_do_nothing() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![
        portal(0, (0, 0, 0), false, true),
        portal(1, (3, 0, 0), false, false),
    ]);
    let mut audio = RecordingAudio::playing(AmbienceCue::WorldOne);
    let mut commands = Vec::new();

    resolver.resolve(&view, Vec3::ZERO, &mut audio, &mut commands);

    assert!(commands.is_empty());
    assert!(audio.log.is_empty());
}

#[test]
fn one_shot_portal_is_removed_after_use() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![portal(4, (0, 0, 0), true, true)]);
    let mut audio = RecordingAudio::playing(AmbienceCue::WorldOne);
    let mut commands = Vec::new();

    resolver.resolve(&view, Vec3::ZERO, &mut audio, &mut commands);

    assert_eq!(
        commands,
        vec![
            Command::TeleportPlayer {
                offset: Vec3::new(0.0, 10.0, 0.0),
            },
            Command::RemovePortal {
                portal: PortalId::new(4),
            },
        ]
    );
}

#[test]
fn stacked_portals_see_height_left_by_previous_traversal() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![
        portal(1, (0, 10, 0), true, false),
        portal(0, (0, 0, 0), true, false),
    ]);
    let mut audio = RecordingAudio::playing(AmbienceCue::WorldOne);
    let mut commands = Vec::new();

    resolver.resolve(&view, Vec3::ZERO, &mut audio, &mut commands);

    assert_eq!(teleports(&commands), vec![10.0, -10.0]);
    assert!(audio.is_playing(AmbienceCue::WorldOne.name()));
}

#[test]
fn only_last_triggered_one_shot_portal_is_removed() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![
        portal(0, (0, 0, 0), true, true),
        portal(1, (0, 10, 0), true, true),
        portal(2, (0, 0, 0), true, false),
    ]);
    let mut audio = RecordingAudio::default();
    let mut commands = Vec::new();

    resolver.resolve(&view, Vec3::ZERO, &mut audio, &mut commands);

    assert_eq!(removals(&commands), vec![PortalId::new(1)]);
    assert!(matches!(commands.last(), Some(Command::RemovePortal { .. })));
}

#[test]
fn custom_configuration_moves_threshold_and_offset() {
    let resolver = PortalResolver::new(Config::new(2.0, 4.0));
    let view = PortalView::from_snapshots(vec![portal(0, (0, 3, 0), true, false)]);
    let mut audio = RecordingAudio::default();
    let mut commands = Vec::new();

    resolver.resolve(&view, Vec3::new(0.0, 3.0, 0.0), &mut audio, &mut commands);

    assert_eq!(teleports(&commands), vec![-4.0]);
}

#[test]
fn handle_resolves_only_on_elapsed_window() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![portal(0, (0, 0, 0), true, false)]);
    let mut audio = RecordingAudio::default();
    let mut commands = Vec::new();

    resolver.handle(
        &[Event::TurnCompleted { turn: 1 }],
        &view,
        Vec3::ZERO,
        &mut audio,
        &mut commands,
    );
    assert!(commands.is_empty());

    resolver.handle(
        &[Event::TurnWindowElapsed { turn: 1 }],
        &view,
        Vec3::ZERO,
        &mut audio,
        &mut commands,
    );
    assert_eq!(teleports(&commands), vec![10.0]);
}

#[test]
fn occupancy_only_sees_player_in_the_portal_world() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![
        portal(0, (2, 0, 2), false, false),
        portal(1, (2, 10, 2), false, false),
        portal(2, (5, 0, 5), true, false),
    ]);
    let mut commands = Vec::new();

    resolver.refresh_occupancy(&view, CellCoord::new(2, 10, 2), &mut commands);

    assert_eq!(
        commands,
        vec![
            Command::SetPortalOccupancy {
                portal: PortalId::new(1),
                has_player: true,
            },
            Command::SetPortalOccupancy {
                portal: PortalId::new(2),
                has_player: false,
            },
        ]
    );
}

#[test]
fn lower_portal_is_blind_to_player_walking_above_it() {
    let resolver = PortalResolver::default();
    let view = PortalView::from_snapshots(vec![portal(0, (0, 0, 1), false, false)]);
    let mut commands = Vec::new();

    resolver.refresh_occupancy(&view, CellCoord::new(0, 10, 1), &mut commands);

    assert!(commands.is_empty());
}

#[test]
fn resolved_commands_drive_the_world_through_a_round_trip() {
    let mut world = World::new();
    let resolver = PortalResolver::default();
    let mut audio = RecordingAudio::playing(AmbienceCue::WorldOne);
    let mut events = Vec::new();

    world::apply(
        &mut world,
        Command::PlacePortal {
            cell: CellCoord::new(0, 0, 0),
            one_shot: true,
        },
        &mut events,
    );

    let mut commands = Vec::new();
    resolver.refresh_occupancy(
        &query::portal_view(&world),
        query::player(&world).cell(),
        &mut commands,
    );
    for command in commands.drain(..) {
        world::apply(&mut world, command, &mut events);
    }

    resolver.resolve(
        &query::portal_view(&world),
        query::player(&world).position,
        &mut audio,
        &mut commands,
    );
    for command in commands.drain(..) {
        world::apply(&mut world, command, &mut events);
    }

    assert_eq!(query::player(&world).position, Vec3::new(0.0, 10.0, 0.0));
    assert_eq!(query::portal_view(&world).iter().count(), 0);
    assert!(events.contains(&Event::PortalRemoved {
        portal: PortalId::new(0),
    }));
    assert!(audio.is_playing(AmbienceCue::WorldTwo.name()));
}
