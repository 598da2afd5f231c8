use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use gridturn_core::{
    CellCoord, StepOffset, DEFAULT_PORTAL_OFFSET, DEFAULT_PORTAL_THRESHOLD, DEFAULT_STEP_DURATION,
};
use serde::Deserialize;
use thiserror::Error;

/// Scenario played when no file is supplied on the command line.
const BUILTIN_SCENARIO: &str = r#"
seed = 7
moves = ["forward", "forward", "right", "back", "left", "left"]

[player]
start = { x = 0, y = 0, z = 0 }

[[obstacles]]
x = 2
y = 0
z = 2

[[obstacles]]
x = 2
y = 0
z = 3

[[enemies]]
cell = { x = 4, y = 0, z = 4 }

[[enemies]]
cell = { x = -3, y = 0, z = 1 }

[[portals]]
cell = { x = 1, y = 0, z = 2 }
one_shot = false

[[portals]]
cell = { x = -1, y = 10, z = 1 }
"#;

/// Level layout and scripted player input loaded from TOML.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Duration of one step in milliseconds.
    #[serde(default)]
    pub(crate) step_ms: Option<u64>,
    /// Seed of the enemy policy's random source.
    #[serde(default)]
    pub(crate) seed: Option<u64>,
    /// Height above which the player counts as being in world 2.
    #[serde(default)]
    pub(crate) portal_threshold: Option<f32>,
    /// Vertical distance between the two worlds.
    #[serde(default)]
    pub(crate) portal_offset: Option<f32>,
    /// Player placement.
    pub(crate) player: PlayerSpec,
    /// Cells that block enemy movement.
    #[serde(default)]
    pub(crate) obstacles: Vec<CellCoord>,
    /// Enemies spawned before the first turn.
    #[serde(default)]
    pub(crate) enemies: Vec<EnemySpec>,
    /// Portals placed before the first turn.
    #[serde(default)]
    pub(crate) portals: Vec<PortalSpec>,
    /// Player steps replayed in order, one per turn.
    #[serde(default)]
    pub(crate) moves: Vec<StepOffset>,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlayerSpec {
    pub(crate) start: CellCoord,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EnemySpec {
    pub(crate) cell: CellCoord,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PortalSpec {
    pub(crate) cell: CellCoord,
    #[serde(default)]
    pub(crate) one_shot: bool,
}

impl Scenario {
    /// Reads and validates the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let source = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    /// Scenario used when none is supplied.
    pub(crate) fn builtin() -> Result<Self, ScenarioError> {
        Self::parse(BUILTIN_SCENARIO)
    }

    /// Parses and validates a scenario from TOML text.
    pub(crate) fn parse(source: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(source)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Configured step duration, falling back to the engine default.
    #[must_use]
    pub(crate) fn step_duration(&self) -> Duration {
        self.step_ms
            .map_or(DEFAULT_STEP_DURATION, Duration::from_millis)
    }

    /// World-2 height threshold, falling back to the engine default.
    #[must_use]
    pub(crate) fn portal_threshold(&self) -> f32 {
        self.portal_threshold.unwrap_or(DEFAULT_PORTAL_THRESHOLD)
    }

    /// Distance a portal moves the player, falling back to the engine default.
    #[must_use]
    pub(crate) fn portal_offset(&self) -> f32 {
        self.portal_offset.unwrap_or(DEFAULT_PORTAL_OFFSET)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.step_ms == Some(0) {
            return Err(ScenarioError::ZeroStepDuration);
        }

        let (threshold, offset) = (self.portal_threshold(), self.portal_offset());
        if !threshold.is_finite() || !offset.is_finite() || offset <= 0.0 || threshold >= offset {
            return Err(ScenarioError::PortalGeometry { threshold, offset });
        }

        let blocked: BTreeSet<CellCoord> = self.obstacles.iter().copied().collect();
        if let Some(enemy) = self
            .enemies
            .iter()
            .find(|enemy| blocked.contains(&enemy.cell))
        {
            return Err(ScenarioError::EnemyOnObstacle { cell: enemy.cell });
        }

        Ok(())
    }
}

/// Errors that can occur while loading a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The scenario file could not be read.
    #[error("could not read scenario '{}'", path.display())]
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The scenario text is not valid TOML for the expected schema.
    #[error("could not parse scenario")]
    Parse(#[from] toml::de::Error),
    /// A zero step duration would close every turn window instantly.
    #[error("step duration must be greater than zero")]
    ZeroStepDuration,
    /// Portals could not carry the player above the threshold and back.
    #[error("portal offset {offset} must be positive and above threshold {threshold}")]
    PortalGeometry {
        /// Configured world-2 threshold.
        threshold: f32,
        /// Configured distance between worlds.
        offset: f32,
    },
    /// An enemy was spawned on a blocked cell.
    #[error("enemy placed on obstacle at ({}, {}, {})", cell.x(), cell.y(), cell.z())]
    EnemyOnObstacle {
        /// Offending cell.
        cell: CellCoord,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scenario_is_valid() {
        let scenario = Scenario::builtin().expect("builtin scenario parses");

        assert_eq!(scenario.seed, Some(7));
        assert_eq!(scenario.step_duration(), DEFAULT_STEP_DURATION);
        assert_eq!(scenario.enemies.len(), 2);
        assert_eq!(scenario.moves[2], StepOffset::Right);
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let scenario = Scenario::parse(
            r#"
            [player]
            start = { x = 1, y = 0, z = -1 }
            "#,
        )
        .expect("minimal scenario parses");

        assert_eq!(scenario.player.start, CellCoord::new(1, 0, -1));
        assert!(scenario.obstacles.is_empty());
        assert!(scenario.moves.is_empty());
        assert_eq!(scenario.seed, None);
    }

    #[test]
    fn portals_default_to_reusable() {
        let scenario = Scenario::parse(
            r#"
            step_ms = 350
            [player]
            start = { x = 0, y = 0, z = 0 }
            [[portals]]
            cell = { x = 0, y = 0, z = 1 }
            "#,
        )
        .expect("scenario parses");

        assert!(!scenario.portals[0].one_shot);
        assert_eq!(scenario.step_duration(), Duration::from_millis(350));
        assert_eq!(scenario.portal_threshold(), DEFAULT_PORTAL_THRESHOLD);
        assert_eq!(scenario.portal_offset(), DEFAULT_PORTAL_OFFSET);
    }

    #[test]
    fn portal_geometry_is_read_from_the_file() {
        let scenario = Scenario::parse(
            r#"
            portal_threshold = 2.0
            portal_offset = 4.0
            [player]
            start = { x = 0, y = 0, z = 0 }
            "#,
        )
        .expect("scenario parses");

        assert_eq!(scenario.portal_threshold(), 2.0);
        assert_eq!(scenario.portal_offset(), 4.0);
    }

    #[test]
    fn portal_offset_must_clear_the_threshold() {
        for (threshold, offset) in [(5.0, 0.0), (5.0, -10.0), (5.0, 5.0), (6.0, 4.0)] {
            let source = format!(
                "portal_threshold = {threshold:?}\nportal_offset = {offset:?}\n\
                 [player]\nstart = {{ x = 0, y = 0, z = 0 }}\n"
            );
            let error = Scenario::parse(&source).expect_err("bad geometry rejected");

            assert!(
                matches!(error, ScenarioError::PortalGeometry { .. }),
                "threshold {threshold} offset {offset}"
            );
        }
    }

    #[test]
    fn zero_step_duration_is_rejected() {
        let error = Scenario::parse(
            r#"
            step_ms = 0
            [player]
            start = { x = 0, y = 0, z = 0 }
            "#,
        )
        .expect_err("zero step rejected");

        assert!(matches!(error, ScenarioError::ZeroStepDuration));
    }

    #[test]
    fn enemy_on_obstacle_is_rejected() {
        let error = Scenario::parse(
            r#"
            obstacles = [{ x = 3, y = 0, z = 3 }]
            [player]
            start = { x = 0, y = 0, z = 0 }
            [[enemies]]
            cell = { x = 3, y = 0, z = 3 }
            "#,
        )
        .expect_err("enemy on obstacle rejected");

        assert!(matches!(
            error,
            ScenarioError::EnemyOnObstacle { cell } if cell == CellCoord::new(3, 0, 3)
        ));
        assert_eq!(error.to_string(), "enemy placed on obstacle at (3, 0, 3)");
    }

    #[test]
    fn unknown_moves_fail_to_parse() {
        let error = Scenario::parse(
            r#"
            moves = ["sideways"]
            [player]
            start = { x = 0, y = 0, z = 0 }
            "#,
        )
        .expect_err("unknown move rejected");

        assert!(matches!(error, ScenarioError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let error = Scenario::load(Path::new("does/not/exist.toml")).expect_err("missing file");

        assert!(error.to_string().contains("does/not/exist.toml"));
    }
}
