#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tile motion animator that turns discrete grid steps into smooth motion.
//!
//! A [`TileMotion`] is owned by every entity that moves on the grid. Steps are
//! started with [`TileMotion::begin_step`] and advanced by the external tick
//! through [`TileMotion::advance`]; the motion never blocks and holds no
//! state beyond the single step in flight.

use std::time::Duration;

use gridturn_core::Vec3;

/// Position of an entity together with the step it is animating, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMotion {
    position: Vec3,
    step: Option<ActiveStep>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ActiveStep {
    origin: Vec3,
    target: Vec3,
    elapsed: Duration,
    duration: Duration,
}

/// Describes a step that ran to completion during [`TileMotion::advance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepFinished {
    /// Position the step departed from.
    pub origin: Vec3,
    /// Position the entity snapped to.
    pub target: Vec3,
}

impl TileMotion {
    /// Creates an idle motion resting on the provided position.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            step: None,
        }
    }

    /// Current, possibly interpolated, position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Reports whether a step is in flight.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.step.is_some()
    }

    /// Position the entity will rest on once the current step completes.
    #[must_use]
    pub fn target(&self) -> Vec3 {
        self.step.map_or(self.position, |step| step.target)
    }

    /// Starts animating from the current position toward `position + offset`.
    ///
    /// Returns `false` without touching the motion when a step is already in
    /// flight. A zero offset is a valid step that keeps the entity busy for
    /// the full duration.
    pub fn begin_step(&mut self, offset: Vec3, duration: Duration) -> bool {
        if self.step.is_some() {
            return false;
        }

        self.step = Some(ActiveStep {
            origin: self.position,
            target: self.position + offset,
            elapsed: Duration::ZERO,
            duration,
        });
        true
    }

    /// Advances the step in flight by `dt`.
    ///
    /// Returns the finished step once the accumulated time reaches the
    /// step's duration, at which point the position equals the target
    /// exactly.
    pub fn advance(&mut self, dt: Duration) -> Option<StepFinished> {
        let step = self.step.as_mut()?;
        step.elapsed = step.elapsed.saturating_add(dt);

        if step.elapsed >= step.duration {
            let finished = StepFinished {
                origin: step.origin,
                target: step.target,
            };
            self.position = finished.target;
            self.step = None;
            tracing::trace!(position = ?finished.target, "step finished");
            return Some(finished);
        }

        let progress = (step.elapsed.as_secs_f32() / step.duration.as_secs_f32()).clamp(0.0, 1.0);
        self.position = step.origin.lerp(step.target, progress);
        None
    }

    /// Shifts the motion rigidly, including any step in flight.
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
        if let Some(step) = self.step.as_mut() {
            step.origin += offset;
            step.target += offset;
        }
    }
}

impl Default for TileMotion {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}
