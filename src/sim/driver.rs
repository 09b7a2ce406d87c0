//! Fixed-step driver for hosts with a variable frame rate

use super::state::World;
use super::tick::{TickInput, tick};
use crate::consts::*;

/// Converts wall-clock frame times into whole [`SIM_DT`] ticks.
///
/// One-shot inputs (start, pause, skip) are latched until a tick consumes
/// them, so a press during a frame that runs zero ticks is not lost.
#[derive(Debug, Clone, Default)]
pub struct FixedStepper {
    accumulator: f32,
    pending_start: bool,
    pending_pause: bool,
    pending_skip: bool,
}

impl FixedStepper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run as many ticks as `frame_dt` covers, up to [`MAX_SUBSTEPS`].
    /// Returns the number of ticks run.
    pub fn advance(&mut self, world: &mut World, input: &TickInput, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);
        self.pending_start |= input.start;
        self.pending_pause |= input.pause;
        self.pending_skip |= input.skip_wave;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let step_input = TickInput {
                start: self.pending_start,
                pause: self.pending_pause,
                skip_wave: self.pending_skip,
                ..input.clone()
            };
            tick(world, &step_input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.pending_start = false;
            self.pending_pause = false;
            self.pending_skip = false;
        }

        if self.accumulator >= SIM_DT {
            log::debug!(
                "Dropping {:.3}s of simulation backlog",
                self.accumulator - self.accumulator % SIM_DT
            );
            self.accumulator %= SIM_DT;
        }

        substeps
    }

    /// Fraction of a tick left in the accumulator, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / SIM_DT
    }
}
