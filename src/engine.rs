//! The tick-driven intercept engine.
//!
//! One [`InterceptEngine`] owns the debouncer, one [`ChannelController`] per
//! input channel, and the output consolidation step. The host polls it once
//! per loop iteration with a raw input snapshot and the current clock
//! reading; the engine debounces, updates every controller against that one
//! clock value, OR-merges the per-channel output vectors, and writes the
//! result through the relay driver, in that order, every tick.

use std::array;
use std::sync::Arc;

use bitflags::bitflags;

use crate::controller::ChannelController;
use crate::debounce::Debouncer;
use crate::driver::RelayDriver;
use crate::program::Program;
use crate::{NUM_INPUT_CHANNELS, NUM_OUTPUT_CHANNELS};

bitflags! {
    /// Raw input port snapshot, one bit per input channel.
    ///
    /// Bit `n` is input channel `n`, already normalized by the hardware
    /// collaborator so that set means pressed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InputSnapshot: u16 {
        /// Input channel 0.
        const CH0 = 1 << 0;
        /// Input channel 1.
        const CH1 = 1 << 1;
        /// Input channel 2.
        const CH2 = 1 << 2;
        /// Input channel 3.
        const CH3 = 1 << 3;
        /// Input channel 4.
        const CH4 = 1 << 4;
        /// Input channel 5.
        const CH5 = 1 << 5;
        /// Input channel 6.
        const CH6 = 1 << 6;
        /// Input channel 7.
        const CH7 = 1 << 7;
        /// Input channel 8.
        const CH8 = 1 << 8;
        /// Input channel 9.
        const CH9 = 1 << 9;
        /// Input channel 10.
        const CH10 = 1 << 10;
        /// Input channel 11.
        const CH11 = 1 << 11;
    }
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl InputSnapshot {
    /// Builds a snapshot from per-channel levels.
    pub fn from_levels(levels: &[bool; NUM_INPUT_CHANNELS]) -> Self {
        let mut bits = 0u16;
        for (channel, &pressed) in levels.iter().enumerate() {
            if pressed {
                bits |= 1 << channel;
            }
        }
        Self::from_bits_retain(bits)
    }

    /// The raw level of one input channel.
    pub fn pressed(self, channel: usize) -> bool {
        channel < NUM_INPUT_CHANNELS && self.bits() & (1 << channel) != 0
    }

    /// Returns a copy with one channel's level replaced.
    pub fn with_channel(self, channel: usize, pressed: bool) -> Self {
        if channel >= NUM_INPUT_CHANNELS {
            return self;
        }
        let mask = 1 << channel;
        let bits = if pressed {
            self.bits() | mask
        } else {
            self.bits() & !mask
        };
        Self::from_bits_retain(bits)
    }
}

/// The per-tick sequencing engine.
///
/// Strictly single-threaded and tick-driven: nothing here blocks or sleeps,
/// and [`set_program`](Self::set_program) must be serialized with
/// [`tick`](Self::tick) by the caller.
pub struct InterceptEngine<D: RelayDriver> {
    driver: D,
    debouncer: Debouncer,
    controllers: [ChannelController; NUM_INPUT_CHANNELS],
    stable_inputs: [bool; NUM_INPUT_CHANNELS],
    consolidated: [bool; NUM_OUTPUT_CHANNELS],
    follower_override: bool,
}

impl<D: RelayDriver> InterceptEngine<D> {
    /// Creates an engine with the default debounce window.
    ///
    /// Controller indices are assigned deterministically from the fixed
    /// channel array; every controller starts in follower mode.
    pub fn new(driver: D) -> Self {
        Self::with_debouncer(driver, Debouncer::new())
    }

    /// Creates an engine with an explicit debouncer.
    pub fn with_debouncer(driver: D, debouncer: Debouncer) -> Self {
        Self {
            driver,
            debouncer,
            controllers: array::from_fn(ChannelController::new),
            stable_inputs: [false; NUM_INPUT_CHANNELS],
            consolidated: [false; NUM_OUTPUT_CHANNELS],
            follower_override: false,
        }
    }

    /// Forces every controller into follower behavior (safety/bring-up mode).
    pub fn set_follower_override(&mut self, on: bool) {
        if on != self.follower_override {
            tracing::info!(on, "follower override changed");
        }
        self.follower_override = on;
    }

    /// Whether the follower override is active.
    pub fn follower_override(&self) -> bool {
        self.follower_override
    }

    /// Assigns a program to one input channel (`None` selects follower mode).
    ///
    /// Returns `false` when the channel index is out of range.
    pub fn set_program(&mut self, channel: usize, program: Option<Arc<Program>>) -> bool {
        let Some(controller) = self.controllers.get_mut(channel) else {
            tracing::warn!(channel, "program assignment to unknown input channel ignored");
            return false;
        };
        controller.set_program(program);
        true
    }

    /// The controller for one input channel.
    pub fn controller(&self, channel: usize) -> &ChannelController {
        &self.controllers[channel]
    }

    /// All controllers, index-aligned with input channels.
    pub fn controllers(&self) -> &[ChannelController] {
        &self.controllers
    }

    /// The debounced input levels from the last tick.
    pub fn stable_inputs(&self) -> &[bool; NUM_INPUT_CHANNELS] {
        &self.stable_inputs
    }

    /// The consolidated output vector from the last tick.
    pub fn consolidated(&self) -> &[bool; NUM_OUTPUT_CHANNELS] {
        &self.consolidated
    }

    /// The relay driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the relay driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// One polling pass.
    ///
    /// `now_ms` is read once by the caller and shared by every stage of this
    /// tick, so no channel observes a newer clock value than another. The
    /// consolidator runs only after every controller has updated. Returns the
    /// consolidated vector, which has also been written to the driver.
    pub fn tick(&mut self, raw: InputSnapshot, now_ms: u32) -> [bool; NUM_OUTPUT_CHANNELS] {
        for channel in 0..NUM_INPUT_CHANNELS {
            let stable = self.debouncer.debounce(channel, raw.pressed(channel), now_ms);
            if stable != self.stable_inputs[channel] {
                tracing::debug!(channel, pressed = stable, now_ms, "button state change");
            }
            self.stable_inputs[channel] = stable;
        }

        for (channel, controller) in self.controllers.iter_mut().enumerate() {
            controller.update(self.stable_inputs[channel], now_ms, self.follower_override);
        }

        let mut outputs = [false; NUM_OUTPUT_CHANNELS];
        for controller in &self.controllers {
            for (merged, play) in outputs.iter_mut().zip(controller.play_states()) {
                if play.valid && play.pressed {
                    *merged = true;
                }
            }
        }

        for (index, (new, old)) in outputs.iter().zip(self.consolidated.iter()).enumerate() {
            if new != old {
                tracing::debug!(output = index, on = *new, now_ms, "output toggle");
            }
        }
        self.consolidated = outputs;
        self.driver.drive(&outputs);
        outputs
    }
}
