//! Scripted raw-input source.
//!
//! Replays a [`Program`] as synthetic button levels so the engine can be
//! driven without hardware: the program's waveform *is* the raw line level,
//! bounce and all. The authored scripts cover the interesting input shapes:
//! presses short enough to debounce away, releases that bounce, a long hold,
//! and a re-press after playback.

use std::sync::Arc;

use crate::engine::InputSnapshot;
use crate::program::{PlayStates, Program};
use crate::{NUM_INPUT_CHANNELS, NUM_OUTPUT_CHANNELS};

/// Replays a program as raw input levels.
#[derive(Debug, Clone)]
pub struct InputScript {
    program: Arc<Program>,
    start_ms: Option<u32>,
}

impl InputScript {
    /// Wraps a program as an input script.
    pub fn new(program: Arc<Program>) -> Self {
        Self {
            program,
            start_ms: None,
        }
    }

    /// Starts the script at `now_ms`.
    pub fn start(&mut self, now_ms: u32) {
        self.start_ms = Some(now_ms);
    }

    /// Stops the script; all levels read low afterwards.
    pub fn stop(&mut self) {
        self.start_ms = None;
    }

    /// Whether the script is running.
    pub fn is_running(&self) -> bool {
        self.start_ms.is_some()
    }

    /// The scripted program's total play time.
    pub fn play_time_ms(&self) -> u32 {
        self.program.total_play_time_ms()
    }

    /// The raw level of `channel` at `now_ms`.
    ///
    /// Low before the script starts and after it ends. The queried channel is
    /// used as the program's default output, so a single universal waveform
    /// scripts whichever channel is asked for.
    pub fn level(&self, channel: usize, now_ms: u32) -> bool {
        let Some(start) = self.start_ms else {
            return false;
        };
        if now_ms < start || channel >= NUM_OUTPUT_CHANNELS {
            return false;
        }
        let mut states = PlayStates::default();
        if !self.program.button_states(now_ms - start, &mut states, Some(channel)) {
            return false;
        }
        states[channel].valid && states[channel].pressed
    }

    /// A full raw input snapshot at `now_ms`, scripting `channel` only.
    pub fn snapshot(&self, channel: usize, now_ms: u32) -> InputSnapshot {
        InputSnapshot::default().with_channel(channel, self.level(channel, now_ms))
    }

    /// A snapshot scripting every pairable input channel at once.
    pub fn snapshot_all(&self, now_ms: u32) -> InputSnapshot {
        let mut levels = [false; NUM_INPUT_CHANNELS];
        for (channel, level) in levels.iter_mut().enumerate() {
            *level = self.level(channel, now_ms);
        }
        InputSnapshot::from_levels(&levels)
    }
}

/// A press that bounces on its way in, then holds: the debouncer should
/// report a single clean press.
pub fn debounce_on() -> Arc<Program> {
    Program::universal(
        "DebounceOn",
        crate::waveform::Sequence::from_pairs(&[
            (true, 40),
            (false, 60),
            (true, 80),
            (false, 20),
            (true, 150),
        ]),
    )
}

/// A press that bounces on its way out: the debouncer should report a single
/// clean release.
pub fn debounce_off() -> Arc<Program> {
    Program::universal(
        "DebounceOff",
        crate::waveform::Sequence::from_pairs(&[
            (true, 200),
            (false, 60),
            (true, 80),
            (false, 20),
            (true, 80),
            (false, 200),
        ]),
    )
}

/// A seven-second hold.
pub fn long_press() -> Arc<Program> {
    Program::universal(
        "LongPress",
        crate::waveform::Sequence::from_pairs(&[(true, 7000)]),
    )
}

/// Two clean presses separated by a release.
pub fn new_press() -> Arc<Program> {
    Program::universal(
        "NewPress",
        crate::waveform::Sequence::from_pairs(&[(true, 500), (false, 200), (true, 500)]),
    )
}

/// Looks up an authored script by its kebab-case name.
pub fn by_name(name: &str) -> Option<Arc<Program>> {
    match name {
        "debounce-on" => Some(debounce_on()),
        "debounce-off" => Some(debounce_off()),
        "long-press" => Some(long_press()),
        "new-press" => Some(new_press()),
        _ => None,
    }
}
