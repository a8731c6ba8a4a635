//! Programs: named compositions of waveforms bound to output channels.
//!
//! A [`Program`] wraps one or more [`ChannelSequence`]s on a shared timeline
//! and answers pure time-indexed queries: given a play time, which output
//! channels does the program drive, and to what level. Programs are stateless
//! and immutable; all playback state lives in the per-channel controllers.

use std::sync::Arc;

use crate::waveform::Sequence;
use crate::NUM_OUTPUT_CHANNELS;

/// Where a channel sequence's output lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTarget {
    /// Use the owning controller's default output channel.
    #[default]
    Default,
    /// Assert no output for this sequence, regardless of the default.
    Suppressed,
    /// Drive this explicit output channel, overriding the default.
    Channel(usize),
}

/// One waveform bound onto a program's timeline.
///
/// The sequence starts `start_delay_ms` after playback begins and drives the
/// resolved output channel for its authored play time.
#[derive(Debug, Clone)]
pub struct ChannelSequence {
    target: OutputTarget,
    start_delay_ms: u32,
    sequence: Arc<Sequence>,
}

impl ChannelSequence {
    /// Binds a waveform to an output target with a start offset.
    pub fn new(target: OutputTarget, start_delay_ms: u32, sequence: Arc<Sequence>) -> Self {
        Self {
            target,
            start_delay_ms,
            sequence,
        }
    }

    /// The output target of this sequence.
    pub fn target(&self) -> OutputTarget {
        self.target
    }

    /// Start offset within the program's timeline.
    pub fn start_delay_ms(&self) -> u32 {
        self.start_delay_ms
    }

    /// The shared waveform.
    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.sequence
    }

    /// Authored play time including the start delay.
    pub(crate) fn play_time_ms(&self) -> u32 {
        self.start_delay_ms + self.sequence.play_time_ms()
    }

    /// The level this waveform asserts at `play_time`.
    ///
    /// Walks the sections in order: each playable section whose start has
    /// been reached updates the level; a non-positive duration halts the
    /// walk without altering it. Before the start delay the level is low.
    fn sample(&self, play_time: u32) -> bool {
        let mut elapsed = u64::from(self.start_delay_ms);
        let mut output = false;
        for section in self.sequence.sections() {
            if elapsed > u64::from(play_time) || section.duration_ms <= 0 {
                break;
            }
            output = section.on;
            elapsed += section.duration_ms as u64;
        }
        output
    }

    /// Resolves the output slot, if any, given the controller default.
    fn resolve(&self, default_output: Option<usize>) -> Option<usize> {
        let channel = match self.target {
            OutputTarget::Channel(ch) => Some(ch),
            OutputTarget::Default => default_output,
            OutputTarget::Suppressed => None,
        };
        channel.filter(|&ch| ch < NUM_OUTPUT_CHANNELS)
    }
}

/// Per-output-channel query result.
///
/// `valid == false` means "this program does not drive this channel at this
/// time", which is distinct from driving it low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayState {
    /// Whether the slot is driven at all.
    pub valid: bool,
    /// The driven level; meaningful only when `valid` is set.
    pub pressed: bool,
}

/// One output vector: a play state per relay channel.
pub type PlayStates = [PlayState; NUM_OUTPUT_CHANNELS];

/// Named, immutable composition of channel sequences.
///
/// The total play time is derived once at construction as the maximum
/// authored play time over all sequences, delays included.
#[derive(Debug, Clone)]
pub struct Program {
    name: String,
    sequences: Vec<ChannelSequence>,
    total_play_time_ms: u32,
}

impl Program {
    /// Builds a shared program from its channel sequences.
    pub fn new(name: impl Into<String>, sequences: Vec<ChannelSequence>) -> Arc<Self> {
        let total_play_time_ms = sequences
            .iter()
            .map(ChannelSequence::play_time_ms)
            .max()
            .unwrap_or(0);
        Arc::new(Self {
            name: name.into(),
            sequences,
            total_play_time_ms,
        })
    }

    /// Convenience constructor for a single waveform on the default output.
    pub fn universal(name: impl Into<String>, sequence: Arc<Sequence>) -> Arc<Self> {
        Self::new(
            name,
            vec![ChannelSequence::new(OutputTarget::Default, 0, sequence)],
        )
    }

    /// The program's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound channel sequences, in authored order.
    pub fn sequences(&self) -> &[ChannelSequence] {
        &self.sequences
    }

    /// Total authored play time in milliseconds.
    pub fn total_play_time_ms(&self) -> u32 {
        self.total_play_time_ms
    }

    /// `true` once `play_time` is strictly past the total play time.
    pub fn is_finished(&self, play_time: u32) -> bool {
        play_time > self.total_play_time_ms
    }

    /// Queries the output vector at `play_time`.
    ///
    /// Returns `false` and leaves `states` untouched when `play_time` is past
    /// the end of the program. Otherwise each sequence independently samples
    /// its waveform and writes `{valid: true, pressed}` into its resolved
    /// slot; sequences later in the list overwrite earlier ones on collision.
    pub fn button_states(
        &self,
        play_time: u32,
        states: &mut PlayStates,
        default_output: Option<usize>,
    ) -> bool {
        if play_time > self.total_play_time_ms {
            return false;
        }
        for channel_sequence in &self.sequences {
            let pressed = channel_sequence.sample(play_time);
            if let Some(slot) = channel_sequence.resolve(default_output) {
                states[slot] = PlayState {
                    valid: true,
                    pressed,
                };
            }
        }
        true
    }
}
