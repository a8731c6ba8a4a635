//! Button intercept relay sequencing engine.
//!
//! A deterministic, tick-driven interpreter that translates noisy physical
//! button inputs into timed patterns of relay activations for a themed-
//! effects control box. Each input channel either mirrors its button
//! directly (follower mode) or triggers a pre-authored timed waveform, a
//! [`Program`], that drives one or more output channels with temporal
//! offsets, independently of the input's own output index.
//!
//! # Architecture
//! - [`waveform`]: immutable on/off timing tables ([`Section`], [`Sequence`])
//! - [`program`]: time-indexed, stateless waveform compositions
//! - [`debounce`]: per-input hysteresis filtering of raw reads
//! - [`controller`]: per-input state machine (follower vs. playback, with
//!   deferred program swaps)
//! - [`engine`]: the per-tick update loop and output consolidation
//! - [`driver`]: the relay output seam toward the hardware collaborators
//! - [`presets`]: the built-in effect library and selector bank
//! - [`config`]/[`builder`] (feature `dynamic-config`): decoded dynamic
//!   tables and their boot-time overlay
//! - [`script`] (feature `simulator`): scripted raw input for hosts without
//!   hardware
//!
//! # Crate feature flags
//! - `dynamic-config` (default): decoded configuration tables and the
//!   program overlay (enables `serde`/`serde_json`)
//! - `simulator` (default): the scripted raw-input source
//!
//! # Quick start
//! ```
//! use button_intercept::{InputSnapshot, InterceptEngine, NoopRelayDriver, ProgramBank};
//!
//! let bank = ProgramBank::new();
//! let mut engine = InterceptEngine::new(NoopRelayDriver::new());
//! engine.set_program(1, bank.by_selector(6)); // button 1 fires a poof
//!
//! // Host polling loop: one snapshot and one clock read per tick.
//! let outputs = engine.tick(InputSnapshot::CH1, 0);
//! assert_eq!(outputs, [false; 8]);
//! ```

#![warn(missing_docs)]

pub mod controller;
pub mod debounce;
pub mod driver;
pub mod engine;
pub mod presets;
pub mod program;
pub mod waveform;

#[cfg(feature = "dynamic-config")]
pub mod builder;
#[cfg(feature = "dynamic-config")]
pub mod config;
#[cfg(feature = "simulator")]
pub mod script;

/// Number of physical button input channels.
pub const NUM_INPUT_CHANNELS: usize = 12;

/// Number of relay output channels.
pub const NUM_OUTPUT_CHANNELS: usize = 8;

/// Error types for intercept engine operations.
#[derive(thiserror::Error, Debug)]
pub enum InterceptError {
    /// Invalid or undecodable configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A bounded dynamic table is full.
    #[error("Dynamic table full: {0}")]
    TableFull(&'static str),

    /// IO error from the filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl From<String> for InterceptError {
    /// Converts a String into `InterceptError::Other`.
    ///
    /// Convenience for generic string errors; prefer the specific variant
    /// constructors where the failure class is known.
    fn from(msg: String) -> Self {
        InterceptError::Other(msg)
    }
}

impl From<&str> for InterceptError {
    /// Converts a string slice into `InterceptError::Other`.
    fn from(msg: &str) -> Self {
        InterceptError::Other(msg.to_string())
    }
}

/// Result type for intercept engine operations.
pub type Result<T> = std::result::Result<T, InterceptError>;

// Public API exports
pub use controller::{ChannelController, ControllerMode, ControllerState};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_WINDOW_MS};
pub use driver::{NoopRelayDriver, RecordingRelayDriver, RelayDriver};
pub use engine::{InputSnapshot, InterceptEngine};
pub use presets::{ProgramBank, NUM_SELECTOR_POSITIONS};
pub use program::{ChannelSequence, OutputTarget, PlayState, PlayStates, Program};
pub use waveform::{Section, Sequence};

#[cfg(feature = "dynamic-config")]
pub use builder::{apply_bindings, overlay, ChannelAliases, OverlayReport};
#[cfg(feature = "dynamic-config")]
pub use config::{ChannelAliasConfig, PatternsConfig};
#[cfg(feature = "simulator")]
pub use script::InputScript;
