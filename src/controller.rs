//! Per-input-channel control state machine.
//!
//! A [`ChannelController`] takes the debounced state of one input channel and
//! decides what it means for the outputs: either transparently following the
//! button on the channel's default output (follower mode), or running an
//! assigned [`Program`] across one or more output channels. Reassignment
//! during playback is deferred until the active program completes.

use std::sync::Arc;

use crate::program::{PlayState, PlayStates, Program};
use crate::NUM_OUTPUT_CHANNELS;

/// Playback state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Armed: a press starts playback.
    WaitForPress,
    /// Disarmed until a release is observed.
    WaitForUnpress,
    /// A program is playing.
    Playback,
}

/// How the controller interprets its input.
///
/// Kept as a tagged variant: the two modes share no behavior worth
/// abstracting behind a trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    /// Output mirrors the input directly.
    Follower,
    /// A press triggers the assigned program.
    Program,
}

/// State machine for one input channel.
pub struct ChannelController {
    input_channel: usize,
    default_output: Option<usize>,
    program: Option<Arc<Program>>,
    next_program: Option<Arc<Program>>,
    mode: ControllerMode,
    state: ControllerState,
    playback_start_ms: u32,
    outputs: PlayStates,
}

impl ChannelController {
    /// Creates the controller for `input_channel`.
    ///
    /// The default output channel is the input index when it is in range,
    /// otherwise the controller produces no follower output. The boot state
    /// is [`ControllerState::WaitForUnpress`]: a release must be observed
    /// before the controller arms, so an indeterminate boot-time line level
    /// cannot trigger playback.
    pub fn new(input_channel: usize) -> Self {
        Self {
            input_channel,
            default_output: (input_channel < NUM_OUTPUT_CHANNELS).then_some(input_channel),
            program: None,
            next_program: None,
            mode: ControllerMode::Follower,
            state: ControllerState::WaitForUnpress,
            playback_start_ms: 0,
            outputs: PlayStates::default(),
        }
    }

    /// The input channel this controller owns.
    pub fn input_channel(&self) -> usize {
        self.input_channel
    }

    /// The default output channel, `None` when suppressed.
    pub fn default_output(&self) -> Option<usize> {
        self.default_output
    }

    /// The current mode.
    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    /// The current state machine state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The assigned program, if any.
    pub fn program(&self) -> Option<&Arc<Program>> {
        self.program.as_ref()
    }

    /// The queued program swap, if any.
    pub fn queued_program(&self) -> Option<&Arc<Program>> {
        self.next_program.as_ref()
    }

    /// This tick's output vector.
    pub fn play_states(&self) -> &PlayStates {
        &self.outputs
    }

    fn is_current_assignment(&self, program: &Option<Arc<Program>>) -> bool {
        match (&self.program, program) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        }
    }

    /// Assigns a program (`None` selects follower mode).
    ///
    /// A no-op when `program` is the current assignment. During playback the
    /// change is queued and takes effect once the active program reports
    /// finished; a later call overwrites the queued value (last write wins).
    /// Outside playback the assignment applies immediately and the state
    /// machine re-arms via [`ControllerState::WaitForPress`].
    pub fn set_program(&mut self, program: Option<Arc<Program>>) {
        if self.is_current_assignment(&program) {
            return;
        }
        let label = program_label(&program);
        if self.state == ControllerState::Playback {
            tracing::info!(
                channel = self.input_channel,
                program = label,
                "program change queued until playback completes"
            );
            self.next_program = program;
        } else {
            tracing::info!(channel = self.input_channel, program = label, "program assigned");
            self.mode = if program.is_some() {
                ControllerMode::Program
            } else {
                ControllerMode::Follower
            };
            self.program = program;
            self.next_program = None;
            self.state = ControllerState::WaitForPress;
            self.outputs = PlayStates::default();
        }
    }

    /// Advances the controller by one tick.
    ///
    /// `force_follower` is the engine-wide override: it bypasses the state
    /// machine entirely, regardless of any assignment.
    pub fn update(&mut self, pressed: bool, now_ms: u32, force_follower: bool) {
        if force_follower || self.mode == ControllerMode::Follower {
            self.outputs = PlayStates::default();
            if let Some(slot) = self.default_output {
                self.outputs[slot] = PlayState {
                    valid: true,
                    pressed,
                };
            }
            return;
        }

        match self.state {
            ControllerState::WaitForPress => {
                if pressed {
                    tracing::debug!(
                        channel = self.input_channel,
                        now_ms,
                        "press observed, starting playback"
                    );
                    self.state = ControllerState::Playback;
                    self.playback_start_ms = now_ms;
                }
            }
            ControllerState::WaitForUnpress => {
                if !pressed {
                    self.state = ControllerState::WaitForPress;
                }
            }
            ControllerState::Playback => {
                let Some(program) = self.program.as_ref() else {
                    // Unreachable through the public API; fail safe.
                    self.mode = ControllerMode::Follower;
                    self.state = ControllerState::WaitForUnpress;
                    return;
                };
                let playhead = now_ms.saturating_sub(self.playback_start_ms);
                if program.is_finished(playhead) {
                    tracing::debug!(
                        channel = self.input_channel,
                        program = program.name(),
                        now_ms,
                        "playback finished"
                    );
                    self.state = ControllerState::WaitForUnpress;
                    // A finished program must not keep driving relays.
                    self.outputs = PlayStates::default();
                    if let Some(next) = self.next_program.take() {
                        tracing::info!(
                            channel = self.input_channel,
                            program = next.name(),
                            "queued program now active"
                        );
                        self.program = Some(next);
                    }
                } else {
                    self.outputs = PlayStates::default();
                    program.button_states(playhead, &mut self.outputs, self.default_output);
                }
            }
        }
    }
}

fn program_label(program: &Option<Arc<Program>>) -> &str {
    program.as_ref().map_or(":follower", |p| p.name())
}
