//! Dynamic program builder.
//!
//! Boot-time overlay of externally-decoded tables over the built-in program
//! bank. Everything here is best-effort: an unresolved name, a malformed
//! entry, or a full table degrades to the built-in default with a warning.
//! The box never refuses to run because a configuration document is wrong.

use crate::config::{ChannelAliasConfig, PatternsConfig};
use crate::driver::RelayDriver;
use crate::engine::InterceptEngine;
use crate::presets::ProgramBank;
use crate::program::{ChannelSequence, OutputTarget, Program};
use crate::waveform::Sequence;
use crate::{Result, NUM_INPUT_CHANNELS, NUM_OUTPUT_CHANNELS};

/// Relay channel alias table.
///
/// Maps human-readable relay names (as authored on the box) to output
/// channel indices. Defaults to `"Channel 0"` .. `"Channel 7"`.
#[derive(Debug, Clone)]
pub struct ChannelAliases {
    names: [String; NUM_OUTPUT_CHANNELS],
}

impl ChannelAliases {
    /// Creates the default alias table.
    pub fn new() -> Self {
        Self {
            names: std::array::from_fn(|i| format!("Channel {i}")),
        }
    }

    /// Applies a decoded alias table, skipping out-of-range entries.
    pub fn apply(&mut self, config: &ChannelAliasConfig) {
        for (index, alias) in &config.0 {
            match self.names.get_mut(*index) {
                Some(slot) => {
                    tracing::info!(channel = index, alias = alias.as_str(), "channel alias set");
                    *slot = alias.clone();
                }
                None => {
                    tracing::warn!(
                        channel = index,
                        alias = alias.as_str(),
                        "alias for unknown output channel ignored"
                    );
                }
            }
        }
    }

    /// Resolves an alias to an output channel index.
    pub fn resolve(&self, alias: &str) -> Option<usize> {
        self.names.iter().position(|n| n == alias)
    }

    /// The alias of one output channel.
    pub fn name(&self, channel: usize) -> &str {
        &self.names[channel]
    }
}

impl Default for ChannelAliases {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts reported by a completed overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayReport {
    /// Sequences loaded into the dynamic table.
    pub sequences_loaded: usize,
    /// Programs built and loaded into the dynamic table.
    pub programs_built: usize,
    /// Pattern entries skipped over unresolved names.
    pub entries_skipped: usize,
}

/// Overlays decoded sequences and patterns onto the bank.
///
/// Fails only when the bank has already been overlaid (reload without a
/// reset); everything else degrades per-entry with a warning. Sequence names
/// inside patterns resolve against the dynamic table first, then the
/// built-in fallback set.
pub fn overlay(
    bank: &mut ProgramBank,
    aliases: &ChannelAliases,
    config: &PatternsConfig,
) -> Result<OverlayReport> {
    bank.begin_overlay()?;
    let mut report = OverlayReport::default();

    for (name, pairs) in &config.sequences {
        let sequence = Sequence::from_pairs(
            &pairs.iter().map(|s| (s.0, s.1)).collect::<Vec<_>>(),
        );
        let zero_holds = sequence.zero_duration_holds();
        if !zero_holds.is_empty() {
            tracing::warn!(
                sequence = name.as_str(),
                sections = ?zero_holds,
                "zero-duration hold terminates playback early; likely an authoring bug"
            );
        }
        match bank.insert_dynamic_sequence(name.clone(), sequence) {
            Ok(()) => {
                tracing::info!(sequence = name.as_str(), "dynamic sequence loaded");
                report.sequences_loaded += 1;
            }
            Err(e) => {
                tracing::warn!(sequence = name.as_str(), error = %e, "dynamic sequence dropped");
                break;
            }
        }
    }

    for (name, entries) in &config.patterns {
        let mut sequences = Vec::new();
        for entry in entries {
            let Some(channel) = aliases.resolve(&entry.0) else {
                tracing::warn!(
                    pattern = name.as_str(),
                    alias = entry.0.as_str(),
                    "unknown channel alias; entry skipped"
                );
                report.entries_skipped += 1;
                continue;
            };
            let Some(sequence) = bank.sequence_by_name(&entry.2) else {
                tracing::warn!(
                    pattern = name.as_str(),
                    sequence = entry.2.as_str(),
                    "unknown sequence name; entry skipped"
                );
                report.entries_skipped += 1;
                continue;
            };
            sequences.push(ChannelSequence::new(
                OutputTarget::Channel(channel),
                entry.1,
                sequence,
            ));
        }
        if sequences.is_empty() {
            tracing::warn!(pattern = name.as_str(), "no usable entries; pattern dropped");
            continue;
        }
        match bank.insert_dynamic_program(Program::new(name.clone(), sequences)) {
            Ok(()) => {
                tracing::info!(pattern = name.as_str(), "dynamic program built");
                report.programs_built += 1;
            }
            Err(e) => {
                tracing::warn!(pattern = name.as_str(), error = %e, "dynamic program dropped");
                break;
            }
        }
    }

    Ok(report)
}

/// Applies the input-channel-to-program bindings to the engine.
///
/// Program names resolve against the built-ins first, then the dynamic
/// table. Unknown channels and names are reported and skipped.
pub fn apply_bindings<D: RelayDriver>(
    bank: &ProgramBank,
    config: &PatternsConfig,
    engine: &mut InterceptEngine<D>,
) {
    for (key, program_name) in &config.mappings {
        let Ok(channel) = key.parse::<usize>() else {
            tracing::warn!(key = key.as_str(), "binding key is not a channel index");
            continue;
        };
        if channel >= NUM_INPUT_CHANNELS {
            tracing::warn!(channel, "binding for unknown input channel ignored");
            continue;
        }
        match bank.program_by_name(program_name) {
            Some(program) => {
                tracing::info!(
                    channel,
                    program = program_name.as_str(),
                    "input channel bound to program"
                );
                engine.set_program(channel, Some(program));
            }
            None => {
                tracing::warn!(
                    channel,
                    program = program_name.as_str(),
                    "unknown program name; binding ignored"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NoopRelayDriver;

    fn patterns(json: &str) -> PatternsConfig {
        PatternsConfig::from_json(json).unwrap()
    }

    #[test]
    fn aliases_default_and_apply() {
        let mut aliases = ChannelAliases::new();
        assert_eq!(aliases.resolve("Channel 3"), Some(3));

        aliases.apply(&ChannelAliasConfig(vec![
            (3, "North poofer".into()),
            (42, "Nowhere".into()),
        ]));
        assert_eq!(aliases.resolve("North poofer"), Some(3));
        assert_eq!(aliases.resolve("Channel 3"), None);
        assert_eq!(aliases.name(3), "North poofer");
    }

    #[test]
    fn overlay_builds_programs_from_dynamic_and_builtin_sequences() {
        let mut bank = ProgramBank::new();
        let aliases = ChannelAliases::new();
        let config = patterns(
            r#"{
                "sequences": { "blip": [[true, 50], [false, 50]] },
                "patterns": {
                    "Mixed": [
                        ["Channel 2", 0, "blip"],
                        ["Channel 3", 100, "poof"]
                    ]
                }
            }"#,
        );

        let report = overlay(&mut bank, &aliases, &config).unwrap();
        assert_eq!(report.sequences_loaded, 1);
        assert_eq!(report.programs_built, 1);
        assert_eq!(report.entries_skipped, 0);

        let program = bank.program_by_name("Mixed").unwrap();
        assert_eq!(program.sequences().len(), 2);
        assert_eq!(program.total_play_time_ms(), 100 + 700);
    }

    #[test]
    fn unresolved_names_skip_entries_not_patterns() {
        let mut bank = ProgramBank::new();
        let aliases = ChannelAliases::new();
        let config = patterns(
            r#"{
                "patterns": {
                    "Partial": [
                        ["No Such Relay", 0, "poof"],
                        ["Channel 1", 0, "no_such_sequence"],
                        ["Channel 1", 0, "poof"]
                    ]
                }
            }"#,
        );

        let report = overlay(&mut bank, &aliases, &config).unwrap();
        assert_eq!(report.entries_skipped, 2);
        assert_eq!(report.programs_built, 1);
        assert_eq!(bank.program_by_name("Partial").unwrap().sequences().len(), 1);
    }

    #[test]
    fn pattern_with_no_usable_entries_is_dropped() {
        let mut bank = ProgramBank::new();
        let aliases = ChannelAliases::new();
        let config = patterns(
            r#"{ "patterns": { "Empty": [["No Such Relay", 0, "poof"]] } }"#,
        );
        let report = overlay(&mut bank, &aliases, &config).unwrap();
        assert_eq!(report.programs_built, 0);
        assert!(bank.program_by_name("Empty").is_none());
    }

    #[test]
    fn reload_without_reset_is_refused() {
        let mut bank = ProgramBank::new();
        let aliases = ChannelAliases::new();
        let config = patterns("{}");
        overlay(&mut bank, &aliases, &config).unwrap();
        assert!(overlay(&mut bank, &aliases, &config).is_err());
    }

    #[test]
    fn bindings_resolve_builtins_first() {
        let mut bank = ProgramBank::new();
        let aliases = ChannelAliases::new();
        // A dynamic pattern named like a built-in cannot shadow it.
        let config = patterns(
            r#"{
                "patterns": { "Poof": [["Channel 0", 0, "long_poof"]] },
                "pattern_mappings": { "5": "Poof", "9": "Missing", "x": "Poof" }
            }"#,
        );
        overlay(&mut bank, &aliases, &config).unwrap();

        let mut engine = InterceptEngine::new(NoopRelayDriver::new());
        apply_bindings(&bank, &config, &mut engine);

        let assigned = engine.controller(5).program().unwrap();
        assert_eq!(assigned.total_play_time_ms(), 700); // built-in Poof, not the 1200ms dynamic one
        assert!(engine.controller(9).program().is_none());
    }
}
