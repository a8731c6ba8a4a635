//! Built-in waveforms and programs.
//!
//! The effect library compiled into every control box. A [`ProgramBank`]
//! holds the built-in programs, the 8-position selector table (position 0
//! selects follower mode), and the bounded tables that dynamically-built
//! sequences and programs are overlaid into at boot.

use std::sync::Arc;

use crate::program::{ChannelSequence, OutputTarget, Program};
use crate::waveform::Sequence;
use crate::{InterceptError, Result, NUM_OUTPUT_CHANNELS};

/// Number of positions on the per-channel program selector (3-bit).
pub const NUM_SELECTOR_POSITIONS: usize = 8;

/// Maximum number of dynamically-loaded sequences.
pub const MAX_DYNAMIC_SEQUENCES: usize = 16;

/// Maximum number of dynamically-built programs.
pub const MAX_DYNAMIC_PROGRAMS: usize = 16;

/// The program bank: built-in effects plus the dynamic overlay tables.
pub struct ProgramBank {
    builtin_sequences: Vec<(&'static str, Arc<Sequence>)>,
    builtin_programs: Vec<Arc<Program>>,
    selector: [Option<Arc<Program>>; NUM_SELECTOR_POSITIONS],
    dynamic_sequences: Vec<(String, Arc<Sequence>)>,
    dynamic_programs: Vec<Arc<Program>>,
    overlaid: bool,
}

impl ProgramBank {
    /// Builds the bank with the authored built-in library.
    pub fn new() -> Self {
        // Waveforms. Two longs followed by five shorts for the bird call;
        // two shorts for the chirp; single bursts for the poofs.
        let bird_call = Sequence::from_pairs(&[
            (true, 500),
            (false, 300),
            (true, 500),
            (false, 200),
            (true, 100),
            (false, 200),
            (true, 100),
            (false, 200),
            (true, 100),
            (false, 200),
            (true, 100),
            (false, 200),
            (true, 100),
            (false, 500),
        ]);
        let chirp_chirp = Sequence::from_pairs(&[(true, 75), (false, 200), (true, 75), (false, 200)]);
        let poof = Sequence::from_pairs(&[(true, 500), (false, 200)]);
        let long_poof = Sequence::from_pairs(&[(true, 1000), (false, 200)]);

        let builtin_sequences = vec![
            ("jdv_bird", bird_call.clone()),
            ("chirp_chirp", chirp_chirp.clone()),
            ("poof", poof.clone()),
            ("long_poof", long_poof.clone()),
            // Aliases used by older configuration documents.
            ("quick_burst", chirp_chirp.clone()),
            ("slow_flame", long_poof.clone()),
        ];

        let jdv_bird = Program::universal("JDVBird", bird_call.clone());
        let chirp = Program::universal("ChirpChirp", chirp_chirp.clone());
        let poof_program = Program::universal("Poof", poof.clone());
        let long_poof_program = Program::universal("LongPoof", long_poof);

        // Bird call on output 4, chirp on output 5 a beat later.
        let this_and_that = Program::new(
            "ThisAndThat",
            vec![
                ChannelSequence::new(OutputTarget::Channel(4), 0, bird_call.clone()),
                ChannelSequence::new(OutputTarget::Channel(5), 100, chirp_chirp.clone()),
            ],
        );
        // Bird call on output 4 plus a chirp on the pressed channel's output.
        let std_and_other = Program::new(
            "StdAndOther",
            vec![
                ChannelSequence::new(OutputTarget::Channel(4), 0, bird_call),
                ChannelSequence::new(OutputTarget::Default, 0, chirp_chirp),
            ],
        );
        // A poof walking across every output at half-second steps.
        let chase = Program::new(
            "Chase",
            (0..NUM_OUTPUT_CHANNELS)
                .map(|ch| ChannelSequence::new(OutputTarget::Channel(ch), ch as u32 * 500, poof.clone()))
                .collect(),
        );
        // Every output at once.
        let all_poof = Program::new(
            "AllPoof",
            (0..NUM_OUTPUT_CHANNELS)
                .map(|ch| ChannelSequence::new(OutputTarget::Channel(ch), 0, poof.clone()))
                .collect(),
        );

        let selector = [
            None, // position 0: follower mode
            Some(jdv_bird.clone()),
            Some(chirp.clone()),
            Some(chase.clone()),
            Some(all_poof.clone()),
            Some(long_poof_program.clone()),
            Some(poof_program.clone()),
            Some(std_and_other.clone()),
        ];

        let builtin_programs = vec![
            jdv_bird,
            chirp,
            poof_program,
            long_poof_program,
            this_and_that,
            std_and_other,
            chase,
            all_poof,
        ];

        Self {
            builtin_sequences,
            builtin_programs,
            selector,
            dynamic_sequences: Vec::new(),
            dynamic_programs: Vec::new(),
            overlaid: false,
        }
    }

    /// The built-in programs, in authored order.
    pub fn builtin_programs(&self) -> &[Arc<Program>] {
        &self.builtin_programs
    }

    /// The dynamically-built programs, in load order.
    pub fn dynamic_programs(&self) -> &[Arc<Program>] {
        &self.dynamic_programs
    }

    /// The program behind a selector position. Position 0 and out-of-range
    /// positions select follower mode (`None`).
    pub fn by_selector(&self, position: u8) -> Option<Arc<Program>> {
        self.selector
            .get(position as usize)
            .and_then(Clone::clone)
    }

    /// Looks up a sequence by name: dynamic definitions first, then the
    /// built-in fallback set.
    pub fn sequence_by_name(&self, name: &str) -> Option<Arc<Sequence>> {
        self.dynamic_sequences
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.clone())
            .or_else(|| {
                self.builtin_sequences
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, s)| s.clone())
            })
    }

    /// Looks up a program by name: built-ins first, then dynamic ones.
    pub fn program_by_name(&self, name: &str) -> Option<Arc<Program>> {
        self.builtin_programs
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .or_else(|| {
                self.dynamic_programs
                    .iter()
                    .find(|p| p.name() == name)
                    .cloned()
            })
    }

    /// Whether a dynamic overlay has already been applied.
    pub fn is_overlaid(&self) -> bool {
        self.overlaid
    }

    /// Marks the start of the one allowed overlay phase.
    ///
    /// The dynamic tables are filled once at startup; a second overlay is
    /// refused until [`reset_dynamic`](Self::reset_dynamic) is called.
    pub fn begin_overlay(&mut self) -> Result<()> {
        if self.overlaid {
            return Err(InterceptError::ConfigError(
                "dynamic tables already loaded; reset before reloading".into(),
            ));
        }
        self.overlaid = true;
        Ok(())
    }

    /// Drops all dynamically-loaded tables and allows a fresh overlay.
    pub fn reset_dynamic(&mut self) {
        self.dynamic_sequences.clear();
        self.dynamic_programs.clear();
        self.overlaid = false;
    }

    /// Registers a dynamically-loaded sequence, up to the table limit.
    pub fn insert_dynamic_sequence(&mut self, name: String, sequence: Arc<Sequence>) -> Result<()> {
        if self.dynamic_sequences.len() >= MAX_DYNAMIC_SEQUENCES {
            return Err(InterceptError::TableFull("dynamic sequences"));
        }
        self.dynamic_sequences.push((name, sequence));
        Ok(())
    }

    /// Registers a dynamically-built program, up to the table limit.
    pub fn insert_dynamic_program(&mut self, program: Arc<Program>) -> Result<()> {
        if self.dynamic_programs.len() >= MAX_DYNAMIC_PROGRAMS {
            return Err(InterceptError::TableFull("dynamic programs"));
        }
        self.dynamic_programs.push(program);
        Ok(())
    }
}

impl Default for ProgramBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_zero_is_follower() {
        let bank = ProgramBank::new();
        assert!(bank.by_selector(0).is_none());
        assert!(bank.by_selector(8).is_none());
    }

    #[test]
    fn selector_table_matches_names() {
        let bank = ProgramBank::new();
        let names: Vec<_> = (1..8)
            .map(|i| bank.by_selector(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            ["JDVBird", "ChirpChirp", "Chase", "AllPoof", "LongPoof", "Poof", "StdAndOther"]
        );
    }

    #[test]
    fn chase_walks_all_outputs() {
        let bank = ProgramBank::new();
        let chase = bank.program_by_name("Chase").unwrap();
        assert_eq!(chase.sequences().len(), NUM_OUTPUT_CHANNELS);
        assert_eq!(chase.total_play_time_ms(), 3500 + 700);
    }

    #[test]
    fn sequence_aliases_resolve() {
        let bank = ProgramBank::new();
        assert!(Arc::ptr_eq(
            &bank.sequence_by_name("quick_burst").unwrap(),
            &bank.sequence_by_name("chirp_chirp").unwrap()
        ));
        assert!(bank.sequence_by_name("nope").is_none());
    }

    #[test]
    fn dynamic_sequence_shadows_builtin() {
        let mut bank = ProgramBank::new();
        let custom = Sequence::from_pairs(&[(true, 1)]);
        bank.insert_dynamic_sequence("poof".into(), custom.clone())
            .unwrap();
        assert!(Arc::ptr_eq(&bank.sequence_by_name("poof").unwrap(), &custom));
    }

    #[test]
    fn builtin_program_shadows_dynamic() {
        let mut bank = ProgramBank::new();
        let builtin = bank.program_by_name("Poof").unwrap();
        let custom = Program::universal("Poof", Sequence::from_pairs(&[(true, 1)]));
        bank.insert_dynamic_program(custom).unwrap();
        assert!(Arc::ptr_eq(&bank.program_by_name("Poof").unwrap(), &builtin));
    }

    #[test]
    fn dynamic_tables_are_bounded() {
        let mut bank = ProgramBank::new();
        for i in 0..MAX_DYNAMIC_SEQUENCES {
            bank.insert_dynamic_sequence(format!("seq{i}"), Sequence::from_pairs(&[(true, 1)]))
                .unwrap();
        }
        assert!(bank
            .insert_dynamic_sequence("overflow".into(), Sequence::from_pairs(&[(true, 1)]))
            .is_err());
    }

    #[test]
    fn overlay_phase_is_single_shot() {
        let mut bank = ProgramBank::new();
        bank.begin_overlay().unwrap();
        assert!(bank.begin_overlay().is_err());
        bank.reset_dynamic();
        assert!(bank.begin_overlay().is_ok());
    }
}
