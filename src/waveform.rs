//! Waveform timing tables.
//!
//! A [`Section`] is one on/off hold of a given duration; a [`Sequence`] is an
//! ordered, sentinel-terminated list of sections describing one channel's
//! waveform. Sequences are authored once, never mutated, and shared by
//! reference (`Arc`) across any number of programs.

use std::sync::Arc;

/// One on/off hold of a given duration within a waveform.
///
/// A section with a non-positive duration is a terminator sentinel rather
/// than a playable hold; by convention sentinels use `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    /// Output level held for the duration of this section.
    pub on: bool,
    /// Hold duration in milliseconds. Non-positive values terminate.
    pub duration_ms: i32,
}

impl Section {
    /// Creates a section.
    pub const fn new(on: bool, duration_ms: i32) -> Self {
        Self { on, duration_ms }
    }

    /// The conventional terminator sentinel.
    pub const fn terminator() -> Self {
        Self {
            on: false,
            duration_ms: -1,
        }
    }

    /// `true` when this section is a playable hold rather than a terminator.
    pub const fn is_playable(&self) -> bool {
        self.duration_ms > 0
    }
}

/// Ordered, sentinel-terminated list of sections; one channel's waveform.
///
/// Construction appends the terminator if the authored table lacks one, so
/// every sequence in the system is well-terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    sections: Vec<Section>,
}

impl Sequence {
    /// Builds a shared sequence from authored sections.
    pub fn new(mut sections: Vec<Section>) -> Arc<Self> {
        let terminated = sections.iter().any(|s| s.duration_ms < 0);
        if !terminated {
            sections.push(Section::terminator());
        }
        Arc::new(Self { sections })
    }

    /// Builds a shared sequence from `(on, duration_ms)` pairs.
    pub fn from_pairs(pairs: &[(bool, i32)]) -> Arc<Self> {
        Self::new(pairs.iter().map(|&(on, d)| Section::new(on, d)).collect())
    }

    /// The ordered sections, terminator included.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Authored play time in milliseconds.
    ///
    /// Sums durations up to the first strictly-negative one. Zero-duration
    /// holds count toward the total even though playback treats them as
    /// terminators; the asymmetry is part of the authored data contract.
    pub fn play_time_ms(&self) -> u32 {
        let mut total: i64 = 0;
        for section in &self.sections {
            if section.duration_ms < 0 {
                break;
            }
            total += i64::from(section.duration_ms);
        }
        total as u32
    }

    /// Indices of zero-duration holds ahead of the terminator.
    ///
    /// These are almost always authoring bugs: the hold counts toward the
    /// play-time total but stops the playback walk early.
    pub fn zero_duration_holds(&self) -> Vec<usize> {
        self.sections
            .iter()
            .take_while(|s| s.duration_ms >= 0)
            .enumerate()
            .filter(|(_, s)| s.duration_ms == 0)
            .map(|(i, _)| i)
            .collect()
    }
}
