use nih_plug::nih_debug_assert_eq;

use super::Direction;

pub const DEGREES: usize = 7;

const SEMITONES_PER_OCTAVE: i32 = 12;

pub const NATURAL_MINOR_INTERVALS: [u8; DEGREES] = [2, 1, 2, 2, 1, 2, 2];
pub const MAJOR_INTERVALS: [u8; DEGREES] = [2, 2, 1, 2, 2, 2, 1];

/// A diatonic scale: the step pattern plus the pitch classes it lands on, starting at the tonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleDefinition {
    intervals: [u8; DEGREES],
    pitch_classes: [u8; DEGREES],
}

impl ScaleDefinition {
    pub fn new(tonic: u8, intervals: [u8; DEGREES]) -> Self {
        nih_debug_assert_eq!(
            intervals.iter().map(|&i| i as i32).sum::<i32>(),
            SEMITONES_PER_OCTAVE
        );

        let mut pitch_classes = [0; DEGREES];
        let mut pitch_class = tonic % 12;
        for (degree, interval) in intervals.iter().enumerate() {
            pitch_classes[degree] = pitch_class;
            pitch_class = (pitch_class + interval) % 12;
        }

        Self {
            intervals,
            pitch_classes,
        }
    }

    pub fn a_minor() -> Self {
        Self::new(9, NATURAL_MINOR_INTERVALS)
    }

    pub fn c_major() -> Self {
        Self::new(0, MAJOR_INTERVALS)
    }

    pub fn tonic(&self) -> u8 {
        self.pitch_classes[0]
    }

    #[cfg(test)]
    pub fn pitch_classes(&self) -> &[u8; DEGREES] {
        &self.pitch_classes
    }

    pub fn degree_of(&self, pitch: i32) -> Option<usize> {
        let pitch_class = pitch.rem_euclid(12) as u8;
        self.pitch_classes.iter().position(|&pc| pc == pitch_class)
    }

    /// Moves an off-scale pitch up a semitone at a time until it lands in the scale.
    /// On-scale pitches come back untouched.
    pub fn round_into_scale(&self, pitch: i32) -> (i32, usize) {
        let mut pitch = pitch;
        // at most 11 increments, the scale always has pitch classes
        loop {
            if let Some(degree) = self.degree_of(pitch) {
                return (pitch, degree);
            }
            pitch = pitch.saturating_add(1);
        }
    }

    /** Walk `steps` scale degrees from `origin` in `direction`, rounding `origin` into the scale first.

    No clamping: the result can leave the MIDI range, callers decide what to do with it. */
    pub fn step(&self, origin: i32, steps: u64, direction: Direction) -> i32 {
        let (mut pitch, mut degree) = self.round_into_scale(origin);

        // Seven steps in either direction always span exactly one octave and end on the same degree.
        let octaves = steps / DEGREES as u64;
        let octave_span = i32::try_from(octaves)
            .unwrap_or(i32::MAX)
            .saturating_mul(SEMITONES_PER_OCTAVE);
        pitch = match direction {
            Direction::Ascending => pitch.saturating_add(octave_span),
            Direction::Descending => pitch.saturating_sub(octave_span),
        };

        for _ in 0..steps % DEGREES as u64 {
            match direction {
                Direction::Ascending => {
                    pitch = pitch.saturating_add(self.intervals[degree] as i32);
                    degree = (degree + 1) % DEGREES;
                }
                Direction::Descending => {
                    // mirrored lookup: the interval below the current degree
                    let interval_index = (degree + 6) % DEGREES;
                    pitch = pitch.saturating_sub(self.intervals[interval_index] as i32);
                    degree = (degree + DEGREES - 1) % DEGREES;
                }
            }
        }

        pitch
    }
}
