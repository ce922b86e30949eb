use std::fmt;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Displays a note number as name + octave, 60 being C4. Works outside the MIDI range too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteName(pub i32);

impl NoteName {
    pub fn pitch_class_name(&self) -> &'static str {
        NOTE_NAMES[self.0.rem_euclid(12) as usize]
    }
    pub fn octave(&self) -> i32 {
        self.0.div_euclid(12) - 1
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class_name(), self.octave())
    }
}

pub fn velocity_to_midi(velocity: f32) -> u8 {
    (velocity.clamp(0.0, 1.0) * 127.0).round() as u8
}

pub fn midi_to_velocity(velocity: u8) -> f32 {
    velocity.min(127) as f32 / 127.0
}
