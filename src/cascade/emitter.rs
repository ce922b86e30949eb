use super::{clock::TimingClock, CascadeEvent, NoteStatus, TransportSnapshot};

/// Note-on/note-off for the echo belonging to step `elapsed_steps` of a held note.
///
/// The note-on lands on that step's boundary, measured from `current`. It's usually zero or negative,
/// since the boundary has normally already been crossed when the step gets detected. The note-off
/// follows one step later.
pub fn echo_pair(
    press: &TransportSnapshot,
    current: &TransportSnapshot,
    clock: &TimingClock,
    elapsed_steps: i64,
    pitch: i32,
    velocity: u8,
) -> [CascadeEvent; 2] {
    let step_duration = clock.step_duration();
    let boundary = press.sample_position as f64 + step_duration * elapsed_steps as f64;
    let delay = (boundary - current.sample_position as f64).floor() as i64;

    [
        CascadeEvent {
            status: NoteStatus::NoteOn,
            pitch,
            velocity,
            channel: 0,
            delay_samples: delay,
        },
        CascadeEvent {
            status: NoteStatus::NoteOff,
            pitch,
            velocity: 0,
            channel: 0,
            delay_samples: delay + step_duration as i64,
        },
    ]
}
