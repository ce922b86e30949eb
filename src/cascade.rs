use crate::{
    diagnostic::{DiagnosticSink, Severity},
    util::NoteName,
};

use self::{
    clock::TimingClock,
    emitter::echo_pair,
    registry::{NoteRegistry, SLOT_COUNT},
    scale::ScaleDefinition,
};

pub mod clock;
pub mod emitter;
pub mod registry;
pub mod scale;

/// Host timing at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSnapshot {
    pub sample_rate: f64,
    /// Beats per minute.
    pub tempo: f64,
    pub sample_position: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// Reads a 0..1 automation value, anything above the middle goes up.
    pub fn from_normalized(value: f32) -> Self {
        if value > 0.5 {
            Self::Ascending
        } else {
            Self::Descending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStatus {
    NoteOn,
    NoteOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeEvent {
    pub status: NoteStatus,
    /// Not clamped, may fall outside 0..=127.
    pub pitch: i32,
    pub velocity: u8,
    pub channel: u8,
    /// Relative to the transport position passed to [`CascadeEngine::generate`].
    pub delay_samples: i64,
}

/// The echo most recently generated for a held note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Echo {
    pub source: u8,
    pub pitch: i32,
    /// Scale steps away from `source`.
    pub steps: u64,
}

/// Turns held notes into echoes that walk the active scale, one step per eighth note.
///
/// Driven from a single thread: feed it the block's presses and releases, then call
/// [`generate`](Self::generate) once.
pub struct CascadeEngine<S: DiagnosticSink> {
    scale: ScaleDefinition,
    registry: NoteRegistry,
    output: Vec<CascadeEvent>,
    latest_echo: Option<Echo>,
    sink: S,
    transport_degenerate: bool,
}

impl<S: DiagnosticSink> CascadeEngine<S> {
    pub fn new(scale: ScaleDefinition, sink: S) -> Self {
        Self {
            scale,
            registry: NoteRegistry::default(),
            // two events per slot at most, so generate never reallocates
            output: Vec::with_capacity(SLOT_COUNT * 2),
            latest_echo: None,
            sink,
            transport_degenerate: false,
        }
    }

    /// Takes effect on the next echo of every held note.
    pub fn set_scale(&mut self, scale: ScaleDefinition) {
        if scale == self.scale {
            return;
        }
        self.scale = scale;
        self.sink.report(
            Severity::Info,
            format_args!(
                "scale changed, tonic {}",
                NoteName(scale.tonic() as i32 + 60).pitch_class_name()
            ),
        );
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn held_count(&self) -> usize {
        self.registry.held_count()
    }

    /// Last echo of the most recent [`generate`](Self::generate) call, if it made any.
    pub fn latest_echo(&self) -> Option<Echo> {
        self.latest_echo
    }

    pub fn reset(&mut self) {
        let held = self.held_count();
        if held > 0 {
            self.sink.report(
                Severity::Info,
                format_args!("reset, dropping {held} held notes"),
            );
        }
        self.registry.clear();
        self.output.clear();
        self.latest_echo = None;
        self.transport_degenerate = false;
    }

    pub fn on_press(&mut self, pitch: u8, velocity: u8, snapshot: TransportSnapshot) -> bool {
        if !self.registry.press(pitch, velocity, snapshot) {
            self.sink.report(
                Severity::Warning,
                format_args!("ignoring note on for out-of-range note number {pitch}"),
            );
            return false;
        }
        self.sink.report(
            Severity::Trace,
            format_args!(
                "pressed {} at sample {}",
                NoteName(pitch as i32),
                snapshot.sample_position
            ),
        );
        true
    }

    pub fn on_release(&mut self, pitch: u8) -> bool {
        if !self.registry.release(pitch) {
            self.sink.report(
                Severity::Warning,
                format_args!("ignoring note off for out-of-range note number {pitch}"),
            );
            return false;
        }
        self.sink.report(
            Severity::Trace,
            format_args!("released {}", NoteName(pitch as i32)),
        );
        true
    }

    /// Echoes for every held note that entered a new step since the last call, in note order.
    pub fn generate(&mut self, current: &TransportSnapshot, direction: Direction) -> &[CascadeEvent] {
        self.output.clear();
        self.latest_echo = None;

        let Some(clock) = TimingClock::for_transport(current) else {
            if !self.transport_degenerate {
                self.transport_degenerate = true;
                self.sink.report(
                    Severity::Warning,
                    format_args!(
                        "no usable tempo ({} bpm at {} Hz), cascade paused",
                        current.tempo, current.sample_rate
                    ),
                );
            }
            return &self.output;
        };
        if self.transport_degenerate {
            self.transport_degenerate = false;
            self.sink.report(
                Severity::Info,
                format_args!("tempo available again ({} bpm), cascade resumed", current.tempo),
            );
        }

        for (pitch, held) in self.registry.held_mut() {
            let elapsed_steps = clock.elapsed_steps(&held.press, current);
            // the transport jumped back before the press
            if elapsed_steps < 0 {
                continue;
            }
            if !held.advance_to(elapsed_steps) {
                continue;
            }

            // the first echo is already one step away from the pressed note
            let steps = elapsed_steps as u64 + 1;
            let echo = self.scale.step(pitch as i32, steps, direction);
            self.latest_echo = Some(Echo {
                source: pitch,
                pitch: echo,
                steps,
            });
            self.output.extend(echo_pair(
                &held.press,
                current,
                &clock,
                elapsed_steps,
                echo,
                held.velocity,
            ));

            self.sink.report(
                Severity::Trace,
                format_args!(
                    "{} step {} -> {}",
                    NoteName(pitch as i32),
                    elapsed_steps,
                    NoteName(echo)
                ),
            );
        }

        &self.output
    }
}
