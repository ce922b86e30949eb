use nih_plug::prelude::{NoteEvent, Transport};

use crate::{
    cascade::{scale::ScaleDefinition, CascadeEngine, Direction, Echo, TransportSnapshot},
    diagnostic::DiagnosticSink,
    dispatch::EventDispatcher,
    util::velocity_to_midi,
};

/// What the host reported about the transport for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostTiming {
    pub sample_rate: f32,
    pub tempo: Option<f64>,
    pub pos_samples: Option<i64>,
}

impl HostTiming {
    pub fn from_transport(transport: &Transport) -> Self {
        Self {
            sample_rate: transport.sample_rate,
            tempo: transport.tempo,
            pos_samples: transport.pos_samples(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockState {
    /// Block start on the plugin's own sample counter.
    start: i64,
    len: usize,
    /// Host transport at the block start.
    transport: TransportSnapshot,
}

/// Everything `process` does with MIDI, minus the host.
///
/// Per block: [`begin_block`](Self::begin_block), one [`handle_event`](Self::handle_event) per
/// incoming event, then [`finish_block`](Self::finish_block).
pub struct CascadeProcessor<S: DiagnosticSink> {
    engine: CascadeEngine<S>,
    dispatcher: EventDispatcher<S>,
    /// Samples processed since the last reset. The dispatcher schedules on this, and it stands in
    /// for the host position when the host doesn't report one.
    samples_processed: i64,
    block: BlockState,
}

impl<S: DiagnosticSink> CascadeProcessor<S> {
    pub fn new(scale: ScaleDefinition, engine_sink: S, dispatch_sink: S) -> Self {
        Self {
            engine: CascadeEngine::new(scale, engine_sink),
            dispatcher: EventDispatcher::new(dispatch_sink),
            samples_processed: 0,
            block: BlockState {
                start: 0,
                len: 0,
                transport: TransportSnapshot {
                    sample_rate: 0.0,
                    tempo: 0.0,
                    sample_position: 0,
                },
            },
        }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &CascadeEngine<S> {
        &self.engine
    }

    /// Forgets held notes. Echoes already sent still get their note-off in the next block.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.samples_processed = 0;
        self.dispatcher.reset(self.samples_processed);
    }

    pub fn begin_block(&mut self, host: HostTiming, block_len: usize, scale: ScaleDefinition) {
        self.engine.set_scale(scale);
        self.block = BlockState {
            start: self.samples_processed,
            len: block_len,
            transport: TransportSnapshot {
                sample_rate: host.sample_rate as f64,
                // no tempo means no step length, the engine pauses
                tempo: host.tempo.unwrap_or(0.0),
                sample_position: host.pos_samples.unwrap_or(self.samples_processed),
            },
        };
    }

    /// Feeds note events to the engine and queues every event to be forwarded.
    pub fn handle_event(&mut self, event: NoteEvent<()>) {
        match event {
            NoteEvent::NoteOn {
                timing,
                note,
                velocity,
                ..
            } if velocity_to_midi(velocity) > 0 => {
                let press = TransportSnapshot {
                    sample_position: self.block.transport.sample_position + timing as i64,
                    ..self.block.transport
                };
                self.engine.on_press(note, velocity_to_midi(velocity), press);
            }
            // a zero velocity note on is a release
            NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note, .. } => {
                self.engine.on_release(note);
            }
            _ => (),
        }
        self.dispatcher.pass_through(event, self.block.start);
    }

    /// Generates this block's echoes and sends everything due in it. Returns the last echo
    /// generated, if any.
    pub fn finish_block(
        &mut self,
        direction: Direction,
        send: impl FnMut(NoteEvent<()>),
    ) -> Option<Echo> {
        let BlockState {
            start,
            len,
            transport,
        } = self.block;

        // Generate against the end of the block so steps crossed inside it are found now. Delays
        // then count back from the block end.
        let block_end = TransportSnapshot {
            sample_position: transport.sample_position + len as i64,
            ..transport
        };
        let reference = start + len as i64;

        for event in self.engine.generate(&block_end, direction) {
            self.dispatcher.schedule(event, reference, start);
        }
        self.dispatcher.flush(start, len, send);

        self.samples_processed += len as i64;
        self.engine.latest_echo()
    }
}
