use nih_plug::prelude::NoteEvent;

use crate::{
    cascade::{CascadeEvent, NoteStatus},
    diagnostic::{DiagnosticSink, Severity},
    util::{midi_to_velocity, NoteName},
};

/// Room for queued echoes.
pub const QUEUE_CAPACITY: usize = 1024;
/// Extra room for the incoming events forwarded within one block.
pub const PASS_THROUGH_CAPACITY: usize = 512;

#[derive(Debug)]
enum Payload {
    Echo {
        status: NoteStatus,
        note: u8,
        velocity: u8,
        channel: u8,
    },
    /// Forwarded untouched. Its timing already points into the block it was queued in.
    PassThrough(NoteEvent<()>),
}

#[derive(Debug)]
struct PendingEvent {
    /// Position on the plugin's sample counter.
    due: i64,
    seq: u64,
    payload: Payload,
}

impl PendingEvent {
    fn sort_key(&self) -> (i64, u8, u64) {
        // on a shared sample: echo note-offs, then forwarded input, then echo note-ons
        let rank = match self.payload {
            Payload::Echo {
                status: NoteStatus::NoteOff,
                ..
            } => 0,
            Payload::PassThrough(_) => 1,
            Payload::Echo {
                status: NoteStatus::NoteOn,
                ..
            } => 2,
        };
        (self.due, rank, self.seq)
    }

    fn is_echo(&self, wanted: NoteStatus) -> bool {
        matches!(self.payload, Payload::Echo { status, .. } if status == wanted)
    }

    fn into_note_event(self, block_start: i64) -> NoteEvent<()> {
        let timing = (self.due - block_start).max(0) as u32;
        match self.payload {
            Payload::Echo {
                status: NoteStatus::NoteOn,
                note,
                velocity,
                channel,
            } => NoteEvent::NoteOn {
                timing,
                voice_id: None,
                channel,
                note,
                velocity: midi_to_velocity(velocity),
            },
            Payload::Echo {
                status: NoteStatus::NoteOff,
                note,
                velocity,
                channel,
            } => NoteEvent::NoteOff {
                timing,
                voice_id: None,
                channel,
                note,
                velocity: midi_to_velocity(velocity),
            },
            Payload::PassThrough(event) => event,
        }
    }
}

/// Merges forwarded input with cascade output and holds echoes until the block they fall into.
/// Everything the host sees comes out in time order with an offset inside the current buffer.
///
/// Times are kept on the plugin's own running sample counter rather than the host's transport
/// position, which can jump around when looping.
pub struct EventDispatcher<S: DiagnosticSink> {
    pending: Vec<PendingEvent>,
    next_seq: u64,
    sink: S,
}

impl<S: DiagnosticSink> EventDispatcher<S> {
    pub fn new(sink: S) -> Self {
        Self {
            pending: Vec::with_capacity(QUEUE_CAPACITY + PASS_THROUGH_CAPACITY),
            next_seq: 0,
            sink,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Drops everything except the note-offs of echoes that already went out, which move to
    /// `restart_at` so nothing is left hanging.
    pub fn reset(&mut self, restart_at: i64) {
        // a pair is queued back to back, so the note-on sits right before its note-off by seq
        self.pending.sort_unstable_by_key(|event| event.seq);
        let mut unsent_note_on = None;
        self.pending.retain_mut(|event| {
            let partner_unsent = unsent_note_on.is_some() && unsent_note_on == event.seq.checked_sub(1);
            unsent_note_on = event.is_echo(NoteStatus::NoteOn).then_some(event.seq);

            if event.is_echo(NoteStatus::NoteOff) && !partner_unsent {
                event.due = restart_at;
                true
            } else {
                false
            }
        });
    }

    fn push(&mut self, due: i64, payload: Payload) {
        self.pending.push(PendingEvent {
            due,
            seq: self.next_seq,
            payload,
        });
        self.next_seq += 1;
    }

    /// Queues an incoming event to go out at its own timing in the block starting at `block_start`.
    pub fn pass_through(&mut self, event: NoteEvent<()>, block_start: i64) {
        if self.pending.len() >= QUEUE_CAPACITY + PASS_THROUGH_CAPACITY {
            self.sink.report(
                Severity::Warning,
                format_args!("event queue full, dropping incoming {event:?}"),
            );
            return;
        }
        let due = block_start + event.timing() as i64;
        self.push(due, Payload::PassThrough(event));
    }

    /// Queues `event`, whose delay counts from `reference`. Anything due before `block_start` is
    /// moved up to the block start.
    ///
    /// Pitches MIDI can't carry are dropped, as is everything once the queue is full. A note-on is
    /// only accepted when its note-off still fits.
    pub fn schedule(&mut self, event: &CascadeEvent, reference: i64, block_start: i64) {
        let is_note_on = event.status == NoteStatus::NoteOn;

        let note = match u8::try_from(event.pitch) {
            Ok(note) if note <= 127 => note,
            _ => {
                if is_note_on {
                    self.sink.report(
                        Severity::Warning,
                        format_args!("dropping echo {}, outside the MIDI note range", NoteName(event.pitch)),
                    );
                }
                return;
            }
        };

        let needed = if is_note_on { 2 } else { 1 };
        if self.pending.len() + needed > QUEUE_CAPACITY {
            self.sink.report(
                Severity::Warning,
                format_args!("event queue full, dropping {:?} for {}", event.status, NoteName(event.pitch)),
            );
            return;
        }

        let mut due = reference + event.delay_samples;
        if due < block_start {
            self.sink.report(
                Severity::Warning,
                format_args!(
                    "{:?} for {} was due {} samples before this block, sending it at the block start",
                    event.status,
                    NoteName(event.pitch),
                    block_start - due
                ),
            );
            due = block_start;
        }

        self.push(
            due,
            Payload::Echo {
                status: event.status,
                note,
                velocity: event.velocity,
                channel: event.channel,
            },
        );
    }

    /// Sends everything due inside `block_start..block_start + block_len` in time order and keeps the rest.
    pub fn flush(&mut self, block_start: i64, block_len: usize, mut send: impl FnMut(NoteEvent<()>)) {
        let block_end = block_start + block_len as i64;

        // seq makes the unstable sort deterministic
        self.pending.sort_unstable_by_key(PendingEvent::sort_key);
        let due_count = self.pending.partition_point(|event| event.due < block_end);
        for event in self.pending.drain(..due_count) {
            send(event.into_note_event(block_start));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::testing::RecordingSink;

    fn event(status: NoteStatus, pitch: i32, delay_samples: i64) -> CascadeEvent {
        CascadeEvent {
            status,
            pitch,
            velocity: if status == NoteStatus::NoteOn { 100 } else { 0 },
            channel: 0,
            delay_samples,
        }
    }

    fn flushed(
        dispatcher: &mut EventDispatcher<RecordingSink>,
        block_start: i64,
        block_len: usize,
    ) -> Vec<NoteEvent<()>> {
        let mut out = vec![];
        dispatcher.flush(block_start, block_len, |e| out.push(e));
        out
    }

    #[test]
    fn events_wait_for_their_block() {
        let mut dispatcher = EventDispatcher::new(RecordingSink::default());
        // block 512..1024, delays measured from its end
        dispatcher.schedule(&event(NoteStatus::NoteOn, 72, -100), 1024, 512);
        dispatcher.schedule(&event(NoteStatus::NoteOff, 72, 10925), 1024, 512);

        let out = flushed(&mut dispatcher, 512, 512);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].timing(), 412);
        assert!(matches!(out[0], NoteEvent::NoteOn { note: 72, .. }));
        assert_eq!(dispatcher.len(), 1);

        // note-off due at 11949
        assert!(flushed(&mut dispatcher, 1024, 10_000).is_empty());
        let out = flushed(&mut dispatcher, 11_024, 1024);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].timing(), 925);
        assert!(matches!(out[0], NoteEvent::NoteOff { note: 72, .. }));
        assert_eq!(dispatcher.len(), 0);
        assert_eq!(dispatcher.sink().warnings().count(), 0);
    }

    #[test]
    fn late_events_are_clamped_to_the_block_start() {
        let mut dispatcher = EventDispatcher::new(RecordingSink::default());
        dispatcher.schedule(&event(NoteStatus::NoteOn, 60, -2000), 1024, 512);

        let out = flushed(&mut dispatcher, 512, 512);
        assert_eq!(out[0].timing(), 0);
        assert_eq!(dispatcher.sink().warnings().count(), 1);
    }

    #[test]
    fn pitches_outside_midi_are_dropped_with_their_note_off() {
        let mut dispatcher = EventDispatcher::new(RecordingSink::default());
        dispatcher.schedule(&event(NoteStatus::NoteOn, 131, 0), 0, 0);
        dispatcher.schedule(&event(NoteStatus::NoteOff, 131, 100), 0, 0);
        dispatcher.schedule(&event(NoteStatus::NoteOn, -1, 0), 0, 0);
        dispatcher.schedule(&event(NoteStatus::NoteOff, -1, 100), 0, 0);

        assert_eq!(dispatcher.len(), 0);
        assert_eq!(dispatcher.sink().warnings().count(), 2);
    }

    #[test]
    fn flush_orders_by_time_with_note_offs_first() {
        let mut dispatcher = EventDispatcher::new(RecordingSink::default());
        dispatcher.schedule(&event(NoteStatus::NoteOn, 64, 300), 0, 0);
        dispatcher.schedule(&event(NoteStatus::NoteOn, 62, 100), 0, 0);
        dispatcher.schedule(&event(NoteStatus::NoteOff, 62, 300), 0, 0);

        let out = flushed(&mut dispatcher, 0, 512);
        let order: Vec<(u32, bool)> = out
            .iter()
            .map(|e| (e.timing(), matches!(e, NoteEvent::NoteOn { .. })))
            .collect();
        assert_eq!(order, vec![(100, true), (300, false), (300, true)]);
    }

    #[test]
    fn full_queue_drops_new_pairs() {
        let mut dispatcher = EventDispatcher::new(RecordingSink::default());
        for _ in 0..QUEUE_CAPACITY / 2 {
            dispatcher.schedule(&event(NoteStatus::NoteOn, 60, 10_000), 0, 0);
            dispatcher.schedule(&event(NoteStatus::NoteOff, 60, 20_000), 0, 0);
        }
        assert_eq!(dispatcher.len(), QUEUE_CAPACITY);

        dispatcher.schedule(&event(NoteStatus::NoteOn, 62, 0), 0, 0);
        assert_eq!(dispatcher.len(), QUEUE_CAPACITY);
        assert_eq!(dispatcher.sink().warnings().count(), 1);
    }

    #[test]
    fn reset_keeps_note_offs_of_sounding_echoes() {
        let mut dispatcher = EventDispatcher::new(RecordingSink::default());
        dispatcher.schedule(&event(NoteStatus::NoteOn, 71, -512), 512, 0);
        dispatcher.schedule(&event(NoteStatus::NoteOff, 71, 10513), 512, 0);
        dispatcher.schedule(&event(NoteStatus::NoteOn, 72, 30_000), 512, 0);
        dispatcher.schedule(&event(NoteStatus::NoteOff, 72, 41_025), 512, 0);

        let out = flushed(&mut dispatcher, 0, 512);
        assert!(matches!(out.as_slice(), [NoteEvent::NoteOn { note: 71, .. }]));

        dispatcher.reset(0);
        let out = flushed(&mut dispatcher, 0, 100_000);
        let note_offs: Vec<(u8, u32)> = out
            .iter()
            .filter_map(|e| match e {
                NoteEvent::NoteOff { note, timing, .. } => Some((*note, *timing)),
                _ => None,
            })
            .collect();
        // 72 never sounded, so its note-off goes too
        assert_eq!(note_offs, vec![(71, 0)]);
        assert!(!out.iter().any(|e| matches!(e, NoteEvent::NoteOn { .. })));
        assert_eq!(dispatcher.len(), 0);
    }

    #[test]
    fn forwarded_input_merges_with_echoes_in_time_order() {
        let mut dispatcher = EventDispatcher::new(RecordingSink::default());
        dispatcher.pass_through(
            NoteEvent::NoteOn {
                timing: 400,
                voice_id: None,
                channel: 0,
                note: 69,
                velocity: 1.0,
            },
            1024,
        );
        dispatcher.pass_through(
            NoteEvent::MidiCC {
                timing: 10,
                channel: 0,
                cc: 1,
                value: 0.5,
            },
            1024,
        );
        // echoes at 0 and 400 into the block
        dispatcher.schedule(&event(NoteStatus::NoteOn, 62, -512), 1536, 1024);
        dispatcher.schedule(&event(NoteStatus::NoteOn, 71, -112), 1536, 1024);

        let out = flushed(&mut dispatcher, 1024, 512);
        let timings: Vec<u32> = out.iter().map(|e| e.timing()).collect();
        assert_eq!(timings, vec![0, 10, 400, 400]);
        assert!(timings.windows(2).all(|pair| pair[0] <= pair[1]));
        // the played note goes out before its echo
        assert!(matches!(out[2], NoteEvent::NoteOn { note: 69, .. }));
        assert!(matches!(out[3], NoteEvent::NoteOn { note: 71, .. }));
        assert_eq!(dispatcher.len(), 0);
    }
}
