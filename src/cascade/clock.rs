use super::TransportSnapshot;

/// Cascade steps are eighth notes.
const STEPS_PER_BEAT: f64 = 2.0;

/// Step timing derived from one transport reading. Built fresh every cycle so tempo changes apply to
/// every held note on its next step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingClock {
    step_duration: f64,
}

impl TimingClock {
    /// `None` when the transport can't give a step length (no tempo, no sample rate).
    pub fn for_transport(transport: &TransportSnapshot) -> Option<Self> {
        let TransportSnapshot {
            sample_rate, tempo, ..
        } = *transport;
        if !(sample_rate.is_finite() && tempo.is_finite()) || sample_rate <= 0.0 || tempo <= 0.0 {
            return None;
        }
        Some(Self {
            step_duration: sample_rate * 60.0 / tempo / STEPS_PER_BEAT,
        })
    }

    /// Samples per cascade step.
    pub fn step_duration(&self) -> f64 {
        self.step_duration
    }

    /// Whole steps between the press and `current`. Negative if `current` lies before the press.
    pub fn elapsed_steps(&self, press: &TransportSnapshot, current: &TransportSnapshot) -> i64 {
        let samples_passed = (current.sample_position - press.sample_position) as f64;
        (samples_passed / self.step_duration).floor() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(tempo: f64, sample_position: i64) -> TransportSnapshot {
        TransportSnapshot {
            sample_rate: 44100.0,
            tempo,
            sample_position,
        }
    }

    #[test]
    fn eighth_note_at_120_bpm() {
        let clock = TimingClock::for_transport(&transport(120.0, 0)).unwrap();
        assert_eq!(clock.step_duration(), 11025.0);
    }

    #[test]
    fn degenerate_transports_have_no_clock() {
        assert!(TimingClock::for_transport(&transport(0.0, 0)).is_none());
        assert!(TimingClock::for_transport(&transport(-90.0, 0)).is_none());
        assert!(TimingClock::for_transport(&transport(f64::NAN, 0)).is_none());
        let no_rate = TransportSnapshot {
            sample_rate: 0.0,
            ..transport(120.0, 0)
        };
        assert!(TimingClock::for_transport(&no_rate).is_none());
    }

    #[test]
    fn elapsed_steps_floor_at_step_boundaries() {
        let press = transport(120.0, 1000);
        let clock = TimingClock::for_transport(&press).unwrap();
        assert_eq!(clock.elapsed_steps(&press, &transport(120.0, 1000)), 0);
        assert_eq!(clock.elapsed_steps(&press, &transport(120.0, 12024)), 0);
        assert_eq!(clock.elapsed_steps(&press, &transport(120.0, 12025)), 1);
        assert_eq!(clock.elapsed_steps(&press, &transport(120.0, 999)), -1);
    }

    #[test]
    fn elapsed_steps_never_decrease_while_the_transport_moves_forward() {
        let press = transport(133.0, 512);
        let clock = TimingClock::for_transport(&press).unwrap();
        let mut last = i64::MIN;
        for position in (512..200_000).step_by(97) {
            let steps = clock.elapsed_steps(&press, &transport(133.0, position));
            assert!(steps >= last);
            last = steps;
        }
    }

    #[test]
    fn current_tempo_sets_the_step_length() {
        let press = transport(120.0, 0);
        let now = transport(60.0, 44100);
        let clock = TimingClock::for_transport(&now).unwrap();
        assert_eq!(clock.step_duration(), 22050.0);
        assert_eq!(clock.elapsed_steps(&press, &now), 2);
    }
}
