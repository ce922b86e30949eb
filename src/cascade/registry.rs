use super::TransportSnapshot;

/// One slot per MIDI note number.
pub const SLOT_COUNT: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteSlot {
    Empty,
    Held(HeldNote),
    /// Released. Inert until the same note number is pressed again.
    Suppressed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeldNote {
    pub velocity: u8,
    pub press: TransportSnapshot,
    /// Elapsed-step count the last echo was generated for.
    pub last_step: Option<i64>,
}

impl HeldNote {
    /// Marks `elapsed_steps` as handled. Returns false when it already was.
    pub fn advance_to(&mut self, elapsed_steps: i64) -> bool {
        if self.last_step == Some(elapsed_steps) {
            return false;
        }
        self.last_step = Some(elapsed_steps);
        true
    }
}

pub struct NoteRegistry {
    slots: [NoteSlot; SLOT_COUNT],
}

impl Default for NoteRegistry {
    fn default() -> Self {
        Self {
            slots: [NoteSlot::Empty; SLOT_COUNT],
        }
    }
}

impl NoteRegistry {
    /// Overwrites whatever the slot held before. False (and no change) for out-of-range pitches.
    pub fn press(&mut self, pitch: u8, velocity: u8, press: TransportSnapshot) -> bool {
        match self.slots.get_mut(pitch as usize) {
            Some(slot) => {
                *slot = NoteSlot::Held(HeldNote {
                    velocity,
                    press,
                    last_step: None,
                });
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self, pitch: u8) -> bool {
        match self.slots.get_mut(pitch as usize) {
            Some(slot) => {
                *slot = NoteSlot::Suppressed;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn slot(&self, pitch: u8) -> Option<&NoteSlot> {
        self.slots.get(pitch as usize)
    }

    /// Held slots in ascending note order.
    pub fn held_mut(&mut self) -> impl Iterator<Item = (u8, &mut HeldNote)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(pitch, slot)| match slot {
                NoteSlot::Held(held) => Some((pitch as u8, held)),
                _ => None,
            })
    }

    pub fn held_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, NoteSlot::Held(_)))
            .count()
    }

    pub fn clear(&mut self) {
        self.slots = [NoteSlot::Empty; SLOT_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(sample_position: i64) -> TransportSnapshot {
        TransportSnapshot {
            sample_rate: 48000.0,
            tempo: 90.0,
            sample_position,
        }
    }

    #[test]
    fn slots_start_empty() {
        let registry = NoteRegistry::default();
        assert_eq!(registry.slot(0), Some(&NoteSlot::Empty));
        assert_eq!(registry.slot(127), Some(&NoteSlot::Empty));
        assert_eq!(registry.held_count(), 0);
    }

    #[test]
    fn press_release_press_cycle() {
        let mut registry = NoteRegistry::default();

        assert!(registry.press(60, 90, at(100)));
        assert!(matches!(registry.slot(60), Some(NoteSlot::Held(held)) if held.velocity == 90));

        assert!(registry.release(60));
        assert_eq!(registry.slot(60), Some(&NoteSlot::Suppressed));
        assert_eq!(registry.held_count(), 0);

        assert!(registry.press(60, 30, at(5000)));
        match registry.slot(60) {
            Some(NoteSlot::Held(held)) => {
                assert_eq!(held.velocity, 30);
                assert_eq!(held.press, at(5000));
                assert_eq!(held.last_step, None);
            }
            other => panic!("expected a held slot, got {other:?}"),
        }
    }

    #[test]
    fn re_press_while_held_resets_the_step_counter() {
        let mut registry = NoteRegistry::default();
        registry.press(64, 100, at(0));
        for (_, held) in registry.held_mut() {
            assert!(held.advance_to(3));
        }

        registry.press(64, 100, at(9000));
        let (_, held) = registry.held_mut().next().unwrap();
        assert_eq!(held.last_step, None);
        assert_eq!(held.press.sample_position, 9000);
    }

    #[test]
    fn out_of_range_pitches_are_rejected() {
        let mut registry = NoteRegistry::default();
        assert!(!registry.press(128, 100, at(0)));
        assert!(!registry.release(200));
        assert_eq!(registry.slot(128), None);
        assert_eq!(registry.held_count(), 0);
    }

    #[test]
    fn advance_only_reports_new_steps() {
        let mut held = HeldNote {
            velocity: 1,
            press: at(0),
            last_step: None,
        };
        assert!(held.advance_to(0));
        assert!(!held.advance_to(0));
        assert!(held.advance_to(1));
        assert!(!held.advance_to(1));
    }

    #[test]
    fn held_notes_come_out_in_note_order() {
        let mut registry = NoteRegistry::default();
        registry.press(72, 1, at(0));
        registry.press(48, 1, at(0));
        registry.press(60, 1, at(0));
        registry.release(60);

        let pitches: Vec<u8> = registry.held_mut().map(|(pitch, _)| pitch).collect();
        assert_eq!(pitches, vec![48, 72]);
    }
}
