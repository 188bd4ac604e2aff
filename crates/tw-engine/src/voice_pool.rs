//! VoicePool: fixed-size voice allocation and lifecycle management.

use alloc::vec::Vec;

use crate::voice::{Voice, VoiceState};

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// Fixed-capacity pool of voices. Slots are allocated once up front so
/// note-on never allocates.
pub struct VoicePool {
    slots: Vec<Option<Voice>>,
}

impl VoicePool {
    /// Create a pool with `polyphony` slots (at least one).
    pub fn new(polyphony: usize) -> Self {
        Self {
            slots: (0..polyphony.max(1)).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Place a voice in a free slot, or steal one when the pool is full.
    ///
    /// Returns the slot and whether a sounding voice was stolen.
    pub fn allocate(&mut self, voice: Voice) -> (VoiceId, bool) {
        if let Some(id) = self.slots.iter().position(|s| s.is_none()) {
            self.slots[id] = Some(voice);
            return (id, false);
        }
        let id = self.find_steal_candidate();
        self.slots[id] = Some(voice);
        (id, true)
    }

    /// Oldest released voice, else the oldest active one.
    fn find_steal_candidate(&self) -> VoiceId {
        let priority = |state: VoiceState| match state {
            VoiceState::Released => 0,
            VoiceState::Active => 1,
        };
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, (priority(v.state), v.age))))
            .min_by_key(|(_, rank)| *rank)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.slots.get(id).and_then(|s| s.as_ref())
    }

    /// Drop every voice immediately.
    pub fn clear(&mut self) {
        self.slots.fill_with(|| None);
    }

    /// Remove voices whose release has completed.
    pub fn reap_finished(&mut self) {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(Voice::is_finished) {
                *slot = None;
            }
        }
    }

    /// Count of occupied slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Sum every voice into the stereo planes, then reap finished ones.
    pub fn render_all(&mut self, left: &mut [f32], right: &mut [f32]) {
        for voice in self.slots.iter_mut().flatten() {
            voice.render(left, right);
        }
        self.reap_finished();
    }
}
