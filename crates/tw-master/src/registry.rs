//! Control-side mirror of the mixer graph.
//!
//! Entities live in dense arenas keyed by slotmap keys; caller-facing string
//! ids map onto those keys. The render context only ever sees the keys.

use std::collections::{HashMap, HashSet};

use slotmap::DenseSlotMap;
use tw_engine::{effects, ChainTarget, EffectKey, TrackKey, MAX_CHAIN_LEN};
use tw_ir::{
    AdsrParams, ChannelControls, EffectId, EffectKind, InstrumentId, InstrumentSpec, TrackId,
};

use crate::error::{EngineError, Result};

#[derive(Clone, Debug)]
pub(crate) struct InstrumentEntry {
    pub id: InstrumentId,
    pub spec: InstrumentSpec,
}

#[derive(Clone, Debug)]
pub(crate) struct TrackEntry {
    pub id: TrackId,
    pub name: String,
    pub controls: ChannelControls,
    pub instrument: Option<InstrumentEntry>,
    /// Effect order, mirroring the render-side chain.
    pub chain: Vec<EffectKey>,
}

#[derive(Clone, Debug)]
pub(crate) struct EffectEntry {
    pub id: EffectId,
    pub kind: EffectKind,
    pub target: ChainTarget,
    pub enabled: bool,
    /// Current value of each parameter, indexed by parameter id.
    pub params: Vec<f32>,
}

impl EffectEntry {
    fn new(id: EffectId, kind: EffectKind, target: ChainTarget) -> Self {
        let params = effects::info_for(kind).params.iter().map(|p| p.default).collect();
        Self { id, kind, target, enabled: true, params }
    }
}

/// Snapshot of one track for collaborators.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackInfo {
    pub id: TrackId,
    pub name: String,
    pub controls: ChannelControls,
    pub instrument: Option<InstrumentInfo>,
    /// Effects in signal order.
    pub effects: Vec<EffectId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentInfo {
    pub id: InstrumentId,
    pub spec: InstrumentSpec,
}

/// Snapshot of one effect node.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectSnapshot {
    pub id: EffectId,
    pub kind: EffectKind,
    pub enabled: bool,
    /// Owning track, or `None` on the master bus.
    pub track: Option<TrackId>,
    pub params: Vec<(&'static str, f32)>,
}

#[derive(Default)]
pub(crate) struct Registry {
    tracks: DenseSlotMap<TrackKey, TrackEntry>,
    track_ids: HashMap<TrackId, TrackKey>,
    retired_tracks: HashSet<TrackId>,
    effects: DenseSlotMap<EffectKey, EffectEntry>,
    effect_ids: HashMap<EffectId, EffectKey>,
    retired_effects: HashSet<EffectId>,
    master_chain: Vec<EffectKey>,
    pub master_controls: ChannelControls,
    next_instrument: u32,
}

impl Registry {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // --- Tracks ---

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track_key(&self, id: &str) -> Result<TrackKey> {
        self.track_ids.get(id).copied().ok_or_else(|| EngineError::UnknownTrackId(id.into()))
    }

    pub fn track(&self, key: TrackKey) -> &TrackEntry {
        &self.tracks[key]
    }

    pub fn track_mut(&mut self, key: TrackKey) -> &mut TrackEntry {
        &mut self.tracks[key]
    }

    pub fn track_id(&self, key: TrackKey) -> Option<&TrackId> {
        self.tracks.get(key).map(|t| &t.id)
    }

    /// Ids of live tracks and of tracks deleted earlier are both taken.
    pub fn check_new_track(&self, id: &str) -> Result<()> {
        if self.track_ids.contains_key(id) || self.retired_tracks.contains(id) {
            return Err(EngineError::DuplicateTrackId(id.into()));
        }
        Ok(())
    }

    pub fn insert_track(&mut self, id: TrackId, name: String) -> TrackKey {
        let key = self.tracks.insert(TrackEntry {
            id: id.clone(),
            name,
            controls: ChannelControls::default(),
            instrument: None,
            chain: Vec::new(),
        });
        self.track_ids.insert(id, key);
        key
    }

    /// Remove a track together with every effect in its chain.
    pub fn remove_track(&mut self, key: TrackKey) -> Option<TrackEntry> {
        let entry = self.tracks.remove(key)?;
        self.track_ids.remove(&entry.id);
        self.retired_tracks.insert(entry.id.clone());
        for fx in &entry.chain {
            if let Some(e) = self.effects.remove(*fx) {
                self.effect_ids.remove(&e.id);
                self.retired_effects.insert(e.id);
            }
        }
        Some(entry)
    }

    pub fn any_solo(&self) -> bool {
        self.tracks.values().any(|t| t.controls.solo)
    }

    pub fn next_instrument_id(&mut self) -> InstrumentId {
        self.next_instrument += 1;
        InstrumentId(self.next_instrument)
    }

    pub fn set_instrument(&mut self, key: TrackKey, instrument: Option<InstrumentEntry>) {
        self.tracks[key].instrument = instrument;
    }

    pub fn set_envelope(&mut self, key: TrackKey, envelope: AdsrParams) {
        if let Some(inst) = self.tracks[key].instrument.as_mut() {
            inst.spec.envelope = envelope;
        }
    }

    pub fn track_info(&self, key: TrackKey) -> TrackInfo {
        let t = &self.tracks[key];
        TrackInfo {
            id: t.id.clone(),
            name: t.name.clone(),
            controls: t.controls,
            instrument: t.instrument.as_ref().map(|i| InstrumentInfo { id: i.id, spec: i.spec }),
            effects: t.chain.iter().map(|k| self.effects[*k].id.clone()).collect(),
        }
    }

    pub fn track_infos(&self) -> Vec<TrackInfo> {
        self.tracks.keys().map(|k| self.track_info(k)).collect()
    }

    // --- Effects ---

    pub fn effect_key(&self, id: &str) -> Result<EffectKey> {
        self.effect_ids.get(id).copied().ok_or_else(|| EngineError::UnknownEffectId(id.into()))
    }

    pub fn effect(&self, key: EffectKey) -> &EffectEntry {
        &self.effects[key]
    }

    pub fn effect_mut(&mut self, key: EffectKey) -> &mut EffectEntry {
        &mut self.effects[key]
    }

    pub fn check_new_effect(&self, id: &str) -> Result<()> {
        if self.effect_ids.contains_key(id) || self.retired_effects.contains(id) {
            return Err(EngineError::DuplicateEffectId(id.into()));
        }
        Ok(())
    }

    pub fn chain(&self, target: ChainTarget) -> &[EffectKey] {
        match target {
            ChainTarget::Track(key) => &self.tracks[key].chain,
            ChainTarget::Master => &self.master_chain,
        }
    }

    fn chain_mut(&mut self, target: ChainTarget) -> &mut Vec<EffectKey> {
        match target {
            ChainTarget::Track(key) => &mut self.tracks[key].chain,
            ChainTarget::Master => &mut self.master_chain,
        }
    }

    pub fn check_chain_room(&self, target: ChainTarget) -> Result<()> {
        if self.chain(target).len() >= MAX_CHAIN_LEN {
            return Err(EngineError::CapacityExceeded { what: "effect chain", limit: MAX_CHAIN_LEN });
        }
        Ok(())
    }

    /// Append a new effect to `target`'s chain, returning its key and index.
    pub fn push_effect(&mut self, id: EffectId, kind: EffectKind, target: ChainTarget) -> (EffectKey, usize) {
        let key = self.effects.insert(EffectEntry::new(id.clone(), kind, target));
        self.effect_ids.insert(id, key);
        let chain = self.chain_mut(target);
        chain.push(key);
        (key, chain.len() - 1)
    }

    pub fn remove_effect(&mut self, key: EffectKey) -> Option<EffectEntry> {
        let entry = self.effects.remove(key)?;
        self.effect_ids.remove(&entry.id);
        self.retired_effects.insert(entry.id.clone());
        self.chain_mut(entry.target).retain(|k| *k != key);
        Some(entry)
    }

    /// Move an effect within its chain. `index` must name an existing slot.
    pub fn move_effect(&mut self, key: EffectKey, index: usize) -> Result<()> {
        let target = self.effects[key].target;
        let chain = self.chain_mut(target);
        if index >= chain.len() {
            return Err(EngineError::EffectOutOfRange { index, len: chain.len() });
        }
        if let Some(from) = chain.iter().position(|k| *k == key) {
            let k = chain.remove(from);
            chain.insert(index, k);
        }
        Ok(())
    }

    pub fn effect_snapshot(&self, key: EffectKey) -> EffectSnapshot {
        let e = &self.effects[key];
        let info = effects::info_for(e.kind);
        EffectSnapshot {
            id: e.id.clone(),
            kind: e.kind,
            enabled: e.enabled,
            track: match e.target {
                ChainTarget::Track(t) => self.track_id(t).cloned(),
                ChainTarget::Master => None,
            },
            params: info.params.iter().map(|p| (p.name, e.params[p.id as usize])).collect(),
        }
    }

    pub fn master_effects(&self) -> Vec<EffectId> {
        self.master_chain.iter().map(|k| self.effects[*k].id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_ids_stay_taken() {
        let mut reg = Registry::default();
        let key = reg.insert_track("t1".into(), "Lead".into());
        assert!(matches!(reg.check_new_track("t1"), Err(EngineError::DuplicateTrackId(_))));
        reg.remove_track(key);
        assert!(matches!(reg.track_key("t1"), Err(EngineError::UnknownTrackId(_))));
        assert!(matches!(reg.check_new_track("t1"), Err(EngineError::DuplicateTrackId(_))));
        assert!(reg.check_new_track("t2").is_ok());
    }

    #[test]
    fn removing_a_track_removes_its_effects() {
        let mut reg = Registry::default();
        let t = reg.insert_track("t1".into(), String::new());
        reg.push_effect("fx1".into(), EffectKind::Delay, ChainTarget::Track(t));
        reg.push_effect("fx2".into(), EffectKind::Reverb, ChainTarget::Master);
        reg.remove_track(t);
        assert!(reg.effect_key("fx1").is_err());
        assert!(reg.effect_key("fx2").is_ok());
        assert!(reg.check_new_effect("fx1").is_err());
    }

    #[test]
    fn move_reorders_and_checks_range() {
        let mut reg = Registry::default();
        let t = reg.insert_track("t1".into(), String::new());
        let target = ChainTarget::Track(t);
        let (a, _) = reg.push_effect("a".into(), EffectKind::Filter, target);
        let (b, _) = reg.push_effect("b".into(), EffectKind::Delay, target);
        reg.move_effect(b, 0).unwrap();
        assert_eq!(reg.chain(target), &[b, a]);
        assert!(matches!(reg.move_effect(a, 2), Err(EngineError::EffectOutOfRange { index: 2, len: 2 })));
    }

    #[test]
    fn snapshot_lists_default_params() {
        let mut reg = Registry::default();
        let (k, _) = reg.push_effect("f".into(), EffectKind::Filter, ChainTarget::Master);
        let snap = reg.effect_snapshot(k);
        assert_eq!(snap.track, None);
        assert!(snap.params.contains(&("frequency", 1000.0)));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut reg = Registry::default();
        let t = reg.insert_track("t1".into(), String::new());
        reg.remove_track(t);
        reg.clear();
        assert!(reg.check_new_track("t1").is_ok());
        assert_eq!(reg.track_count(), 0);
    }
}
