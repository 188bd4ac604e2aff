//! Ordered, fixed-capacity list of effect nodes applied to one signal.

use alloc::boxed::Box;

use tw_ir::AudioBuffer;

use crate::keys::EffectKey;
use crate::processor::Effect;

/// Maximum effects per chain.
pub const MAX_CHAIN_LEN: usize = 16;

/// One effect in a chain.
pub struct EffectNode {
    pub key: EffectKey,
    pub processor: Box<dyn Effect>,
    pub enabled: bool,
}

impl EffectNode {
    pub fn new(key: EffectKey, processor: Box<dyn Effect>) -> Self {
        Self { key, processor, enabled: true }
    }
}

/// Signal flows through nodes in list order. Disabled nodes are skipped
/// entirely, so a bypassed node's output is its input, bit for bit.
#[derive(Default)]
pub struct EffectChain {
    nodes: heapless::Vec<EffectNode, MAX_CHAIN_LEN>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn position(&self, key: EffectKey) -> Option<usize> {
        self.nodes.iter().position(|n| n.key == key)
    }

    /// Insert at `index` (clamped to the end). Hands the node back when full.
    pub fn insert(&mut self, index: usize, node: EffectNode) -> Result<(), EffectNode> {
        let index = index.min(self.nodes.len());
        self.nodes.insert(index, node)
    }

    pub fn push(&mut self, node: EffectNode) -> Result<(), EffectNode> {
        self.nodes.push(node)
    }

    pub fn remove(&mut self, key: EffectKey) -> Option<EffectNode> {
        let i = self.position(key)?;
        Some(self.nodes.remove(i))
    }

    /// Move a node to `index` (clamped). Returns false if `key` is absent.
    pub fn move_to(&mut self, key: EffectKey, index: usize) -> bool {
        let Some(from) = self.position(key) else { return false };
        let node = self.nodes.remove(from);
        let index = index.min(self.nodes.len());
        // Capacity was just freed, so this cannot fail.
        let _ = self.nodes.insert(index, node);
        true
    }

    pub fn get_mut(&mut self, key: EffectKey) -> Option<&mut EffectNode> {
        self.nodes.iter_mut().find(|n| n.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = EffectKey> + '_ {
        self.nodes.iter().map(|n| n.key)
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        for node in self.nodes.iter_mut().filter(|n| n.enabled) {
            node.processor.process(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::new_effect;
    use slotmap::SlotMap;
    use tw_ir::EffectKind;

    fn keys(n: usize) -> Vec<EffectKey> {
        let mut sm: SlotMap<EffectKey, ()> = SlotMap::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    fn node(key: EffectKey, kind: EffectKind) -> EffectNode {
        let mut fx = new_effect(kind);
        fx.init(48_000);
        EffectNode::new(key, fx)
    }

    fn noise(frames: u16) -> AudioBuffer {
        let mut buf = AudioBuffer::stereo(frames);
        let mut x = 12345u32;
        for ch in 0..2 {
            for s in buf.channel_mut(ch) {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12345);
                *s = (x >> 16) as f32 / 32768.0 - 1.0;
            }
        }
        buf
    }

    #[test]
    fn disabled_node_is_bit_identical_bypass() {
        let k = keys(1);
        for kind in EffectKind::ALL {
            let mut chain = EffectChain::new();
            assert!(chain.push(node(k[0], kind)).is_ok());
            if let Some(n) = chain.get_mut(k[0]) {
                n.enabled = false;
            }
            let input = noise(256);
            let mut buf = input.clone();
            chain.process(&mut buf);
            assert_eq!(buf, input, "{kind} bypass");
        }
    }

    #[test]
    fn order_is_significant() {
        let k = keys(2);
        let mut a = EffectChain::new();
        let _ = a.push(node(k[0], EffectKind::Distortion));
        let _ = a.push(node(k[1], EffectKind::Filter));
        let mut b = EffectChain::new();
        let _ = b.push(node(k[1], EffectKind::Filter));
        let _ = b.push(node(k[0], EffectKind::Distortion));

        let mut x = noise(256);
        let mut y = noise(256);
        a.process(&mut x);
        b.process(&mut y);
        assert_ne!(x, y);
    }

    #[test]
    fn move_reorders() {
        let k = keys(3);
        let mut chain = EffectChain::new();
        for key in &k {
            let _ = chain.push(node(*key, EffectKind::Distortion));
        }
        assert!(chain.move_to(k[2], 0));
        assert_eq!(chain.keys().collect::<Vec<_>>(), vec![k[2], k[0], k[1]]);
        assert!(chain.move_to(k[2], 99));
        assert_eq!(chain.keys().collect::<Vec<_>>(), vec![k[0], k[1], k[2]]);
    }

    #[test]
    fn capacity_is_enforced() {
        let k = keys(MAX_CHAIN_LEN + 1);
        let mut chain = EffectChain::new();
        for key in &k[..MAX_CHAIN_LEN] {
            assert!(chain.push(node(*key, EffectKind::Distortion)).is_ok());
        }
        assert!(chain.push(node(k[MAX_CHAIN_LEN], EffectKind::Distortion)).is_err());
    }

    #[test]
    fn remove_returns_node() {
        let k = keys(2);
        let mut chain = EffectChain::new();
        let _ = chain.push(node(k[0], EffectKind::Reverb));
        assert!(chain.remove(k[1]).is_none());
        assert_eq!(chain.remove(k[0]).map(|n| n.key), Some(k[0]));
        assert!(chain.is_empty());
    }
}
