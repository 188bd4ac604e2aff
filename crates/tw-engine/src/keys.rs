//! Arena keys shared by the facade's registries and the renderer.

use slotmap::new_key_type;

new_key_type! {
    /// Dense handle for a track channel.
    pub struct TrackKey;
    /// Dense handle for an effect node.
    pub struct EffectKey;
}
