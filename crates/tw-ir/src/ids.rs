//! Caller-chosen identifiers for tracks and effects, and engine-issued
//! instrument ids.

use alloc::string::String;
use core::borrow::Borrow;
use core::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.into())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Stable track identifier. Never reused within a session once deleted.
    TrackId
}

string_id! {
    /// Stable effect node identifier, unique across every chain.
    EffectId
}

/// Instrument identifier issued by the engine, monotonically increasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(pub u32);

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inst-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn borrow_as_str_for_lookup() {
        let mut map = HashMap::new();
        map.insert(TrackId::from("t1"), 7);
        assert_eq!(map.get("t1"), Some(&7));
    }

    #[test]
    fn display() {
        assert_eq!(EffectId::new("verb").to_string(), "verb");
        assert_eq!(InstrumentId(3).to_string(), "inst-3");
    }
}
