//! Type-safe identifier wrappers.
//!
//! Locations are named by the graph-construction collaborator (district
//! names in real runs, stringified integers for synthetic graphs), so
//! [`LocationId`] wraps a `String`. Agents have no name at all: an agent's
//! identity is its position in the agent store, wrapped in [`AgentIndex`].
//! Runs get a time-ordered UUID v7 so output directories sort by start time.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_uuid_id! {
    /// Unique identifier for one simulation run.
    RunId
}

/// Stable identifier of a location (node in the location graph).
///
/// Ordering is lexicographic on the underlying string. The movement policy
/// relies on this ordering to break desirability ties reproducibly.
///
/// Always serializes as a string. Deserializes from a string or an integer,
/// so graph files that number their nodes load unchanged; `17` becomes
/// `"17"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LocationId(pub String);

/// Wire forms accepted for a [`LocationId`].
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLocationId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl<'de> Deserialize<'de> for LocationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawLocationId::deserialize(deserializer)? {
            RawLocationId::Text(name) => Self(name),
            RawLocationId::Unsigned(n) => Self(n.to_string()),
            RawLocationId::Signed(n) => Self(n.to_string()),
        })
    }
}

impl LocationId {
    /// Create a location identifier from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for LocationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for LocationId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Identity of an agent: its index in the agent store.
///
/// Indices are assigned on append and never reassigned, so kin and friend
/// relations can refer to agents by index across parallel batch merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentIndex(pub usize);

impl AgentIndex {
    /// Return the raw index.
    pub const fn get(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for AgentIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for AgentIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_ids_order_lexicographically() {
        let a = LocationId::from("Adana");
        let b = LocationId::from("Kilis");
        assert!(a < b);
        assert_eq!(a.as_str(), "Adana");
    }

    #[test]
    fn location_id_serializes_as_plain_string() {
        let id = LocationId::from("Kumlu");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"Kumlu\"");
    }

    #[test]
    fn location_id_accepts_integers() {
        let ids: Vec<LocationId> =
            serde_json::from_str(r#"[17, "17", "Kilis", -2]"#).unwrap_or_default();
        assert_eq!(
            ids,
            vec![
                LocationId::from("17"),
                LocationId::from("17"),
                LocationId::from("Kilis"),
                LocationId::from("-2"),
            ]
        );
        assert!(serde_json::from_str::<LocationId>("1.5").is_err());
    }

    #[test]
    fn agent_index_display() {
        assert_eq!(AgentIndex(7).to_string(), "#7");
        assert_eq!(AgentIndex::from(3).get(), 3);
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
