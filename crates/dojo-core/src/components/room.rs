//! Room components: Room, RoomKind

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DojoError;

/// Maximum occupancy of an office
pub const OFFICE_CAPACITY: usize = 6;
/// Maximum occupancy of a living space
pub const LIVING_SPACE_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Office,
    LivingSpace,
}

impl RoomKind {
    /// Fixed capacity for every room of this kind
    pub fn capacity(self) -> usize {
        match self {
            RoomKind::Office => OFFICE_CAPACITY,
            RoomKind::LivingSpace => LIVING_SPACE_CAPACITY,
        }
    }

    /// Discriminator stored in the `rooms.kind` column
    pub fn as_str(self) -> &'static str {
        match self {
            RoomKind::Office => "office",
            RoomKind::LivingSpace => "living_space",
        }
    }

    /// Human-readable name
    pub fn label(self) -> &'static str {
        match self {
            RoomKind::Office => "office",
            RoomKind::LivingSpace => "living space",
        }
    }

    /// Infer the kind from a stored capacity value
    pub fn from_capacity(capacity: usize) -> Option<Self> {
        match capacity {
            OFFICE_CAPACITY => Some(RoomKind::Office),
            LIVING_SPACE_CAPACITY => Some(RoomKind::LivingSpace),
            _ => None,
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RoomKind {
    type Err = DojoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "office" => Ok(RoomKind::Office),
            "living_space" | "living-space" | "livingspace" | "living space" => Ok(RoomKind::LivingSpace),
            other => Err(DojoError::Validation(format!("unknown room type '{other}'"))),
        }
    }
}

/// A physical space people are allocated into.
///
/// Capacity is fixed by the kind; the only way to build one is through
/// [`Room::office`] or [`Room::living_space`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    name: String,
    kind: RoomKind,
    occupants: BTreeSet<String>,
}

impl Room {
    pub fn office(name: impl Into<String>) -> Self {
        Self::with_kind(name, RoomKind::Office)
    }

    pub fn living_space(name: impl Into<String>) -> Self {
        Self::with_kind(name, RoomKind::LivingSpace)
    }

    pub(crate) fn with_kind(name: impl Into<String>, kind: RoomKind) -> Self {
        Self {
            name: name.into(),
            kind,
            occupants: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.kind.capacity()
    }

    /// Occupant person ids, sorted
    pub fn occupants(&self) -> &BTreeSet<String> {
        &self.occupants
    }

    pub fn has_occupant(&self, person_id: &str) -> bool {
        self.occupants.contains(person_id)
    }

    /// Add a person. Already present counts as success; a full room refuses.
    pub fn add_occupant(&mut self, person_id: &str) -> bool {
        if self.occupants.contains(person_id) {
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.occupants.insert(person_id.to_string());
        true
    }

    /// Remove a person, returning false if they were not here
    pub fn remove_occupant(&mut self, person_id: &str) -> bool {
        self.occupants.remove(person_id)
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.capacity()
    }

    pub fn available_space(&self) -> usize {
        self.capacity().saturating_sub(self.occupants.len())
    }

    /// Case-insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Stable row id: lowercase name with spaces replaced by underscores
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// Row id for a room name
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}/{})",
            self.kind.as_str(),
            self.name,
            self.occupants.len(),
            self.capacity()
        )
    }
}
