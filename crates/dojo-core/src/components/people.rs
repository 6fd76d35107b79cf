//! People components: Person, Role, PersonKind

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::room::RoomKind;
use crate::error::DojoError;

/// Person kind discriminator, as requested by callers and stored in `people.kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonKind {
    Fellow,
    Staff,
}

impl PersonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PersonKind::Fellow => "fellow",
            PersonKind::Staff => "staff",
        }
    }

    /// Capitalized name for messages
    pub fn label(self) -> &'static str {
        match self {
            PersonKind::Fellow => "Fellow",
            PersonKind::Staff => "Staff",
        }
    }
}

impl fmt::Display for PersonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PersonKind {
    type Err = DojoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fellow" => Ok(PersonKind::Fellow),
            "staff" => Ok(PersonKind::Staff),
            other => Err(DojoError::Validation(format!("unknown person type '{other}'"))),
        }
    }
}

/// Per-kind state. Staff have no living-space slot at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Fellow {
        wants_accommodation: bool,
        living_space: Option<String>,
    },
    Staff,
}

/// Someone admitted to the dojo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    id: String,
    name: String,
    office: Option<String>,
    role: Role,
}

impl Person {
    pub fn fellow(id: impl Into<String>, name: impl Into<String>, wants_accommodation: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            office: None,
            role: Role::Fellow {
                wants_accommodation,
                living_space: None,
            },
        }
    }

    pub fn staff(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            office: None,
            role: Role::Staff,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First word of the name, used in short messages
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn kind(&self) -> PersonKind {
        match self.role {
            Role::Fellow { .. } => PersonKind::Fellow,
            Role::Staff => PersonKind::Staff,
        }
    }

    pub fn wants_accommodation(&self) -> bool {
        matches!(
            self.role,
            Role::Fellow {
                wants_accommodation: true,
                ..
            }
        )
    }

    pub fn office(&self) -> Option<&str> {
        self.office.as_deref()
    }

    pub fn living_space(&self) -> Option<&str> {
        match &self.role {
            Role::Fellow { living_space, .. } => living_space.as_deref(),
            Role::Staff => None,
        }
    }

    /// Recorded assignment for a room kind
    pub fn assignment(&self, kind: RoomKind) -> Option<&str> {
        match kind {
            RoomKind::Office => self.office(),
            RoomKind::LivingSpace => self.living_space(),
        }
    }

    /// Whether this person may be placed in a room of `kind`
    pub fn is_eligible_for(&self, kind: RoomKind) -> bool {
        match kind {
            RoomKind::Office => true,
            RoomKind::LivingSpace => self.wants_accommodation(),
        }
    }

    /// Record (or clear) the assignment for a room kind.
    ///
    /// Returns false without touching anything if the person is not
    /// eligible for `kind`; clearing always succeeds.
    pub(crate) fn set_assignment(&mut self, kind: RoomKind, room: Option<String>) -> bool {
        match kind {
            RoomKind::Office => {
                self.office = room;
                true
            }
            RoomKind::LivingSpace => match &mut self.role {
                Role::Fellow {
                    wants_accommodation,
                    living_space,
                } => {
                    if room.is_some() && !*wants_accommodation {
                        return false;
                    }
                    *living_space = room;
                    true
                }
                Role::Staff => room.is_none(),
            },
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (ID: {})", self.kind().label(), self.name, self.id)
    }
}
