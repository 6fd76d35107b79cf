//! Plain-text reports over a dojo

use dojo_core::prelude::*;

const RULE: &str = "==================================================";

/// Offices then living spaces, each with `name (n/capacity)` and occupants
pub fn allocations(dojo: &Dojo) -> String {
    let mut lines = Vec::new();
    for (kind, heading) in [
        (RoomKind::Office, "OFFICES"),
        (RoomKind::LivingSpace, "LIVING SPACES"),
    ] {
        let rooms = dojo.rooms(kind);
        if rooms.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(heading.to_string());
        lines.push(RULE.to_string());
        for room in rooms {
            lines.push(String::new());
            lines.push(format!(
                "{} ({}/{}):",
                room.name(),
                room.occupants().len(),
                room.capacity()
            ));
            for id in room.occupants() {
                if let Some(person) = dojo.find_person(id) {
                    lines.push(format!("  - {}", person.name()));
                }
            }
        }
    }

    if lines.is_empty() {
        return "No room allocations to display.".to_string();
    }
    lines.join("\n")
}

/// Everyone still missing an office or a requested living space
pub fn unallocated(dojo: &Dojo) -> String {
    let mut lines = vec!["Unallocated People".to_string(), RULE.to_string()];
    let pending = dojo.unallocated();
    if pending.is_empty() {
        lines.push("No unallocated people.".to_string());
    }
    for entry in pending {
        let mut missing = Vec::new();
        if entry.missing_office {
            missing.push("office");
        }
        if entry.missing_living_space {
            missing.push("living space");
        }
        lines.push(format!(
            "- {} (missing: {})",
            entry.person.name(),
            missing.join(", ")
        ));
    }
    lines.join("\n")
}

/// One room and the people in it
pub fn room(room: &Room, people: &[&Person]) -> String {
    let kind = match room.kind() {
        RoomKind::Office => "Office",
        RoomKind::LivingSpace => "Living Space",
    };
    let mut lines = vec![
        format!("Room: {}", room.name()),
        format!("Type: {}", kind),
        "Occupants:".to_string(),
    ];
    for person in people {
        lines.push(format!("  - {} ({})", person.name(), person.kind().label()));
    }
    lines.join("\n")
}
