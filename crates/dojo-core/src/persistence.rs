//! Save/Load functionality for persisting dojo state
//!
//! A save is a full snapshot: all rows are deleted and the current dojo is
//! written back inside a single transaction. A load rebuilds a fresh dojo
//! from the rows and hands it back only if every row mapped cleanly.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info, warn};
use rusqlite::Connection;

use crate::components::*;
use crate::engine::Dojo;
use crate::error::{Result, StorageError};
use crate::store::Store;
use crate::tables::{self, FellowRecord, PersonRecord, Record, RoomRecord};

/// All rows of one dojo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub rooms: Vec<RoomRecord>,
    pub people: Vec<PersonRecord>,
    pub fellows: Vec<FellowRecord>,
}

impl Snapshot {
    /// Map a dojo onto rows: offices, then living spaces, then people
    pub fn capture(dojo: &Dojo) -> Self {
        let rooms = dojo
            .all_rooms()
            .map(|room| RoomRecord {
                id: room.slug(),
                name: room.name().to_string(),
                kind: Some(room.kind().as_str().to_string()),
                capacity: room.capacity() as i64,
            })
            .collect();

        let mut people = Vec::with_capacity(dojo.people().len());
        let mut fellows = Vec::new();
        for person in dojo.people() {
            people.push(PersonRecord {
                id: person.id().to_string(),
                name: person.name().to_string(),
                kind: person.kind().as_str().to_string(),
                office_id: person.office().map(slugify),
                living_space_id: person.living_space().map(slugify),
            });
            if let Role::Fellow {
                wants_accommodation,
                ..
            } = person.role()
            {
                fellows.push(FellowRecord {
                    id: person.id().to_string(),
                    wants_accommodation: *wants_accommodation,
                });
            }
        }

        Self {
            rooms,
            people,
            fellows,
        }
    }

    /// Read every table
    pub fn read(conn: &Connection) -> Result<Self, StorageError> {
        Ok(Self {
            rooms: tables::query_all(conn)?,
            people: tables::query_all(conn)?,
            fellows: tables::query_all(conn)?,
        })
    }

    /// Replace every row with this snapshot
    pub fn write(&self, conn: &Connection) -> Result<(), StorageError> {
        tables::clear_all(conn)?;
        for room in &self.rooms {
            room.insert(conn)?;
        }
        let fellows: HashMap<&str, &FellowRecord> =
            self.fellows.iter().map(|f| (f.id.as_str(), f)).collect();
        for person in &self.people {
            person.insert(conn)?;
            if let Some(fellow) = fellows.get(person.id.as_str()) {
                fellow.insert(conn)?;
            }
        }
        debug!(
            "Wrote {} rooms and {} people",
            self.rooms.len(),
            self.people.len()
        );
        Ok(())
    }
}

/// Resolve a room row's kind, falling back to its capacity when the
/// discriminator is missing
fn room_kind(record: &RoomRecord) -> Result<RoomKind, StorageError> {
    match record.kind.as_deref().map(str::trim) {
        Some(kind) if !kind.is_empty() => kind.parse().map_err(|_| {
            StorageError::Corrupt(format!("room '{}' has unknown kind '{}'", record.name, kind))
        }),
        _ => usize::try_from(record.capacity)
            .ok()
            .and_then(RoomKind::from_capacity)
            .ok_or_else(|| {
                StorageError::Corrupt(format!(
                    "room '{}' has no kind and capacity {}",
                    record.name, record.capacity
                ))
            }),
    }
}

/// Rebuild rooms and people from rows into `dojo`.
///
/// Rooms already present by name and people already present by id are
/// skipped, so restoring the same snapshot twice changes nothing.
pub fn restore_into(dojo: &mut Dojo, snapshot: Snapshot) -> Result<(), StorageError> {
    // Row id -> name of the room kept in `dojo`, seeded with the rooms
    // already present so their ids resolve too
    let mut names_by_id: HashMap<String, String> = dojo
        .all_rooms()
        .map(|room| (room.slug(), room.name().to_string()))
        .collect();

    for record in &snapshot.rooms {
        let kind = room_kind(record)?;
        if record.capacity != kind.capacity() as i64 {
            warn!(
                "Room {} stored with capacity {}, using {}",
                record.name,
                record.capacity,
                kind.capacity()
            );
        }
        let kept = if dojo.restore_room(Room::with_kind(record.name.clone(), kind)) {
            record.name.clone()
        } else {
            debug!("Room {} already present", record.name);
            let slug = slugify(&record.name);
            dojo.all_rooms()
                .find(|room| room.is_named(&record.name) || room.slug() == slug)
                .map(|room| room.name().to_string())
                .ok_or_else(|| {
                    StorageError::Corrupt(format!("room '{}' could not be restored", record.name))
                })?
        };
        names_by_id.insert(record.id.clone(), kept);
    }

    let resolve = |id: &Option<String>, owner: &str| -> Result<Option<String>, StorageError> {
        match id {
            None => Ok(None),
            Some(id) => names_by_id.get(id).cloned().map(Some).ok_or_else(|| {
                StorageError::Corrupt(format!("{} references unknown room '{}'", owner, id))
            }),
        }
    };

    let wants: HashMap<&str, bool> = snapshot
        .fellows
        .iter()
        .map(|f| (f.id.as_str(), f.wants_accommodation))
        .collect();

    for record in &snapshot.people {
        let kind: PersonKind = record.kind.parse().map_err(|_| {
            StorageError::Corrupt(format!(
                "person {} has unknown kind '{}'",
                record.id, record.kind
            ))
        })?;
        let mut person = match kind {
            PersonKind::Fellow => Person::fellow(
                record.id.clone(),
                record.name.clone(),
                wants.get(record.id.as_str()).copied().unwrap_or(false),
            ),
            PersonKind::Staff => Person::staff(record.id.clone(), record.name.clone()),
        };

        let office = resolve(&record.office_id, &record.id)?;
        let living_space = resolve(&record.living_space_id, &record.id)?;
        person.set_assignment(RoomKind::Office, office);
        if !person.set_assignment(RoomKind::LivingSpace, living_space) {
            return Err(StorageError::Corrupt(format!(
                "{} {} holds a living space without requesting one",
                kind.label(),
                record.id
            )));
        }

        if !dojo.restore_person(person)? {
            debug!("Person {} already present", record.id);
        }
    }

    let problems = dojo.invariant_violations();
    if !problems.is_empty() {
        return Err(StorageError::Corrupt(problems.join("; ")));
    }
    Ok(())
}

fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StorageError> {
    let mut store = Store::create(path)?;
    store.run_in_transaction(|tx| {
        tables::create_schema(tx)?;
        snapshot.write(tx)
    })
}

/// Snapshot `dojo` into the SQLite file at `path`.
///
/// A failed save leaves an existing file as it was; a file created by the
/// failed attempt is removed again.
pub fn save(dojo: &Dojo, path: &Path) -> Result<()> {
    let existed = path.exists();
    let snapshot = Snapshot::capture(dojo);

    let result = write_snapshot(path, &snapshot);
    match &result {
        Ok(()) => info!(
            "Saved {} rooms and {} people to {}",
            snapshot.rooms.len(),
            snapshot.people.len(),
            path.display()
        ),
        Err(e) => {
            warn!("Saving to {} failed: {}", path.display(), e);
            if !existed {
                if let Err(cleanup) = fs::remove_file(path) {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        warn!("Could not remove {}: {}", path.display(), cleanup);
                    }
                }
            }
        }
    }
    Ok(result?)
}

/// Load a dojo from the SQLite file at `path` into a fresh instance
pub fn load(path: &Path) -> Result<Dojo> {
    let mut store = Store::open_existing(path)?;
    let snapshot = store.run_in_transaction(|tx| Snapshot::read(tx))?;

    let mut dojo = Dojo::new();
    restore_into(&mut dojo, snapshot)?;
    info!(
        "Loaded {} rooms and {} people from {}",
        dojo.all_rooms().count(),
        dojo.people().len(),
        path.display()
    );
    Ok(dojo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn example() -> Dojo {
        let mut rng = StdRng::seed_from_u64(11);
        let mut dojo = Dojo::new();
        dojo.create_room(RoomKind::Office, &["Blue Room"]);
        dojo.create_room(RoomKind::LivingSpace, &["Python"]);
        dojo.add_person_with("Ann Lee", PersonKind::Fellow, true, &mut rng)
            .unwrap();
        dojo.add_person_with("Bo", PersonKind::Staff, false, &mut rng)
            .unwrap();
        dojo.add_person_with("Cy", PersonKind::Fellow, false, &mut rng)
            .unwrap();
        dojo
    }

    #[test]
    fn test_capture_maps_rows() {
        let dojo = example();
        let snapshot = Snapshot::capture(&dojo);

        assert_eq!(snapshot.rooms[0].id, "blue_room");
        assert_eq!(snapshot.rooms[0].kind.as_deref(), Some("office"));
        assert_eq!(snapshot.rooms[0].capacity, 6);
        assert_eq!(snapshot.rooms[1].kind.as_deref(), Some("living_space"));
        assert_eq!(snapshot.rooms[1].capacity, 4);

        let ann = &snapshot.people[0];
        assert_eq!(ann.kind, "fellow");
        assert_eq!(ann.office_id.as_deref(), Some("blue_room"));
        assert_eq!(ann.living_space_id.as_deref(), Some("python"));
        assert_eq!(snapshot.people[1].kind, "staff");
        assert_eq!(snapshot.people[1].living_space_id, None);

        // Staff get no fellow row
        assert_eq!(snapshot.fellows.len(), 2);
        assert!(snapshot.fellows[0].wants_accommodation);
        assert!(!snapshot.fellows[1].wants_accommodation);
    }

    #[test]
    fn test_restore_rebuilds_occupancy() {
        let original = example();
        let mut restored = Dojo::new();
        restore_into(&mut restored, Snapshot::capture(&original)).unwrap();

        assert_eq!(Snapshot::capture(&restored), Snapshot::capture(&original));
        assert_eq!(
            restored.find_room("blue room").unwrap().occupants(),
            original.find_room("Blue Room").unwrap().occupants()
        );
        assert!(restored.invariant_violations().is_empty());
    }

    #[test]
    fn test_restore_twice_is_idempotent() {
        let snapshot = Snapshot::capture(&example());
        let mut dojo = Dojo::new();
        restore_into(&mut dojo, snapshot.clone()).unwrap();
        restore_into(&mut dojo, snapshot).unwrap();

        assert_eq!(dojo.offices().len(), 1);
        assert_eq!(dojo.living_spaces().len(), 1);
        assert_eq!(dojo.people().len(), 3);
        assert_eq!(dojo.find_room("Blue Room").unwrap().occupants().len(), 3);
    }

    #[test]
    fn test_missing_kind_inferred_from_capacity() {
        let mut snapshot = Snapshot::capture(&example());
        for room in &mut snapshot.rooms {
            room.kind = None;
        }
        let mut dojo = Dojo::new();
        restore_into(&mut dojo, snapshot).unwrap();
        assert_eq!(dojo.offices()[0].name(), "Blue Room");
        assert_eq!(dojo.living_spaces()[0].name(), "Python");
    }

    #[test]
    fn test_unknown_kind_and_capacity_is_corrupt() {
        let snapshot = Snapshot {
            rooms: vec![RoomRecord {
                id: "attic".into(),
                name: "Attic".into(),
                kind: None,
                capacity: 9,
            }],
            ..Default::default()
        };
        assert!(matches!(
            restore_into(&mut Dojo::new(), snapshot),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_staff_with_living_space_is_corrupt() {
        let mut snapshot = Snapshot::capture(&example());
        snapshot.people[1].living_space_id = Some("python".into());
        assert!(matches!(
            restore_into(&mut Dojo::new(), snapshot),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_dangling_room_reference_is_corrupt() {
        let mut snapshot = Snapshot::capture(&example());
        snapshot.people[0].office_id = Some("basement".into());
        assert!(matches!(
            restore_into(&mut Dojo::new(), snapshot),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_row_ids_resolve_to_rooms_already_present() {
        let mut snapshot = Snapshot::capture(&example());
        snapshot.rooms[0].id = "r7".into();
        for person in &mut snapshot.people {
            person.office_id = Some("r7".into());
        }

        let mut dojo = Dojo::new();
        dojo.create_room(RoomKind::Office, &["BLUE ROOM"]);
        restore_into(&mut dojo, snapshot).unwrap();

        assert_eq!(dojo.offices().len(), 1);
        assert_eq!(dojo.people()[0].office(), Some("BLUE ROOM"));
        assert_eq!(dojo.offices()[0].occupants().len(), 3);
    }

    #[test]
    fn test_in_memory_write_then_read() {
        let snapshot = Snapshot::capture(&example());
        let mut store = Store::in_memory().unwrap();
        store.create_schema().unwrap();
        store.run_in_transaction(|tx| snapshot.write(tx)).unwrap();
        // A second write replaces rather than appends
        store.run_in_transaction(|tx| snapshot.write(tx)).unwrap();

        let read = store.run_in_transaction(|tx| Snapshot::read(tx)).unwrap();
        assert_eq!(read, snapshot);
    }
}
