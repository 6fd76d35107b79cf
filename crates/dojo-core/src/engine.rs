//! Allocation engine - the caller-owned dojo and its operations

use std::path::Path;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::components::*;
use crate::error::{DojoError, Result, StorageError};

/// Outcome of admitting a person
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub person_id: String,
    /// Office assigned, if one had space
    pub office: Option<String>,
    /// Living space assigned, if requested and one had space
    pub living_space: Option<String>,
}

/// Outcome of a successful reallocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reallocation {
    pub kind: RoomKind,
    pub from: Option<String>,
    pub to: String,
}

/// A person still waiting on at least one room
#[derive(Debug, Clone, Copy)]
pub struct Unallocated<'a> {
    pub person: &'a Person,
    pub missing_office: bool,
    pub missing_living_space: bool,
}

/// All rooms and people of one dojo.
///
/// There is no global instance: callers construct one, mutate it through
/// the methods below, and persist or discard it as they see fit.
#[derive(Debug, Clone, Default)]
pub struct Dojo {
    offices: Vec<Room>,
    living_spaces: Vec<Room>,
    people: Vec<Person>,
}

impl Dojo {
    /// Create an empty dojo
    pub fn new() -> Self {
        Self::default()
    }

    // ── Rooms ──────────────────────────────────────────────────────────

    /// Create rooms of one kind, returning the names actually created.
    ///
    /// Blank names and names already in use (ignoring case, across both
    /// kinds) are skipped, including repeats within `names` itself.
    pub fn create_room<S: AsRef<str>>(&mut self, kind: RoomKind, names: &[S]) -> Vec<String> {
        let mut created = Vec::new();
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() {
                debug!("Skipping blank room name");
                continue;
            }
            if self.name_taken(name) {
                debug!("A room called {} already exists", name);
                continue;
            }

            self.rooms_mut(kind).push(Room::with_kind(name, kind));
            info!("Created {} {}", kind.label(), name);
            created.push(name.to_string());
        }
        created
    }

    /// True if `name` clashes with an existing room, either ignoring case
    /// or through its row id
    fn name_taken(&self, name: &str) -> bool {
        let slug = slugify(name);
        self.all_rooms()
            .any(|room| room.is_named(name) || room.slug() == slug)
    }

    fn rooms_mut(&mut self, kind: RoomKind) -> &mut Vec<Room> {
        match kind {
            RoomKind::Office => &mut self.offices,
            RoomKind::LivingSpace => &mut self.living_spaces,
        }
    }

    pub fn offices(&self) -> &[Room] {
        &self.offices
    }

    pub fn living_spaces(&self) -> &[Room] {
        &self.living_spaces
    }

    pub fn rooms(&self, kind: RoomKind) -> &[Room] {
        match kind {
            RoomKind::Office => &self.offices,
            RoomKind::LivingSpace => &self.living_spaces,
        }
    }

    /// Offices followed by living spaces
    pub fn all_rooms(&self) -> impl Iterator<Item = &Room> {
        self.offices.iter().chain(self.living_spaces.iter())
    }

    /// Case-insensitive lookup, offices first
    pub fn find_room(&self, name: &str) -> Option<&Room> {
        self.all_rooms().find(|room| room.is_named(name))
    }

    fn locate_room(&self, name: &str) -> Option<(RoomKind, usize)> {
        [RoomKind::Office, RoomKind::LivingSpace]
            .into_iter()
            .find_map(|kind| {
                self.rooms(kind)
                    .iter()
                    .position(|room| room.is_named(name))
                    .map(|index| (kind, index))
            })
    }

    /// A room together with the people in it
    pub fn room_occupants(&self, name: &str) -> Result<(&Room, Vec<&Person>)> {
        let room = self
            .find_room(name)
            .ok_or_else(|| DojoError::NotFound(format!("room '{}'", name)))?;
        let occupants = room
            .occupants()
            .iter()
            .filter_map(|id| self.find_person(id))
            .collect();
        Ok((room, occupants))
    }

    // ── People ─────────────────────────────────────────────────────────

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn fellows(&self) -> impl Iterator<Item = &Person> {
        self.people
            .iter()
            .filter(|p| p.kind() == PersonKind::Fellow)
    }

    pub fn staff(&self) -> impl Iterator<Item = &Person> {
        self.people.iter().filter(|p| p.kind() == PersonKind::Staff)
    }

    pub fn find_person(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id() == id)
    }

    /// Admit a person and try to allocate them rooms at random
    pub fn add_person(
        &mut self,
        name: &str,
        kind: PersonKind,
        wants_accommodation: bool,
    ) -> Result<Admission> {
        let mut rng = rand::thread_rng();
        self.add_person_with(name, kind, wants_accommodation, &mut rng)
    }

    /// Admit a person, drawing room choices from `rng`.
    ///
    /// The person is registered even if no office or living space has
    /// space; the admission reports what was assigned.
    pub fn add_person_with(
        &mut self,
        name: &str,
        kind: PersonKind,
        wants_accommodation: bool,
        rng: &mut impl Rng,
    ) -> Result<Admission> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Rejected person with a blank name");
            return Err(DojoError::Validation("person name cannot be blank".into()));
        }
        if kind == PersonKind::Staff && wants_accommodation {
            debug!("Rejected staff {} requesting accommodation", name);
            return Err(DojoError::Validation(
                "staff cannot be allocated living spaces".into(),
            ));
        }

        let id = self.fresh_person_id();
        let person = match kind {
            PersonKind::Fellow => Person::fellow(id.clone(), name, wants_accommodation),
            PersonKind::Staff => Person::staff(id.clone(), name),
        };
        self.people.push(person);
        let index = self.people.len() - 1;

        let office = self.allocate(index, RoomKind::Office, rng);
        let living_space = if kind == PersonKind::Fellow && wants_accommodation {
            self.allocate(index, RoomKind::LivingSpace, rng)
        } else {
            None
        };

        info!(
            "{} {} added as {} (office: {}, living space: {})",
            kind.label(),
            name,
            id,
            office.as_deref().unwrap_or("none"),
            living_space.as_deref().unwrap_or("none"),
        );

        Ok(Admission {
            person_id: id,
            office,
            living_space,
        })
    }

    fn fresh_person_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().simple().to_string()[..8].to_string();
            if self.find_person(&id).is_none() {
                return id;
            }
        }
    }

    /// Place a person in a uniformly chosen non-full room of `kind`
    fn allocate(&mut self, person_index: usize, kind: RoomKind, rng: &mut impl Rng) -> Option<String> {
        let Self {
            offices,
            living_spaces,
            people,
        } = self;
        let rooms = match kind {
            RoomKind::Office => offices,
            RoomKind::LivingSpace => living_spaces,
        };
        let person = &mut people[person_index];

        let mut open: Vec<&mut Room> = rooms.iter_mut().filter(|r| !r.is_full()).collect();
        let room = open.choose_mut(rng)?;
        if !room.add_occupant(person.id()) {
            return None;
        }
        let room_name = room.name().to_string();
        if !person.set_assignment(kind, Some(room_name.clone())) {
            room.remove_occupant(person.id());
            return None;
        }
        Some(room_name)
    }

    /// Move a person into another room of the same kind.
    ///
    /// Moving someone into the room they already occupy is refused with
    /// [`DojoError::AlreadyAssigned`] rather than treated as success.
    pub fn reallocate_person(&mut self, person_id: &str, room_name: &str) -> Result<Reallocation> {
        let result = self.try_reallocate(person_id, room_name);
        match &result {
            Ok(moved) => info!(
                "Reallocated {} from {} to {}",
                person_id,
                moved.from.as_deref().unwrap_or("no room"),
                moved.to
            ),
            Err(e) => debug!("Reallocation of {} to {} refused: {}", person_id, room_name, e),
        }
        result
    }

    fn try_reallocate(&mut self, person_id: &str, room_name: &str) -> Result<Reallocation> {
        let person_index = self
            .people
            .iter()
            .position(|p| p.id() == person_id)
            .ok_or_else(|| DojoError::NotFound(format!("person with id '{}'", person_id)))?;
        let (kind, target) = self
            .locate_room(room_name)
            .ok_or_else(|| DojoError::NotFound(format!("room '{}'", room_name)))?;

        let Self {
            offices,
            living_spaces,
            people,
        } = self;
        let person = &mut people[person_index];
        if !person.is_eligible_for(kind) {
            return Err(DojoError::NotFound(format!(
                "{} is a living space and {} has not requested accommodation",
                room_name,
                person.name()
            )));
        }

        let rooms = match kind {
            RoomKind::Office => offices,
            RoomKind::LivingSpace => living_spaces,
        };
        if rooms[target].is_full() {
            return Err(DojoError::Capacity {
                room: rooms[target].name().to_string(),
            });
        }

        let current = rooms.iter().position(|r| r.has_occupant(person_id));
        if current == Some(target) {
            return Err(DojoError::AlreadyAssigned {
                person: person.name().to_string(),
                room: rooms[target].name().to_string(),
            });
        }

        // Every check is done; the steps below cannot fail halfway.
        let from = current.map(|index| {
            rooms[index].remove_occupant(person_id);
            rooms[index].name().to_string()
        });
        rooms[target].add_occupant(person_id);
        let to = rooms[target].name().to_string();
        person.set_assignment(kind, Some(to.clone()));

        Ok(Reallocation { kind, from, to })
    }

    /// People missing an office, or wanting accommodation and missing a
    /// living space
    pub fn unallocated(&self) -> Vec<Unallocated<'_>> {
        self.people
            .iter()
            .filter_map(|person| {
                let missing_office = person.office().is_none();
                let missing_living_space =
                    person.wants_accommodation() && person.living_space().is_none();
                (missing_office || missing_living_space).then_some(Unallocated {
                    person,
                    missing_office,
                    missing_living_space,
                })
            })
            .collect()
    }

    // ── Restore support ────────────────────────────────────────────────

    /// Register a rebuilt room unless its name is already present
    pub(crate) fn restore_room(&mut self, room: Room) -> bool {
        if self.name_taken(room.name()) {
            return false;
        }
        let kind = room.kind();
        self.rooms_mut(kind).push(room);
        true
    }

    /// Register a rebuilt person and occupy the rooms recorded on them.
    ///
    /// Returns `Ok(false)` if the id is already present. Assignments that
    /// point at missing or full rooms, or that the person is not eligible
    /// for, are rejected before anything is changed.
    pub(crate) fn restore_person(&mut self, person: Person) -> Result<bool, StorageError> {
        if self.find_person(person.id()).is_some() {
            return Ok(false);
        }

        let mut placements = Vec::new();
        for kind in [RoomKind::Office, RoomKind::LivingSpace] {
            let Some(room_name) = person.assignment(kind) else {
                continue;
            };
            let index = self
                .rooms(kind)
                .iter()
                .position(|r| r.name() == room_name)
                .ok_or_else(|| {
                    StorageError::Corrupt(format!(
                        "{} references unknown {} '{}'",
                        person.id(),
                        kind.label(),
                        room_name
                    ))
                })?;
            let room = &self.rooms(kind)[index];
            if room.is_full() && !room.has_occupant(person.id()) {
                return Err(StorageError::Corrupt(format!(
                    "{} '{}' holds more than {} people",
                    kind.label(),
                    room_name,
                    room.capacity()
                )));
            }
            placements.push((kind, index));
        }

        for (kind, index) in placements {
            self.rooms_mut(kind)[index].add_occupant(person.id());
        }
        self.people.push(person);
        Ok(true)
    }

    /// Describe every broken invariant; empty when the dojo is consistent
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut names: Vec<String> = self.all_rooms().map(|r| r.name().to_lowercase()).collect();
        names.sort();
        for pair in names.windows(2) {
            if pair[0] == pair[1] {
                problems.push(format!("duplicate room name '{}'", pair[0]));
            }
        }

        let mut ids: Vec<&str> = self.people.iter().map(|p| p.id()).collect();
        ids.sort_unstable();
        for pair in ids.windows(2) {
            if pair[0] == pair[1] {
                problems.push(format!("duplicate person id '{}'", pair[0]));
            }
        }

        for room in self.all_rooms() {
            if room.occupants().len() > room.capacity() {
                problems.push(format!("{} is over capacity", room.name()));
            }
            for id in room.occupants() {
                match self.find_person(id) {
                    Some(person) if person.assignment(room.kind()) == Some(room.name()) => {}
                    Some(_) => problems.push(format!(
                        "{} occupies {} without being assigned to it",
                        id,
                        room.name()
                    )),
                    None => problems.push(format!("{} holds unknown person {}", room.name(), id)),
                }
            }
        }

        for person in &self.people {
            for kind in [RoomKind::Office, RoomKind::LivingSpace] {
                let Some(name) = person.assignment(kind) else {
                    continue;
                };
                let occupied = self
                    .rooms(kind)
                    .iter()
                    .any(|r| r.name() == name && r.has_occupant(person.id()));
                if !occupied {
                    problems.push(format!(
                        "{} is assigned to {} {} but not listed there",
                        person.id(),
                        kind.label(),
                        name
                    ));
                }
                if !person.is_eligible_for(kind) {
                    problems.push(format!("{} may not hold a {}", person.id(), kind.label()));
                }
            }
        }

        problems
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Snapshot the whole dojo to a SQLite file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::persistence::save(self, path.as_ref())
    }

    /// Replace this dojo with the one stored at `path`.
    ///
    /// On any error `self` is left exactly as it was.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let loaded = crate::persistence::load(path.as_ref())?;
        *self = loaded;
        Ok(())
    }
}
