//! Command execution against the working dojo store.
//!
//! Every invocation loads the working database (if it exists), runs one
//! command, and writes the snapshot back when the command changed
//! anything.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use log::{debug, info, warn};

use dojo_core::config::StoreConfig;
use dojo_core::persistence;
use dojo_core::prelude::*;

use crate::people_file;
use crate::report;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create one or more rooms of a kind (office or living_space)
    CreateRoom {
        room_type: RoomKind,
        #[arg(required = true)]
        room_names: Vec<String>,
    },
    /// Admit a fellow or staff member and allocate rooms at random
    AddPerson {
        /// Full name; quote names with spaces
        person_name: String,
        person_type: PersonKind,
        /// Y if a fellow wants a living space
        wants_accommodation: Option<String>,
    },
    /// Move a person to a specific room
    ReallocatePerson {
        person_id: String,
        new_room_name: String,
    },
    /// Admit everyone listed in a people file
    LoadPeople { filename: PathBuf },
    /// Show a room and its occupants
    PrintRoom { room_name: String },
    /// Show every room and its occupants
    PrintAllocations {
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Show people still waiting on an office or living space
    PrintUnallocated {
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Snapshot the current state to a database
    SaveState {
        #[arg(long)]
        to: Option<PathBuf>,
    },
    /// Replace the current state with a saved database
    LoadState { database: PathBuf },
}

pub struct App {
    dojo: Dojo,
    config: StoreConfig,
}

impl App {
    /// Load the working store, or start empty if it does not exist yet
    pub fn open(config: StoreConfig) -> Result<Self> {
        let dojo = if config.path.exists() {
            persistence::load(&config.path)
                .with_context(|| format!("failed to load {}", config.path.display()))?
        } else {
            info!("No store at {}, starting empty", config.path.display());
            Dojo::new()
        };
        Ok(Self { dojo, config })
    }

    /// Like [`App::open`], except that `load-state` starts empty: the
    /// working store is about to be replaced, so it need not be readable
    pub fn open_for(config: StoreConfig, command: &Command) -> Result<Self> {
        if matches!(command, Command::LoadState { .. }) {
            debug!("Not reading {}, load-state replaces it", config.path.display());
            return Ok(Self {
                dojo: Dojo::new(),
                config,
            });
        }
        Self::open(config)
    }

    fn persist(&self) -> Result<()> {
        let path = &self.config.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        self.dojo
            .save(path)
            .with_context(|| format!("failed to save {}", path.display()))
    }

    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> Result<()> {
        let changed = match command {
            Command::CreateRoom {
                room_type,
                room_names,
            } => self.create_room(room_type, &room_names, out)?,
            Command::AddPerson {
                person_name,
                person_type,
                wants_accommodation,
            } => {
                let wants = match wants_accommodation {
                    Some(flag) => people_file::parse_accommodation(&flag)?,
                    None => false,
                };
                let admission = self.dojo.add_person(&person_name, person_type, wants)?;
                write_admission(&self.dojo, &admission, out)?;
                true
            }
            Command::ReallocatePerson {
                person_id,
                new_room_name,
            } => {
                let moved = self.dojo.reallocate_person(&person_id, &new_room_name)?;
                let name = self
                    .dojo
                    .find_person(&person_id)
                    .map(|p| p.name().to_string())
                    .unwrap_or(person_id);
                writeln!(out, "{} has been reallocated to {}.", name, moved.to)?;
                true
            }
            Command::LoadPeople { filename } => self.load_people(&filename, out)?,
            Command::PrintRoom { room_name } => {
                let (room, people) = self.dojo.room_occupants(&room_name)?;
                writeln!(out, "{}", report::room(room, &people))?;
                false
            }
            Command::PrintAllocations { output } => {
                emit(&report::allocations(&self.dojo), output.as_deref(), out)?;
                false
            }
            Command::PrintUnallocated { output } => {
                emit(&report::unallocated(&self.dojo), output.as_deref(), out)?;
                false
            }
            Command::SaveState { to } => {
                match to {
                    Some(target) => {
                        self.dojo
                            .save(&target)
                            .with_context(|| format!("failed to save {}", target.display()))?;
                        writeln!(out, "Application state saved to {}", target.display())?;
                    }
                    None => {
                        self.persist()?;
                        writeln!(
                            out,
                            "Application state saved to {}",
                            self.config.path.display()
                        )?;
                    }
                }
                false
            }
            Command::LoadState { database } => {
                self.dojo
                    .load(&database)
                    .with_context(|| format!("failed to load {}", database.display()))?;
                writeln!(out, "Application state loaded from {}", database.display())?;
                true
            }
        };

        if changed {
            self.persist()?;
        }
        Ok(())
    }

    fn create_room(&mut self, kind: RoomKind, names: &[String], out: &mut impl Write) -> Result<bool> {
        let created = self.dojo.create_room(kind, names);
        let article = match kind {
            RoomKind::Office => "An",
            RoomKind::LivingSpace => "A",
        };
        // `created` is the subsequence of `names` that went through
        let mut accepted = created.iter().peekable();
        for name in names {
            if accepted.next_if(|c| *c == name).is_some() {
                writeln!(
                    out,
                    "{} {} called {} has been successfully created!",
                    article,
                    kind.label(),
                    name
                )?;
            } else {
                writeln!(out, "Could not create room '{}': name is blank or already in use.", name)?;
            }
        }
        Ok(!created.is_empty())
    }

    fn load_people(&mut self, filename: &Path, out: &mut impl Write) -> Result<bool> {
        let contents = fs::read_to_string(filename)
            .with_context(|| format!("failed to read {}", filename.display()))?;
        let (entries, errors) = people_file::parse(&contents);
        for (line, e) in &errors {
            warn!("{}:{}: {}", filename.display(), line, e);
            writeln!(out, "Skipping line {}: {}", line, e)?;
        }

        let mut added = 0;
        for entry in entries {
            match self
                .dojo
                .add_person(&entry.name, entry.kind, entry.wants_accommodation)
            {
                Ok(admission) => {
                    write_admission(&self.dojo, &admission, out)?;
                    added += 1;
                }
                Err(e) => writeln!(out, "Could not add {}: {}", entry.name, e)?,
            }
        }
        writeln!(out, "Successfully added {} people from file", added)?;
        Ok(added > 0)
    }
}

fn write_admission(dojo: &Dojo, admission: &Admission, out: &mut impl Write) -> Result<()> {
    let Some(person) = dojo.find_person(&admission.person_id) else {
        return Ok(());
    };
    writeln!(
        out,
        "{} {} (ID: {}) has been successfully added.",
        person.kind().label(),
        person.name(),
        person.id()
    )?;
    match &admission.office {
        Some(office) => writeln!(out, "{} has been allocated the office {}", person.first_name(), office)?,
        None => writeln!(out, "No office is available for {} at the moment.", person.first_name())?,
    }
    if person.wants_accommodation() {
        match &admission.living_space {
            Some(space) => writeln!(
                out,
                "{} has been allocated the living space {}",
                person.first_name(),
                space
            )?,
            None => writeln!(
                out,
                "No living space is available for {} at the moment.",
                person.first_name()
            )?,
        }
    }
    Ok(())
}

/// Write a report to `path` if given, else to `out`
fn emit(text: &str, path: Option<&Path>, out: &mut impl Write) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, format!("{text}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            writeln!(out, "Report written to {}", path.display())?;
        }
        None => writeln!(out, "{}", text)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── Helpers ──────────────────────────────────────────────────────────

    fn app_in(dir: &TempDir) -> App {
        let config = StoreConfig::default().with_path(dir.path().join("state").join("dojo.db"));
        App::open(config).unwrap()
    }

    fn run(app: &mut App, command: Command) -> String {
        let mut out = Vec::new();
        app.execute(command, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn create(kind: RoomKind, names: &[&str]) -> Command {
        Command::CreateRoom {
            room_type: kind,
            room_names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn add(name: &str, kind: PersonKind, wants: Option<&str>) -> Command {
        Command::AddPerson {
            person_name: name.to_string(),
            person_type: kind,
            wants_accommodation: wants.map(str::to_string),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────────

    #[test]
    fn test_create_room_messages() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);

        let text = run(&mut app, create(RoomKind::Office, &["Blue", "blue"]));
        assert!(text.contains("An office called Blue has been successfully created!"));
        assert!(text.contains("Could not create room 'blue'"));

        let text = run(&mut app, create(RoomKind::LivingSpace, &["Python"]));
        assert!(text.contains("A living space called Python has been successfully created!"));
    }

    #[test]
    fn test_state_survives_between_invocations() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        run(&mut app, create(RoomKind::Office, &["Blue"]));
        let text = run(&mut app, add("Ann Lee", PersonKind::Fellow, Some("Y")));
        assert!(text.contains("Fellow Ann Lee (ID: "));
        assert!(text.contains("Ann has been allocated the office Blue"));
        assert!(text.contains("No living space is available for Ann at the moment."));

        let reopened = app_in(&dir);
        assert_eq!(reopened.dojo.people().len(), 1);
        assert_eq!(reopened.dojo.people()[0].office(), Some("Blue"));
        assert!(reopened.dojo.people()[0].wants_accommodation());
    }

    #[test]
    fn test_reallocate_and_print_room() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        run(&mut app, create(RoomKind::Office, &["Blue"]));
        run(&mut app, add("Ann Lee", PersonKind::Staff, None));
        run(&mut app, create(RoomKind::Office, &["Red"]));
        let id = app.dojo.people()[0].id().to_string();

        let text = run(
            &mut app,
            Command::ReallocatePerson {
                person_id: id,
                new_room_name: "Red".into(),
            },
        );
        assert_eq!(text, "Ann Lee has been reallocated to Red.\n");

        let text = run(
            &mut app,
            Command::PrintRoom {
                room_name: "red".into(),
            },
        );
        assert!(text.contains("Room: Red\nType: Office\nOccupants:\n  - Ann Lee (Staff)"));
    }

    #[test]
    fn test_domain_errors_leave_store_untouched() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        run(&mut app, create(RoomKind::Office, &["Blue"]));

        let mut out = Vec::new();
        let err = app
            .execute(add("Bo", PersonKind::Staff, Some("Y")), &mut out)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DojoError>(),
            Some(DojoError::Validation(_))
        ));
        assert!(app_in(&dir).dojo.people().is_empty());
    }

    #[test]
    fn test_load_people_file() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        run(&mut app, create(RoomKind::Office, &["Blue"]));
        run(&mut app, create(RoomKind::LivingSpace, &["Python"]));

        let file = dir.path().join("people.txt");
        fs::write(
            &file,
            "# intake\nOLUWAFEMI SULE FELLOW Y\nDOMINIC WALTERS STAFF\nBROKEN\nLEIGH RILEY STAFF Y\n",
        )
        .unwrap();

        let text = run(&mut app, Command::LoadPeople { filename: file });
        assert!(text.contains("Skipping line 4"));
        assert!(text.contains("Could not add LEIGH RILEY"));
        assert!(text.contains("Successfully added 2 people from file"));
        assert_eq!(app_in(&dir).dojo.people().len(), 2);
    }

    #[test]
    fn test_reports_to_file() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        run(&mut app, add("Cy", PersonKind::Fellow, None));

        let target = dir.path().join("unallocated.txt");
        let text = run(
            &mut app,
            Command::PrintUnallocated {
                output: Some(target.clone()),
            },
        );
        assert!(text.starts_with("Report written to"));
        let written = fs::read_to_string(&target).unwrap();
        assert!(written.contains("- Cy (missing: office)"));

        let text = run(&mut app, Command::PrintAllocations { output: None });
        assert_eq!(text, "No room allocations to display.\n");
    }

    #[test]
    fn test_save_and_load_state() {
        let dir = TempDir::new().unwrap();
        let backup = dir.path().join("backup.db");
        let mut app = app_in(&dir);
        run(&mut app, create(RoomKind::Office, &["Blue"]));
        run(&mut app, Command::SaveState { to: Some(backup.clone()) });

        run(&mut app, create(RoomKind::Office, &["Red"]));
        assert_eq!(app.dojo.offices().len(), 2);

        let text = run(&mut app, Command::LoadState { database: backup });
        assert!(text.starts_with("Application state loaded from"));
        assert_eq!(app.dojo.offices().len(), 1);
        assert_eq!(app_in(&dir).dojo.offices().len(), 1);
    }

    #[test]
    fn test_load_state_replaces_unreadable_working_store() {
        let dir = TempDir::new().unwrap();
        let backup = dir.path().join("backup.db");
        let mut app = app_in(&dir);
        run(&mut app, create(RoomKind::Office, &["Blue"]));
        run(&mut app, create(RoomKind::LivingSpace, &["Python"]));
        run(&mut app, add("Ann", PersonKind::Fellow, Some("Y")));
        run(&mut app, Command::SaveState { to: Some(backup.clone()) });

        // Staff holding a living space: valid SQLite, inconsistent rows
        let working = app.config.path.clone();
        let conn = rusqlite::Connection::open(&working).unwrap();
        conn.execute("UPDATE people SET kind = 'staff'", []).unwrap();
        drop(conn);
        assert!(App::open(app.config.clone()).is_err());

        let command = Command::LoadState { database: backup };
        let mut app = App::open_for(app.config.clone(), &command).unwrap();
        let mut out = Vec::new();
        app.execute(command, &mut out).unwrap();

        let reopened = app_in(&dir);
        assert_eq!(reopened.dojo.people().len(), 1);
        assert_eq!(reopened.dojo.people()[0].living_space(), Some("Python"));
    }

    #[test]
    fn test_other_commands_still_read_working_store() {
        let dir = TempDir::new().unwrap();
        let working = dir.path().join("dojo.db");
        fs::write(&working, "not a database").unwrap();
        let config = StoreConfig::default().with_path(&working);

        assert!(App::open_for(config.clone(), &Command::PrintAllocations { output: None }).is_err());
        assert!(App::open_for(
            config,
            &Command::LoadState {
                database: dir.path().join("any.db")
            }
        )
        .is_ok());
    }

    #[test]
    fn test_load_state_rejects_foreign_file() {
        let dir = TempDir::new().unwrap();
        let junk = dir.path().join("junk.db");
        fs::write(&junk, "not a database").unwrap();
        let mut app = app_in(&dir);
        run(&mut app, create(RoomKind::Office, &["Blue"]));

        let mut out = Vec::new();
        assert!(app
            .execute(Command::LoadState { database: junk }, &mut out)
            .is_err());
        assert_eq!(app.dojo.offices().len(), 1);
    }
}
