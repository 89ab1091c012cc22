//! Bulk load and flush of the flat-text backing files.
//!
//! Files are read once when a session starts and rewritten once when it
//! ends. Nothing touches the disk in between.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{
    codec::{self, LineCodec},
    error::{Error, ParseError, Result},
    ledger::BookingLedger,
    models::{Route, Train, User},
    repository::Repository,
    session::Session,
};

/// Default file name for user records.
pub const USERS_FILE: &str = "users.txt";
/// Default file name for train records.
pub const TRAINS_FILE: &str = "trains.txt";
/// Default file name for route records.
pub const ROUTES_FILE: &str = "routes.txt";
/// Default file name for booking histories.
pub const BOOKINGS_FILE: &str = "bookings.txt";

/// What to do with a persisted line that fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Log the line, record it in the [`LoadReport`] and keep loading.
    #[default]
    Skip,
    /// Abort the whole load with [`Error::Parse`].
    Fail,
}

/// Locations of the four backing files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    /// `username,password,role` lines.
    pub users: PathBuf,
    /// `id,name,source,destination,seats` lines.
    pub trains: PathBuf,
    /// `id,source,destination` lines.
    pub routes: PathBuf,
    /// `username:train;train;...` lines.
    pub bookings: PathBuf,
}

impl DataFiles {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            users: dir.join(USERS_FILE),
            trains: dir.join(TRAINS_FILE),
            routes: dir.join(ROUTES_FILE),
            bookings: dir.join(BOOKINGS_FILE),
        }
    }
}

/// A line left out of the session because it did not decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// File the line came from.
    pub path: PathBuf,
    /// One-based line number.
    pub line_number: usize,
    /// Decode failure.
    pub error: ParseError,
}

/// Diagnostics gathered while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Lines dropped under [`ParsePolicy::Skip`].
    pub skipped: Vec<SkippedLine>,
    /// Lines whose key repeated an earlier line in the same file.
    pub overwritten: usize,
}

impl LoadReport {
    /// Whether every line loaded cleanly.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.overwritten == 0
    }
}

/// Reads and writes every store in one pass.
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    files: DataFiles,
    policy: ParsePolicy,
}

impl PersistenceManager {
    /// Manager over `files` using `policy` for undecodable lines.
    pub fn new(files: DataFiles, policy: ParsePolicy) -> Self {
        Self { files, policy }
    }

    /// Backing file locations.
    pub fn files(&self) -> &DataFiles {
        &self.files
    }

    /// Policy applied to undecodable lines.
    pub fn policy(&self) -> ParsePolicy {
        self.policy
    }

    /// Populate a fresh session from the backing files.
    pub fn load_all(&self) -> Result<Session> {
        self.load_all_with_report().map(|(session, _)| session)
    }

    /// Like [`PersistenceManager::load_all`], also returning diagnostics.
    pub fn load_all_with_report(&self) -> Result<(Session, LoadReport)> {
        let mut report = LoadReport::default();
        let mut repository = Repository::new();
        let mut ledger = BookingLedger::new();

        let users = self.decode_file(&self.files.users, &mut report, User::decode)?;
        let count = users.len();
        for user in users {
            let username = user.username.clone();
            if repository.restore_user(user) {
                note_overwrite(&self.files.users, &username, &mut report);
            }
        }
        info!(path = %self.files.users.display(), count, "users loaded");

        let trains = self.decode_file(&self.files.trains, &mut report, Train::decode)?;
        let count = trains.len();
        for train in trains {
            let id = train.id;
            if repository.restore_train(train) {
                note_overwrite(&self.files.trains, &id.to_string(), &mut report);
            }
        }
        info!(path = %self.files.trains.display(), count, "trains loaded");

        let routes = self.decode_file(&self.files.routes, &mut report, Route::decode)?;
        let count = routes.len();
        for route in routes {
            let id = route.id;
            if repository.restore_route(route) {
                note_overwrite(&self.files.routes, &id.to_string(), &mut report);
            }
        }
        info!(path = %self.files.routes.display(), count, "routes loaded");

        let histories =
            self.decode_file(&self.files.bookings, &mut report, codec::decode_bookings)?;
        for (username, records) in histories {
            ledger.restore(&username, records);
        }
        info!(
            path = %self.files.bookings.display(),
            travellers = ledger.traveller_count(),
            bookings = ledger.booking_count(),
            "bookings loaded"
        );

        if !report.skipped.is_empty() {
            warn!(skipped = report.skipped.len(), "some persisted lines were skipped");
        }

        Ok((Session::from_parts(repository, ledger), report))
    }

    /// Rewrite every backing file from the given stores.
    ///
    /// Each file is written to a temporary sibling and renamed over the
    /// original, so an interrupted save leaves the previous contents intact.
    pub fn save_all(&self, repository: &Repository, ledger: &BookingLedger) -> Result<()> {
        write_lines(&self.files.users, repository.list_users().map(User::encode))?;
        info!(
            path = %self.files.users.display(),
            count = repository.user_count(),
            "users saved"
        );

        write_lines(&self.files.trains, repository.list_trains().map(Train::encode))?;
        info!(
            path = %self.files.trains.display(),
            count = repository.train_count(),
            "trains saved"
        );

        write_lines(&self.files.routes, repository.list_routes().map(Route::encode))?;
        info!(
            path = %self.files.routes.display(),
            count = repository.route_count(),
            "routes saved"
        );

        write_lines(
            &self.files.bookings,
            ledger
                .histories()
                .map(|(username, history)| codec::encode_bookings(username, history)),
        )?;
        info!(
            path = %self.files.bookings.display(),
            travellers = ledger.traveller_count(),
            "bookings saved"
        );
        Ok(())
    }

    fn decode_file<T>(
        &self,
        path: &Path,
        report: &mut LoadReport,
        decode: impl Fn(&str) -> std::result::Result<T, ParseError>,
    ) -> Result<Vec<T>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "backing file missing; starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(Error::io(path, err)),
        };

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }
            match decode(line) {
                Ok(record) => records.push(record),
                Err(error) => match self.policy {
                    ParsePolicy::Fail => return Err(error.into()),
                    ParsePolicy::Skip => {
                        warn!(
                            path = %path.display(),
                            line = index + 1,
                            "skipping malformed line: {error}"
                        );
                        report.skipped.push(SkippedLine {
                            path: path.to_path_buf(),
                            line_number: index + 1,
                            error,
                        });
                    }
                },
            }
        }
        Ok(records)
    }
}

fn note_overwrite(path: &Path, key: &str, report: &mut LoadReport) {
    warn!(path = %path.display(), key, "duplicate key; later line wins");
    report.overwritten += 1;
}

fn write_lines<I>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|err| Error::io(dir, err))?;

    let mut file = NamedTempFile::new_in(dir).map_err(|err| Error::io(dir, err))?;
    let mut written = 0usize;
    for line in lines {
        writeln!(file, "{line}").map_err(|err| Error::io(path, err))?;
        written += 1;
    }
    file.as_file()
        .sync_all()
        .map_err(|err| Error::io(path, err))?;
    file.persist(path)
        .map_err(|err| Error::io(path, err.error))?;
    debug!(path = %path.display(), lines = written, "file replaced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::EntityKind,
        models::{RouteId, TrainId},
    };
    use anyhow::Result;
    use tempfile::tempdir;

    fn manager(dir: &Path, policy: ParsePolicy) -> PersistenceManager {
        PersistenceManager::new(DataFiles::in_dir(dir), policy)
    }

    fn populated_session() -> Session {
        let mut session = Session::new();
        let repo = session.repository_mut();
        repo.register_user("alice", "pw1", "user").unwrap();
        repo.register_user("root", "pw2", "admin").unwrap();
        repo.add_train(Train::new(3, "Night", "Bergen", "Oslo", 2))
            .unwrap();
        repo.add_train(Train::new(1, "Express", "Oslo", "Bergen", 5))
            .unwrap();
        repo.add_route(Route::new(10, "Oslo", "Bergen")).unwrap();
        session.book("alice", TrainId::new(1)).unwrap();
        session.book("alice", TrainId::new(3)).unwrap();
        session.book("root", TrainId::new(1)).unwrap();
        session
    }

    #[test]
    fn save_then_load_reconstructs_session() -> Result<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path(), ParsePolicy::Fail);
        let session = populated_session();

        manager.save_all(session.repository(), session.ledger())?;
        let (loaded, report) = manager.load_all_with_report()?;

        assert!(report.is_clean());
        let (repository, ledger) = loaded.into_parts();
        assert_eq!(&repository, session.repository());
        assert_eq!(&ledger, session.ledger());
        Ok(())
    }

    #[test]
    fn files_follow_line_grammar_in_key_order() -> Result<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path(), ParsePolicy::Fail);
        populated_session().close(&manager)?;

        let files = manager.files();
        assert_eq!(
            fs::read_to_string(&files.users)?,
            "alice,pw1,user\nroot,pw2,admin\n"
        );
        assert_eq!(
            fs::read_to_string(&files.trains)?,
            "1,Express,Oslo,Bergen,3\n3,Night,Bergen,Oslo,1\n"
        );
        assert_eq!(fs::read_to_string(&files.routes)?, "10,Oslo,Bergen\n");
        assert_eq!(
            fs::read_to_string(&files.bookings)?,
            "alice:1,Express,Oslo,Bergen,4;3,Night,Bergen,Oslo,1\nroot:1,Express,Oslo,Bergen,3\n"
        );
        Ok(())
    }

    #[test]
    fn missing_files_load_as_empty_session() -> Result<()> {
        let dir = tempdir()?;
        let session = manager(&dir.path().join("fresh"), ParsePolicy::Fail).load_all()?;
        assert_eq!(session, Session::new());
        Ok(())
    }

    #[test]
    fn skip_policy_drops_bad_lines_and_reports_them() -> Result<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path(), ParsePolicy::Skip);
        let files = manager.files().clone();
        fs::write(&files.users, "alice,pw,user\nbroken line\n\nbob,pw,admin\n")?;
        fs::write(&files.trains, "1,Express,Oslo,Bergen,5\nx,Bad,A,B,1\n")?;
        fs::write(&files.routes, "7,Oslo,Bergen\r\n")?;
        fs::write(&files.bookings, "alice:1,Express,Oslo,Bergen,4;\nnocolon\n")?;

        let (session, report) = manager.load_all_with_report()?;
        let repo = session.repository();
        assert_eq!(repo.user_count(), 2);
        assert_eq!(repo.train_count(), 1);
        assert_eq!(repo.find_route(RouteId::new(7)).unwrap().destination, "Bergen");
        assert_eq!(session.bookings_for("alice").len(), 1);

        let skipped: Vec<(EntityKind, usize)> = report
            .skipped
            .iter()
            .map(|line| (line.error.kind, line.line_number))
            .collect();
        assert_eq!(
            skipped,
            vec![
                (EntityKind::User, 2),
                (EntityKind::Train, 2),
                (EntityKind::Booking, 2),
            ]
        );
        Ok(())
    }

    #[test]
    fn fail_policy_aborts_on_first_bad_line() -> Result<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path(), ParsePolicy::Fail);
        assert_eq!(manager.policy(), ParsePolicy::Fail);
        fs::write(&manager.files().trains, "1,Express,Oslo,Bergen,many\n")?;

        let err = manager.load_all().unwrap_err();
        match err {
            Error::Parse(parse) => assert_eq!(parse.kind, EntityKind::Train),
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }

    #[test]
    fn repeated_keys_keep_last_line() -> Result<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path(), ParsePolicy::Fail);
        fs::write(
            &manager.files().trains,
            "1,Old,Oslo,Bergen,5\n1,New,Oslo,Bergen,6\n",
        )?;
        fs::write(
            &manager.files().bookings,
            "alice:1,Old,Oslo,Bergen,4\nalice:1,New,Oslo,Bergen,5\n",
        )?;

        let (session, report) = manager.load_all_with_report()?;
        let train = session.repository().find_train(TrainId::new(1)).unwrap();
        assert_eq!(train.name, "New");
        assert_eq!(report.overwritten, 1);

        let names: Vec<String> = session
            .bookings_for("alice")
            .iter()
            .map(|record| record.name().to_string())
            .collect();
        assert_eq!(names, vec!["Old", "New"]);
        Ok(())
    }

    #[test]
    fn save_overwrites_previous_contents() -> Result<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path(), ParsePolicy::Fail);
        fs::write(&manager.files().routes, "1,A,B\n2,C,D\n")?;

        let mut session = manager.load_all()?;
        session.repository_mut().remove_route(RouteId::new(1))?;
        session.close(&manager)?;

        assert_eq!(fs::read_to_string(&manager.files().routes)?, "2,C,D\n");
        let leftovers = fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) != Some("txt")
            })
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[test]
    fn unreadable_path_is_an_io_error() -> Result<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path(), ParsePolicy::Skip);
        fs::create_dir(&manager.files().users)?;
        assert!(matches!(manager.load_all(), Err(Error::Io { .. })));
        Ok(())
    }
}
