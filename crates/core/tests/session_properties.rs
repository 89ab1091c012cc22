use std::fs;

use anyhow::Result;
use railbook_core::{
    codec::LineCodec, DataFiles, Error, KeyedStore, ParsePolicy, PersistenceManager, Route,
    RouteId, Session, Train, TrainDetails, TrainId, User,
};
use tempfile::tempdir;

fn seeded_session() -> Result<Session> {
    let mut session = Session::new();
    let repo = session.repository_mut();
    repo.register_user("alice", "secret", "user")?;
    repo.register_user("root", "toor", "admin")?;
    repo.add_train(Train::new(7, "Night", "Bergen", "Oslo", 3))?;
    repo.add_train(Train::new(2, "Express", "Oslo", "Bergen", 1))?;
    repo.add_route(Route::new(4, "Oslo", "Trondheim"))?;
    repo.add_route(Route::new(1, "Bergen", "Stavanger"))?;
    Ok(session)
}

#[test]
fn records_survive_encode_and_decode() -> Result<()> {
    let user = User::new("alice", "secret", "admin");
    let train = Train::new(12, "Coastal Line", "Bodø", "Narvik", 40);
    let route = Route::new(3, "Oslo", "Bergen");

    assert_eq!(User::decode(&user.encode())?, user);
    assert_eq!(Train::decode(&train.encode())?, train);
    assert_eq!(Route::decode(&route.encode())?, route);
    Ok(())
}

#[test]
fn container_updates_where_repository_rejects() -> Result<()> {
    let mut store = KeyedStore::new();
    for key in [5, 1, 3] {
        store.insert(key, key * 10);
    }
    assert_eq!(store.keys().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
    assert_eq!(store.insert(3, 0), Some(30));
    assert_eq!(store.len(), 3);

    let mut session = seeded_session()?;
    let err = session
        .repository_mut()
        .add_train(Train::new(2, "Impostor", "A", "B", 99))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { .. }));
    let kept = session.repository().find_train(TrainId::new(2)).expect("train 2");
    assert_eq!(kept.name, "Express");
    assert_eq!(kept.seats, 1);
    Ok(())
}

#[test]
fn listings_follow_id_order() -> Result<()> {
    let session = seeded_session()?;
    let train_ids: Vec<u32> = session
        .repository()
        .list_trains()
        .map(|train| train.id.get())
        .collect();
    let route_ids: Vec<u32> = session
        .repository()
        .list_routes()
        .map(|route| route.id.get())
        .collect();
    assert_eq!(train_ids, vec![2, 7]);
    assert_eq!(route_ids, vec![1, 4]);
    Ok(())
}

#[test]
fn last_seat_is_sold_once_and_snapshot_is_frozen() -> Result<()> {
    let mut session = seeded_session()?;
    let express = TrainId::new(2);

    let record = session.book("alice", express)?;
    assert_eq!(record.name(), "Express");
    assert_eq!(session.repository().find_train(express).map(|t| t.seats), Some(0));

    let err = session.book("alice", express).unwrap_err();
    assert!(matches!(err, Error::CapacityExhausted { train_id } if train_id == express));
    assert_eq!(session.repository().find_train(express).map(|t| t.seats), Some(0));

    session.repository_mut().edit_train(
        express,
        TrainDetails {
            name: "Renamed".into(),
            source: "Oslo".into(),
            destination: "Bergen".into(),
            seats: 5,
        },
    )?;
    let bookings = session.bookings_for("alice");
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].name(), "Express");

    assert!(session.bookings_for("neverBooked").is_empty());
    assert!(matches!(
        session.book("alice", TrainId::new(99)),
        Err(Error::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn save_then_load_reconstructs_session() -> Result<()> {
    let dir = tempdir()?;
    let manager = PersistenceManager::new(DataFiles::in_dir(dir.path()), ParsePolicy::Skip);

    let mut session = seeded_session()?;
    session.book("alice", TrainId::new(7))?;
    session.book("alice", TrainId::new(2))?;
    session.book("root", TrainId::new(7))?;
    session.repository_mut().remove_route(RouteId::new(4))?;

    let expected = session.clone();
    session.close(&manager)?;

    let (reloaded, report) = manager.load_all_with_report()?;
    assert!(report.is_clean());
    assert_eq!(reloaded, expected);

    let alice: Vec<u32> = reloaded
        .bookings_for("alice")
        .iter()
        .map(|record| record.train_id().get())
        .collect();
    assert_eq!(alice, vec![7, 2]);
    assert_eq!(reloaded.summary_counts().bookings, 3);
    Ok(())
}

#[test]
fn hand_written_files_load_with_skip_policy() -> Result<()> {
    let dir = tempdir()?;
    let files = DataFiles::in_dir(dir.path());
    fs::write(&files.users, "alice,secret,user\r\nbroken line\n\nroot,toor,admin\n")?;
    fs::write(&files.trains, "1,Express,Oslo,Bergen,4\n2,Night,Bergen,Oslo,many\n")?;
    fs::write(&files.bookings, "alice:1,Express,Oslo,Bergen,4;\n")?;

    let manager = PersistenceManager::new(files.clone(), ParsePolicy::Skip);
    let (session, report) = manager.load_all_with_report()?;
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(session.repository().user_count(), 2);
    assert_eq!(session.repository().train_count(), 1);
    assert_eq!(session.repository().route_count(), 0);
    assert_eq!(session.bookings_for("alice").len(), 1);
    assert_eq!(session.repository().authenticate("alice", "secret")?, "user");

    let strict = PersistenceManager::new(files, ParsePolicy::Fail);
    assert!(matches!(strict.load_all(), Err(Error::Parse(_))));
    Ok(())
}

#[test]
fn unwritable_text_never_reaches_the_booking_file() -> Result<()> {
    let dir = tempdir()?;
    let files = DataFiles::in_dir(dir.path());
    fs::write(
        &files.trains,
        "1,Ex;press,Oslo,Bergen,5\n2,Night,Bergen:S,Oslo,5\n3,Coastal,Bodø,Narvik,5\n",
    )?;
    fs::write(&files.users, ",pw,user\nalice,pw,user\n")?;

    let manager = PersistenceManager::new(files.clone(), ParsePolicy::Skip);
    let (mut session, report) = manager.load_all_with_report()?;
    let skipped: Vec<usize> = report.skipped.iter().map(|line| line.line_number).collect();
    assert_eq!(skipped, vec![1, 1, 2]);
    assert_eq!(session.repository().train_count(), 1);
    assert_eq!(session.repository().user_count(), 1);

    for username in ["a:b", ""] {
        assert!(matches!(
            session.book(username, TrainId::new(3)),
            Err(Error::InvalidField { .. })
        ));
    }
    session.book("alice", TrainId::new(3))?;
    let expected = session.clone();
    session.close(&manager)?;

    let strict = PersistenceManager::new(files, ParsePolicy::Fail);
    assert_eq!(strict.load_all()?, expected);
    Ok(())
}
