//! Session context owning every store for the lifetime of one run.
//!
//! A session is produced by [`PersistenceManager::load_all`], mutated in
//! memory through the operations below, and consumed by [`Session::close`],
//! which writes everything back.

use serde::Serialize;

use crate::{
    error::Result,
    ledger::BookingLedger,
    models::{BookingRecord, TrainId},
    persistence::PersistenceManager,
    repository::Repository,
};

/// Totals shown on an overview screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SummaryCounts {
    /// Registered users.
    pub users: usize,
    /// Trains in the catalogue.
    pub trains: usize,
    /// Routes.
    pub routes: usize,
    /// Booking records across all users.
    pub bookings: usize,
    /// Users with a booking history.
    pub travellers: usize,
}

/// Repository and booking ledger for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    repository: Repository,
    ledger: BookingLedger,
}

impl Session {
    /// Empty session with no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a session from already populated stores.
    pub fn from_parts(repository: Repository, ledger: BookingLedger) -> Self {
        Self { repository, ledger }
    }

    /// Split the session back into its stores.
    pub fn into_parts(self) -> (Repository, BookingLedger) {
        (self.repository, self.ledger)
    }

    /// Users, trains and routes.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Mutable access for catalogue and account operations.
    pub fn repository_mut(&mut self) -> &mut Repository {
        &mut self.repository
    }

    /// Booking histories.
    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    /// Book a seat on `train_id` for `username`. See [`BookingLedger::book`].
    pub fn book(&mut self, username: &str, train_id: TrainId) -> Result<BookingRecord> {
        self.ledger.book(&mut self.repository, username, train_id)
    }

    /// The user's bookings, oldest first.
    pub fn bookings_for(&self, username: &str) -> Vec<BookingRecord> {
        self.ledger.bookings_for(username)
    }

    /// Record totals across every store.
    pub fn summary_counts(&self) -> SummaryCounts {
        SummaryCounts {
            users: self.repository.user_count(),
            trains: self.repository.train_count(),
            routes: self.repository.route_count(),
            bookings: self.ledger.booking_count(),
            travellers: self.ledger.traveller_count(),
        }
    }

    /// Write every store through `manager` and end the session.
    pub fn close(self, manager: &PersistenceManager) -> Result<()> {
        manager.save_all(&self.repository, &self.ledger)
    }
}
