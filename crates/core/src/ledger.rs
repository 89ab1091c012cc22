//! Per-user booking history and the seat-decrement protocol.

use tracing::{debug, warn};

use crate::{
    error::Result,
    models::{BookingRecord, TrainId},
    repository::{check_username, Repository},
    store::{AppendOnlySequence, KeyedStore},
};

/// Booking histories keyed by username, each oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingLedger {
    histories: KeyedStore<String, AppendOnlySequence<BookingRecord>>,
}

impl BookingLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Book one seat on `train_id` for `username`.
    ///
    /// The train loses exactly one seat and a snapshot of its fields, taken
    /// after the decrement, is appended to the user's history. A missing or
    /// full train leaves both the catalogue and the ledger unchanged, as does
    /// a username that could not be written back to the booking file.
    pub fn book(
        &mut self,
        repository: &mut Repository,
        username: &str,
        train_id: TrainId,
    ) -> Result<BookingRecord> {
        check_username(username)?;
        let train = repository.take_seat(train_id).inspect_err(|err| {
            warn!(username, train_id = %train_id, "booking refused: {err}");
        })?;
        let record = BookingRecord::snapshot(&train);
        self.history_mut(username).append(record.clone());
        debug!(username, train_id = %train_id, seats_left = train.seats, "ticket booked");
        Ok(record)
    }

    /// Copy of the user's bookings, oldest first. Empty when the user has
    /// never booked.
    pub fn bookings_for(&self, username: &str) -> Vec<BookingRecord> {
        self.history(username).to_vec()
    }

    /// Borrowed view of the user's bookings, oldest first.
    pub fn history(&self, username: &str) -> &[BookingRecord] {
        self.histories
            .find(username)
            .map(AppendOnlySequence::as_slice)
            .unwrap_or_default()
    }

    /// Histories in username order.
    pub fn histories(
        &self,
    ) -> impl Iterator<Item = (&str, &AppendOnlySequence<BookingRecord>)> + '_ {
        self.histories
            .iter()
            .map(|(username, history)| (username.as_str(), history))
    }

    /// Number of users with a history entry.
    pub fn traveller_count(&self) -> usize {
        self.histories.len()
    }

    /// Total bookings across every user.
    pub fn booking_count(&self) -> usize {
        self.histories.values().map(AppendOnlySequence::len).sum()
    }

    /// Append persisted records to a user's history, creating it if needed.
    pub(crate) fn restore(&mut self, username: &str, records: Vec<BookingRecord>) {
        self.history_mut(username).extend(records);
    }

    fn history_mut(&mut self, username: &str) -> &mut AppendOnlySequence<BookingRecord> {
        self.histories
            .get_or_insert_with(username.to_string(), AppendOnlySequence::new)
    }
}
