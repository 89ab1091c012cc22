//! Shared domain models.

mod ids;

pub use ids::{RouteId, TrainId};

use serde::{Deserialize, Serialize};

/// Role names understood by front ends. The stored role is free text.
pub struct Role;

impl Role {
    /// Administrative role.
    pub const ADMIN: &'static str = "admin";
    /// Regular passenger role, used when registration names none.
    pub const DEFAULT: &'static str = "user";
}

/// Registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique login name.
    pub username: String,
    /// Stored verbatim.
    pub password: String,
    /// Free-text role, usually `admin` or `user`.
    pub role: String,
}

impl User {
    /// Build a user record.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role: role.into(),
        }
    }

    /// Whether the stored role grants catalogue administration.
    pub fn is_admin(&self) -> bool {
        self.role == Role::ADMIN
    }
}

/// Train in the catalogue together with its remaining seat count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Train {
    /// Unique identifier.
    pub id: TrainId,
    /// Display name.
    pub name: String,
    /// Departure station.
    pub source: String,
    /// Arrival station.
    pub destination: String,
    /// Seats still available for booking.
    pub seats: u32,
}

impl Train {
    /// Build a train record.
    pub fn new(
        id: u32,
        name: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
        seats: u32,
    ) -> Self {
        Self {
            id: TrainId::new(id),
            name: name.into(),
            source: source.into(),
            destination: destination.into(),
            seats,
        }
    }
}

/// Mutable part of a train, used when editing an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainDetails {
    /// Display name.
    pub name: String,
    /// Departure station.
    pub source: String,
    /// Arrival station.
    pub destination: String,
    /// Seat count to store.
    pub seats: u32,
}

/// Route between two stations. Routes are not linked to trains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Unique identifier.
    pub id: RouteId,
    /// Origin station.
    pub source: String,
    /// Terminal station.
    pub destination: String,
}

impl Route {
    /// Build a route record.
    pub fn new(
        id: u32,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            id: RouteId::new(id),
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Copy of a train's fields taken when a ticket was booked.
///
/// The snapshot owns its data, so later edits or removal of the train leave
/// recorded bookings untouched. Fields are read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingRecord(Train);

impl BookingRecord {
    /// Capture the current state of `train`.
    pub fn snapshot(train: &Train) -> Self {
        Self(train.clone())
    }

    /// Identifier of the booked train.
    pub fn train_id(&self) -> TrainId {
        self.0.id
    }

    /// Train name at booking time.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Departure station at booking time.
    pub fn source(&self) -> &str {
        &self.0.source
    }

    /// Arrival station at booking time.
    pub fn destination(&self) -> &str {
        &self.0.destination
    }

    /// Seats remaining on the train right after this booking.
    pub fn seats(&self) -> u32 {
        self.0.seats
    }

    /// Borrow the captured train fields.
    pub fn as_train(&self) -> &Train {
        &self.0
    }
}

impl From<Train> for BookingRecord {
    fn from(train: Train) -> Self {
        Self(train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_detached_from_source() {
        let mut train = Train::new(7, "Express", "Oslo", "Bergen", 3);
        let record = BookingRecord::snapshot(&train);
        train.name = "Renamed".to_string();
        train.seats = 0;
        assert_eq!(record.name(), "Express");
        assert_eq!(record.seats(), 3);
        assert_eq!(record.train_id(), TrainId::new(7));
    }

    #[test]
    fn admin_role_is_exact_match() {
        assert!(User::new("root", "pw", "admin").is_admin());
        assert!(!User::new("root", "pw", "Admin").is_admin());
        assert!(!User::new("bob", "pw", Role::DEFAULT).is_admin());
    }
}
