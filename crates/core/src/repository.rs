//! Users, trains and routes with reject-on-duplicate semantics.
//!
//! Each family lives in its own [`KeyedStore`]. The store itself overwrites
//! on a repeated key; the domain operations here check for the key first and
//! report [`Error::DuplicateKey`] instead.

use tracing::debug;

use crate::{
    codec,
    error::{EntityKind, Error, Result},
    models::{Route, RouteId, Train, TrainDetails, TrainId, User},
    store::KeyedStore,
};

/// Catalogue and account records held for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repository {
    users: KeyedStore<String, User>,
    trains: KeyedStore<TrainId, Train>,
    routes: KeyedStore<RouteId, Route>,
}

impl Repository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new account.
    pub fn register_user(&mut self, username: &str, password: &str, role: &str) -> Result<()> {
        check_username(username)?;
        check_field("password", password)?;
        check_field("role", role)?;

        if self.users.contains_key(username) {
            return Err(Error::duplicate(EntityKind::User, username));
        }
        self.users
            .insert(username.to_string(), User::new(username, password, role));
        debug!(username, role, "user registered");
        Ok(())
    }

    /// Check credentials and return the stored role on success.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<&str> {
        match self.users.find(username) {
            Some(user) if user.password == password => Ok(user.role.as_str()),
            _ => Err(Error::Authentication),
        }
    }

    /// Look up an account.
    pub fn find_user(&self, username: &str) -> Option<&User> {
        self.users.find(username)
    }

    /// Accounts in username order.
    pub fn list_users(&self) -> impl Iterator<Item = &User> + '_ {
        self.users.values()
    }

    /// Add a train to the catalogue.
    pub fn add_train(&mut self, train: Train) -> Result<()> {
        check_train_text(&train.name, &train.source, &train.destination)?;
        if self.trains.contains_key(&train.id) {
            return Err(Error::duplicate(EntityKind::Train, train.id));
        }
        debug!(id = %train.id, name = %train.name, seats = train.seats, "train added");
        self.trains.insert(train.id, train);
        Ok(())
    }

    /// Replace every mutable field of an existing train, keeping its id.
    pub fn edit_train(&mut self, id: TrainId, details: TrainDetails) -> Result<&Train> {
        check_train_text(&details.name, &details.source, &details.destination)?;
        let train = self
            .trains
            .find_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Train, id))?;
        train.name = details.name;
        train.source = details.source;
        train.destination = details.destination;
        train.seats = details.seats;
        debug!(%id, "train updated");
        Ok(train)
    }

    /// Remove a train, returning the record that was deleted.
    pub fn remove_train(&mut self, id: TrainId) -> Result<Train> {
        let removed = self
            .trains
            .take(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Train, id))?;
        debug!(%id, "train removed");
        Ok(removed)
    }

    /// Look up a train.
    pub fn find_train(&self, id: TrainId) -> Option<&Train> {
        self.trains.find(&id)
    }

    /// Trains in ascending id order.
    pub fn list_trains(&self) -> impl Iterator<Item = &Train> + '_ {
        self.trains.values()
    }

    /// Add a route.
    pub fn add_route(&mut self, route: Route) -> Result<()> {
        check_field("source", &route.source)?;
        check_field("destination", &route.destination)?;
        if self.routes.contains_key(&route.id) {
            return Err(Error::duplicate(EntityKind::Route, route.id));
        }
        debug!(id = %route.id, "route added");
        self.routes.insert(route.id, route);
        Ok(())
    }

    /// Replace the endpoints of an existing route, keeping its id.
    pub fn edit_route(&mut self, id: RouteId, source: &str, destination: &str) -> Result<&Route> {
        check_field("source", source)?;
        check_field("destination", destination)?;
        let route = self
            .routes
            .find_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Route, id))?;
        route.source = source.to_string();
        route.destination = destination.to_string();
        debug!(%id, "route updated");
        Ok(route)
    }

    /// Remove a route, returning the record that was deleted.
    pub fn remove_route(&mut self, id: RouteId) -> Result<Route> {
        let removed = self
            .routes
            .take(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Route, id))?;
        debug!(%id, "route removed");
        Ok(removed)
    }

    /// Look up a route.
    pub fn find_route(&self, id: RouteId) -> Option<&Route> {
        self.routes.find(&id)
    }

    /// Routes in ascending id order.
    pub fn list_routes(&self) -> impl Iterator<Item = &Route> + '_ {
        self.routes.values()
    }

    /// Number of registered users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of trains in the catalogue.
    pub fn train_count(&self) -> usize {
        self.trains.len()
    }

    /// Number of routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Take one seat on `id` and return a copy of the train as it stands
    /// afterwards. Nothing changes when the train is missing or full.
    pub(crate) fn take_seat(&mut self, id: TrainId) -> Result<Train> {
        let train = self
            .trains
            .find_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Train, id))?;
        train.seats = train
            .seats
            .checked_sub(1)
            .ok_or(Error::CapacityExhausted { train_id: id })?;
        Ok(train.clone())
    }

    // Restoring from disk goes straight to the stores: a repeated key in a
    // file overwrites the earlier line. The return value reports that case.

    pub(crate) fn restore_user(&mut self, user: User) -> bool {
        self.users.insert(user.username.clone(), user).is_some()
    }

    pub(crate) fn restore_train(&mut self, train: Train) -> bool {
        self.trains.insert(train.id, train).is_some()
    }

    pub(crate) fn restore_route(&mut self, route: Route) -> bool {
        self.routes.insert(route.id, route).is_some()
    }
}

/// Usernames key both the account file and the booking file, so they must
/// be non-empty and free of reserved characters.
pub(crate) fn check_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(Error::InvalidField {
            field: "username",
            reason: "must not be empty".to_string(),
        });
    }
    check_field("username", username)
}

fn check_train_text(name: &str, source: &str, destination: &str) -> Result<()> {
    check_field("name", name)?;
    check_field("source", source)?;
    check_field("destination", destination)
}

fn check_field(field: &'static str, value: &str) -> Result<()> {
    codec::check_free_text(value).map_err(|ch| Error::InvalidField {
        field,
        reason: format!("must not contain {ch:?}"),
    })
}
