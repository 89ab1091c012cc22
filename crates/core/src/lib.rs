#![warn(clippy::all, missing_docs)]

//! Core record management for the railbook reservation system.
//!
//! This crate hosts the generic containers, the line codec, the user/train/
//! route repository, the booking ledger and the flat-file persistence used
//! by the command-line front end.

pub mod codec;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod persistence;
pub mod repository;
pub mod session;
pub mod store;

pub use config::AppConfig;
pub use error::{EntityKind, Error, ParseError, Result};
pub use ledger::BookingLedger;
pub use models::{BookingRecord, Role, Route, RouteId, Train, TrainDetails, TrainId, User};
pub use persistence::{DataFiles, LoadReport, ParsePolicy, PersistenceManager};
pub use repository::Repository;
pub use session::{Session, SummaryCounts};
pub use store::{AppendOnlySequence, KeyedStore};
