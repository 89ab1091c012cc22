//! Command-line surface over a loaded session.

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use railbook_core::{Role, Route, RouteId, Session, Train, TrainDetails, TrainId};
use serde::Serialize;

/// `railbook` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "railbook",
    about = "Manage users, trains, routes and bookings stored in flat files",
    version
)]
pub struct Cli {
    /// Config file to read instead of the default location.
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,
    /// Directory holding the backing files; overrides the config.
    #[arg(long = "data-dir", global = true, value_name = "path")]
    pub data_dir: Option<PathBuf>,
    /// Print listings as JSON.
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a new account.
    Register {
        username: String,
        password: String,
        #[arg(long, default_value = Role::DEFAULT)]
        role: String,
    },
    /// Check credentials and print the stored role.
    Login { username: String, password: String },
    /// Add a train to the catalogue.
    AddTrain {
        id: u32,
        name: String,
        source: String,
        destination: String,
        seats: u32,
    },
    /// Replace the details of an existing train.
    EditTrain {
        id: u32,
        name: String,
        source: String,
        destination: String,
        seats: u32,
    },
    /// Remove a train from the catalogue.
    RemoveTrain { id: u32 },
    /// List trains by id.
    Trains,
    /// Add a route.
    AddRoute {
        id: u32,
        source: String,
        destination: String,
    },
    /// Replace the endpoints of an existing route.
    EditRoute {
        id: u32,
        source: String,
        destination: String,
    },
    /// Remove a route.
    RemoveRoute { id: u32 },
    /// List routes by id.
    Routes,
    /// Book a seat after checking the user's credentials.
    Book {
        username: String,
        password: String,
        train_id: u32,
    },
    /// Show a user's bookings, oldest first.
    Bookings { username: String },
    /// Show record totals.
    Summary,
}

/// Apply `command` to `session`, writing any output to `out`.
pub fn run(command: Command, session: &mut Session, json: bool, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Register {
            username,
            password,
            role,
        } => {
            session
                .repository_mut()
                .register_user(&username, &password, &role)
                .with_context(|| format!("failed to register {username}"))?;
            writeln!(out, "User registered successfully!")?;
        }
        Command::Login { username, password } => {
            let role = session.repository().authenticate(&username, &password)?;
            writeln!(out, "Login successful! Welcome, {role} {username}")?;
        }
        Command::AddTrain {
            id,
            name,
            source,
            destination,
            seats,
        } => {
            session
                .repository_mut()
                .add_train(Train::new(id, name, source, destination, seats))?;
            writeln!(out, "Train added successfully!")?;
        }
        Command::EditTrain {
            id,
            name,
            source,
            destination,
            seats,
        } => {
            let details = TrainDetails {
                name,
                source,
                destination,
                seats,
            };
            session
                .repository_mut()
                .edit_train(TrainId::new(id), details)?;
            writeln!(out, "Train details updated successfully!")?;
        }
        Command::RemoveTrain { id } => {
            session.repository_mut().remove_train(TrainId::new(id))?;
            writeln!(out, "Train removed successfully!")?;
        }
        Command::Trains => {
            let trains: Vec<&Train> = session.repository().list_trains().collect();
            if json {
                return write_json(out, &trains);
            }
            for train in trains {
                writeln!(
                    out,
                    "ID: {}, Name: {}, From: {} To: {}, Seats: {}",
                    train.id, train.name, train.source, train.destination, train.seats
                )?;
            }
        }
        Command::AddRoute {
            id,
            source,
            destination,
        } => {
            session
                .repository_mut()
                .add_route(Route::new(id, source, destination))?;
            writeln!(out, "Route added successfully!")?;
        }
        Command::EditRoute {
            id,
            source,
            destination,
        } => {
            session
                .repository_mut()
                .edit_route(RouteId::new(id), &source, &destination)?;
            writeln!(out, "Route details updated successfully!")?;
        }
        Command::RemoveRoute { id } => {
            session.repository_mut().remove_route(RouteId::new(id))?;
            writeln!(out, "Route removed successfully!")?;
        }
        Command::Routes => {
            let routes: Vec<&Route> = session.repository().list_routes().collect();
            if json {
                return write_json(out, &routes);
            }
            for route in routes {
                writeln!(
                    out,
                    "ID: {}, From: {} To: {}",
                    route.id, route.source, route.destination
                )?;
            }
        }
        Command::Book {
            username,
            password,
            train_id,
        } => {
            session.repository().authenticate(&username, &password)?;
            let record = session.book(&username, TrainId::new(train_id))?;
            if json {
                return write_json(out, &record);
            }
            writeln!(
                out,
                "Ticket booked successfully! Train {} ({}), {} seat(s) left",
                record.train_id(),
                record.name(),
                record.seats()
            )?;
        }
        Command::Bookings { username } => {
            let bookings = session.bookings_for(&username);
            if json {
                return write_json(out, &bookings);
            }
            if bookings.is_empty() {
                writeln!(out, "No bookings found!")?;
            }
            for record in &bookings {
                writeln!(
                    out,
                    "Train ID: {}, Name: {}, From: {} To: {}",
                    record.train_id(),
                    record.name(),
                    record.source(),
                    record.destination()
                )?;
            }
        }
        Command::Summary => {
            let counts = session.summary_counts();
            if json {
                return write_json(out, &counts);
            }
            writeln!(out, "Total Users: {}", counts.users)?;
            writeln!(out, "Total Trains: {}", counts.trains)?;
            writeln!(out, "Total Routes: {}", counts.routes)?;
            writeln!(out, "Total Bookings: {}", counts.bookings)?;
        }
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to encode JSON output")?;
    writeln!(out)?;
    Ok(())
}
