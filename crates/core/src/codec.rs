//! Line-oriented text encoding for persisted records.
//!
//! Every record occupies one line. Fields are joined with [`FIELD_DELIMITER`]
//! in a fixed order and are written verbatim: nothing is quoted or escaped,
//! so the encoding is only lossless for values free of the reserved
//! characters. The repository refuses such values on the way in (see
//! [`check_free_text`]) and decoding refuses them on the way back.
//!
//! A booking line holds one user's history:
//! `username:train;train;...` where each `train` uses the train encoding.

use std::str::FromStr;

use crate::{
    error::{EntityKind, ParseError},
    models::{BookingRecord, Route, Train, User},
};

/// Separates fields inside a record.
pub const FIELD_DELIMITER: char = ',';
/// Separates the username from the bookings on a ledger line.
pub const OWNER_SEPARATOR: char = ':';
/// Separates consecutive bookings on a ledger line.
pub const RECORD_SEPARATOR: char = ';';

const RESERVED: [char; 5] = [FIELD_DELIMITER, OWNER_SEPARATOR, RECORD_SEPARATOR, '\n', '\r'];

/// A record with a single-line text form.
pub trait LineCodec: Sized {
    /// Entity family reported in decode errors.
    const KIND: EntityKind;

    /// Render the record as one line, without a terminator.
    fn encode(&self) -> String;

    /// Parse a line produced by [`LineCodec::encode`].
    fn decode(line: &str) -> Result<Self, ParseError>;
}

impl LineCodec for User {
    const KIND: EntityKind = EntityKind::User;

    fn encode(&self) -> String {
        join_fields(&[
            self.username.as_str(),
            self.password.as_str(),
            self.role.as_str(),
        ])
    }

    fn decode(line: &str) -> Result<Self, ParseError> {
        let [username, password, role] = split_fields::<3>(Self::KIND, line)?;
        if username.is_empty() {
            return Err(ParseError::new(Self::KIND, line, "empty username"));
        }
        Ok(Self::new(
            free_text(Self::KIND, line, "username", username)?,
            free_text(Self::KIND, line, "password", password)?,
            free_text(Self::KIND, line, "role", role)?,
        ))
    }
}

impl LineCodec for Train {
    const KIND: EntityKind = EntityKind::Train;

    fn encode(&self) -> String {
        join_fields(&[
            self.id.to_string().as_str(),
            self.name.as_str(),
            self.source.as_str(),
            self.destination.as_str(),
            self.seats.to_string().as_str(),
        ])
    }

    fn decode(line: &str) -> Result<Self, ParseError> {
        let [id, name, source, destination, seats] = split_fields::<5>(Self::KIND, line)?;
        Ok(Self {
            id: parse_number(Self::KIND, line, "id", id)?,
            name: free_text(Self::KIND, line, "name", name)?.to_string(),
            source: free_text(Self::KIND, line, "source", source)?.to_string(),
            destination: free_text(Self::KIND, line, "destination", destination)?.to_string(),
            seats: parse_number(Self::KIND, line, "seats", seats)?,
        })
    }
}

impl LineCodec for Route {
    const KIND: EntityKind = EntityKind::Route;

    fn encode(&self) -> String {
        join_fields(&[
            self.id.to_string().as_str(),
            self.source.as_str(),
            self.destination.as_str(),
        ])
    }

    fn decode(line: &str) -> Result<Self, ParseError> {
        let [id, source, destination] = split_fields::<3>(Self::KIND, line)?;
        Ok(Self {
            id: parse_number(Self::KIND, line, "id", id)?,
            source: free_text(Self::KIND, line, "source", source)?.to_string(),
            destination: free_text(Self::KIND, line, "destination", destination)?.to_string(),
        })
    }
}

/// Render a user's booking history as one ledger line.
pub fn encode_bookings<'a, I>(username: &str, records: I) -> String
where
    I: IntoIterator<Item = &'a BookingRecord>,
{
    let segments: Vec<String> = records
        .into_iter()
        .map(|record| record.as_train().encode())
        .collect();
    format!(
        "{username}{OWNER_SEPARATOR}{}",
        segments.join(RECORD_SEPARATOR.to_string().as_str())
    )
}

/// Parse a ledger line into the owner and their bookings, oldest first.
///
/// Empty segments are ignored, which also accepts a trailing separator.
pub fn decode_bookings(line: &str) -> Result<(String, Vec<BookingRecord>), ParseError> {
    let kind = EntityKind::Booking;
    let (username, rest) = line
        .split_once(OWNER_SEPARATOR)
        .ok_or_else(|| ParseError::new(kind, line, format!("missing '{OWNER_SEPARATOR}'")))?;
    if username.is_empty() {
        return Err(ParseError::new(kind, line, "empty username"));
    }
    free_text(kind, line, "username", username)?;

    let records = rest
        .split(RECORD_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            Train::decode(segment)
                .map(BookingRecord::from)
                .map_err(|err| ParseError::new(kind, line, err.reason))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((username.to_string(), records))
}

/// Check that `value` can be written without corrupting the line format.
///
/// Returns the offending character when one is found.
pub fn check_free_text(value: &str) -> Result<(), char> {
    match value.chars().find(|ch| RESERVED.contains(ch)) {
        Some(ch) => Err(ch),
        None => Ok(()),
    }
}

fn join_fields(fields: &[&str]) -> String {
    fields.join(FIELD_DELIMITER.to_string().as_str())
}

fn split_fields<const N: usize>(kind: EntityKind, line: &str) -> Result<[&str; N], ParseError> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    let found = fields.len();
    fields.try_into().map_err(|_| {
        ParseError::new(kind, line, format!("expected {N} fields, found {found}"))
    })
}

// A decoded field must re-encode to the same line, so reserved characters
// that the field split did not consume are refused here.
fn free_text<'a>(
    kind: EntityKind,
    line: &str,
    field: &str,
    value: &'a str,
) -> Result<&'a str, ParseError> {
    check_free_text(value)
        .map(|()| value)
        .map_err(|ch| ParseError::new(kind, line, format!("{field} contains {ch:?}")))
}

fn parse_number<T>(kind: EntityKind, line: &str, field: &str, raw: &str) -> Result<T, ParseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err| ParseError::new(kind, line, format!("{field} {raw:?}: {err}")))
}
