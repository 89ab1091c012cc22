//! Numeric identifiers for catalogue records.

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw identifier.
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Underlying integer.
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Key of a train in the catalogue.
    TrainId
);

numeric_id!(
    /// Key of a route.
    RouteId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_numerically() {
        let mut ids: Vec<TrainId> = [10, 2, 33].into_iter().map(TrainId::from).collect();
        ids.sort();
        assert_eq!(ids, vec![TrainId::new(2), TrainId::new(10), TrainId::new(33)]);
    }

    #[test]
    fn parses_with_surrounding_whitespace() {
        assert_eq!(" 12 ".parse::<RouteId>(), Ok(RouteId::new(12)));
        assert!("-1".parse::<RouteId>().is_err());
        assert!("x".parse::<TrainId>().is_err());
    }
}
