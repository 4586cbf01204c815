//! Core airport and route types for flightsearch.
//!
//! This module defines the records read from the lookup table and the
//! favorite routes stored by the user.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A row of the read-only airport lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportRecord {
    /// Row identifier (assigned by the storage layer when seeding).
    #[serde(default)]
    pub id: i64,

    /// Three-letter IATA code.
    pub iata_code: String,

    /// Human-readable airport name.
    pub name: String,

    /// Yearly passenger volume, used to rank search results.
    pub passengers: i64,
}

impl AirportRecord {
    /// Project this record down to the fields shown in result lists.
    #[must_use]
    pub fn to_match(&self) -> AirportMatch {
        AirportMatch::new(self.iata_code.clone(), self.name.clone())
    }
}

/// The code/name pair returned by suggestion and destination queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AirportMatch {
    /// Three-letter IATA code.
    pub iata_code: String,

    /// Human-readable airport name.
    pub name: String,
}

impl AirportMatch {
    /// Create a new match.
    #[must_use]
    pub fn new(iata_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iata_code: iata_code.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for AirportMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.iata_code, self.name)
    }
}

/// A saved (departure, destination) pair.
///
/// Equality and hashing cover both codes, matching the uniqueness constraint
/// on the favorites table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FavoriteRoute {
    /// IATA code of the departure airport.
    pub departure_code: String,

    /// IATA code of the destination airport.
    pub destination_code: String,
}

impl FavoriteRoute {
    /// Create a new route.
    #[must_use]
    pub fn new(departure_code: impl Into<String>, destination_code: impl Into<String>) -> Self {
        Self {
            departure_code: departure_code.into(),
            destination_code: destination_code.into(),
        }
    }

    /// The route from `departure` to `destination`.
    #[must_use]
    pub fn between(departure: &AirportMatch, destination: &AirportMatch) -> Self {
        Self::new(departure.iata_code.clone(), destination.iata_code.clone())
    }

    /// Check whether this route departs from `departure` and lands at `destination`.
    #[must_use]
    pub fn connects(&self, departure: &str, destination: &str) -> bool {
        self.departure_code == departure && self.destination_code == destination
    }
}

impl fmt::Display for FavoriteRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.departure_code, self.destination_code)
    }
}
