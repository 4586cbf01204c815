//! `flightsearch` - Flight route search with saved favorite routes
//!
//! This library provides airport autocomplete over a bundled lookup table,
//! destination listing from a departure airport, and persistent favorite
//! routes, together with the session state that ties them to a search screen.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod airport;
pub mod cli;
pub mod config;
pub mod error;
pub mod live;
pub mod logging;
pub mod preferences;
pub mod repository;
pub mod saved;
pub mod session;
pub mod storage;

pub use airport::{AirportMatch, AirportRecord, FavoriteRoute};
pub use config::Config;
pub use error::{Error, Result};
pub use live::LiveFeed;
pub use logging::init_logging;
pub use preferences::{MemorySettings, SettingsStore, UserPreferences};
pub use repository::{FlightRepository, OfflineFlightRepository, QueryFeed};
pub use saved::SavedRoutes;
pub use session::{PendingWrite, SearchSession, SearchState};
pub use storage::{Storage, StorageStats};
