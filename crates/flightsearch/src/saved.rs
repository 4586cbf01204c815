//! Favorite membership tracking.
//!
//! [`SavedRoutes`] answers "is this route saved?" without a round trip to the
//! store. It keeps two tiers:
//!
//! - a confirmed set, the last authoritative view of the favorites table
//!   (acknowledged writes and reconciled snapshots), and
//! - an overlay of optimistic intents for writes that are still in flight.
//!
//! The overlay wins while a write is pending. Acknowledgement folds the intent
//! into the confirmed set; failure drops it.

use std::collections::{HashMap, HashSet};

use crate::airport::{AirportMatch, FavoriteRoute};

/// An optimistic change that the store has not acknowledged yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingChange {
    /// Shown as saved; insert in flight.
    Save,
    /// Shown as not saved; delete in flight.
    Remove,
}

/// Saved-flag bookkeeping for favorite routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedRoutes {
    confirmed: HashSet<FavoriteRoute>,
    overlay: HashMap<FavoriteRoute, PendingChange>,
}

impl SavedRoutes {
    /// Create an empty tracker. Every route reads as not saved.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `route` should be shown as saved.
    #[must_use]
    pub fn is_saved(&self, route: &FavoriteRoute) -> bool {
        match self.overlay.get(route) {
            Some(PendingChange::Save) => true,
            Some(PendingChange::Remove) => false,
            None => self.confirmed.contains(route),
        }
    }

    /// The in-flight change for `route`, if any.
    #[must_use]
    pub fn pending(&self, route: &FavoriteRoute) -> Option<PendingChange> {
        self.overlay.get(route).copied()
    }

    /// Every route currently shown as saved, sorted.
    #[must_use]
    pub fn saved(&self) -> Vec<FavoriteRoute> {
        let mut routes: Vec<_> = self
            .confirmed
            .iter()
            .chain(self.overlay.keys())
            .filter(|r| self.is_saved(r))
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        routes.sort();
        routes
    }

    /// Record an optimistic save.
    pub fn begin_save(&mut self, route: FavoriteRoute) {
        self.overlay.insert(route, PendingChange::Save);
    }

    /// Record an optimistic removal.
    ///
    /// Returns `false` (and records nothing) if the route is not shown as saved.
    pub fn begin_remove(&mut self, route: &FavoriteRoute) -> bool {
        if !self.is_saved(route) {
            return false;
        }
        self.overlay.insert(route.clone(), PendingChange::Remove);
        true
    }

    /// Record an optimistic removal of every route shown as saved.
    ///
    /// Returns the routes that were flipped.
    pub fn begin_remove_all(&mut self) -> Vec<FavoriteRoute> {
        let routes = self.saved();
        for route in &routes {
            self.overlay.insert(route.clone(), PendingChange::Remove);
        }
        routes
    }

    /// The store acknowledged an insert of `route`.
    pub fn save_confirmed(&mut self, route: &FavoriteRoute) {
        self.confirmed.insert(route.clone());
        self.settle(route, PendingChange::Save);
    }

    /// The store rejected an insert of `route`; the optimistic flag is dropped.
    pub fn save_failed(&mut self, route: &FavoriteRoute) {
        self.settle(route, PendingChange::Save);
    }

    /// The store acknowledged a delete of `route`.
    pub fn remove_confirmed(&mut self, route: &FavoriteRoute) {
        self.confirmed.remove(route);
        self.settle(route, PendingChange::Remove);
    }

    /// The store rejected a delete of `route`; the optimistic flag is dropped.
    pub fn remove_failed(&mut self, route: &FavoriteRoute) {
        self.settle(route, PendingChange::Remove);
    }

    /// The store acknowledged deleting every favorite.
    ///
    /// `flipped` are the routes returned by [`begin_remove_all`](Self::begin_remove_all).
    pub fn remove_all_confirmed(&mut self, flipped: &[FavoriteRoute]) {
        self.confirmed.clear();
        for route in flipped {
            self.settle(route, PendingChange::Remove);
        }
    }

    /// The store rejected deleting every favorite.
    pub fn remove_all_failed(&mut self, flipped: &[FavoriteRoute]) {
        for route in flipped {
            self.settle(route, PendingChange::Remove);
        }
    }

    /// Apply an authoritative favorites snapshot for routes departing from
    /// `departure` towards any of `destinations`.
    ///
    /// Routes present in the snapshot become saved. Routes in scope that are
    /// absent from it are cleared, unless a write for them is still in flight.
    /// An in-flight intent that the snapshot already reflects is settled.
    /// Routes outside the scope are left untouched.
    pub fn reconcile(
        &mut self,
        snapshot: &[FavoriteRoute],
        departure: &AirportMatch,
        destinations: &[AirportMatch],
    ) {
        for destination in destinations {
            let route = FavoriteRoute::between(departure, destination);
            let stored = snapshot
                .iter()
                .any(|f| f.connects(&departure.iata_code, &destination.iata_code));

            if stored {
                self.confirmed.insert(route.clone());
                self.settle(&route, PendingChange::Save);
            } else {
                self.confirmed.remove(&route);
                self.settle(&route, PendingChange::Remove);
            }
        }
    }

    fn settle(&mut self, route: &FavoriteRoute, change: PendingChange) {
        if self.overlay.get(route) == Some(&change) {
            self.overlay.remove(route);
        }
    }
}
