//! Data access over the airport and favorites tables.
//!
//! Reads are exposed as [`LiveFeed`]s that re-run their query whenever the
//! table they read from changes. Writes bump a per-table generation counter
//! which wakes every feed watching that table.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::airport::{AirportMatch, AirportRecord, FavoriteRoute};
use crate::error::{Error, Result};
use crate::live::LiveFeed;
use crate::storage::{Storage, StorageStats};

/// A live feed of query results. A failed query yields one `Err` and ends the feed.
pub type QueryFeed<T> = LiveFeed<Result<Vec<T>>>;

/// Read and write access to airports and favorite routes.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// Airports whose code or name contains `query`, busiest first.
    fn suggest_airports(&self, query: &str) -> QueryFeed<AirportMatch>;

    /// Every airport except the one matching both `exclude_code` and
    /// `exclude_name`, busiest first.
    fn suggest_destinations(&self, exclude_code: &str, exclude_name: &str)
        -> QueryFeed<AirportMatch>;

    /// Save a route. Saving an already saved route is not an error.
    async fn add_favorite(&self, route: &FavoriteRoute) -> Result<()>;

    /// Forget a route. Forgetting an unsaved route is not an error.
    async fn remove_favorite(&self, route: &FavoriteRoute) -> Result<()>;

    /// Forget every saved route.
    async fn clear_all_favorites(&self) -> Result<()>;

    /// All saved routes in insertion order.
    fn list_favorites(&self) -> QueryFeed<FavoriteRoute>;
}

/// [`FlightRepository`] backed by the local `SQLite` database.
#[derive(Debug, Clone)]
pub struct OfflineFlightRepository {
    storage: Arc<Mutex<Storage>>,
    airports_changed: Arc<watch::Sender<u64>>,
    favorites_changed: Arc<watch::Sender<u64>>,
}

impl OfflineFlightRepository {
    /// Wrap an opened storage.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            airports_changed: Arc::new(watch::channel(0).0),
            favorites_changed: Arc::new(watch::channel(0).0),
        }
    }

    /// Look up a single airport by IATA code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AirportNotFound`] if no airport has that code, or a
    /// database error if the lookup fails.
    pub fn airport(&self, iata_code: &str) -> Result<AirportRecord> {
        with_storage(&self.storage, |s| s.airport(iata_code))?
            .ok_or_else(|| Error::airport_not_found(iata_code))
    }

    /// Replace the airport lookup table and wake feeds reading from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn reseed(&self, airports: &[AirportRecord]) -> Result<usize> {
        let count = with_storage(&self.storage, |s| s.seed_airports(airports))?;
        bump(&self.airports_changed);
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        with_storage(&self.storage, Storage::stats)
    }

    fn airport_feed<Q>(&self, query: Q) -> QueryFeed<AirportMatch>
    where
        Q: Fn(&Storage) -> Result<Vec<AirportMatch>> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        LiveFeed::watching(self.airports_changed.subscribe(), move || {
            with_storage(&storage, &query)
        })
        .fuse_on_error()
    }
}

#[async_trait]
impl FlightRepository for OfflineFlightRepository {
    fn suggest_airports(&self, query: &str) -> QueryFeed<AirportMatch> {
        let query = query.to_string();
        self.airport_feed(move |s| s.search_airports(&query))
    }

    fn suggest_destinations(
        &self,
        exclude_code: &str,
        exclude_name: &str,
    ) -> QueryFeed<AirportMatch> {
        let code = exclude_code.to_string();
        let name = exclude_name.to_string();
        self.airport_feed(move |s| s.destinations(&code, &name))
    }

    async fn add_favorite(&self, route: &FavoriteRoute) -> Result<()> {
        if with_storage(&self.storage, |s| s.insert_favorite(route))? {
            debug!("Saved favorite {}", route);
            bump(&self.favorites_changed);
        }
        Ok(())
    }

    async fn remove_favorite(&self, route: &FavoriteRoute) -> Result<()> {
        if with_storage(&self.storage, |s| s.delete_favorite(route))? {
            debug!("Removed favorite {}", route);
            bump(&self.favorites_changed);
        }
        Ok(())
    }

    async fn clear_all_favorites(&self) -> Result<()> {
        if with_storage(&self.storage, Storage::delete_all_favorites)? > 0 {
            bump(&self.favorites_changed);
        }
        Ok(())
    }

    fn list_favorites(&self) -> QueryFeed<FavoriteRoute> {
        let storage = Arc::clone(&self.storage);
        LiveFeed::watching(self.favorites_changed.subscribe(), move || {
            with_storage(&storage, Storage::favorites)
        })
        .fuse_on_error()
    }
}

fn with_storage<R>(
    storage: &Mutex<Storage>,
    f: impl FnOnce(&Storage) -> Result<R>,
) -> Result<R> {
    let guard = storage
        .lock()
        .map_err(|_| Error::internal("storage mutex poisoned"))?;
    f(&guard)
}

fn bump(changes: &watch::Sender<u64>) {
    changes.send_modify(|generation| *generation = generation.wrapping_add(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(code: &str, name: &str, passengers: i64) -> AirportRecord {
        AirportRecord {
            id: 0,
            iata_code: code.to_string(),
            name: name.to_string(),
            passengers,
        }
    }

    fn create_test_repository() -> OfflineFlightRepository {
        let storage = Storage::open_in_memory_with(&[
            airport("OPO", "Francisco Sa Carneiro Airport", 13_000_000),
            airport("LIS", "Humberto Delgado Airport", 31_000_000),
            airport("JFK", "John F. Kennedy International Airport", 62_000_000),
        ])
        .unwrap();
        OfflineFlightRepository::new(storage)
    }

    async fn first<T: Send + 'static>(mut feed: QueryFeed<T>) -> Vec<T> {
        feed.next().await.expect("feed ended").expect("query failed")
    }

    #[tokio::test]
    async fn test_suggest_airports() {
        let repo = create_test_repository();
        let results = first(repo.suggest_airports("Airport")).await;
        let codes: Vec<_> = results.iter().map(|a| a.iata_code.as_str()).collect();
        assert_eq!(codes, vec!["JFK", "LIS", "OPO"]);
    }

    #[tokio::test]
    async fn test_suggest_destinations() {
        let repo = create_test_repository();
        let results = first(repo.suggest_destinations("LIS", "Humberto Delgado Airport")).await;
        assert!(results.iter().all(|a| a.iata_code != "LIS"));
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_list_favorites_is_live() {
        let repo = create_test_repository();
        let mut feed = repo.list_favorites();
        assert!(feed.next().await.unwrap().unwrap().is_empty());

        let route = FavoriteRoute::new("OPO", "LIS");
        repo.add_favorite(&route).await.unwrap();
        assert_eq!(feed.next().await.unwrap().unwrap(), vec![route.clone()]);

        repo.remove_favorite(&route).await.unwrap();
        assert!(feed.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_favorite_twice_stores_once() {
        let repo = create_test_repository();
        let route = FavoriteRoute::new("JFK", "OPO");
        repo.add_favorite(&route).await.unwrap();
        repo.add_favorite(&route).await.unwrap();

        assert_eq!(first(repo.list_favorites()).await, vec![route]);
    }

    #[tokio::test]
    async fn test_remove_missing_favorite_is_noop() {
        let repo = create_test_repository();
        assert!(repo
            .remove_favorite(&FavoriteRoute::new("OPO", "JFK"))
            .await
            .is_ok());
        assert!(first(repo.list_favorites()).await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_favorites() {
        let repo = create_test_repository();
        repo.add_favorite(&FavoriteRoute::new("OPO", "LIS"))
            .await
            .unwrap();
        repo.add_favorite(&FavoriteRoute::new("LIS", "JFK"))
            .await
            .unwrap();

        let mut feed = repo.list_favorites();
        assert_eq!(feed.next().await.unwrap().unwrap().len(), 2);

        repo.clear_all_favorites().await.unwrap();
        assert!(feed.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reseed_wakes_airport_feeds() {
        let repo = create_test_repository();
        let mut feed = repo.suggest_airports("MUC");
        assert!(feed.next().await.unwrap().unwrap().is_empty());

        repo.reseed(&[airport("MUC", "Munich International Airport", 1)])
            .unwrap();
        let results = feed.next().await.unwrap().unwrap();
        assert_eq!(results, vec![AirportMatch::new("MUC", "Munich International Airport")]);
    }

    #[tokio::test]
    async fn test_airport_lookup() {
        let repo = create_test_repository();
        assert_eq!(repo.airport("jfk").unwrap().iata_code, "JFK");
        assert!(repo.airport("ZZZ").unwrap_err().is_not_found());
    }
}
