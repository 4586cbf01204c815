//! Search session state.
//!
//! A [`SearchSession`] owns the observable [`SearchState`] for one search
//! screen: the text being typed, the selected departure airport, which routes
//! are saved, and whether the delete-all confirmation is showing. Favorite
//! writes are applied to the state optimistically and reconciled when the
//! store answers.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, warn};

use crate::airport::{AirportMatch, FavoriteRoute};
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::live::LiveFeed;
use crate::preferences::{last_user_input, SettingsStore};
use crate::repository::{FlightRepository, QueryFeed};
use crate::saved::SavedRoutes;

/// Snapshot of a search screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Text currently typed into the search field.
    pub user_input: String,
    /// Last airport picked from the suggestions.
    pub selected_airport: Option<AirportMatch>,
    /// Whether `selected_airport` was picked since the text last changed.
    pub is_airport_selected: bool,
    /// Saved flags for favorite routes.
    pub saved_routes: SavedRoutes,
    /// Whether the delete-all confirmation is showing.
    pub is_delete_dialog_visible: bool,
}

impl SearchState {
    /// The selected airport, if it was picked since the text last changed.
    #[must_use]
    pub fn active_selection(&self) -> Option<&AirportMatch> {
        self.selected_airport
            .as_ref()
            .filter(|_| self.is_airport_selected)
    }
}

/// A favorite write that has been applied optimistically.
///
/// The write runs whether or not this handle is awaited. Awaiting
/// [`confirmed`](Self::confirmed) reports how the store answered.
#[derive(Debug)]
pub struct PendingWrite {
    handle: JoinHandle<Result<()>>,
}

impl PendingWrite {
    fn spawn<F>(write: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(write),
        }
    }

    /// Wait for the store's answer.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write was rejected. The optimistic
    /// change has already been rolled back by then.
    pub async fn confirmed(self) -> Result<()> {
        self.handle
            .await
            .map_err(|e| Error::internal(format!("favorite write task failed: {e}")))?
    }
}

/// State manager for one search screen.
pub struct SearchSession {
    repository: Arc<dyn FlightRepository>,
    state: Arc<watch::Sender<SearchState>>,
    input_edited: Arc<AtomicBool>,
    restored: watch::Receiver<bool>,
    restore_task: JoinHandle<()>,
    persist_tx: watch::Sender<String>,
    persist_task: JoinHandle<()>,
    debounce: Duration,
}

impl SearchSession {
    /// Create a session and start restoring the last search text.
    ///
    /// The saved text is applied once loaded unless the user has typed in
    /// the meantime. A failed load leaves the text empty. Must be called from
    /// within a Tokio runtime.
    pub fn new(
        repository: Arc<dyn FlightRepository>,
        preferences: Arc<dyn SettingsStore>,
        config: &SearchConfig,
    ) -> Self {
        let state = Arc::new(watch::channel(SearchState::default()).0);
        let input_edited = Arc::new(AtomicBool::new(false));
        let (restored_tx, restored) = watch::channel(false);

        let restore_task = tokio::spawn({
            let state = Arc::clone(&state);
            let preferences = Arc::clone(&preferences);
            let input_edited = Arc::clone(&input_edited);
            async move {
                let text = last_user_input(preferences.as_ref()).await;
                let applied = state.send_if_modified(|s| {
                    if input_edited.load(Ordering::SeqCst) || s.user_input == text {
                        return false;
                    }
                    s.user_input = text;
                    true
                });
                debug!(applied, "Restored last search");
                restored_tx.send_replace(true);
            }
        });

        let (persist_tx, persist_rx) = watch::channel(String::new());
        let persist_task = tokio::spawn(persist_user_input(persist_rx, preferences));

        Self {
            repository,
            state,
            input_edited,
            restored,
            restore_task,
            persist_tx,
            persist_task,
            debounce: config.debounce(),
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Wait until the startup restore of the last search text has finished.
    pub async fn restored(&self) {
        let mut restored = self.restored.clone();
        // Err means the restore task is gone, which also means it is done.
        let _ = restored.wait_for(|done| *done).await;
    }

    /// Replace the search text.
    ///
    /// Clears the selection flag and persists the text in the background.
    /// Persistence failures are logged and otherwise ignored.
    pub fn update_user_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| {
            self.input_edited.store(true, Ordering::SeqCst);
            s.user_input.clone_from(&text);
            s.is_airport_selected = false;
        });
        self.persist_tx.send_replace(text);
    }

    /// Empty the search text.
    pub fn clear_user_input(&self) {
        self.update_user_input(String::new());
    }

    /// Record the airport the user picked from the suggestions.
    pub fn update_selected_airport(&self, airport: AirportMatch) {
        debug!("Selected {}", airport);
        self.state.send_modify(|s| {
            s.selected_airport = Some(airport);
            s.is_airport_selected = true;
        });
    }

    /// Debounced suggestions for the current search text.
    ///
    /// Blank text yields a feed that completes without emitting.
    #[must_use]
    pub fn current_suggestions(&self) -> QueryFeed<AirportMatch> {
        let query = self.state.borrow().user_input.trim().to_string();
        if query.is_empty() {
            return LiveFeed::empty();
        }
        self.repository
            .suggest_airports(&query)
            .debounce(self.debounce)
    }

    /// Suggestions that follow the search text as it changes.
    ///
    /// A query runs only once the text has been stable for the debounce
    /// period, and replaces the subscription for the previous text. Blank
    /// text emits an empty list straight away.
    #[must_use]
    pub fn watch_suggestions(&self) -> QueryFeed<AirportMatch> {
        let mut input = self.state.subscribe();
        let repository = Arc::clone(&self.repository);
        let period = self.debounce;

        LiveFeed::spawn(move |tx| async move {
            let mut last: Option<String> = None;
            let mut pending: Option<(String, Instant)> = None;
            let mut active: Option<QueryFeed<AirportMatch>> = None;

            loop {
                let query = input.borrow_and_update().user_input.trim().to_string();
                if last.as_deref() != Some(query.as_str()) {
                    last = Some(query.clone());
                    active = None;
                    if query.is_empty() {
                        pending = None;
                        if tx.send(Ok(Vec::new())).await.is_err() {
                            break;
                        }
                    } else {
                        pending = Some((query, Instant::now() + period));
                    }
                }

                let deadline = pending.as_ref().map(|(_, at)| *at);
                tokio::select! {
                    changed = input.changed() => if changed.is_err() {
                        break;
                    },
                    () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        if let Some((query, _)) = pending.take() {
                            debug!(query = %query, "Querying suggestions");
                            active = Some(repository.suggest_airports(&query));
                        }
                    }
                    item = next_snapshot(&mut active), if active.is_some() => match item {
                        Some(result) => {
                            if tx.send(result).await.is_err() {
                                break;
                            }
                        }
                        None => active = None,
                    },
                }
            }
        })
    }

    /// Every airport except `departure`, busiest first.
    #[must_use]
    pub fn current_destinations(&self, departure: &AirportMatch) -> QueryFeed<AirportMatch> {
        self.repository
            .suggest_destinations(&departure.iata_code, &departure.name)
    }

    /// All saved routes as stored.
    #[must_use]
    pub fn favorites(&self) -> QueryFeed<FavoriteRoute> {
        self.repository.list_favorites()
    }

    /// Save a route. The route reads as saved immediately.
    pub fn insert_favorite(&self, route: FavoriteRoute) -> PendingWrite {
        self.state
            .send_modify(|s| s.saved_routes.begin_save(route.clone()));

        let repository = Arc::clone(&self.repository);
        let state = Arc::clone(&self.state);
        PendingWrite::spawn(async move {
            let result = repository.add_favorite(&route).await;
            state.send_modify(|s| match &result {
                Ok(()) => s.saved_routes.save_confirmed(&route),
                Err(_) => s.saved_routes.save_failed(&route),
            });
            if let Err(e) = &result {
                error!("Failed to save favorite {}: {}", route, e);
            }
            result
        })
    }

    /// Forget a route. The route reads as not saved immediately.
    ///
    /// A route that is not shown as saved is still deleted from the store,
    /// but the state is left alone.
    pub fn remove_favorite(&self, route: FavoriteRoute) -> PendingWrite {
        let flipped = self
            .state
            .send_if_modified(|s| s.saved_routes.begin_remove(&route));

        let repository = Arc::clone(&self.repository);
        let state = Arc::clone(&self.state);
        PendingWrite::spawn(async move {
            let result = repository.remove_favorite(&route).await;
            if flipped {
                state.send_modify(|s| match &result {
                    Ok(()) => s.saved_routes.remove_confirmed(&route),
                    Err(_) => s.saved_routes.remove_failed(&route),
                });
            }
            if let Err(e) = &result {
                error!("Failed to remove favorite {}: {}", route, e);
            }
            result
        })
    }

    /// Whether `route` currently reads as saved.
    #[must_use]
    pub fn is_favorite(&self, route: &FavoriteRoute) -> bool {
        self.state.borrow().saved_routes.is_saved(route)
    }

    /// Forget every saved route. Every route reads as not saved immediately.
    pub fn clear_all_favorites(&self) -> PendingWrite {
        let mut flipped = Vec::new();
        self.state
            .send_modify(|s| flipped = s.saved_routes.begin_remove_all());

        let repository = Arc::clone(&self.repository);
        let state = Arc::clone(&self.state);
        PendingWrite::spawn(async move {
            let result = repository.clear_all_favorites().await;
            state.send_modify(|s| match &result {
                Ok(()) => s.saved_routes.remove_all_confirmed(&flipped),
                Err(_) => s.saved_routes.remove_all_failed(&flipped),
            });
            match &result {
                Ok(()) => debug!("Cleared {} favorites", flipped.len()),
                Err(e) => error!("Failed to clear favorites: {}", e),
            }
            result
        })
    }

    /// Show or hide the delete-all confirmation.
    pub fn toggle_delete_confirmation(&self) {
        self.state
            .send_modify(|s| s.is_delete_dialog_visible = !s.is_delete_dialog_visible);
    }

    /// Align saved flags for routes from `selected` with a favorites snapshot.
    ///
    /// Only routes from `selected` to one of `destinations` are touched.
    pub fn sync_saved_state_from_store(
        &self,
        favorites: &[FavoriteRoute],
        selected: &AirportMatch,
        destinations: &[AirportMatch],
    ) {
        self.state.send_if_modified(|s| {
            let before = s.saved_routes.clone();
            s.saved_routes.reconcile(favorites, selected, destinations);
            s.saved_routes != before
        });
    }

    /// Fetch the stored favorites and destinations for `selected` and align
    /// saved flags with them.
    ///
    /// # Errors
    ///
    /// Returns an error if either query fails.
    pub async fn reconcile_with_store(&self, selected: &AirportMatch) -> Result<()> {
        let favorites = first_snapshot(self.favorites()).await?;
        let destinations = first_snapshot(self.current_destinations(selected)).await?;
        self.sync_saved_state_from_store(&favorites, selected, &destinations);
        Ok(())
    }

    /// Stop background work, flushing the latest search text to the
    /// settings store first.
    pub async fn shutdown(self) {
        self.restore_task.abort();
        drop(self.persist_tx);
        if let Err(e) = self.persist_task.await {
            warn!("Search text persistence task failed: {}", e);
        }
    }
}

impl fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSession")
            .field("state", &*self.state.borrow())
            .field("restored", &*self.restored.borrow())
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

/// Save the newest search text whenever it changes, oldest write first.
async fn persist_user_input(
    mut latest: watch::Receiver<String>,
    preferences: Arc<dyn SettingsStore>,
) {
    while latest.changed().await.is_ok() {
        let text = latest.borrow_and_update().clone();
        if let Err(e) = preferences.save_user_input(&text).await {
            warn!("Error saving search text: {}", e);
        }
    }
}

async fn next_snapshot<T: Send + 'static>(feed: &mut Option<LiveFeed<T>>) -> Option<T> {
    match feed {
        Some(feed) => feed.next().await,
        None => std::future::pending().await,
    }
}

async fn first_snapshot<T: Send + 'static>(mut feed: QueryFeed<T>) -> Result<Vec<T>> {
    feed.next()
        .await
        .unwrap_or_else(|| Err(Error::internal("feed ended before its first snapshot")))
}
