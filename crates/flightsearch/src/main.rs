//! `flightsearch` - CLI for flight route search
//!
//! This binary looks up airports, lists destinations, and manages saved
//! favorite routes in the local database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::debug;

use flightsearch::cli::{
    Cli, Command, ConfigCommand, DestinationsCommand, FavoritesCommand, SearchCommand,
    SuggestCommand,
};
use flightsearch::preferences::last_user_input;
use flightsearch::storage::seed;
use flightsearch::{
    init_logging, AirportMatch, Config, FavoriteRoute, FlightRepository, OfflineFlightRepository,
    QueryFeed, SearchSession, Storage, UserPreferences,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Suggest(cmd) => handle_suggest(&config, &cmd).await,
        Command::Destinations(cmd) => handle_destinations(&config, &cmd).await,
        Command::Search(cmd) => handle_search(&config, &cmd).await,
        Command::Favorites(cmd) => handle_favorites(&config, cmd).await,
        Command::Status(cmd) => handle_status(&config, cmd.json).await,
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_repository(config: &Config) -> anyhow::Result<OfflineFlightRepository> {
    let seed_path = config.storage.seed_path.clone();
    let storage = Storage::open_seeded(config.database_path(), || match &seed_path {
        Some(path) => seed::load_airports(path),
        None => seed::bundled_airports(),
    })
    .with_context(|| format!("opening {}", config.database_path().display()))?;
    Ok(OfflineFlightRepository::new(storage))
}

fn open_session(config: &Config, repository: &OfflineFlightRepository) -> SearchSession {
    let preferences = UserPreferences::open(config.preferences_path());
    SearchSession::new(
        Arc::new(repository.clone()),
        Arc::new(preferences),
        &config.search,
    )
}

async fn snapshot<T: Send + 'static>(mut feed: QueryFeed<T>) -> anyhow::Result<Vec<T>> {
    match feed.next().await {
        Some(result) => Ok(result?),
        None => Ok(Vec::new()),
    }
}

fn print_airports(airports: &[AirportMatch], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(airports)?);
    } else if airports.is_empty() {
        println!("No airports found.");
    } else {
        for airport in airports {
            println!("{airport}");
        }
    }
    Ok(())
}

async fn handle_suggest(config: &Config, cmd: &SuggestCommand) -> anyhow::Result<()> {
    let repository = open_repository(config)?;
    let query = cmd.query.trim();
    let airports = if query.is_empty() {
        Vec::new()
    } else {
        snapshot(repository.suggest_airports(query)).await?
    };
    print_airports(&airports, cmd.json)
}

async fn handle_destinations(config: &Config, cmd: &DestinationsCommand) -> anyhow::Result<()> {
    let repository = open_repository(config)?;
    let departure = repository.airport(cmd.code.trim())?.to_match();

    let session = open_session(config, &repository);
    session.reconcile_with_store(&departure).await?;
    let destinations = snapshot(session.current_destinations(&departure)).await?;

    if cmd.json {
        let rows: Vec<_> = destinations
            .iter()
            .map(|destination| {
                let route = FavoriteRoute::between(&departure, destination);
                serde_json::json!({
                    "iata_code": destination.iata_code,
                    "name": destination.name,
                    "saved": session.is_favorite(&route),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("Flights from {departure}");
        println!();
        for destination in &destinations {
            let route = FavoriteRoute::between(&departure, destination);
            let marker = if session.is_favorite(&route) { "*" } else { " " };
            println!("{marker} {destination}");
        }
    }

    session.shutdown().await;
    Ok(())
}

async fn handle_search(config: &Config, cmd: &SearchCommand) -> anyhow::Result<()> {
    let repository = open_repository(config)?;
    let session = open_session(config, &repository);
    session.restored().await;

    match &cmd.text {
        Some(text) => session.update_user_input(text.as_str()),
        None => debug!("Repeating last search"),
    }

    let text = session.state().user_input;
    if text.trim().is_empty() {
        if cmd.last {
            println!("No previous search.");
        }
        session.shutdown().await;
        return Ok(());
    }

    let airports = snapshot(session.current_suggestions()).await?;
    if !cmd.json {
        println!("Results for \"{text}\"");
        println!();
    }
    print_airports(&airports, cmd.json)?;

    session.shutdown().await;
    Ok(())
}

async fn handle_favorites(config: &Config, cmd: FavoritesCommand) -> anyhow::Result<()> {
    let repository = open_repository(config)?;

    match cmd {
        FavoritesCommand::List { json } => {
            let mut routes = snapshot(repository.list_favorites()).await?;
            routes.reverse();
            if json {
                println!("{}", serde_json::to_string_pretty(&routes)?);
            } else if routes.is_empty() {
                println!("No saved routes.");
            } else {
                for route in &routes {
                    println!("{route}");
                }
            }
        }
        FavoritesCommand::Add { from, to } => {
            let departure = repository.airport(from.trim())?.to_match();
            let destination = repository.airport(to.trim())?.to_match();
            if departure == destination {
                bail!("departure and destination are the same airport");
            }

            let session = open_session(config, &repository);
            let route = FavoriteRoute::between(&departure, &destination);
            session.insert_favorite(route.clone()).confirmed().await?;
            println!("Saved {route}");
            session.shutdown().await;
        }
        FavoritesCommand::Remove { from, to } => {
            let route = FavoriteRoute::new(from.trim().to_uppercase(), to.trim().to_uppercase());

            let session = open_session(config, &repository);
            match repository.airport(&route.departure_code) {
                Ok(departure) => session.reconcile_with_store(&departure.to_match()).await?,
                Err(e) if e.is_not_found() => debug!("Unknown departure {}", route.departure_code),
                Err(e) => return Err(e.into()),
            }
            let stored = session.is_favorite(&route)
                || snapshot(session.favorites()).await?.contains(&route);

            session.remove_favorite(route.clone()).confirmed().await?;
            if stored {
                println!("Removed {route}");
            } else {
                println!("{route} is not saved.");
            }
            session.shutdown().await;
        }
        FavoritesCommand::Clear { yes } => {
            let count = repository.stats()?.favorite_count;
            if count == 0 {
                println!("No saved routes.");
                return Ok(());
            }

            let session = open_session(config, &repository);
            let mut departures: Vec<_> = snapshot(session.favorites())
                .await?
                .into_iter()
                .map(|route| route.departure_code)
                .collect();
            departures.sort();
            departures.dedup();
            for code in departures {
                match repository.airport(&code) {
                    Ok(departure) => session.reconcile_with_store(&departure.to_match()).await?,
                    Err(e) if e.is_not_found() => debug!("Skipping unknown departure {}", code),
                    Err(e) => return Err(e.into()),
                }
            }

            let confirmed = yes || {
                session.toggle_delete_confirmation();
                let answer = confirm(&format!("Delete all {count} saved routes?"))?;
                session.toggle_delete_confirmation();
                answer
            };

            if confirmed {
                session.clear_all_favorites().confirmed().await?;
                println!("Deleted {count} saved routes.");
            } else {
                println!("Aborted.");
            }
            session.shutdown().await;
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

async fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let repository = open_repository(config)?;
    let stats = repository.stats()?;
    let preferences = UserPreferences::open(config.preferences_path());
    let last_search = last_user_input(&preferences).await;

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "preferences_path": config.preferences_path(),
            "airport_count": stats.airport_count,
            "favorite_count": stats.favorite_count,
            "newest_favorite": stats.newest_favorite,
            "db_size_bytes": stats.db_size_bytes,
            "last_search": last_search,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("flightsearch status");
        println!("-------------------");
        println!("Database:      {}", config.database_path().display());
        println!("Preferences:   {}", config.preferences_path().display());
        println!("Airports:      {}", stats.airport_count);
        println!("Saved routes:  {}", stats.favorite_count);
        if let Some(newest) = stats.newest_favorite {
            println!("Last saved:    {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!("Size:          {} bytes", stats.db_size_bytes);
        if !last_search.is_empty() {
            println!("Last search:   {last_search}");
        }
    }
    preferences.close();
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!(
                    "  Preferences path:   {}",
                    config.preferences_path().display()
                );
                match &config.storage.seed_path {
                    Some(path) => println!("  Seed dataset:       {}", path.display()),
                    None => println!("  Seed dataset:       (bundled)"),
                }
                println!();
                println!("[Search]");
                println!("  Debounce (ms):      {}", config.search.debounce_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
