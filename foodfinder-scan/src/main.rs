//! FoodFinder - command-line entry point
//!
//! Photograph a dish, find out what it is, and find restaurants nearby that
//! serve it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use foodfinder_common::config::{self, TomlConfig, API_URL_ENV};
use foodfinder_common::events::ScanEvent;
use foodfinder_scan::map_view::PinKind;
use foodfinder_scan::models::{format_confidence, Coordinates, Restaurant};
use foodfinder_scan::{
    ApiClient, DirectionsHandler, DirectionsRequest, FoodFinderApi, GeolocationProvider, MapScene,
    MapView, Outcome, ScanSession, ScanState,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for foodfinder
#[derive(Parser, Debug)]
#[command(name = "foodfinder")]
#[command(about = "Recognize food in a photo and find restaurants that serve it")]
#[command(version)]
struct Args {
    /// Backend base URL
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    /// Config file (defaults to <config_dir>/foodfinder/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recognize a food photo and search restaurants for the top prediction
    Scan {
        /// Image file to upload
        image: PathBuf,

        /// Re-search with this dish instead of keeping the top prediction
        #[arg(long)]
        dish: Option<String>,

        #[command(flatten)]
        location: LocationArgs,

        /// Print the final scene as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search restaurants for a dish by name
    Search {
        dish: String,

        #[command(flatten)]
        location: LocationArgs,

        #[arg(long)]
        json: bool,
    },

    /// List the popular dish catalog
    Dishes,

    /// Check backend health
    Health,
}

#[derive(ClapArgs, Debug)]
struct LocationArgs {
    /// Latitude to search around (requires --lon)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude to search around (requires --lat)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Never send a location
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    no_location: bool,
}

impl LocationArgs {
    fn provider(&self, toml_config: &TomlConfig) -> Result<GeolocationProvider> {
        if self.no_location {
            return Ok(GeolocationProvider::unavailable());
        }
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                let coords = Coordinates::new(lat, lon);
                if !coords.is_valid() {
                    bail!("Coordinates out of range: {}, {}", lat, lon);
                }
                Ok(GeolocationProvider::fixed(coords))
            }
            _ => Ok(GeolocationProvider::from_config(&toml_config.geolocation)),
        }
    }
}

/// Prints directions links instead of launching a browser
struct PrintDirections;

impl DirectionsHandler for PrintDirections {
    fn open_directions(&self, request: &DirectionsRequest) {
        println!("    directions: {}", request.url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = config::load_or_default(args.config.as_deref());
    init_tracing(&toml_config).context("Failed to initialize logging")?;

    let api_base_url = config::resolve_api_base_url(args.api_url.as_deref(), &toml_config);
    let client = ApiClient::with_timeout(
        api_base_url.clone(),
        Duration::from_secs(toml_config.request_timeout_secs()),
    )
    .context("Failed to create API client")?
    .with_search_radius(toml_config.search_radius_m);

    info!("Using FoodFinder backend at {}", api_base_url);

    let map_view = MapView::from_config(&toml_config.map, config::resolve_map_api_key(&toml_config))
        .with_directions_handler(Arc::new(PrintDirections));

    match args.command {
        Command::Scan {
            image,
            dish,
            location,
            json,
        } => {
            let geolocation = location.provider(&toml_config)?;
            run_scan(client, geolocation, &toml_config, &map_view, image, dish, json).await
        }
        Command::Search {
            dish,
            location,
            json,
        } => {
            let geolocation = location.provider(&toml_config)?;
            run_search(client, geolocation, &map_view, &dish, json).await
        }
        Command::Dishes => {
            let catalog = client.dishes().await.context("Failed to fetch dish catalog")?;
            for dish in catalog.dishes {
                println!("{:>4}  {:<24} {}", dish.id, dish.name, dish.category);
            }
            Ok(())
        }
        Command::Health => {
            let health = client.health().await.context("Backend health check failed")?;
            println!("{}: {}", api_base_url, health.status);
            Ok(())
        }
    }
}

fn init_tracing(toml_config: &TomlConfig) -> Result<()> {
    let level = &toml_config.logging.level;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "foodfinder={level},foodfinder_scan={level},foodfinder_common={level}",
            level = level
        )
        .into()
    });

    match &toml_config.logging.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

async fn run_scan(
    client: ApiClient,
    geolocation: GeolocationProvider,
    toml_config: &TomlConfig,
    map_view: &MapView,
    image: PathBuf,
    dish: Option<String>,
    json: bool,
) -> Result<()> {
    let session = ScanSession::new(Arc::new(client), geolocation)
        .with_max_image_bytes(toml_config.max_image_bytes());

    let mut events = session.subscribe();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_event(&event);
        }
    });

    session
        .load_image_file(&image)
        .await
        .with_context(|| format!("Cannot use {}", image.display()))?;

    if let Outcome::Ignored(rejection) = session.recognize().await {
        bail!("Recognition not started: {}", rejection);
    }

    let state = session.snapshot();
    if let Some(failure) = state.failure() {
        bail!("{}", failure);
    }

    print_predictions(&state);

    if let Some(dish) = dish {
        match session.search(&dish).await? {
            Outcome::Ignored(rejection) => warn!("Re-search ignored: {}", rejection),
            Outcome::Applied | Outcome::Discarded => {}
        }
        if let Some(failure) = session.snapshot().failure() {
            bail!("{}", failure);
        }
    }

    let state = session.snapshot();
    match session.map_scene(map_view) {
        Some(scene) => report_results(map_view, state.searched_dish(), state.restaurants(), &scene, json)?,
        None => println!("No dish recognized; nothing to search."),
    }

    drop(session);
    let _ = event_log.await;
    Ok(())
}

async fn run_search(
    client: ApiClient,
    geolocation: GeolocationProvider,
    map_view: &MapView,
    dish: &str,
    json: bool,
) -> Result<()> {
    let dish = dish.trim();
    if dish.is_empty() {
        bail!("Dish name must not be empty");
    }

    let location = geolocation.resolve().await;
    let found = client
        .search(dish, location)
        .await
        .with_context(|| format!("Search for '{}' failed", dish))?;

    let scene = map_view.render(&found.restaurants, location);
    report_results(map_view, Some(dish), &found.restaurants, &scene, json)
}

fn print_predictions(state: &ScanState) {
    let predictions = state.predictions();
    if predictions.is_empty() {
        return;
    }
    println!("Predictions:");
    for (rank, prediction) in predictions.iter().enumerate() {
        println!(
            "  {}. {:<24} {:>6}",
            rank + 1,
            prediction.food_name,
            format_confidence(prediction.confidence)
        );
    }
}

fn report_results(
    map_view: &MapView,
    dish: Option<&str>,
    restaurants: &[Restaurant],
    scene: &MapScene,
    json: bool,
) -> Result<()> {
    if json {
        let out = serde_json::json!({
            "dish": dish,
            "restaurants": restaurants,
            "map": scene,
            "script_url": map_view.script_url(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialize results")?
        );
        return Ok(());
    }

    let dish = dish.unwrap_or("?");
    if restaurants.is_empty() {
        println!("No restaurants found serving {}.", dish);
        return Ok(());
    }

    println!("Restaurants serving {}:", dish);
    for (index, restaurant) in restaurants.iter().enumerate() {
        println!("  * {}", restaurant.summary());
        if !restaurant.address.is_empty() {
            println!("    {}", restaurant.address);
        }
        let pin = scene
            .pins
            .iter()
            .position(|p| p.kind == PinKind::Restaurant { index });
        if let Some(pin_index) = pin {
            map_view.activate_pin(scene, pin_index);
        }
    }
    Ok(())
}

fn log_event(event: &ScanEvent) {
    match event {
        ScanEvent::PhaseChanged {
            old_phase,
            new_phase,
            ..
        } => debug!("{} -> {}", old_phase, new_phase),
        ScanEvent::RequestIssued {
            request,
            dish,
            with_location,
            ..
        } => info!(
            dish = dish.as_deref().unwrap_or(""),
            with_location, "{} request issued", request
        ),
        ScanEvent::RequestFailed {
            request, message, ..
        } => warn!("{} failed: {}", request, message),
        ScanEvent::StaleResponseDiscarded { request, .. } => {
            debug!("Stale {} response discarded", request)
        }
    }
}
