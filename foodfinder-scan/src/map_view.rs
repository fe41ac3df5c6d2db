//! Map presentation adapter
//!
//! [`MapView::render`] is a pure function of the restaurant list and the
//! optional user location. It produces a [`MapScene`] (pins plus viewport) that
//! an embedded map widget draws. The only action flowing back out is "get
//! directions" on a restaurant pin, which is handed to a [`DirectionsHandler`]
//! and never touches session state.

use crate::models::{Coordinates, Restaurant};
use foodfinder_common::config::{MapConfig, DEFAULT_MAP_PROVIDER_URL};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Zoom for an empty or single-pin map
pub const DEFAULT_ZOOM: u8 = 13;

/// Zoom used in directions deep links
pub const DIRECTIONS_ZOOM: u8 = 15;

/// Pixel margin kept around fitted bounds
pub const FIT_MARGIN_PX: u32 = 20;

const WIDGET_SCRIPT_URL: &str = "https://api-maps.yandex.ru/2.1/";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PinKind {
    User,
    /// Index into the rendered restaurant list
    Restaurant { index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pin {
    #[serde(flatten)]
    pub kind: PinKind,
    pub position: Coordinates,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directions_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Viewport {
    Centered {
        center: Coordinates,
        zoom: u8,
    },
    /// Bounds enclosing every pin
    Fitted {
        south_west: Coordinates,
        north_east: Coordinates,
        margin: u32,
    },
}

/// Everything the widget needs to draw one result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapScene {
    pub pins: Vec<Pin>,
    pub viewport: Viewport,
}

impl MapScene {
    pub fn user_pin(&self) -> Option<&Pin> {
        self.pins.iter().find(|p| p.kind == PinKind::User)
    }

    pub fn restaurant_pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins
            .iter()
            .filter(|p| matches!(p.kind, PinKind::Restaurant { .. }))
    }
}

/// "Get directions" action for one restaurant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectionsRequest {
    pub restaurant_name: String,
    pub url: String,
}

/// Receives directions actions; typically opens the URL in an external map
pub trait DirectionsHandler: Send + Sync {
    fn open_directions(&self, request: &DirectionsRequest);
}

/// Renders restaurant results as map pins
#[derive(Clone)]
pub struct MapView {
    provider_url: String,
    language: String,
    api_key: Option<String>,
    default_center: Coordinates,
    directions_handler: Option<Arc<dyn DirectionsHandler>>,
}

impl Default for MapView {
    fn default() -> Self {
        Self::from_config(&MapConfig::default(), None)
    }
}

impl MapView {
    /// Build from the `[map]` config section and a resolved widget API key
    pub fn from_config(config: &MapConfig, api_key: Option<String>) -> Self {
        let provider_url = if config.provider_url.trim().is_empty() {
            DEFAULT_MAP_PROVIDER_URL.to_string()
        } else {
            config.provider_url.trim_end_matches('/').to_string()
        };

        Self {
            provider_url,
            language: config.language.clone(),
            api_key,
            default_center: Coordinates::new(config.default_center.lat, config.default_center.lon),
            directions_handler: None,
        }
    }

    pub fn with_directions_handler(mut self, handler: Arc<dyn DirectionsHandler>) -> Self {
        self.directions_handler = Some(handler);
        self
    }

    pub fn default_center(&self) -> Coordinates {
        self.default_center
    }

    /// Widget loader URL, or `None` without an API key
    pub fn script_url(&self) -> Option<String> {
        let key = self.api_key.as_deref()?;
        reqwest::Url::parse_with_params(
            WIDGET_SCRIPT_URL,
            &[("lang", self.language.as_str()), ("apikey", key)],
        )
        .map(String::from)
        .ok()
    }

    /// Deep link into the external map, pointed at `position`
    pub fn directions_url(&self, position: Coordinates) -> String {
        format!(
            "{}/?pt={},{}&z={}&l=map",
            self.provider_url, position.lon, position.lat, DIRECTIONS_ZOOM
        )
    }

    /// Lay out pins and pick the viewport
    ///
    /// The user pin (if any) comes first. Restaurants without usable
    /// coordinates are listed elsewhere but get no pin.
    pub fn render(&self, restaurants: &[Restaurant], user_location: Option<Coordinates>) -> MapScene {
        let mut pins = Vec::with_capacity(restaurants.len() + 1);

        if let Some(position) = user_location.filter(Coordinates::is_valid) {
            pins.push(Pin {
                kind: PinKind::User,
                position,
                title: "You are here".to_string(),
                address: None,
                rating: None,
                price_range: None,
                directions_url: None,
            });
        }

        for (index, restaurant) in restaurants.iter().enumerate() {
            let Some(position) = restaurant.coordinates.filter(Coordinates::is_valid) else {
                debug!(restaurant = %restaurant.name, "No coordinates, skipping pin");
                continue;
            };
            pins.push(Pin {
                kind: PinKind::Restaurant { index },
                position,
                title: restaurant.name.clone(),
                address: Some(restaurant.address.clone()).filter(|a| !a.is_empty()),
                rating: Some(restaurant.rating),
                price_range: Some(restaurant.price_range.clone()).filter(|p| !p.is_empty()),
                directions_url: Some(self.directions_url(position)),
            });
        }

        let viewport = self.viewport_for(&pins);
        MapScene { pins, viewport }
    }

    fn viewport_for(&self, pins: &[Pin]) -> Viewport {
        if pins.len() < 2 {
            let center = pins
                .first()
                .map(|p| p.position)
                .unwrap_or(self.default_center);
            return Viewport::Centered {
                center,
                zoom: DEFAULT_ZOOM,
            };
        }

        let (mut min_lat, mut min_lon) = (f64::MAX, f64::MAX);
        let (mut max_lat, mut max_lon) = (f64::MIN, f64::MIN);
        for pin in pins {
            min_lat = min_lat.min(pin.position.lat);
            min_lon = min_lon.min(pin.position.lon);
            max_lat = max_lat.max(pin.position.lat);
            max_lon = max_lon.max(pin.position.lon);
        }

        Viewport::Fitted {
            south_west: Coordinates::new(min_lat, min_lon),
            north_east: Coordinates::new(max_lat, max_lon),
            margin: FIT_MARGIN_PX,
        }
    }

    /// User clicked the pin at `pin_index` in `scene`
    ///
    /// Restaurant pins forward a [`DirectionsRequest`] to the handler and
    /// return it; the user pin does nothing.
    pub fn activate_pin(&self, scene: &MapScene, pin_index: usize) -> Option<DirectionsRequest> {
        let pin = scene.pins.get(pin_index)?;
        let url = pin.directions_url.clone()?;
        let request = DirectionsRequest {
            restaurant_name: pin.title.clone(),
            url,
        };

        info!(restaurant = %request.restaurant_name, url = %request.url, "Directions requested");
        if let Some(handler) = &self.directions_handler {
            handler.open_directions(&request);
        }
        Some(request)
    }
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("provider_url", &self.provider_url)
            .field("language", &self.language)
            .field("has_api_key", &self.api_key.is_some())
            .field("default_center", &self.default_center)
            .finish_non_exhaustive()
    }
}
