//! Restaurant search payloads

use serde::{Deserialize, Serialize};

/// Geographic position in degrees
///
/// Always carried as `Option<Coordinates>`: `None` means "location unavailable",
/// never a zero sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and within WGS84 bounds
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Backend ids are numeric today; string ids are accepted as well
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RestaurantId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestaurantId::Number(n) => write!(f, "{}", n),
            RestaurantId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub price_range: String,
    /// Human-readable distance from the search location, e.g. "0.3km"
    #[serde(default)]
    pub distance: String,
    /// Missing when the backend could not geocode the restaurant
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub menu_link: String,
}

impl Restaurant {
    /// One-line summary: name, rating, price range, distance
    pub fn summary(&self) -> String {
        let mut parts = vec![self.name.clone(), format!("{:.1}★", self.rating)];
        if !self.price_range.is_empty() {
            parts.push(self.price_range.clone());
        }
        if !self.distance.is_empty() {
            parts.push(self.distance.clone());
        }
        parts.join(" · ")
    }
}

/// Echo of the location the backend searched around
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchLocation {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// `GET /api/restaurants/search` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantSearchResponse {
    #[serde(default)]
    pub dish: String,
    #[serde(default)]
    pub location: Option<SearchLocation>,
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
}
