//! FoodFinder backend client
//!
//! Thin wrapper over the recognition, restaurant search, catalog and health
//! endpoints. The client holds configuration only and never retries on its own:
//! a retry is the user re-invoking the owning session transition.

use crate::error::{RecognitionError, RequestFailure, SearchError};
use crate::models::{
    Coordinates, DishCatalog, HealthStatus, ImageAsset, RecognitionResponse,
    RestaurantSearchResponse,
};
use async_trait::async_trait;
use foodfinder_common::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("FoodFinder/", env!("CARGO_PKG_VERSION"));

const RECOGNIZE_PATH: &str = "/api/food/recognize";
const SEARCH_PATH: &str = "/api/restaurants/search";
const DISHES_PATH: &str = "/api/food/dishes";
const HEALTH_PATH: &str = "/health";

/// The two calls a scan session depends on
///
/// Implemented by [`ApiClient`] for the real backend and by stubs in tests.
#[async_trait]
pub trait FoodFinderApi: Send + Sync {
    /// Upload an image, receive ranked predictions
    async fn recognize(&self, image: &ImageAsset) -> Result<RecognitionResponse, RecognitionError>;

    /// Search restaurants serving `dish`, near `location` when known
    async fn search(
        &self,
        dish: &str,
        location: Option<Coordinates>,
    ) -> Result<RestaurantSearchResponse, SearchError>;
}

/// HTTP client for the FoodFinder backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    search_radius_m: Option<u32>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RequestFailure> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RequestFailure> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RequestFailure::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            search_radius_m: None,
        })
    }

    /// Forward a search radius (metres) with every search
    pub fn with_search_radius(mut self, radius_m: Option<u32>) -> Self {
        self.search_radius_m = radius_m;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Popular dish catalog
    pub async fn dishes(&self) -> Result<DishCatalog, RequestFailure> {
        self.get_json(DISHES_PATH, &[]).await
    }

    /// Backend liveness probe
    pub async fn health(&self) -> Result<HealthStatus, RequestFailure> {
        self.get_json(HEALTH_PATH, &[]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, RequestFailure> {
        let response = self
            .http_client
            .get(self.url(path))
            .query(query)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RequestFailure::Parse(e.to_string()))
    }
}

/// Query parameters for a restaurant search
///
/// `lat`/`lon` are omitted entirely when the location is unknown.
pub fn search_query(
    dish: &str,
    location: Option<Coordinates>,
    radius_m: Option<u32>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("dish", dish.to_string())];
    if let Some(coords) = location {
        params.push(("lat", coords.lat.to_string()));
        params.push(("lon", coords.lon.to_string()));
    }
    if let Some(radius) = radius_m {
        params.push(("radius", radius.to_string()));
    }
    params
}

/// Turn a non-2xx response into a `RequestFailure::Status`
///
/// The message is the backend's `detail` field when the body is a JSON error,
/// else the raw body, else the canonical reason phrase.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RequestFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

    warn!(status = status.as_u16(), %message, "Backend returned error status");
    Err(RequestFailure::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl FoodFinderApi for ApiClient {
    async fn recognize(&self, image: &ImageAsset) -> Result<RecognitionResponse, RecognitionError> {
        let part = reqwest::multipart::Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.mime_type())
            .map_err(|e| RequestFailure::Parse(format!("Invalid image MIME type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        debug!(
            file = image.file_name(),
            mime = image.mime_type(),
            bytes = image.len(),
            "Uploading image for recognition"
        );

        let response = self
            .http_client
            .post(self.url(RECOGNIZE_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(RequestFailure::from)?;

        let response = ensure_success(response).await?;
        let recognition: RecognitionResponse = response
            .json()
            .await
            .map_err(|e| RequestFailure::Parse(e.to_string()))?;

        if !recognition.success {
            let message = if recognition.message.is_empty() {
                "recognition was not successful".to_string()
            } else {
                recognition.message.clone()
            };
            return Err(RequestFailure::Rejected(message).into());
        }

        if let Some(top) = recognition.top() {
            info!(
                dish = %top.food_name,
                confidence = top.confidence,
                candidates = recognition.predictions.len(),
                model = %recognition.model,
                "Recognition successful"
            );
        } else {
            info!(model = %recognition.model, "Recognition returned no predictions");
        }

        Ok(recognition)
    }

    async fn search(
        &self,
        dish: &str,
        location: Option<Coordinates>,
    ) -> Result<RestaurantSearchResponse, SearchError> {
        let query = search_query(dish, location, self.search_radius_m);
        debug!(dish, with_location = location.is_some(), "Searching restaurants");

        let found: RestaurantSearchResponse = self.get_json(SEARCH_PATH, &query).await?;
        info!(dish, restaurants = found.restaurants.len(), "Restaurant search complete");
        Ok(found)
    }
}
