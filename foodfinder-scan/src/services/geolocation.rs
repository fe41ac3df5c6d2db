//! Best-effort user location
//!
//! [`GeolocationProvider::resolve`] never fails: an unsupported, denied or
//! unresponsive location source resolves to `None`, and restaurant search
//! proceeds without coordinates.

use crate::models::Coordinates;
use async_trait::async_trait;
use foodfinder_common::config::GeolocationConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a location source produced no fix
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location capability unavailable")]
    Unsupported,

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),
}

/// Platform location capability
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Always resolves to the same position
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// Always reports the permission as denied
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedLocation;

#[async_trait]
impl LocationSource for DeniedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

/// No location capability on this platform
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedLocation;

#[async_trait]
impl LocationSource for UnsupportedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// Never answers; exercises the provider timeout
#[derive(Debug, Clone, Copy, Default)]
pub struct UnresponsiveLocation;

#[async_trait]
impl LocationSource for UnresponsiveLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        std::future::pending().await
    }
}

#[derive(Debug, Deserialize)]
struct IpLocationResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "latitude")]
    lat: Option<f64>,
    #[serde(default, alias = "longitude")]
    lon: Option<f64>,
}

/// IP geolocation over HTTP
///
/// Expects a JSON body with `lat`/`lon` (or `latitude`/`longitude`); an
/// optional `status` other than "success" counts as no fix.
#[derive(Debug, Clone)]
pub struct HttpLocationSource {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpLocationSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, LocationError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::PositionUnavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl LocationSource for HttpLocationSource {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| LocationError::PositionUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocationError::PositionUnavailable(format!(
                "HTTP {} from {}",
                response.status(),
                self.endpoint
            )));
        }

        let body: IpLocationResponse = response
            .json()
            .await
            .map_err(|e| LocationError::PositionUnavailable(e.to_string()))?;

        if let Some(status) = body.status.as_deref() {
            if status != "success" {
                return Err(LocationError::PositionUnavailable(format!(
                    "lookup status {}",
                    status
                )));
            }
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(LocationError::PositionUnavailable(
                "response carried no coordinates".to_string(),
            )),
        }
    }
}

/// Bounded, infallible location lookup
#[derive(Clone)]
pub struct GeolocationProvider {
    source: Arc<dyn LocationSource>,
    timeout: Duration,
}

impl GeolocationProvider {
    pub fn new(source: Arc<dyn LocationSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Provider with no capability; always resolves to `None` immediately
    pub fn unavailable() -> Self {
        Self::new(Arc::new(UnsupportedLocation), Duration::ZERO)
    }

    /// Provider that always reports `coords`
    pub fn fixed(coords: Coordinates) -> Self {
        Self::new(Arc::new(FixedLocation(coords)), Duration::from_secs(1))
    }

    /// Build from the `[geolocation]` config section
    ///
    /// Without an endpoint the capability is treated as unavailable.
    pub fn from_config(config: &GeolocationConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        match config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(endpoint) => match HttpLocationSource::new(endpoint, timeout) {
                Ok(source) => Self::new(Arc::new(source), timeout),
                Err(e) => {
                    warn!("Geolocation disabled: {}", e);
                    Self::unavailable()
                }
            },
            None => Self::unavailable(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current position, or `None` when unavailable, denied or too slow
    pub async fn resolve(&self) -> Option<Coordinates> {
        match tokio::time::timeout(self.timeout, self.source.current_position()).await {
            Ok(Ok(coords)) if coords.is_valid() => {
                debug!(lat = coords.lat, lon = coords.lon, "Location resolved");
                Some(coords)
            }
            Ok(Ok(coords)) => {
                warn!(lat = coords.lat, lon = coords.lon, "Ignoring out-of-range location");
                None
            }
            Ok(Err(e)) => {
                info!("Searching without location: {}", e);
                None
            }
            Err(_) => {
                info!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Searching without location: lookup timed out"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for GeolocationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeolocationProvider")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
