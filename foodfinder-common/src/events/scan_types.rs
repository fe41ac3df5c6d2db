//! Scan-related type definitions
//!
//! Supporting types for scan session phases and backend request kinds.

use serde::{Deserialize, Serialize};

/// Scan session phase
///
/// Mirrors the variants of the session state machine without their payloads,
/// so observers can follow progress without holding images or result lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum ScanPhase {
    /// No image selected
    Idle,
    /// Image held, recognition not started
    ImageReady,
    /// Recognition request in flight
    Recognizing,
    /// Predictions held, no restaurants
    PredictionsReady,
    /// Restaurant search in flight
    SearchingRestaurants,
    /// Restaurants held
    ResultsReady,
    /// Last request failed; prior data retained
    Error,
}

impl ScanPhase {
    /// True while a backend request is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(self, ScanPhase::Recognizing | ScanPhase::SearchingRestaurants)
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhase::Idle => write!(f, "Idle"),
            ScanPhase::ImageReady => write!(f, "ImageReady"),
            ScanPhase::Recognizing => write!(f, "Recognizing"),
            ScanPhase::PredictionsReady => write!(f, "PredictionsReady"),
            ScanPhase::SearchingRestaurants => write!(f, "SearchingRestaurants"),
            ScanPhase::ResultsReady => write!(f, "ResultsReady"),
            ScanPhase::Error => write!(f, "Error"),
        }
    }
}

/// Kind of backend request a session issues
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Recognition,
    Search,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Recognition => write!(f, "recognition"),
            RequestKind::Search => write!(f, "search"),
        }
    }
}
