//! foodfinder-scan library interface
//!
//! Client-side discovery flow: photo → dish predictions → nearby restaurants
//! → map. [`ScanSession`] owns the flow; everything else is a collaborator it
//! drives or a view of its output.

pub mod error;
pub mod map_view;
pub mod models;
pub mod services;
pub mod session;

pub use crate::error::{RecognitionError, RequestFailure, ScanFailure, SearchError, ValidationError};
pub use crate::map_view::{DirectionsHandler, DirectionsRequest, MapScene, MapView};
pub use crate::services::{ApiClient, FoodFinderApi, GeolocationProvider};
pub use crate::session::{Outcome, ScanSession, ScanState};
