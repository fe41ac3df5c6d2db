//! Scan session driver
//!
//! Owns the single [`ScanState`] of one scan and runs the side effects that
//! [`state::apply`] asks for. All state changes go through `apply`; the driver
//! adds three things the pure machine cannot know about:
//!
//! - **At most one request per kind.** The request-issuing transitions are
//!   committed before the request is sent, so a second trigger sees a busy
//!   phase and is ignored.
//! - **Stale response discarding.** Every image load and retake starts a new
//!   generation. A response is applied only if its generation is still current;
//!   otherwise it is dropped silently.
//! - **Auto-chain.** A recognition that yields predictions is followed, under
//!   the same lock, by the search for the top prediction.
//!
//! The lock is never held across an `.await`.

pub mod state;

pub use state::{apply, Command, Event, Rejection, ScanState, SearchResults, Transition};

use crate::error::{ScanFailure, ValidationError};
use crate::map_view::{MapScene, MapView};
use crate::models::ImageAsset;
use crate::services::{FoodFinderApi, GeolocationProvider};
use foodfinder_common::config::DEFAULT_MAX_IMAGE_BYTES;
use foodfinder_common::events::{EventBus, RequestKind, ScanEvent, ScanPhase};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a session operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transition was committed (for request operations: the response was applied)
    Applied,
    /// No-op: busy, or not valid in the current phase
    Ignored(Rejection),
    /// The response arrived after the session was reset and was dropped
    Discarded,
}

struct Inner {
    state: ScanState,
    generation: u64,
}

/// One scan lifecycle: image → predictions → restaurants
pub struct ScanSession {
    id: Uuid,
    api: Arc<dyn FoodFinderApi>,
    geolocation: GeolocationProvider,
    max_image_bytes: u64,
    event_bus: EventBus,
    inner: Mutex<Inner>,
}

impl ScanSession {
    pub fn new(api: Arc<dyn FoodFinderApi>, geolocation: GeolocationProvider) -> Self {
        Self {
            id: Uuid::new_v4(),
            api,
            geolocation,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            event_bus: EventBus::new(100),
            inner: Mutex::new(Inner {
                state: ScanState::Idle,
                generation: 0,
            }),
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: u64) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    /// Publish on a shared bus instead of a private one
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn max_image_bytes(&self) -> u64 {
        self.max_image_bytes
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.event_bus.subscribe()
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> ScanState {
        self.lock().state.clone()
    }

    pub fn phase(&self) -> ScanPhase {
        self.lock().state.phase()
    }

    /// Map scene for the current results, if the session holds any
    pub fn map_scene(&self, view: &MapView) -> Option<MapScene> {
        let state = self.snapshot();
        state
            .search_results()
            .map(|results| view.render(&results.restaurants, results.user_location))
    }

    // ------------------------------------------------------------------
    // Image selection
    // ------------------------------------------------------------------

    /// Select an already decoded image
    ///
    /// Clears predictions, restaurants and any error. Accepted in every phase;
    /// a response still in flight for the previous image will be discarded.
    pub fn load_image(&self, image: ImageAsset) -> Result<Outcome, ValidationError> {
        let size = image.len() as u64;
        if size > self.max_image_bytes {
            return Err(ValidationError::TooLarge {
                size,
                limit: self.max_image_bytes,
            });
        }

        info!(
            session_id = %self.id,
            file = image.file_name(),
            mime = image.mime_type(),
            bytes = size,
            "Image loaded"
        );

        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        match self.dispatch(&mut inner, Event::ImageLoaded(Arc::new(image))) {
            Ok(_) => Ok(Outcome::Applied),
            Err(rejection) => Ok(Outcome::Ignored(rejection)),
        }
    }

    /// Validate raw upload bytes and select them
    pub fn load_image_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        declared_mime: Option<&str>,
    ) -> Result<Outcome, ValidationError> {
        let image = ImageAsset::from_bytes(bytes, file_name, declared_mime, self.max_image_bytes)
            .map_err(|e| {
                warn!(session_id = %self.id, "Rejected upload: {}", e);
                e
            })?;
        self.load_image(image)
    }

    /// Read, validate and select an image file
    pub async fn load_image_file(&self, path: &Path) -> Result<Outcome, ValidationError> {
        let image = ImageAsset::from_path(path, self.max_image_bytes)
            .await
            .map_err(|e| {
                warn!(session_id = %self.id, "Rejected image file: {}", e);
                e
            })?;
        self.load_image(image)
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Discard everything and return to Idle
    pub fn retake(&self) {
        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        let was_busy = inner.state.is_busy();
        // Retake is accepted in every phase
        if let Err(rejection) = self.dispatch(&mut inner, Event::Retake) {
            warn!(session_id = %self.id, "Retake rejected: {}", rejection);
        }
        info!(session_id = %self.id, discarded_in_flight = was_busy, "Session reset");
    }

    /// Dismiss the inline error, returning to the phase before the failure
    pub fn dismiss_error(&self) -> Outcome {
        let mut inner = self.lock();
        match self.dispatch(&mut inner, Event::ErrorDismissed) {
            Ok(_) => Outcome::Applied,
            Err(rejection) => Outcome::Ignored(rejection),
        }
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Recognize the selected image, then auto-search the top prediction
    ///
    /// Returns once the recognition response (and the chained search, if any)
    /// has been applied or discarded. When a search was chained, its outcome
    /// is returned.
    pub async fn recognize(&self) -> Outcome {
        let (generation, image) = {
            let mut inner = self.lock();
            match self.dispatch(&mut inner, Event::RecognizeRequested) {
                Ok(Some(Command::Recognize { image })) => (inner.generation, image),
                Ok(_) => return Outcome::Applied,
                Err(rejection) => {
                    debug!(session_id = %self.id, "recognize ignored: {}", rejection);
                    return Outcome::Ignored(rejection);
                }
            }
        };

        self.event_bus.emit_lossy(ScanEvent::RequestIssued {
            session_id: self.id,
            request: RequestKind::Recognition,
            dish: None,
            with_location: false,
            timestamp: chrono::Utc::now(),
        });

        let result = self.api.recognize(&image).await;

        let chained = {
            let mut inner = self.lock();
            if inner.generation != generation {
                drop(inner);
                self.discard_stale(RequestKind::Recognition);
                return Outcome::Discarded;
            }

            let event = match result {
                Ok(response) => Event::RecognitionSucceeded(response.predictions),
                Err(e) => {
                    let failure = ScanFailure::recognition(&e);
                    self.report_failure(&failure);
                    Event::RecognitionFailed(failure)
                }
            };

            match self.dispatch(&mut inner, event) {
                Ok(command) => command,
                Err(rejection) => {
                    warn!(session_id = %self.id, "Recognition result not applied: {}", rejection);
                    return Outcome::Ignored(rejection);
                }
            }
        };

        if let Some(Command::Search { dish }) = chained {
            info!(session_id = %self.id, dish = %dish, "Auto-searching top prediction");
            return self.run_search(generation, dish).await;
        }

        Outcome::Applied
    }

    /// Search restaurants for `dish` (manual search or re-search)
    ///
    /// Ignored while any request is in flight, including an auto-chained
    /// search: the outstanding result still lands.
    pub async fn search(&self, dish: &str) -> Result<Outcome, ValidationError> {
        let dish = dish.trim();
        if dish.is_empty() {
            return Err(ValidationError::BlankDish);
        }

        let (generation, dish) = {
            let mut inner = self.lock();
            let event = Event::SearchRequested {
                dish: dish.to_string(),
            };
            match self.dispatch(&mut inner, event) {
                Ok(Some(Command::Search { dish })) => (inner.generation, dish),
                Ok(_) => return Ok(Outcome::Applied),
                Err(rejection) => {
                    debug!(session_id = %self.id, dish, "search ignored: {}", rejection);
                    return Ok(Outcome::Ignored(rejection));
                }
            }
        };

        Ok(self.run_search(generation, dish).await)
    }

    /// Resolve location, issue the search, apply the response
    ///
    /// Entered with the session already in SearchingRestaurants.
    async fn run_search(&self, generation: u64, dish: String) -> Outcome {
        let location = self.geolocation.resolve().await;

        let current = self.lock().generation;
        if current != generation {
            // Reset while waiting for a location fix: never send the request
            self.discard_stale(RequestKind::Search);
            return Outcome::Discarded;
        }

        self.event_bus.emit_lossy(ScanEvent::RequestIssued {
            session_id: self.id,
            request: RequestKind::Search,
            dish: Some(dish.clone()),
            with_location: location.is_some(),
            timestamp: chrono::Utc::now(),
        });

        let result = self.api.search(&dish, location).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            drop(inner);
            self.discard_stale(RequestKind::Search);
            return Outcome::Discarded;
        }

        let event = match result {
            Ok(response) => Event::SearchSucceeded(SearchResults {
                dish,
                restaurants: response.restaurants,
                user_location: location,
            }),
            Err(e) => {
                let failure = ScanFailure::search(&e);
                self.report_failure(&failure);
                Event::SearchFailed(failure)
            }
        };

        match self.dispatch(&mut inner, event) {
            Ok(_) => Outcome::Applied,
            Err(rejection) => {
                warn!(session_id = %self.id, "Search result not applied: {}", rejection);
                Outcome::Ignored(rejection)
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is replaced wholesale, so a poisoned lock still holds a valid state
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `event`, commit the next state, then any follow-up event
    ///
    /// Returns the command the caller must execute.
    fn dispatch(&self, inner: &mut Inner, event: Event) -> Result<Option<Command>, Rejection> {
        let transition = apply(&inner.state, event)?;
        self.commit(inner, transition.next);

        let mut command = transition.command;
        if let Some(follow_up) = transition.follow_up {
            match self.dispatch(inner, follow_up) {
                Ok(chained) => command = command.or(chained),
                Err(rejection) => {
                    debug!(session_id = %self.id, "Follow-up not applied: {}", rejection)
                }
            }
        }
        Ok(command)
    }

    fn commit(&self, inner: &mut Inner, next: ScanState) {
        let old_phase = inner.state.phase();
        let new_phase = next.phase();
        inner.state = next;

        if old_phase != new_phase {
            debug!(session_id = %self.id, %old_phase, %new_phase, "Phase changed");
            self.event_bus.emit_lossy(ScanEvent::PhaseChanged {
                session_id: self.id,
                old_phase,
                new_phase,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    fn discard_stale(&self, request: RequestKind) {
        debug!(session_id = %self.id, %request, "Discarding stale response");
        self.event_bus.emit_lossy(ScanEvent::StaleResponseDiscarded {
            session_id: self.id,
            request,
            timestamp: chrono::Utc::now(),
        });
    }

    fn report_failure(&self, failure: &ScanFailure) {
        warn!(session_id = %self.id, request = %failure.request, "{}", failure.message);
        self.event_bus.emit_lossy(ScanEvent::RequestFailed {
            session_id: self.id,
            request: failure.request,
            message: failure.message.clone(),
            timestamp: chrono::Utc::now(),
        });
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("max_image_bytes", &self.max_image_bytes)
            .finish_non_exhaustive()
    }
}
