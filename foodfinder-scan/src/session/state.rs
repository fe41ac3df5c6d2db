//! Scan state machine
//!
//! ```text
//! Idle → ImageReady → Recognizing → PredictionsReady → SearchingRestaurants → ResultsReady
//!                         │                                    │
//!                         └──────────── Error(prior) ◄─────────┘
//! ```
//!
//! [`apply`] is a pure function from `(state, event)` to the next state plus
//! the side effect the driver must perform. Each variant carries exactly the
//! data that phase owns, so restaurants without predictions (or predictions
//! without an image) cannot be represented.

use crate::error::ScanFailure;
use crate::models::{Coordinates, FoodPrediction, ImageAsset, Restaurant};
use foodfinder_common::events::{RequestKind, ScanPhase};
use std::sync::Arc;

/// Outcome of a successful restaurant search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    /// Dish the search was issued for
    pub dish: String,
    /// Possibly empty; "nothing found" is still a result
    pub restaurants: Vec<Restaurant>,
    /// Location the search was issued with, if any
    pub user_location: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Idle,
    ImageReady {
        image: Arc<ImageAsset>,
    },
    Recognizing {
        image: Arc<ImageAsset>,
    },
    PredictionsReady {
        image: Arc<ImageAsset>,
        predictions: Vec<FoodPrediction>,
    },
    SearchingRestaurants {
        image: Arc<ImageAsset>,
        predictions: Vec<FoodPrediction>,
        dish: String,
        /// Results being replaced by a manual re-search
        previous: Option<SearchResults>,
    },
    ResultsReady {
        image: Arc<ImageAsset>,
        predictions: Vec<FoodPrediction>,
        results: SearchResults,
    },
    /// `prior` is always ImageReady, PredictionsReady or ResultsReady
    Error {
        prior: Box<ScanState>,
        failure: ScanFailure,
    },
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ImageLoaded(Arc<ImageAsset>),
    RecognizeRequested,
    RecognitionSucceeded(Vec<FoodPrediction>),
    RecognitionFailed(ScanFailure),
    SearchRequested { dish: String },
    SearchSucceeded(SearchResults),
    SearchFailed(ScanFailure),
    ErrorDismissed,
    Retake,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::ImageLoaded(_) => "ImageLoaded",
            Event::RecognizeRequested => "RecognizeRequested",
            Event::RecognitionSucceeded(_) => "RecognitionSucceeded",
            Event::RecognitionFailed(_) => "RecognitionFailed",
            Event::SearchRequested { .. } => "SearchRequested",
            Event::SearchSucceeded(_) => "SearchSucceeded",
            Event::SearchFailed(_) => "SearchFailed",
            Event::ErrorDismissed => "ErrorDismissed",
            Event::Retake => "Retake",
        }
    }
}

/// Side effect the driver performs after committing a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Recognize { image: Arc<ImageAsset> },
    Search { dish: String },
}

/// Accepted event
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: ScanState,
    pub command: Option<Command>,
    /// Event to apply immediately after this one (the auto-chained search)
    pub follow_up: Option<Event>,
}

impl Transition {
    fn to(next: ScanState) -> Self {
        Self {
            next,
            command: None,
            follow_up: None,
        }
    }

    fn with_command(next: ScanState, command: Command) -> Self {
        Self {
            next,
            command: Some(command),
            follow_up: None,
        }
    }
}

/// Why an event was not accepted; the state is left unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A request of this kind is already in flight
    Busy(RequestKind),
    /// The event makes no sense in the current phase
    InvalidState {
        phase: ScanPhase,
        event: &'static str,
    },
    /// Search requested for a blank dish name
    BlankDish,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Busy(kind) => write!(f, "{} request already in flight", kind),
            Rejection::InvalidState { phase, event } => {
                write!(f, "{} not accepted in phase {}", event, phase)
            }
            Rejection::BlankDish => write!(f, "dish name is empty"),
        }
    }
}

/// Compute the transition for `event` in `state`
pub fn apply(state: &ScanState, event: Event) -> Result<Transition, Rejection> {
    use ScanState::*;

    match (state, event) {
        // Always accepted, from any phase
        (_, Event::Retake) => Ok(Transition::to(Idle)),
        (_, Event::ImageLoaded(image)) => Ok(Transition::to(ImageReady { image })),

        (Error { prior, .. }, Event::ErrorDismissed) => Ok(Transition::to((**prior).clone())),

        // Retrying from an error phase behaves like requesting from the prior phase
        (Error { prior, .. }, event @ (Event::RecognizeRequested | Event::SearchRequested { .. })) => {
            let name = event.name();
            apply(prior, event).map_err(|rejection| match rejection {
                Rejection::InvalidState { .. } => Rejection::InvalidState {
                    phase: ScanPhase::Error,
                    event: name,
                },
                other => other,
            })
        }

        (ImageReady { image }, Event::RecognizeRequested) => Ok(Transition::with_command(
            Recognizing {
                image: Arc::clone(image),
            },
            Command::Recognize {
                image: Arc::clone(image),
            },
        )),
        (Recognizing { .. }, Event::RecognizeRequested) => {
            Err(Rejection::Busy(RequestKind::Recognition))
        }

        (Recognizing { image }, Event::RecognitionSucceeded(predictions)) => {
            let follow_up = predictions.first().map(|top| Event::SearchRequested {
                dish: top.food_name.clone(),
            });
            Ok(Transition {
                next: PredictionsReady {
                    image: Arc::clone(image),
                    predictions,
                },
                command: None,
                follow_up,
            })
        }
        (Recognizing { image }, Event::RecognitionFailed(failure)) => Ok(Transition::to(Error {
            prior: Box::new(ImageReady {
                image: Arc::clone(image),
            }),
            failure,
        })),

        (_, Event::SearchRequested { dish }) if dish.trim().is_empty() => {
            Err(Rejection::BlankDish)
        }
        (Recognizing { .. }, Event::SearchRequested { .. }) => {
            Err(Rejection::Busy(RequestKind::Recognition))
        }
        (SearchingRestaurants { .. }, Event::SearchRequested { .. }) => {
            Err(Rejection::Busy(RequestKind::Search))
        }
        (PredictionsReady { image, predictions }, Event::SearchRequested { dish }) => {
            Ok(Transition::with_command(
                SearchingRestaurants {
                    image: Arc::clone(image),
                    predictions: predictions.clone(),
                    dish: dish.clone(),
                    previous: None,
                },
                Command::Search { dish },
            ))
        }
        (
            ResultsReady {
                image,
                predictions,
                results,
            },
            Event::SearchRequested { dish },
        ) => Ok(Transition::with_command(
            SearchingRestaurants {
                image: Arc::clone(image),
                predictions: predictions.clone(),
                dish: dish.clone(),
                previous: Some(results.clone()),
            },
            Command::Search { dish },
        )),

        (
            SearchingRestaurants {
                image, predictions, ..
            },
            Event::SearchSucceeded(results),
        ) => Ok(Transition::to(ResultsReady {
            image: Arc::clone(image),
            predictions: predictions.clone(),
            results,
        })),
        (
            SearchingRestaurants {
                image,
                predictions,
                previous,
                ..
            },
            Event::SearchFailed(failure),
        ) => {
            let prior = match previous {
                Some(results) => ResultsReady {
                    image: Arc::clone(image),
                    predictions: predictions.clone(),
                    results: results.clone(),
                },
                None => PredictionsReady {
                    image: Arc::clone(image),
                    predictions: predictions.clone(),
                },
            };
            Ok(Transition::to(Error {
                prior: Box::new(prior),
                failure,
            }))
        }

        (state, event) => Err(Rejection::InvalidState {
            phase: state.phase(),
            event: event.name(),
        }),
    }
}

impl ScanState {
    pub fn phase(&self) -> ScanPhase {
        match self {
            ScanState::Idle => ScanPhase::Idle,
            ScanState::ImageReady { .. } => ScanPhase::ImageReady,
            ScanState::Recognizing { .. } => ScanPhase::Recognizing,
            ScanState::PredictionsReady { .. } => ScanPhase::PredictionsReady,
            ScanState::SearchingRestaurants { .. } => ScanPhase::SearchingRestaurants,
            ScanState::ResultsReady { .. } => ScanPhase::ResultsReady,
            ScanState::Error { .. } => ScanPhase::Error,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    /// Selected image, in every phase but Idle
    pub fn image(&self) -> Option<&Arc<ImageAsset>> {
        match self {
            ScanState::Idle => None,
            ScanState::ImageReady { image }
            | ScanState::Recognizing { image }
            | ScanState::PredictionsReady { image, .. }
            | ScanState::SearchingRestaurants { image, .. }
            | ScanState::ResultsReady { image, .. } => Some(image),
            ScanState::Error { prior, .. } => prior.image(),
        }
    }

    /// Ranked predictions; empty before recognition has succeeded
    pub fn predictions(&self) -> &[FoodPrediction] {
        match self {
            ScanState::PredictionsReady { predictions, .. }
            | ScanState::SearchingRestaurants { predictions, .. }
            | ScanState::ResultsReady { predictions, .. } => predictions,
            ScanState::Error { prior, .. } => prior.predictions(),
            _ => &[],
        }
    }

    /// Settled search results (not those being replaced by a running search)
    pub fn search_results(&self) -> Option<&SearchResults> {
        match self {
            ScanState::ResultsReady { results, .. } => Some(results),
            ScanState::Error { prior, .. } => prior.search_results(),
            _ => None,
        }
    }

    /// Restaurants found; empty before a search has succeeded
    pub fn restaurants(&self) -> &[Restaurant] {
        self.search_results()
            .map(|r| r.restaurants.as_slice())
            .unwrap_or(&[])
    }

    /// Dish of the settled results
    pub fn searched_dish(&self) -> Option<&str> {
        self.search_results().map(|r| r.dish.as_str())
    }

    /// Dish of the search currently in flight
    pub fn pending_dish(&self) -> Option<&str> {
        match self {
            ScanState::SearchingRestaurants { dish, .. } => Some(dish),
            _ => None,
        }
    }

    pub fn user_location(&self) -> Option<Coordinates> {
        self.search_results().and_then(|r| r.user_location)
    }

    pub fn failure(&self) -> Option<&ScanFailure> {
        match self {
            ScanState::Error { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Phase an error state will return to
    pub fn prior_phase(&self) -> Option<ScanPhase> {
        match self {
            ScanState::Error { prior, .. } => Some(prior.phase()),
            _ => None,
        }
    }
}
