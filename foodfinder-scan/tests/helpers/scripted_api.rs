//! In-memory backend for ScanSession tests
//!
//! Replies are queued per call kind and handed out in order. A gated
//! ScriptedApi holds every call until the test releases it, which is how
//! tests observe a request "in flight".

use async_trait::async_trait;
use foodfinder_scan::error::{RecognitionError, RequestFailure, SearchError};
use foodfinder_scan::models::{
    Coordinates, FoodPrediction, ImageAsset, RecognitionResponse, Restaurant,
    RestaurantSearchResponse,
};
use foodfinder_scan::FoodFinderApi;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

#[derive(Default)]
pub struct ScriptedApi {
    recognize_replies: Mutex<VecDeque<Result<RecognitionResponse, RecognitionError>>>,
    search_replies: Mutex<VecDeque<Result<RestaurantSearchResponse, SearchError>>>,
    recognize_calls: AtomicUsize,
    searches: Mutex<Vec<(String, Option<Coordinates>)>>,
    recognize_gate: Option<Semaphore>,
    search_gate: Option<Semaphore>,
}

impl ScriptedApi {
    /// Replies immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds every call until released
    pub fn gated() -> Self {
        Self {
            recognize_gate: Some(Semaphore::new(0)),
            search_gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn push_recognition(&self, predictions: Vec<FoodPrediction>) {
        let top_prediction = predictions.first().cloned();
        self.recognize_replies
            .lock()
            .unwrap()
            .push_back(Ok(RecognitionResponse {
                success: true,
                predictions,
                top_prediction,
                model: "food101".to_string(),
                message: String::new(),
            }));
    }

    pub fn push_recognition_failure(&self, failure: RequestFailure) {
        self.recognize_replies
            .lock()
            .unwrap()
            .push_back(Err(RecognitionError(failure)));
    }

    pub fn push_search(&self, dish: &str, restaurants: Vec<Restaurant>) {
        self.search_replies
            .lock()
            .unwrap()
            .push_back(Ok(RestaurantSearchResponse {
                dish: dish.to_string(),
                location: None,
                restaurants,
            }));
    }

    pub fn push_search_failure(&self, failure: RequestFailure) {
        self.search_replies
            .lock()
            .unwrap()
            .push_back(Err(SearchError(failure)));
    }

    pub fn release_recognition(&self) {
        if let Some(gate) = &self.recognize_gate {
            gate.add_permits(1);
        }
    }

    pub fn release_search(&self) {
        if let Some(gate) = &self.search_gate {
            gate.add_permits(1);
        }
    }

    pub fn recognize_count(&self) -> usize {
        self.recognize_calls.load(Ordering::SeqCst)
    }

    /// Every search issued, with the location it carried
    pub fn searches(&self) -> Vec<(String, Option<Coordinates>)> {
        self.searches.lock().unwrap().clone()
    }

    pub async fn wait_for_recognize_calls(&self, count: usize) {
        for _ in 0..1000 {
            if self.recognize_count() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} recognition calls, saw {}", count, self.recognize_count());
    }

    pub async fn wait_for_searches(&self, count: usize) {
        for _ in 0..1000 {
            if self.searches().len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} searches, saw {}", count, self.searches().len());
    }
}

#[async_trait]
impl FoodFinderApi for ScriptedApi {
    async fn recognize(&self, _image: &ImageAsset) -> Result<RecognitionResponse, RecognitionError> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.recognize_gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.recognize_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(RecognitionError(RequestFailure::Network(
                    "no recognition reply scripted".to_string(),
                )))
            })
    }

    async fn search(
        &self,
        dish: &str,
        location: Option<Coordinates>,
    ) -> Result<RestaurantSearchResponse, SearchError> {
        self.searches
            .lock()
            .unwrap()
            .push((dish.to_string(), location));
        if let Some(gate) = &self.search_gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.search_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(SearchError(RequestFailure::Network(
                    "no search reply scripted".to_string(),
                )))
            })
    }
}
