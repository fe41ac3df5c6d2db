//! Test helpers for foodfinder-scan integration tests
//!
//! - StubBackend: in-process HTTP backend for ApiClient tests
//! - LocationStub: in-process IP-geolocation endpoint
//! - ScriptedApi: in-memory FoodFinderApi with gated, counted calls
//! - fixtures: predictions, restaurants and images

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod location_stub;
pub mod scripted_api;
pub mod stub_backend;

pub use fixtures::{png_image, prediction, restaurant};
pub use location_stub::LocationStub;
pub use scripted_api::ScriptedApi;
pub use stub_backend::{Reply, StubBackend};
