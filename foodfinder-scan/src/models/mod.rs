//! Data models exchanged with the FoodFinder backend

pub mod food;
pub mod image;
pub mod restaurant;

pub use food::{
    format_confidence, Dish, DishCatalog, FoodPrediction, HealthStatus, RecognitionResponse,
};
pub use image::ImageAsset;
pub use restaurant::{
    Coordinates, Restaurant, RestaurantId, RestaurantSearchResponse, SearchLocation,
};
