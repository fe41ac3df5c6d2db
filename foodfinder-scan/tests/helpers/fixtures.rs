//! Shared test data

use foodfinder_scan::models::{Coordinates, FoodPrediction, ImageAsset, Restaurant, RestaurantId};

/// PNG signature padded to 32 bytes; enough for magic-byte sniffing
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}

pub fn png_image(file_name: &str) -> ImageAsset {
    ImageAsset::from_bytes(png_bytes(), file_name, None, 10 * 1024 * 1024)
        .expect("fixture PNG must validate")
}

pub fn prediction(food_name: &str, confidence: f64) -> FoodPrediction {
    FoodPrediction {
        food_name: food_name.to_string(),
        confidence,
        class_id: 0,
        description: String::new(),
    }
}

pub fn restaurant(id: i64, name: &str, distance: &str, coordinates: Option<Coordinates>) -> Restaurant {
    Restaurant {
        id: RestaurantId::Number(id),
        name: name.to_string(),
        address: "Tverskaya 1".to_string(),
        rating: 4.6,
        price_range: "$$".to_string(),
        distance: distance.to_string(),
        coordinates,
        menu_link: String::new(),
    }
}
