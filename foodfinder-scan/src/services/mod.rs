//! External collaborators of a scan session: the backend and the location source

pub mod api_client;
pub mod geolocation;

pub use api_client::{search_query, ApiClient, FoodFinderApi};
pub use geolocation::{
    DeniedLocation, FixedLocation, GeolocationProvider, HttpLocationSource, LocationError,
    LocationSource, UnresponsiveLocation, UnsupportedLocation,
};
