pub mod bridge;
pub mod native;
pub mod params;
