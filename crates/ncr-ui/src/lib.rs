pub mod app_services;
pub mod error_mapping;
pub mod models;
pub mod render;
pub mod services;

pub use app_services::AppServices;
pub use models::{Notification, SlotState, WeatherModel, WeatherSlot};
