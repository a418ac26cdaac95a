pub mod weather_model;

pub use weather_model::{Notification, SlotState, WeatherModel, WeatherSlot};
