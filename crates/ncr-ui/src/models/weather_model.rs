//! Dashboard state for the selected municipality.
//!
//! `WeatherModel` owns two independent slots, current conditions and
//! forecast, each moving through `Idle -> Loading -> {Displaying, Failed}`.
//! Fetches run on the tokio runtime; their results come back over an mpsc
//! channel and are applied by [`WeatherModel::poll`] or
//! [`WeatherModel::wait_for_message`] on the UI thread.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ncr_core::AppError;
use ncr_weather::{ForecastBundle, WeatherReading, WeatherService};
use tokio::runtime::Handle;

use crate::services::weather_service::{
    request_current, request_forecast, WeatherError, WeatherServiceMessage,
};

/// Lifecycle of one dashboard slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Idle,
    Loading,
    Displaying,
    Failed,
}

/// Data shown in one slot plus its state.
///
/// `data` survives a failure so the last good result stays on screen.
/// `loading_for` names the city of the fetch the slot is waiting on.
#[derive(Debug, Clone)]
pub struct WeatherSlot<T> {
    pub state: SlotState,
    pub data: Option<T>,
    pub error: Option<WeatherError>,
    loading_for: Option<String>,
}

impl<T> Default for WeatherSlot<T> {
    fn default() -> Self {
        Self {
            state: SlotState::Idle,
            data: None,
            error: None,
            loading_for: None,
        }
    }
}

impl<T> WeatherSlot<T> {
    pub fn is_loading(&self) -> bool {
        self.state == SlotState::Loading
    }

    fn begin(&mut self, city: &str) {
        self.state = SlotState::Loading;
        self.error = None;
        self.loading_for = Some(city.to_string());
    }

    fn show(&mut self, data: T) {
        self.state = SlotState::Displaying;
        self.data = Some(data);
        self.error = None;
        self.loading_for = None;
    }

    fn fail(&mut self, error: WeatherError) {
        self.state = SlotState::Failed;
        self.error = Some(error);
        self.loading_for = None;
    }

    /// A result for `city` arrived after the selection moved on. If the slot
    /// was still waiting on it, go back to what was shown before.
    fn abandon(&mut self, city: &str) {
        if self.state != SlotState::Loading || self.loading_for.as_deref() != Some(city) {
            return;
        }
        self.state = if self.data.is_some() {
            SlotState::Displaying
        } else {
            SlotState::Idle
        };
        self.loading_for = None;
    }
}

/// A user-visible message raised by a failed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

pub struct WeatherModel {
    service: Arc<WeatherService>,
    runtime: Handle,
    tx: Sender<WeatherServiceMessage>,
    rx: Receiver<WeatherServiceMessage>,
    forecast_days: Option<u32>,
    selected: Option<String>,
    current: WeatherSlot<WeatherReading>,
    forecast: WeatherSlot<ForecastBundle>,
    notifications: Vec<Notification>,
    in_flight: usize,
}

impl WeatherModel {
    pub fn new(service: Arc<WeatherService>, runtime: Handle, forecast_days: Option<u32>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            service,
            runtime,
            tx,
            rx,
            forecast_days,
            selected: None,
            current: WeatherSlot::default(),
            forecast: WeatherSlot::default(),
            notifications: Vec::new(),
            in_flight: 0,
        }
    }

    pub fn municipalities(&self) -> Vec<String> {
        self.service.municipalities()
    }

    pub fn selected_city(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn current(&self) -> &WeatherSlot<WeatherReading> {
        &self.current
    }

    pub fn forecast(&self) -> &WeatherSlot<ForecastBundle> {
        &self.forecast
    }

    /// Whether any fetch has not reported back yet.
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Select a municipality. A fresh cached reading is shown at once with
    /// no network call; otherwise a live fetch is started.
    pub fn select_city(&mut self, city: &str) {
        self.selected = Some(city.to_string());

        match self.service.cached_weather(city) {
            Ok(Some(reading)) => {
                tracing::info!("Using cached weather for {}", city);
                self.current.show(reading);
                return;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Cache lookup failed for {}: {}", city, e);
            }
        }

        self.start_current_fetch(city.to_string());
    }

    /// Re-fetch current conditions for the selected municipality, ignoring
    /// the cache.
    pub fn refresh(&mut self) {
        match self.selected.clone() {
            Some(city) => self.start_current_fetch(city),
            None => tracing::debug!("Refresh requested with no municipality selected"),
        }
    }

    /// Fetch a forecast for the selected municipality. Always live.
    pub fn load_forecast(&mut self) {
        let Some(city) = self.selected.clone() else {
            tracing::debug!("Forecast requested with no municipality selected");
            return;
        };

        self.forecast.begin(&city);
        self.in_flight += 1;
        request_forecast(
            &self.tx,
            &self.runtime,
            self.service.clone(),
            city,
            self.forecast_days,
        );
    }

    fn start_current_fetch(&mut self, city: String) {
        self.current.begin(&city);
        self.in_flight += 1;
        request_current(&self.tx, &self.runtime, self.service.clone(), city);
    }

    /// Apply every result that has arrived. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.apply(msg);
            applied += 1;
        }
        applied
    }

    /// Block until one result arrives or `timeout` passes, then drain any
    /// others. Returns false on timeout.
    pub fn wait_for_message(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => {
                self.apply(msg);
                self.poll();
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            // The model holds a sender, so the channel never disconnects.
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Notifications raised since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn apply(&mut self, msg: WeatherServiceMessage) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let selected = self.selected.as_deref() == Some(msg.city());

        match msg {
            WeatherServiceMessage::CurrentDone { city, result } => match result {
                Ok(reading) if selected => {
                    tracing::info!("Weather updated for {}", city);
                    self.current.show(reading);
                }
                Ok(_) => {
                    tracing::debug!("Weather for {} arrived after the selection moved on", city);
                    self.current.abandon(&city);
                }
                Err(e) => {
                    tracing::error!("Failed to fetch weather for {}: {}", city, e);
                    self.notify("Failed to fetch weather data.", &e);
                    if selected {
                        self.current.fail(e);
                    } else {
                        self.current.abandon(&city);
                    }
                }
            },
            WeatherServiceMessage::ForecastDone { city, result } => match result {
                Ok(bundle) if selected => {
                    tracing::info!("Forecast updated for {}", city);
                    self.forecast.show(bundle);
                }
                Ok(_) => {
                    tracing::debug!("Forecast for {} arrived after the selection moved on", city);
                    self.forecast.abandon(&city);
                }
                Err(e) => {
                    tracing::error!("Failed to fetch forecast for {}: {}", city, e);
                    self.notify("Failed to fetch forecast data.", &e);
                    if selected {
                        self.forecast.fail(e);
                    } else {
                        self.forecast.abandon(&city);
                    }
                }
            },
        }
    }

    fn notify(&mut self, headline: &str, error: &WeatherError) {
        let app_error = AppError::from(error.clone());
        self.notifications.push(Notification {
            message: format!("{} {}", headline, app_error.user_message()),
            raised_at: Utc::now(),
        });
    }
}
