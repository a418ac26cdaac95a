//! Plain-text rendering of the dashboard slots.

use chrono::{NaiveDate, NaiveDateTime};
use ncr_weather::{DayForecast, ForecastBundle, WeatherReading};

use crate::models::{SlotState, WeatherModel, WeatherSlot};

/// Format the provider's "YYYY-MM-DD HH:MM" local time as "2:05 PM".
/// Unparseable input is returned as-is.
pub fn format_local_time(local: &str) -> String {
    NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M")
        .map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_else(|_| local.to_string())
}

/// "Today" for the first forecast row, "Mon, Oct 20" otherwise.
pub fn day_label(index: usize, date: NaiveDate) -> String {
    if index == 0 {
        "Today".to_string()
    } else {
        date.format("%a, %b %-d").to_string()
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

/// Join rendered lines, each ending in a newline.
fn block(lines: Vec<String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}

pub fn render_current(reading: &WeatherReading) -> String {
    let conditions = match reading.conditions() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Unreadable reading for {}: {}", reading.location, e);
            return "No weather data available\n".to_string();
        }
    };

    let mut lines = vec![
        format!(
            "{}°C  {}",
            round(conditions.temperature_c),
            conditions.condition.text
        ),
        format!("Feels like {}°C", round(conditions.feels_like_c)),
        format!("Icon: {}", conditions.condition.icon_url()),
        format!("Wind Speed: {} km/h", conditions.wind_kph),
        format!("Humidity: {}%", conditions.humidity),
        format!("UV Index: {}", conditions.uv_index),
    ];
    if let Some(pm2_5) = conditions.pm2_5 {
        lines.push(format!("PM2.5: {}", round(pm2_5)));
    }
    lines.push(conditions.location_name.clone());
    lines.push(format!(
        "Last updated: {}",
        format_local_time(&conditions.local_time)
    ));
    block(lines)
}

fn render_day(index: usize, day: &DayForecast) -> [String; 2] {
    [
        format!(
            "{:<12} {:<24} {}° / {}°  {}% rain",
            day_label(index, day.date),
            day.condition.text,
            round(day.max_temp_c),
            round(day.min_temp_c),
            day.chance_of_rain
        ),
        format!(
            "             Sunrise: {}  Sunset: {}",
            day.sunrise, day.sunset
        ),
    ]
}

/// The forecast is headed by the municipality it was fetched for, which may
/// differ from the current selection.
pub fn render_forecast(bundle: &ForecastBundle) -> String {
    let mut lines = vec![format!("Forecast for {}", bundle.location)];

    if !bundle.alerts.is_empty() {
        lines.push("Weather Alerts".to_string());
        for alert in &bundle.alerts {
            lines.push(match &alert.severity {
                Some(severity) => format!("  [{}] {}", severity, alert.headline),
                None => format!("  {}", alert.headline),
            });
            if !alert.description.is_empty() {
                lines.push(format!("    {}", alert.description));
            }
        }
        lines.push(String::new());
    }

    for (index, day) in bundle.days.iter().enumerate() {
        lines.extend(render_day(index, day));
    }
    block(lines)
}

fn render_slot<T>(
    out: &mut String,
    title: &str,
    slot: &WeatherSlot<T>,
    empty: &str,
    body: impl Fn(&T) -> String,
) {
    out.push_str(&format!("== {} ==\n", title));
    match (slot.state, &slot.data) {
        (SlotState::Loading, _) => out.push_str("Loading...\n"),
        (_, Some(data)) => {
            out.push_str(&body(data));
            if slot.state == SlotState::Failed {
                out.push_str("(showing last successful result)\n");
            }
        }
        (_, None) => {
            out.push_str(empty);
            out.push('\n');
        }
    }
}

/// The whole dashboard: selection, current conditions, forecast.
pub fn render_dashboard(model: &WeatherModel) -> String {
    let mut out = format!(
        "Selected NCR City: {}\n\n",
        model.selected_city().unwrap_or("(none)")
    );

    render_slot(
        &mut out,
        "Current Weather",
        model.current(),
        "No weather data available",
        render_current,
    );
    out.push('\n');
    render_slot(
        &mut out,
        "Forecast",
        model.forecast(),
        "Run \"forecast\" to load the forecast",
        render_forecast,
    );
    out
}
