//! Supported municipalities and their coordinates.

use crate::types::{Municipality, WeatherError};

/// The seventeen NCR cities and municipality, in display order.
const NCR_MUNICIPALITIES: &[(&str, &str)] = &[
    ("Manila", "14.5995,120.9842"),
    ("Quezon City", "14.6760,121.0437"),
    ("Makati", "14.5547,121.0244"),
    ("Pasig", "14.5764,121.0851"),
    ("Taguig", "14.5176,121.0509"),
    ("Mandaluyong", "14.5794,121.0359"),
    ("Marikina", "14.6507,121.1029"),
    ("Pasay", "14.5378,120.9896"),
    ("Caloocan", "14.6488,120.9668"),
    ("Las Piñas", "14.4378,120.9947"),
    ("Muntinlupa", "14.3832,121.0409"),
    ("Parañaque", "14.4793,121.0198"),
    ("Valenzuela", "14.7000,120.9822"),
    ("Malabon", "14.6650,120.9569"),
    ("Navotas", "14.6691,120.9472"),
    ("San Juan", "14.6019,121.0355"),
    ("Pateros", "14.5441,121.0699"),
];

/// Immutable name -> coordinates table, built once and shared.
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    municipalities: Vec<Municipality>,
}

impl LocationRegistry {
    /// Build a registry from a table. Names must be unique and non-empty.
    pub fn new(municipalities: Vec<Municipality>) -> Result<Self, WeatherError> {
        for (i, m) in municipalities.iter().enumerate() {
            if m.name.trim().is_empty() {
                return Err(WeatherError::Configuration(format!(
                    "municipality #{} has an empty name",
                    i
                )));
            }
            if municipalities[..i].iter().any(|other| other.name == m.name) {
                return Err(WeatherError::Configuration(format!(
                    "duplicate municipality: {}",
                    m.name
                )));
            }
        }
        Ok(Self { municipalities })
    }

    /// The built-in Metro Manila table.
    pub fn ncr() -> Self {
        Self {
            municipalities: NCR_MUNICIPALITIES
                .iter()
                .map(|(name, coords)| Municipality::new(*name, *coords))
                .collect(),
        }
    }

    pub fn find(&self, name: &str) -> Option<&Municipality> {
        self.municipalities.iter().find(|m| m.name == name)
    }

    /// Look up a municipality, failing with `UnknownLocation`.
    pub fn resolve(&self, name: &str) -> Result<&Municipality, WeatherError> {
        self.find(name)
            .ok_or_else(|| WeatherError::UnknownLocation(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.municipalities.iter().map(|m| m.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.municipalities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.municipalities.is_empty()
    }
}

impl Default for LocationRegistry {
    fn default() -> Self {
        Self::ncr()
    }
}
