//! Sensor catalog reference data.
//!
//! Fetched once per session from `GET /sensors` and treated as immutable
//! for the rest of the session. The catalog maps sensor codes (the keys of
//! a reading) to display names, units, and icon references.

use serde::{Deserialize, Serialize};

/// One catalog entry as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// The immutable sensor catalog for the session.
#[derive(Debug, Clone, Default)]
pub struct SensorCatalog {
    entries: Vec<SensorInfo>,
}

impl SensorCatalog {
    pub fn new(entries: Vec<SensorInfo>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SensorInfo] {
        &self.entries
    }

    pub fn get(&self, code: &str) -> Option<&SensorInfo> {
        self.entries.iter().find(|s| s.code == code)
    }

    /// Display name for a sensor code, falling back to the code itself for
    /// sensors the catalog does not know.
    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.get(code).map_or(code, |s| s.name.as_str())
    }

    /// Format a value with the sensor's unit when the catalog knows one.
    pub fn format_value(&self, code: &str, value: f64) -> String {
        match self.get(code).and_then(|s| s.unit.as_deref()) {
            Some(unit) => format!("{value:.1} {unit}"),
            None => format!("{value:.1}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SensorCatalog {
        SensorCatalog::new(vec![
            SensorInfo {
                code: "temperature".to_string(),
                name: "Temperature".to_string(),
                unit: Some("°C".to_string()),
                icon: Some("thermometer".to_string()),
            },
            SensorInfo {
                code: "humidity".to_string(),
                name: "Humidity".to_string(),
                unit: Some("%".to_string()),
                icon: None,
            },
        ])
    }

    #[test]
    fn test_lookup_by_code() {
        let catalog = catalog();
        assert_eq!(catalog.get("humidity").unwrap().name, "Humidity");
        assert!(catalog.get("co2").is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_code() {
        let catalog = catalog();
        assert_eq!(catalog.display_name("temperature"), "Temperature");
        assert_eq!(catalog.display_name("co2"), "co2");
    }

    #[test]
    fn test_format_value() {
        let catalog = catalog();
        assert_eq!(catalog.format_value("temperature", 21.55), "21.6 °C");
        assert_eq!(catalog.format_value("co2", 412.0), "412.0");
    }

    #[test]
    fn test_deserialize_catalog() {
        let json = r#"[
            {"code": "temperature", "name": "Temperature", "unit": "°C", "icon": "thermometer"},
            {"code": "cpu_temp", "name": "CPU Temperature"}
        ]"#;
        let entries: Vec<SensorInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].unit.is_none());
    }
}
