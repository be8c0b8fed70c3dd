//! Input records: facilities and hazard events
//!
//! Both record types are produced by collaborators outside this crate (file
//! upload parsing, hazard feed parsing) and arrive as JSON. Deserialization is
//! lenient about numeric fields so that a malformed value becomes NaN and is
//! skipped later by the matcher, instead of failing the whole batch.

use crate::geo::{self, LatLng};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A geolocated facility from an uploaded facility list
///
/// `name` is the unique key within a session. Every extra column of the
/// uploaded row (type, capacity, country, ...) is kept in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    #[serde(default)]
    pub name: String,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub latitude: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub longitude: f64,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Facility {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Facility {
            name: name.into(),
            latitude,
            longitude,
            attributes: BTreeMap::new(),
        }
    }

    /// Attach an extra attribute (builder style)
    pub fn with_attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn location(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Non-empty name and a valid coordinate
    pub fn is_well_formed(&self) -> bool {
        !self.name.trim().is_empty() && self.location().is_valid()
    }

    /// String view of an attribute, if present and scalar
    pub fn attribute_str(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// GDACS hazard type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EventType {
    Earthquake,
    TropicalCyclone,
    Flood,
    Volcano,
    Drought,
    Wildfire,
    Tsunami,
    #[default]
    Unknown,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::Earthquake,
        EventType::TropicalCyclone,
        EventType::Flood,
        EventType::Volcano,
        EventType::Drought,
        EventType::Wildfire,
        EventType::Tsunami,
    ];

    /// Parse a feed code (case-insensitive); unrecognized codes map to `Unknown`
    pub fn from_code(code: &str) -> EventType {
        match code.trim().to_ascii_lowercase().as_str() {
            "eq" => EventType::Earthquake,
            "tc" => EventType::TropicalCyclone,
            "fl" => EventType::Flood,
            "vo" => EventType::Volcano,
            "dr" => EventType::Drought,
            "wf" => EventType::Wildfire,
            "ts" => EventType::Tsunami,
            _ => EventType::Unknown,
        }
    }

    /// Strict parse used by configuration validation
    pub fn parse_known(code: &str) -> Option<EventType> {
        match EventType::from_code(code) {
            EventType::Unknown => None,
            known => Some(known),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EventType::Earthquake => "eq",
            EventType::TropicalCyclone => "tc",
            EventType::Flood => "fl",
            EventType::Volcano => "vo",
            EventType::Drought => "dr",
            EventType::Wildfire => "wf",
            EventType::Tsunami => "ts",
            EventType::Unknown => "unknown",
        }
    }

    /// Human-readable hazard name
    pub fn display_name(&self) -> &'static str {
        match self {
            EventType::Earthquake => "Earthquake",
            EventType::TropicalCyclone => "Tropical Cyclone",
            EventType::Flood => "Flood",
            EventType::Volcano => "Volcanic Activity",
            EventType::Drought => "Drought",
            EventType::Wildfire => "Wildfire",
            EventType::Tsunami => "Tsunami",
            EventType::Unknown => "Unknown Hazard",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = Option::<String>::deserialize(deserializer)?;
        Ok(code.map(|c| EventType::from_code(&c)).unwrap_or_default())
    }
}

/// GDACS alert level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Red,
    Orange,
    Green,
}

impl AlertLevel {
    pub fn parse(value: &str) -> Option<AlertLevel> {
        match value.trim().to_ascii_lowercase().as_str() {
            "red" => Some(AlertLevel::Red),
            "orange" => Some(AlertLevel::Orange),
            "green" => Some(AlertLevel::Green),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Red => "red",
            AlertLevel::Orange => "orange",
            AlertLevel::Green => "green",
        }
    }
}

impl<'de> Deserialize<'de> for AlertLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        AlertLevel::parse(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown alert level: {}", value)))
    }
}

/// A hazard event from the feed
///
/// `polygon` holds raw coordinate pairs of unknown axis order; the zone
/// resolver decides the order and validates the ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(
        default,
        deserialize_with = "lenient_alert_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub alert_level: Option<AlertLevel>,
    #[serde(
        default,
        deserialize_with = "lenient_cap",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_cap",
        skip_serializing_if = "Option::is_none"
    )]
    pub certainty: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_cap",
        skip_serializing_if = "Option::is_none"
    )]
    pub urgency: Option<String>,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub latitude: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub longitude: f64,
    #[serde(
        default,
        deserialize_with = "lenient_polygon",
        skip_serializing_if = "Option::is_none"
    )]
    pub polygon: Option<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<DateTime<Utc>>,
}

impl HazardEvent {
    pub fn new(
        id: impl Into<String>,
        event_type: EventType,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        HazardEvent {
            id: id.into(),
            title: String::new(),
            event_type,
            alert_level: None,
            severity: None,
            certainty: None,
            urgency: None,
            latitude,
            longitude,
            polygon: None,
            pub_date: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_alert(mut self, level: AlertLevel) -> Self {
        self.alert_level = Some(level);
        self
    }

    pub fn with_polygon(mut self, polygon: Vec<[f64; 2]>) -> Self {
        self.polygon = Some(polygon);
        self
    }

    pub fn with_pub_date(mut self, date: DateTime<Utc>) -> Self {
        self.pub_date = Some(date);
        self
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Title, falling back to the id when the feed left it blank
    pub fn display_name(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// Coordinate for a missing key; the matcher skips it like any other NaN
pub(crate) fn nan() -> f64 {
    f64::NAN
}

/// Accept a number, a numeric string, or null; anything unparseable is NaN
pub(crate) fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value).unwrap_or(f64::NAN))
}

pub(crate) fn value_to_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// CAP taxonomy value; numbers are kept as text, other shapes become `None`
fn lenient_cap<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Unknown alert strings are treated as "no alert level" rather than an error
fn lenient_alert_level<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<AlertLevel>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(AlertLevel::parse))
}

/// Keep only pairs that look like two numbers; the resolver validates ranges
///
/// Accepts `[a, b]` pairs, `{lat, lng}` objects, or a CAP polygon string.
fn lenient_polygon<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<[f64; 2]>>, D::Error> {
    let items = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(items)) => items,
        // CAP feeds carry the ring as "a,b a,b ..."
        Some(serde_json::Value::String(text)) => return Ok(Some(geo::parse_cap_polygon(&text))),
        _ => return Ok(None),
    };

    let pairs = items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::Array(pair) if pair.len() == 2 => {
                Some([value_to_f64(&pair[0])?, value_to_f64(&pair[1])?])
            }
            serde_json::Value::Object(map) => {
                let lat = map.get("lat").and_then(value_to_f64)?;
                let lng = map.get("lng").and_then(value_to_f64)?;
                Some([lat, lng])
            }
            _ => None,
        })
        .collect();

    Ok(Some(pairs))
}
