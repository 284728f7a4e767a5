// src/models.rs
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnalysisRequest {
    pub vin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnalysisResponse {
    pub analyse_id: i64,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub car_params: Option<CarParameters>,
    #[serde(default)]
    pub vin_check_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarParameters {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub transmission: Transmission,
    pub drive_type: DriveType,
    pub color: String,
    pub wheel_side: WheelSide,
    pub engine_volume: f64,
    pub engine_type: EngineType,
    pub body_type: BodyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transmission {
    #[serde(rename = "Ручная")]
    Manual,
    #[serde(rename = "Автоматическая")]
    Automatic,
    #[serde(rename = "Полуавтоматическая")]
    SemiAutomatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveType {
    #[serde(rename = "Передний")]
    Front,
    #[serde(rename = "Задний")]
    Rear,
    #[serde(rename = "Полный")]
    AllWheel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WheelSide {
    #[serde(rename = "Левый")]
    Left,
    #[serde(rename = "Правый")]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineType {
    #[serde(rename = "Бензиновый")]
    Petrol,
    #[serde(rename = "Дизельный")]
    Diesel,
    #[serde(rename = "Гибридный")]
    Hybrid,
    #[serde(rename = "Электрический")]
    Electric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    #[serde(rename = "Седан")]
    Sedan,
    #[serde(rename = "Хэтчбек")]
    Hatchback,
    #[serde(rename = "Универсал")]
    Wagon,
    #[serde(rename = "Купе")]
    Coupe,
    #[serde(rename = "Кроссовер")]
    Crossover,
    #[serde(rename = "Внедорожник")]
    Suv,
    #[serde(rename = "Пикап")]
    Pickup,
}

/// Partial update of the draft parameters. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParametersEdit {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub transmission: Option<Transmission>,
    pub drive_type: Option<DriveType>,
    pub color: Option<String>,
    pub wheel_side: Option<WheelSide>,
    pub engine_volume: Option<f64>,
    pub engine_type: Option<EngineType>,
    pub body_type: Option<BodyType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoPosition {
    Front,
    Rear,
    Left,
    Right,
    Other,
}

impl PhotoPosition {
    pub const REQUIRED: [PhotoPosition; 4] = [
        PhotoPosition::Front,
        PhotoPosition::Rear,
        PhotoPosition::Left,
        PhotoPosition::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoPosition::Front => "front",
            PhotoPosition::Rear => "rear",
            PhotoPosition::Left => "left",
            PhotoPosition::Right => "right",
            PhotoPosition::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "front" => Some(PhotoPosition::Front),
            "rear" => Some(PhotoPosition::Rear),
            "left" => Some(PhotoPosition::Left),
            "right" => Some(PhotoPosition::Right),
            "other" => Some(PhotoPosition::Other),
            _ => None,
        }
    }
}

impl fmt::Display for PhotoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A photo held in memory between intake and upload.
#[derive(Debug, Clone)]
pub struct Photo {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DefectKind {
    Dent,
    Cracked,
    Scratch,
    Flaking,
    #[serde(rename = "Broken part")]
    BrokenPart,
    #[serde(rename = "Paint chip")]
    PaintChip,
    #[serde(rename = "Missing part")]
    MissingPart,
    Corrosion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CarPart {
    Windshield,
    #[serde(rename = "Back-windshield")]
    BackWindshield,
    #[serde(rename = "Left-Front-window")]
    LeftFrontWindow,
    #[serde(rename = "Left-Back-window")]
    LeftBackWindow,
    #[serde(rename = "Left-Front-door")]
    LeftFrontDoor,
    #[serde(rename = "Left-Back-door")]
    LeftBackDoor,
    #[serde(rename = "Left-Front-wheel")]
    LeftFrontWheel,
    #[serde(rename = "Left-Back-wheel")]
    LeftBackWheel,
    #[serde(rename = "Right-Front-window")]
    RightFrontWindow,
    #[serde(rename = "Right-Back-window")]
    RightBackWindow,
    #[serde(rename = "Right-Front-door")]
    RightFrontDoor,
    #[serde(rename = "Right-Back-door")]
    RightBackDoor,
    #[serde(rename = "Right-Front-wheel")]
    RightFrontWheel,
    #[serde(rename = "Right-Back-wheel")]
    RightBackWheel,
    #[serde(rename = "Front-bumper")]
    FrontBumper,
    #[serde(rename = "Back-bumper")]
    BackBumper,
    #[serde(rename = "Left-Headlight")]
    LeftHeadlight,
    #[serde(rename = "Left-Tail-light")]
    LeftTailLight,
    #[serde(rename = "Right-Headlight")]
    RightHeadlight,
    #[serde(rename = "Right-Tail-light")]
    RightTailLight,
    Hood,
    Trunk,
    #[serde(rename = "License-plate")]
    LicensePlate,
    #[serde(rename = "Left-Mirror")]
    LeftMirror,
    #[serde(rename = "Right-Mirror")]
    RightMirror,
    Roof,
    Grille,
    #[serde(rename = "Left-Rocker-panel")]
    LeftRockerPanel,
    #[serde(rename = "Left-Quarter-panel")]
    LeftQuarterPanel,
    #[serde(rename = "Left-Fender")]
    LeftFender,
    #[serde(rename = "Right-Rocker-panel")]
    RightRockerPanel,
    #[serde(rename = "Right-Quarter-panel")]
    RightQuarterPanel,
    #[serde(rename = "Right-Fender")]
    RightFender,
}

/// The backend sends either plain strings or described entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefectDetail {
    Text(String),
    Described {
        defect_type: String,
        severity: String,
        description: String,
    },
}

impl DefectDetail {
    pub fn text(&self) -> &str {
        match self {
            DefectDetail::Text(text) => text,
            DefectDetail::Described { description, .. } => description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarPartDamage {
    pub quality: f64,
    #[serde(default)]
    pub metadata: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "deserialize_known")]
    pub defects: Vec<DefectKind>,
    #[serde(default)]
    pub detailed: Vec<DefectDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub quality: f64,
    /// Parts the analysis model reports but this service has no entry for are dropped.
    #[serde(deserialize_with = "deserialize_car_parts")]
    pub car_parts: BTreeMap<CarPart, CarPartDamage>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub details_analize: AnalysisDetails,
}

/// Where the stored analysis result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Backend,
    Mock,
}

fn deserialize_car_parts<'de, D>(deserializer: D) -> Result<BTreeMap<CarPart, CarPartDamage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, CarPartDamage>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, damage)| {
            match serde_json::from_value::<CarPart>(serde_json::Value::String(key.clone())) {
                Ok(part) => Some((part, damage)),
                Err(_) => {
                    warn!("Skipping unrecognized car part {:?}", key);
                    None
                }
            }
        })
        .collect())
}

fn deserialize_known<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value.clone()) {
            Ok(item) => Some(item),
            Err(_) => {
                warn!("Skipping unrecognized entry {}", value);
                None
            }
        })
        .collect())
}

// Accepts RFC 3339 as well as naive timestamps, which are taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn car_parameters_use_localized_wire_values() {
        let params: CarParameters = serde_json::from_value(json!({
            "brand": "Nissan",
            "model": "X-Trail",
            "year": 2023,
            "transmission": "Автоматическая",
            "drive_type": "Полный",
            "color": "Белый",
            "wheel_side": "Левый",
            "engine_volume": 2.5,
            "engine_type": "Гибридный",
            "body_type": "Внедорожник"
        }))
        .unwrap();

        assert_eq!(params.transmission, Transmission::Automatic);
        assert_eq!(params.drive_type, DriveType::AllWheel);
        assert_eq!(params.body_type, BodyType::Suv);

        let back = serde_json::to_value(&params).unwrap();
        assert_eq!(back["engine_type"], "Гибридный");
    }

    #[test]
    fn analysis_response_accepts_backend_shapes() {
        let response: AnalysisResponse = serde_json::from_value(json!({
            "success": true,
            "details_analize": {
                "quality": 3,
                "car_parts": {
                    "Back-bumper": {
                        "quality": 4,
                        "defects": ["Scratch", "Dent"],
                        "detailed": ["Сильная царапина"]
                    },
                    "Hood": {
                        "quality": 1,
                        "metadata": ["bbox"],
                        "defects": ["Paint chip"],
                        "detailed": [{
                            "defect_type": "chip",
                            "severity": "low",
                            "description": "Скол на капоте"
                        }]
                    }
                },
                "created_at": "2024-05-01T10:20:30.123456"
            }
        }))
        .unwrap();

        let details = response.details_analize;
        assert_eq!(details.car_parts.len(), 2);
        let hood = &details.car_parts[&CarPart::Hood];
        assert_eq!(hood.defects, vec![DefectKind::PaintChip]);
        assert_eq!(hood.detailed[0].text(), "Скол на капоте");
        assert_eq!(details.created_at.to_rfc3339().get(..19), Some("2024-05-01T10:20:30"));
    }

    #[test]
    fn unknown_parts_and_defects_do_not_sink_the_result() {
        let response: AnalysisResponse = serde_json::from_value(json!({
            "success": true,
            "details_analize": {
                "quality": 2.5,
                "car_parts": {
                    "Hood": { "quality": 1, "defects": ["Dent", "Rust"] },
                    "Front-door": { "quality": 2, "defects": ["Scratch"] },
                    "Mirror": { "quality": 3 }
                },
                "created_at": "2024-05-01T10:20:30Z"
            }
        }))
        .unwrap();

        let details = response.details_analize;
        assert_eq!(details.car_parts.len(), 1);
        assert_eq!(details.car_parts[&CarPart::Hood].defects, vec![DefectKind::Dent]);
    }

    #[test]
    fn create_response_tolerates_missing_payloads() {
        let response: CreateAnalysisResponse =
            serde_json::from_value(json!({ "success": true, "analyse_id": 7 })).unwrap();
        assert_eq!(response.analyse_id, 7);
        assert!(response.car_params.is_none());
        assert!(response.vin_check_data.is_none());
    }

    #[test]
    fn photo_positions_round_trip_through_text() {
        for position in PhotoPosition::REQUIRED {
            assert_eq!(PhotoPosition::parse(position.as_str()), Some(position));
        }
        assert_eq!(PhotoPosition::parse("top"), None);
    }
}
