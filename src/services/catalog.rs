// src/services/catalog.rs
use crate::errors::AutoCheckError;
use crate::models::*;
use chrono::Datelike;
use serde::Serialize;

/// Brands in display order with their selectable models; the first model is the default.
pub const CAR_MODELS: &[(&str, &[&str])] = &[
    ("Audi", &["A3", "A4", "A6", "Q5", "Q7"]),
    ("BMW", &["3 Series", "5 Series", "X3", "X5", "X6"]),
    ("Mercedes-Benz", &["C-Class", "E-Class", "GLC", "GLE", "S-Class"]),
    ("Toyota", &["Camry", "Corolla", "RAV4", "Land Cruiser", "Highlander"]),
    ("Nissan", &["Altima", "X-Trail", "Qashqai", "Juke", "Pathfinder"]),
    ("Volkswagen", &["Golf", "Passat", "Tiguan", "Polo", "Touareg"]),
    ("Honda", &["Civic", "Accord", "CR-V", "Pilot", "HR-V"]),
    ("Ford", &["Focus", "Fiesta", "Kuga", "Explorer", "Mustang"]),
    ("Hyundai", &["Solaris", "Creta", "Tucson", "Santa Fe", "i30"]),
    ("Kia", &["Rio", "Sportage", "Cerato", "Sorento", "K5"]),
];

pub const COLOR_PALETTE: &[&str] = &[
    "Белый",
    "Черный",
    "Серебристый",
    "Серый",
    "Красный",
    "Синий",
    "Зеленый",
    "Желтый",
    "Коричневый",
];

pub const ENGINE_VOLUMES: &[f64] = &[
    1.0, 1.2, 1.4, 1.5, 1.6, 1.8, 2.0, 2.2, 2.4, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0,
];

pub const YEAR_SPAN: i32 = 30;

pub fn models_for(brand: &str) -> Option<&'static [&'static str]> {
    CAR_MODELS
        .iter()
        .find(|(name, _)| *name == brand)
        .map(|(_, models)| *models)
}

/// Selectable model years, up to and including the current one.
pub fn year_range(current_year: i32) -> std::ops::RangeInclusive<i32> {
    (current_year - YEAR_SPAN + 1)..=current_year
}

/// Applies a draft edit. A brand change resets the model to the first model of the
/// new brand unless the edit names a model of that brand.
pub fn apply_edit(params: &mut CarParameters, edit: ParametersEdit) -> Result<(), AutoCheckError> {
    let current_year = chrono::Utc::now().year();
    let mut next = params.clone();

    if let Some(brand) = edit.brand {
        let models = models_for(&brand)
            .ok_or_else(|| AutoCheckError::Validation(format!("Unknown brand: {}", brand)))?;
        if brand != next.brand {
            next.model = models[0].to_string();
        }
        next.brand = brand;
    }

    if let Some(model) = edit.model {
        let allowed = models_for(&next.brand).unwrap_or_default();
        if !allowed.contains(&model.as_str()) {
            return Err(AutoCheckError::Validation(format!(
                "{} is not a {} model",
                model, next.brand
            )));
        }
        next.model = model;
    }

    if let Some(year) = edit.year {
        if !year_range(current_year).contains(&year) {
            return Err(AutoCheckError::Validation(format!(
                "Year {} is outside the selectable range",
                year
            )));
        }
        next.year = year;
    }

    if let Some(color) = edit.color {
        if !COLOR_PALETTE.contains(&color.as_str()) {
            return Err(AutoCheckError::Validation(format!("Unknown color: {}", color)));
        }
        next.color = color;
    }

    if let Some(volume) = edit.engine_volume {
        if !ENGINE_VOLUMES.iter().any(|v| (v - volume).abs() < f64::EPSILON) {
            return Err(AutoCheckError::Validation(format!(
                "Engine volume {} l is not offered",
                volume
            )));
        }
        next.engine_volume = volume;
    }

    if let Some(transmission) = edit.transmission {
        next.transmission = transmission;
    }
    if let Some(drive_type) = edit.drive_type {
        next.drive_type = drive_type;
    }
    if let Some(wheel_side) = edit.wheel_side {
        next.wheel_side = wheel_side;
    }
    if let Some(engine_type) = edit.engine_type {
        next.engine_type = engine_type;
    }
    if let Some(body_type) = edit.body_type {
        next.body_type = body_type;
    }

    *params = next;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct BrandEntry {
    pub brand: &'static str,
    pub models: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct Choice {
    pub value: serde_json::Value,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Catalog {
    pub brands: Vec<BrandEntry>,
    pub colors: &'static [&'static str],
    pub engine_volumes: &'static [f64],
    pub years: Vec<i32>,
    pub transmissions: Vec<Choice>,
    pub drive_types: Vec<Choice>,
    pub wheel_sides: Vec<Choice>,
    pub engine_types: Vec<Choice>,
    pub body_types: Vec<Choice>,
}

fn choices<T: Serialize>(entries: &[(T, &'static str)]) -> Vec<Choice> {
    entries
        .iter()
        .map(|(value, label)| Choice {
            value: serde_json::to_value(value).unwrap_or_default(),
            label,
        })
        .collect()
}

pub fn catalog() -> Catalog {
    let current_year = chrono::Utc::now().year();

    Catalog {
        brands: CAR_MODELS
            .iter()
            .map(|&(brand, models)| BrandEntry { brand, models })
            .collect(),
        colors: COLOR_PALETTE,
        engine_volumes: ENGINE_VOLUMES,
        years: year_range(current_year).rev().collect(),
        transmissions: choices(&[
            (Transmission::Automatic, "Автомат"),
            (Transmission::Manual, "Механика"),
            (Transmission::SemiAutomatic, "Полуавтомат"),
        ]),
        drive_types: choices(&[
            (DriveType::Front, "Передний"),
            (DriveType::Rear, "Задний"),
            (DriveType::AllWheel, "Полный"),
        ]),
        wheel_sides: choices(&[(WheelSide::Left, "Левый"), (WheelSide::Right, "Правый")]),
        engine_types: choices(&[
            (EngineType::Petrol, "Бензиновый"),
            (EngineType::Diesel, "Дизельный"),
            (EngineType::Hybrid, "Гибрид"),
            (EngineType::Electric, "Электрический"),
        ]),
        body_types: choices(&[
            (BodyType::Sedan, "Седан"),
            (BodyType::Hatchback, "Хэтчбек"),
            (BodyType::Wagon, "Универсал"),
            (BodyType::Coupe, "Купе"),
            (BodyType::Crossover, "Кроссовер"),
            (BodyType::Suv, "Внедорожник 5-дв."),
            (BodyType::Pickup, "Пикап"),
        ]),
    }
}
