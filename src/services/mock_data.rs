// src/services/mock_data.rs
// Canned payloads used whenever the analysis backend cannot answer.
use crate::models::*;
use std::collections::BTreeMap;

pub const MOCK_ANALYSE_ID: i64 = 12345;

pub fn mock_car_parameters() -> CarParameters {
    CarParameters {
        brand: "Nissan".to_string(),
        model: "X-Trail".to_string(),
        year: 2023,
        transmission: Transmission::Automatic,
        drive_type: DriveType::AllWheel,
        color: "Белый".to_string(),
        wheel_side: WheelSide::Left,
        engine_volume: 2.5,
        engine_type: EngineType::Hybrid,
        body_type: BodyType::Suv,
    }
}

pub fn mock_create_response() -> CreateAnalysisResponse {
    CreateAnalysisResponse {
        analyse_id: MOCK_ANALYSE_ID,
        vin: None,
        car_params: Some(mock_car_parameters()),
        vin_check_data: None,
    }
}

pub fn mock_analysis_response() -> AnalysisResponse {
    let mut car_parts = BTreeMap::new();
    car_parts.insert(
        CarPart::RightBackDoor,
        damage(1.0, &[DefectKind::Scratch], &["Царапина", "Скол"]),
    );
    car_parts.insert(
        CarPart::RightQuarterPanel,
        damage(
            2.0,
            &[DefectKind::Dent, DefectKind::PaintChip],
            &["Крупная вмятина", "Скол на краске"],
        ),
    );
    car_parts.insert(
        CarPart::BackBumper,
        damage(
            4.0,
            &[DefectKind::Scratch, DefectKind::Dent],
            &["Сильная царапина", "Скол"],
        ),
    );

    AnalysisResponse {
        success: true,
        details_analize: AnalysisDetails {
            quality: 0.87,
            car_parts,
            created_at: chrono::Utc::now(),
        },
    }
}

fn damage(quality: f64, defects: &[DefectKind], detailed: &[&str]) -> CarPartDamage {
    CarPartDamage {
        quality,
        metadata: Vec::new(),
        defects: defects.to_vec(),
        detailed: detailed
            .iter()
            .map(|text| DefectDetail::Text(text.to_string()))
            .collect(),
    }
}
