// src/report.rs
use crate::models::{AnalysisDetails, CarPart, DefectKind, ResultSource};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Parts and the overall score below this are serious damage.
pub const SERIOUS_DAMAGE_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Severe,
    Moderate,
    Light,
    None,
}

impl Severity {
    pub fn from_quality(quality: f64) -> Self {
        if quality < 1.0 {
            Severity::Severe
        } else if quality < 2.0 {
            Severity::Moderate
        } else if quality < SERIOUS_DAMAGE_THRESHOLD {
            Severity::Light
        } else {
            Severity::None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub serious: bool,
    pub summary: &'static str,
    pub credit: &'static str,
}

impl Verdict {
    pub fn from_quality(quality: f64) -> Self {
        if quality < SERIOUS_DAMAGE_THRESHOLD {
            Verdict {
                serious: true,
                summary: "Повреждения серьезные",
                credit: "Возможность кредитования отсутствует",
            }
        } else {
            Verdict {
                serious: false,
                summary: "Повреждения лёгкие",
                credit: "Возможна покупка в кредит",
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DamageEntry {
    pub part: CarPart,
    pub part_label: &'static str,
    pub quality: f64,
    pub severity: Severity,
    pub defects: Vec<&'static str>,
    pub detailed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DamageReport {
    pub analyse_id: i64,
    pub quality: f64,
    pub verdict: Verdict,
    pub damages: Vec<DamageEntry>,
    pub created_at: DateTime<Utc>,
    pub source: Option<ResultSource>,
}

impl DamageReport {
    /// Lists damaged parts worst first; equal scores keep part order.
    pub fn new(analyse_id: i64, details: &AnalysisDetails, source: Option<ResultSource>) -> Self {
        let mut damages: Vec<DamageEntry> = details
            .car_parts
            .iter()
            .map(|(part, damage)| DamageEntry {
                part: *part,
                part_label: part_label(*part),
                quality: damage.quality,
                severity: Severity::from_quality(damage.quality),
                defects: damage.defects.iter().map(|d| defect_label(*d)).collect(),
                detailed: damage.detailed.iter().map(|d| d.text().to_string()).collect(),
            })
            .collect();
        // BTreeMap iteration is already in part order, so a stable sort settles ties.
        damages.sort_by(|a, b| a.quality.total_cmp(&b.quality));

        Self {
            analyse_id,
            quality: details.quality,
            verdict: Verdict::from_quality(details.quality),
            damages,
            created_at: details.created_at,
            source,
        }
    }
}

pub fn defect_label(defect: DefectKind) -> &'static str {
    match defect {
        DefectKind::Dent => "Вмятина",
        DefectKind::Scratch => "Царапина",
        DefectKind::Cracked => "Трещина",
        DefectKind::Flaking => "Отслоение",
        DefectKind::BrokenPart => "Сломанная деталь",
        DefectKind::PaintChip => "Отсутствие краски",
        DefectKind::MissingPart => "Отсутствующая деталь",
        DefectKind::Corrosion => "Коррозия",
    }
}

pub fn part_label(part: CarPart) -> &'static str {
    match part {
        CarPart::Windshield => "Лобовое стекло",
        CarPart::BackWindshield => "Заднее стекло",
        CarPart::LeftFrontWindow => "Левое переднее окно",
        CarPart::LeftBackWindow => "Левое заднее окно",
        CarPart::LeftFrontDoor => "Левая передняя дверь",
        CarPart::LeftBackDoor => "Левая задняя дверь",
        CarPart::LeftFrontWheel => "Левое переднее колесо",
        CarPart::LeftBackWheel => "Левое заднее колесо",
        CarPart::RightFrontWindow => "Правое переднее окно",
        CarPart::RightBackWindow => "Правое заднее окно",
        CarPart::RightFrontDoor => "Правая передняя дверь",
        CarPart::RightBackDoor => "Правая задняя дверь",
        CarPart::RightFrontWheel => "Правое переднее колесо",
        CarPart::RightBackWheel => "Правое заднее колесо",
        CarPart::FrontBumper => "Передний бампер",
        CarPart::BackBumper => "Задний бампер",
        CarPart::LeftHeadlight => "Левая фара",
        CarPart::LeftTailLight => "Левый задний фонарь",
        CarPart::RightHeadlight => "Правая фара",
        CarPart::RightTailLight => "Правый задний фонарь",
        CarPart::Hood => "Капот",
        CarPart::Trunk => "Багажник",
        CarPart::LicensePlate => "Номерной знак",
        CarPart::LeftMirror => "Левое зеркало",
        CarPart::RightMirror => "Правое зеркало",
        CarPart::Roof => "Крыша",
        CarPart::Grille => "Решётка радиатора",
        CarPart::LeftRockerPanel => "Левая пороговая панель",
        CarPart::LeftQuarterPanel => "Левое заднее крыло",
        CarPart::LeftFender => "Левое переднее крыло",
        CarPart::RightRockerPanel => "Правая пороговая панель",
        CarPart::RightQuarterPanel => "Правое заднее крыло",
        CarPart::RightFender => "Правое переднее крыло",
    }
}
