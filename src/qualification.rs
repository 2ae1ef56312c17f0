use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const BUY_THRESHOLD: i64 = 130;
pub const FOLLOW_HIGH_THRESHOLD: i64 = 100;
pub const FOLLOW_LOW_THRESHOLD: i64 = 80;

const BUY_MULTIPLIER: f64 = 1.8;
const FOLLOW_HIGH_MULTIPLIER: f64 = 1.3;
const FOLLOW_LOW_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStatus {
    Comprar,
    AcompanharAlto,
    AcompanharBaixo,
    Descartar,
}

impl QualificationStatus {
    /// Tier for a score. Thresholds are inclusive lower bounds.
    pub fn for_score(score: i64) -> Self {
        if score >= BUY_THRESHOLD {
            QualificationStatus::Comprar
        } else if score >= FOLLOW_HIGH_THRESHOLD {
            QualificationStatus::AcompanharAlto
        } else if score >= FOLLOW_LOW_THRESHOLD {
            QualificationStatus::AcompanharBaixo
        } else {
            QualificationStatus::Descartar
        }
    }

    /// Multiplier applied to the initial value, or `None` for discarded leads.
    pub fn ceiling_multiplier(self) -> Option<f64> {
        match self {
            QualificationStatus::Comprar => Some(BUY_MULTIPLIER),
            QualificationStatus::AcompanharAlto => Some(FOLLOW_HIGH_MULTIPLIER),
            QualificationStatus::AcompanharBaixo => Some(FOLLOW_LOW_MULTIPLIER),
            QualificationStatus::Descartar => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualificationStatus::Comprar => "comprar",
            QualificationStatus::AcompanharAlto => "acompanhar_alto",
            QualificationStatus::AcompanharBaixo => "acompanhar_baixo",
            QualificationStatus::Descartar => "descartar",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QualificationResult {
    pub status: QualificationStatus,
    pub message: String,
    /// Suggested ceiling for the bid; 0 for discarded leads.
    #[serde(rename = "teto")]
    pub ceiling: f64,
    #[serde(rename = "show_teto")]
    pub show_ceiling: bool,
    pub alert: Option<String>,
}

/// Classifies a lead.
///
/// Alerts are only raised for leads that are still being considered
/// (score ≥ 80) whose current value already exceeds the ceiling.
pub fn classify(score: i64, initial_value: f64, current_value: f64) -> QualificationResult {
    let status = QualificationStatus::for_score(score);
    let ceiling = status
        .ceiling_multiplier()
        .map_or(0.0, |multiplier| initial_value * multiplier);

    let message = match status {
        QualificationStatus::Comprar => {
            format!("🟢 COMPRE JÁ liberado (Teto Sugerido: R$ {:.2})", ceiling)
        }
        QualificationStatus::AcompanharAlto => {
            format!("🟡 Acompanhar (Teto Sugerido: R$ {:.2})", ceiling)
        }
        QualificationStatus::AcompanharBaixo => {
            format!("⚠️ Acompanhar (Teto Sugerido: R$ {:.2})", ceiling)
        }
        QualificationStatus::Descartar => "🔴 Descartar Lead".to_string(),
    };

    let alert = (score >= FOLLOW_LOW_THRESHOLD && current_value > ceiling).then(|| {
        format!(
            "❗ Valor atual (R$ {:.2}) ultrapassou teto sugerido (R$ {:.2}). Reavaliar risco!",
            current_value, ceiling
        )
    });

    let result = QualificationResult {
        status,
        message,
        ceiling,
        show_ceiling: status != QualificationStatus::Descartar,
        alert,
    };

    tracing::info!(
        "Qualification result: score={} status={} teto={:.2} alert={}",
        score,
        status.as_str(),
        result.ceiling,
        result.alert.is_some()
    );

    result
}
