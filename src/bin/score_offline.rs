//! Scores a qualification request without contacting any external service.
//!
//! Usage: `score_offline [request.json]` (reads stdin when no path is given).
//! Every verification is reported as not checked; `CRITERIA_POINTS_FILE`
//! overrides the standard points table as it does for the server.

use dotenvy::dotenv;
use std::env;
use std::io::Read;

use lead_qualifier_api::models::QualifyRequest;
use lead_qualifier_api::qualification::classify;
use lead_qualifier_api::scoring::{total_score, CriterionPoints};
use lead_qualifier_api::verification::VerificationReport;

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let raw = match env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut points = CriterionPoints::standard();
    if let Ok(path) = env::var("CRITERIA_POINTS_FILE") {
        if !path.trim().is_empty() {
            points = points.with_overrides_from_file(std::path::Path::new(&path))?;
        }
    }

    let request: QualifyRequest = serde_json::from_str(&raw)?;
    let input = request
        .into_input()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let report = VerificationReport::default();
    let score = total_score(&input.checklist, &report.outcomes(), &points);
    let qualification = classify(score, input.initial_value, input.current_value);

    let warnings: Vec<String> = input
        .checklist
        .exclusive_conflicts()
        .iter()
        .map(|c| c.message())
        .collect();

    let output = serde_json::json!({
        "score": score,
        "qualification": qualification,
        "checklist_warnings": warnings,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
