use crate::error::ReviewError;
use crate::records::{EvaluationRow, HumanRow, MergedRow, Metrics};
use crate::similarity::jaccard_similarity;
use crate::table;
use csv::Writer;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

pub const DEFAULT_THRESHOLD: f64 = 0.9;
pub const SUMMARY_LABEL: &str = "Metrics";

const OUTPUT_COLUMNS: [&str; 10] = [
    "EventId",
    "System",
    "Occurrences",
    "OriginalTemplate",
    "ExampleLog",
    "ReviewedTemplate",
    "Suggestion",
    "Revised",
    "SimilarityScore",
    "MatchResult",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub rows: Vec<EvaluationRow>,
    pub metrics: Metrics,
}

/// Binary precision/recall/F1 for label 1. Any zero denominator yields 0.0.
pub fn binary_metrics(y_true: &[u8], y_pred: &[u8]) -> Metrics {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == 1, p == 1) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    Metrics {
        precision: ratio(tp, tp + fp),
        recall: ratio(tp, tp + fn_),
        f1: ratio(2 * tp, 2 * tp + fp + fn_),
    }
}

/// Inner-join on (EventId, System) in reviewed-table order and score each
/// pair. Every joined row counts as a positive in the ground truth, so
/// precision is 1.0 whenever anything matched and recall is the match rate.
pub fn evaluate(reviewed: &[MergedRow], human: &[HumanRow], threshold: f64) -> Evaluation {
    let mut by_key: HashMap<(&str, &str), Vec<&HumanRow>> = HashMap::new();
    for h in human {
        by_key.entry((h.event_id.as_str(), h.system.as_str())).or_default().push(h);
    }

    let mut rows = Vec::new();
    for r in reviewed {
        let Some(matches) = by_key.get(&(r.event_id.as_str(), r.system.as_str())) else {
            continue;
        };
        for h in matches {
            let similarity = jaccard_similarity(r.reviewed_template.trim(), h.revised.trim());
            rows.push(EvaluationRow {
                reviewed: r.clone(),
                revised: h.revised.clone(),
                similarity,
                matched: u8::from(similarity >= threshold),
            });
        }
    }

    let y_pred: Vec<u8> = rows.iter().map(|r| r.matched).collect();
    let y_true = vec![1u8; y_pred.len()];
    let metrics = binary_metrics(&y_true, &y_pred);
    Evaluation { rows, metrics }
}

pub fn load_reviewed<R: Read>(reader: R) -> Result<Vec<MergedRow>, ReviewError> {
    table::read_records(reader, "reviewed", MergedRow::REQUIRED_COLUMNS)
}

pub fn load_human<R: Read>(reader: R) -> Result<Vec<HumanRow>, ReviewError> {
    table::read_records(reader, "human", HumanRow::REQUIRED_COLUMNS)
}

/// Write the joined rows followed by one summary row carrying the metrics.
pub fn write_evaluation<W: Write>(writer: W, evaluation: &Evaluation) -> Result<(), ReviewError> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(OUTPUT_COLUMNS)?;
    for row in &evaluation.rows {
        let r = &row.reviewed;
        wtr.write_record([
            r.event_id.as_str(),
            r.system.as_str(),
            r.occurrences.as_deref().unwrap_or(""),
            r.original_template.as_str(),
            r.example_log.as_str(),
            r.reviewed_template.as_str(),
            r.suggestion.as_str(),
            row.revised.as_str(),
            row.similarity.to_string().as_str(),
            row.matched.to_string().as_str(),
        ])?;
    }
    let m = evaluation.metrics;
    let precision = format!("Precision={:.4}", m.precision);
    let recall = format!("Recall={:.4}", m.recall);
    let f1 = format!("F1={:.4}", m.f1);
    wtr.write_record([SUMMARY_LABEL, "", "", "", "", "", "", precision.as_str(), recall.as_str(), f1.as_str()])?;
    wtr.flush()?;
    Ok(())
}

pub fn evaluate_files(
    reviewed_path: &Path,
    human_path: &Path,
    output_path: &Path,
    threshold: f64,
) -> Result<Evaluation, ReviewError> {
    let reviewed = load_reviewed(table::open_file(reviewed_path)?)?;
    let human = load_human(table::open_file(human_path)?)?;
    let evaluation = evaluate(&reviewed, &human, threshold);
    write_evaluation(table::create_file(output_path)?, &evaluation)?;

    let m = evaluation.metrics;
    info!("template comparison finished (threshold={threshold})");
    info!("Precision: {:.4}", m.precision);
    info!("Recall:    {:.4}", m.recall);
    info!("F1 Score:  {:.4}", m.f1);
    info!("results saved to {}", output_path.display());
    Ok(evaluation)
}
