use crate::client::{Completion, TemplateReviewer};
use crate::error::{ReviewError, SENTINEL};
use crate::extract;
use crate::prompt;
use crate::records::{ExampleRow, MergedRow, TemplateRow};
use crate::table;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_THROTTLE: Duration = Duration::from_millis(2000);
pub const DEFAULT_ROW_THROTTLE: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub batch_size: usize,
    /// Fixed pause after every endpoint call.
    pub throttle: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, throttle: DEFAULT_BATCH_THROTTLE }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.batch_size == 0 {
            return Err(ReviewError::InvalidConfig("batch size must be at least 1".into()));
        }
        Ok(())
    }
}

pub fn load_templates(path: &Path) -> Result<Vec<TemplateRow>, ReviewError> {
    table::read_records_from_path(path, "input", TemplateRow::REQUIRED_COLUMNS)
}

/// Reviews templates a batch at a time, one endpoint call per batch.
pub struct BatchPipeline<C> {
    reviewer: TemplateReviewer<C>,
    config: PipelineConfig,
}

impl<C: Completion> BatchPipeline<C> {
    pub fn new(completion: C, config: PipelineConfig) -> Result<Self, ReviewError> {
        config.validate()?;
        Ok(Self { reviewer: TemplateReviewer::new(completion), config })
    }

    pub fn reviewer(&self) -> &TemplateReviewer<C> {
        &self.reviewer
    }

    /// Output rows come back in input order; only the grouping into calls is chunked.
    pub fn run(&self, examples: &[ExampleRow], rows: &[TemplateRow]) -> Vec<MergedRow> {
        let mut reviewed = Vec::with_capacity(rows.len());
        let mut offset = 0;
        for batch in rows.chunks(self.config.batch_size) {
            let systems: BTreeSet<&str> = batch.iter().map(|r| r.system.as_str()).collect();
            let systems: Vec<&str> = systems.into_iter().collect();
            let system_prompt = prompt::prompt_for_systems(examples, systems.as_slice());

            let response = self.reviewer.review_batch(&system_prompt, batch);
            let results = extract::extract_batch_results(&response);

            for row in batch {
                let merged = match results.get(row.event_id.trim()) {
                    Some(res) => MergedRow::new(row, res.reviewed_template.clone(), res.suggestion.clone()),
                    None => MergedRow::failed(row),
                };
                reviewed.push(merged);
            }

            info!("reviewed rows {} - {}", offset + 1, offset + batch.len());
            offset += batch.len();
            pause(self.config.throttle);
        }
        reviewed
    }

    /// Load both tables (failing before any call on a bad header), review, write.
    pub fn process_files(
        &self,
        examples_path: &Path,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<Vec<MergedRow>, ReviewError> {
        let examples = prompt::load_examples_from_path(examples_path)?;
        let rows = load_templates(input_path)?;
        info!(rows = rows.len(), batch_size = self.config.batch_size, "starting batch review");
        let reviewed = self.run(&examples, &rows);
        table::write_records_to_path(output_path, &reviewed)?;
        let failed = reviewed.iter().filter(|r| r.is_error()).count();
        info!(failed, "review finished, saved to {}", output_path.display());
        Ok(reviewed)
    }
}

/// Reviews one system's templates one row at a time.
pub struct SingleSystemPipeline<C> {
    reviewer: TemplateReviewer<C>,
    throttle: Duration,
}

impl<C: Completion> SingleSystemPipeline<C> {
    pub fn new(completion: C, throttle: Duration) -> Self {
        Self { reviewer: TemplateReviewer::new(completion), throttle }
    }

    pub fn reviewer(&self) -> &TemplateReviewer<C> {
        &self.reviewer
    }

    pub fn run(&self, system: &str, examples: &[ExampleRow], rows: &[TemplateRow]) -> Vec<MergedRow> {
        let system_prompt = prompt::prompt_for_system(examples, system);
        let mut reviewed = Vec::with_capacity(rows.len());
        for row in rows {
            info!("reviewing template EventId={}", row.event_id);
            let response = self.reviewer.review_one(&system_prompt, row);
            let (template, suggestion) = if response == SENTINEL {
                (SENTINEL.to_string(), SENTINEL.to_string())
            } else {
                extract::extract_single_result(&response)
            };
            reviewed.push(MergedRow::new(row, template, suggestion));
            pause(self.throttle);
        }
        reviewed
    }

    pub fn process_files(
        &self,
        system: &str,
        examples_path: &Path,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<Vec<MergedRow>, ReviewError> {
        let examples = prompt::load_examples_from_path(examples_path)?;
        let rows = load_templates(input_path)?;
        info!(rows = rows.len(), system, "starting per-row review");
        let reviewed = self.run(system, &examples, &rows);
        table::write_records_to_path(output_path, &reviewed)?;
        info!("review finished, saved to {}", output_path.display());
        Ok(reviewed)
    }
}

fn pause(throttle: Duration) {
    if !throttle.is_zero() {
        std::thread::sleep(throttle);
    }
}
