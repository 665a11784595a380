//! Subcommand dispatch.

use crate::Command;
use anyhow::Context;
use dataops_core::{
    DataOpsError, ErrorKind, Pipeline, PipelineConfig, PipelineOutcome, StageError,
};
use serde::Serialize;
use tracing::info;

/// Successful command completion, as opposed to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// The quality gate rejected the model.
    Rejected,
}

pub fn execute(command: Command, config: PipelineConfig) -> anyhow::Result<Status> {
    let warehouse = config.warehouse.path.display().to_string();
    let pipeline = Pipeline::open(config)
        .with_context(|| format!("Failed to open warehouse {warehouse}"))?;

    match command {
        Command::Validate => {
            let report = pipeline.validate()?;
            info!(
                "Validation completed: total={} worst={}",
                report.total_rows().unwrap_or(0),
                report
                    .worst_severity()
                    .map(|s| s.as_str())
                    .unwrap_or("none")
            );
            print_json(&report)?;
            Ok(Status::Success)
        }
        Command::Train => {
            let outcome = pipeline.train()?;
            print_json(&outcome.metrics)?;
            Ok(Status::Success)
        }
        Command::Gate => {
            let decision = pipeline.gate()?;
            print_json(&decision)?;
            Ok(if decision.is_admitted() {
                Status::Success
            } else {
                Status::Rejected
            })
        }
        Command::Register => {
            let record = pipeline.register()?;
            print_json(&record)?;
            Ok(Status::Success)
        }
        Command::Promote => {
            let record = pipeline.promote()?;
            print_json(&record)?;
            Ok(Status::Success)
        }
        Command::Current => {
            let current = pipeline.current()?;
            if current.is_none() {
                info!("No PROD version for {}", pipeline.config().model_name);
            }
            print_json(&current)?;
            Ok(Status::Success)
        }
        Command::History => {
            print_json(&pipeline.history()?)?;
            Ok(Status::Success)
        }
        Command::Run => {
            let report = pipeline.run()?;
            print_json(&report)?;
            Ok(match report.outcome {
                PipelineOutcome::Promoted(_) => Status::Success,
                PipelineOutcome::Rejected(_) => Status::Rejected,
            })
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Classification of the first library error in the chain, if any.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<StageError>() {
            return Some(e.kind());
        }
        cause.downcast_ref::<DataOpsError>().map(DataOpsError::kind)
    })
}
