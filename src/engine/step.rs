//! Steps and the pipeline driver
//!
//! Each step flows:
//! 1. is_present() - Check if already done (skip if true)
//! 2. remediate() - Produce the artifact
//! 3. is_present() again - The artifact must now be there
//!
//! The first failure aborts the run. Nothing already done is rolled back;
//! running again resumes from the first step whose check fails.

use crate::core::error::{Error, PipelineError, Result};
use crate::core::output;
use crate::helpers::acquire::{Fetcher, VcsClient};
use crate::helpers::util::CommandRunner;
use tokio_util::sync::CancellationToken;

/// Shared services steps use to do their work.
pub struct Toolbox {
    pub fetcher: Fetcher,
    pub vcs: Box<dyn VcsClient>,
    pub runner: CommandRunner,
    pub cancel: CancellationToken,
}

/// One artifact the build needs, with a way to tell whether it is there and
/// a way to produce it.
pub trait Step {
    fn name(&self) -> &str;

    /// True when the artifact is on disk and valid. Must not touch the network.
    fn is_present(&self) -> Result<bool>;

    fn remediate(&self, toolbox: &Toolbox) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    NotChecked,
    Satisfied,
    Remediating,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub state: StepState,
    /// True when the step had to be remediated in this run.
    pub remediated: bool,
}

/// What a pipeline run did, step by step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub steps: Vec<StepRecord>,
}

impl PipelineReport {
    pub fn remediated(&self) -> usize {
        self.steps.iter().filter(|s| s.remediated).count()
    }

    pub fn all_satisfied(&self) -> bool {
        self.steps.iter().all(|s| s.state == StepState::Satisfied)
    }
}

/// An ordered list of steps run one at a time.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: impl Step + 'static) {
        self.steps.push(Box::new(step));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, toolbox: &Toolbox) -> std::result::Result<PipelineReport, PipelineError> {
        let total = self.steps.len();
        let mut report = PipelineReport::default();

        for (i, step) in self.steps.iter().enumerate() {
            let name = step.name().to_string();
            if toolbox.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled { step: name });
            }

            let failed = |source: Error| PipelineError::StepFailed {
                step: name.clone(),
                source: Box::new(source),
            };

            if step.is_present().map_err(failed)? {
                output::skip(&format!("{} already present, skipping", name));
                report.steps.push(StepRecord {
                    name,
                    state: StepState::Satisfied,
                    remediated: false,
                });
                continue;
            }

            output::action_numbered(i + 1, total, &name);
            let mut record = StepRecord {
                name: name.clone(),
                state: StepState::Remediating,
                remediated: true,
            };

            if let Err(e) = step.remediate(toolbox) {
                record.state = StepState::Failed;
                report.steps.push(record);
                return Err(failed(e));
            }

            match step.is_present() {
                Ok(true) => {
                    record.state = StepState::Satisfied;
                    report.steps.push(record);
                }
                Ok(false) => return Err(PipelineError::PostConditionFailed { step: name }),
                Err(e) => return Err(failed(e)),
            }
        }

        Ok(report)
    }
}
