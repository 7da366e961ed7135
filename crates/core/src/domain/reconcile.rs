// Reconciliation between a Job's aggregate counters and its per-row Outputs
//
// Rule: the Job counters stay authoritative for progress; Outputs are
// authoritative for which row artifacts exist. Disagreements are reported,
// never written back into the Job.

use super::job::{GenerationMode, Job, Output, OutputStatus};
use tracing::warn;

/// Output counts recomputed from the per-row table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

impl OutputCounts {
    pub fn tally(outputs: &[Output]) -> Self {
        outputs.iter().fold(Self::default(), |mut acc, o| {
            match o.status {
                OutputStatus::Pending => acc.pending += 1,
                OutputStatus::Processing => acc.processing += 1,
                OutputStatus::Completed => acc.completed += 1,
                OutputStatus::Failed => acc.failed += 1,
            }
            acc
        })
    }

    /// Rows the worker has finished with, successfully or not
    pub fn settled(&self) -> i64 {
        self.completed + self.failed
    }

    pub fn unsettled(&self) -> i64 {
        self.pending + self.processing
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// `completed_items` (which includes failures) differs from settled outputs
    CompletedCountMismatch { job: i64, outputs: i64 },
    FailedCountMismatch { job: i64, outputs: i64 },
    /// Job reported terminal while some outputs are still pending/processing
    UnsettledOutputsOnTerminalJob { unsettled: i64 },
    /// Aggregate counters break `failed <= completed <= total`
    CountsExceedTotal {
        total: i64,
        completed: i64,
        failed: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub counts: OutputCounts,
    pub discrepancies: Vec<Discrepancy>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

pub fn reconcile(job: &Job, outputs: &[Output]) -> Reconciliation {
    let counts = OutputCounts::tally(outputs);
    let mut discrepancies = Vec::new();

    if job.completed_items > job.total_items || job.failed_items > job.completed_items {
        discrepancies.push(Discrepancy::CountsExceedTotal {
            total: job.total_items,
            completed: job.completed_items,
            failed: job.failed_items,
        });
    }

    // per_datasource jobs produce a single artifact, no row table to compare
    if job.generation_mode == GenerationMode::PerRow {
        if counts.settled() != job.completed_items {
            discrepancies.push(Discrepancy::CompletedCountMismatch {
                job: job.completed_items,
                outputs: counts.settled(),
            });
        }
        if counts.failed != job.failed_items {
            discrepancies.push(Discrepancy::FailedCountMismatch {
                job: job.failed_items,
                outputs: counts.failed,
            });
        }
        if job.is_terminal() && counts.unsettled() > 0 {
            discrepancies.push(Discrepancy::UnsettledOutputsOnTerminalJob {
                unsettled: counts.unsettled(),
            });
        }
    }

    for d in &discrepancies {
        warn!(job_id = %job.id, discrepancy = ?d, "Job counters disagree with outputs");
    }

    Reconciliation {
        counts,
        discrepancies,
    }
}
