// Progress aggregation over a Job's counters

use super::job::Job;
use serde::Serialize;

/// Derived progress metrics for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Always within 0..=100
    pub percent: u8,
    pub successful: u64,
    pub failed: u64,
    pub remaining: u64,
}

/// Compute progress from the aggregate counters on a job.
///
/// Counters reported by the server can be transiently inconsistent
/// (e.g. `completed_items > total_items` while a retry is being accounted),
/// so every derived field is clamped instead of trusted.
///
/// ```text
/// {total: 10, completed: 10, failed: 3} -> {percent: 100, successful: 7, failed: 3, remaining: 0}
/// {total: 0,  completed: 0,  failed: 0} -> {percent: 0,   successful: 0, failed: 0, remaining: 0}
/// ```
pub fn compute_progress(job: &Job) -> Progress {
    let total = job.total_items.max(0);
    let completed = job.completed_items.max(0);
    let failed = job.failed_items.max(0);

    let percent = if total > 0 {
        let ratio = (100.0 * completed as f64 / total as f64).round();
        ratio.clamp(0.0, 100.0) as u8
    } else {
        0
    };

    Progress {
        percent,
        successful: completed.saturating_sub(failed).max(0) as u64,
        failed: failed as u64,
        remaining: total.saturating_sub(completed).max(0) as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{fixtures, JobStatus};

    fn progress_of(total: i64, completed: i64, failed: i64) -> Progress {
        compute_progress(&fixtures::job(
            "job-1",
            JobStatus::Processing,
            total,
            completed,
            failed,
        ))
    }

    #[test]
    fn test_completed_with_failures() {
        assert_eq!(
            progress_of(10, 10, 3),
            Progress {
                percent: 100,
                successful: 7,
                failed: 3,
                remaining: 0
            }
        );
    }

    #[test]
    fn test_empty_job_has_no_division_by_zero() {
        assert_eq!(
            progress_of(0, 0, 0),
            Progress {
                percent: 0,
                successful: 0,
                failed: 0,
                remaining: 0
            }
        );
    }

    #[test]
    fn test_percent_rounds_to_nearest() {
        assert_eq!(progress_of(3, 1, 0).percent, 33);
        assert_eq!(progress_of(3, 2, 0).percent, 67);
        assert_eq!(progress_of(8, 1, 0).percent, 13); // 12.5 rounds up
    }

    #[test]
    fn test_overcounted_job_is_clamped() {
        let p = progress_of(4, 6, 1);
        assert_eq!(p.percent, 100);
        assert_eq!(p.remaining, 0);
        assert_eq!(p.successful, 5);
    }

    #[test]
    fn test_failed_exceeding_completed_is_clamped() {
        let p = progress_of(10, 2, 5);
        assert_eq!(p.successful, 0);
        assert_eq!(p.failed, 5);
        assert_eq!(p.remaining, 8);
    }

    #[test]
    fn test_negative_counters_are_clamped() {
        let p = progress_of(-1, -5, -2);
        assert_eq!(
            p,
            Progress {
                percent: 0,
                successful: 0,
                failed: 0,
                remaining: 0
            }
        );
    }

    #[test]
    fn test_compute_progress_is_pure() {
        let job = fixtures::job("job-1", JobStatus::Processing, 7, 3, 1);
        assert_eq!(compute_progress(&job), compute_progress(&job));
    }
}
