//! The scheduled month-rollover sweep.
//!
//! Runs near the start of each calendar month: every tracker that completed
//! its goal in the previous month gets a current-month tracker and a reset,
//! which unblocks the user and sends the welcome-back notice. Safe to
//! re-run — a second pass in the same month finds nothing left to unblock
//! and sends nothing.

use std::collections::HashSet;

use chrono::NaiveDate;

use lifeline_core::clock::Clock;
use lifeline_core::month::{month_label, month_start, previous_month};

use crate::error::ServiceResult;

use super::engine::TrackerEngine;

#[derive(Debug, Clone, Copy, Default)]
pub struct ResetJobOptions {
    /// Month to reset into; defaults to the current calendar month.
    pub target_month: Option<NaiveDate>,
    /// Report intended actions without mutating anything.
    pub dry_run: bool,
    /// Also reset target-month trackers that already completed the goal
    /// this month (manual correction).
    pub force: bool,
}

/// What one job run did (or, under `--dry-run`, would do).
#[derive(Debug, Clone)]
pub struct ResetReport {
    pub target_month: NaiveDate,
    pub dry_run: bool,
    /// Trackers found goal-completed in the previous month.
    pub candidates: usize,
    /// Target-month trackers created by this run.
    pub created: usize,
    /// Trackers reset (or that would be reset, under dry-run).
    pub reset: usize,
    /// Candidates skipped because they already completed the goal in the
    /// target month and `--force` was not given.
    pub skipped: usize,
    /// Unblock notifications that went out.
    pub notified: usize,
    /// Per-user failures; the batch keeps going past each one.
    pub failures: Vec<(uuid::Uuid, String)>,
}

impl ResetReport {
    fn new(target_month: NaiveDate, dry_run: bool) -> Self {
        Self {
            target_month,
            dry_run,
            candidates: 0,
            created: 0,
            reset: 0,
            skipped: 0,
            notified: 0,
            failures: Vec::new(),
        }
    }

    #[must_use]
    pub fn month_label(&self) -> String {
        month_label(self.target_month)
    }
}

impl TrackerEngine {
    /// ## Summary
    /// Runs the monthly reset sweep.
    ///
    /// ## Errors
    /// Returns an error only if the candidate scan itself fails; per-user
    /// failures are accumulated in the report instead.
    #[tracing::instrument(skip(self))]
    pub async fn run_monthly_reset(&self, opts: ResetJobOptions) -> ServiceResult<ResetReport> {
        let target = opts
            .target_month
            .map_or_else(|| month_start(self.clock().now()), month_start_of);
        let mut report = ResetReport::new(target, opts.dry_run);

        let previous = previous_month(target);
        let candidates = self.store().goal_completed_in(previous).await?;
        report.candidates = candidates.len();

        tracing::info!(
            target_month = %target,
            previous_month = %previous,
            candidates = report.candidates,
            dry_run = opts.dry_run,
            "Processing monthly reset"
        );

        let mut handled: HashSet<uuid::Uuid> = HashSet::new();

        for candidate in candidates {
            handled.insert(candidate.user_id);
            if let Err(e) = self.reset_one(candidate.user_id, target, opts, &mut report).await {
                tracing::error!(user_id = %candidate.user_id, error = %e, "Reset failed, continuing");
                report.failures.push((candidate.user_id, e.to_string()));
            }
        }

        if opts.force {
            let completed_now = self.store().goal_completed_in(target).await?;
            for tracker in completed_now {
                if !handled.insert(tracker.user_id) {
                    continue;
                }
                if let Err(e) = self
                    .force_reset_one(tracker.user_id, target, opts, &mut report)
                    .await
                {
                    tracing::error!(user_id = %tracker.user_id, error = %e, "Force reset failed, continuing");
                    report.failures.push((tracker.user_id, e.to_string()));
                }
            }
        }

        tracing::info!(
            created = report.created,
            reset = report.reset,
            skipped = report.skipped,
            notified = report.notified,
            failures = report.failures.len(),
            "Monthly reset finished"
        );

        Ok(report)
    }

    async fn reset_one(
        &self,
        user_id: uuid::Uuid,
        target: NaiveDate,
        opts: ResetJobOptions,
        report: &mut ResetReport,
    ) -> ServiceResult<()> {
        if opts.dry_run {
            // No mutations under dry-run, not even tracker creation.
            match self.store().get(user_id, target).await? {
                None => {
                    report.created += 1;
                    report.reset += 1;
                }
                Some(current) if current.monthly_goal_completed && !opts.force => {
                    report.skipped += 1;
                }
                Some(_) => report.reset += 1,
            }
            return Ok(());
        }

        let (current, created) = self.store().get_or_create(user_id, target).await?;
        if created {
            report.created += 1;
        } else if current.monthly_goal_completed && !opts.force {
            // Completed the goal again in the target month; leave it alone
            // unless the operator forces a correction.
            report.skipped += 1;
            return Ok(());
        }

        let effect = self.reset_for_new_month(user_id, target).await?;
        report.reset += 1;
        if effect.notified {
            report.notified += 1;
        }

        Ok(())
    }

    async fn force_reset_one(
        &self,
        user_id: uuid::Uuid,
        target: NaiveDate,
        opts: ResetJobOptions,
        report: &mut ResetReport,
    ) -> ServiceResult<()> {
        if opts.dry_run {
            report.reset += 1;
            return Ok(());
        }

        let effect = self.reset_for_new_month(user_id, target).await?;
        report.reset += 1;
        if effect.notified {
            report.notified += 1;
        }

        Ok(())
    }
}

fn month_start_of(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use lifeline_core::constants::MONTHLY_CALL_GOAL;
    use lifeline_core::month::month_start;

    use crate::tracker::store::TrackerStore;
    use crate::tracker::testing::{TestHarness, mid_month};

    use super::*;

    /// Drives a user to the blocked state in the harness's current month.
    async fn block_user(harness: &TestHarness) -> uuid::Uuid {
        let user = harness.add_user(true, false);
        for _ in 0..MONTHLY_CALL_GOAL {
            harness.engine.record_confirmed_call(user).await.unwrap();
        }
        assert!(harness.engine.block_for_goal(user).await.unwrap());
        user
    }

    #[test_log::test(tokio::test)]
    async fn dry_run_reports_without_mutating() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = block_user(&harness).await;

        harness.clock.set(mid_month(2025, 4));
        let report = harness
            .engine
            .run_monthly_reset(ResetJobOptions {
                dry_run: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.reset, 1);
        assert_eq!(report.notified, 0);
        assert!(report.dry_run);

        // Nothing actually changed.
        assert!(!harness.users.is_active(user));
        assert!(
            harness
                .store
                .get(user, month_start(mid_month(2025, 4)))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(harness.notifier.sent_count(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn real_run_resets_unblocks_and_notifies_once() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = block_user(&harness).await;

        harness.clock.set(mid_month(2025, 4));
        let report = harness
            .engine
            .run_monthly_reset(ResetJobOptions::default())
            .await
            .unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.created, 1);
        assert_eq!(report.reset, 1);
        assert_eq!(report.notified, 1);
        assert!(report.failures.is_empty());

        assert!(harness.users.is_active(user));
        let april = harness
            .store
            .get(user, month_start(mid_month(2025, 4)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(april.completed_calls_count, 0);
        assert!(!april.monthly_goal_completed);

        // March's tracker is untouched history.
        let march = harness
            .store
            .get(user, month_start(mid_month(2025, 3)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(march.completed_calls_count, MONTHLY_CALL_GOAL);

        let sent = harness.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("April 2025"));
    }

    #[test_log::test(tokio::test)]
    async fn rerunning_the_job_sends_no_duplicate_notifications() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = block_user(&harness).await;

        harness.clock.set(mid_month(2025, 4));
        let opts = ResetJobOptions::default();
        harness.engine.run_monthly_reset(opts).await.unwrap();
        let second = harness.engine.run_monthly_reset(opts).await.unwrap();

        assert_eq!(second.notified, 0);
        assert!(harness.users.is_active(user));
        assert_eq!(harness.notifier.sent_count(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn completed_target_month_is_skipped_without_force() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = block_user(&harness).await;

        // The user completed the goal again in April before the job ran.
        harness.clock.set(mid_month(2025, 4));
        for _ in 0..MONTHLY_CALL_GOAL {
            harness.engine.record_confirmed_call(user).await.unwrap();
        }

        let report = harness
            .engine
            .run_monthly_reset(ResetJobOptions::default())
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.reset, 0);

        let forced = harness
            .engine
            .run_monthly_reset(ResetJobOptions {
                force: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(forced.skipped, 0);
        assert!(forced.reset >= 1);

        let april = harness
            .store
            .get(user, month_start(mid_month(2025, 4)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(april.completed_calls_count, 0);
        assert!(!april.monthly_goal_completed);
    }

    #[test_log::test(tokio::test)]
    async fn explicit_target_month_is_honored() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = block_user(&harness).await;

        // Clock says May, but the operator targets April.
        harness.clock.set(mid_month(2025, 5));
        let report = harness
            .engine
            .run_monthly_reset(ResetJobOptions {
                target_month: Some(month_start(mid_month(2025, 4))),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(report.target_month, month_start(mid_month(2025, 4)));
        assert_eq!(report.candidates, 1);
        assert!(harness.users.is_active(user));
    }

    #[test_log::test(tokio::test)]
    async fn per_user_failures_do_not_abort_the_batch() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let failing = block_user(&harness).await;
        let healthy = block_user(&harness).await;
        harness.users.poison(failing);

        harness.clock.set(mid_month(2025, 4));
        let report = harness
            .engine
            .run_monthly_reset(ResetJobOptions::default())
            .await
            .unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, failing);
        // The healthy user was still processed.
        assert!(harness.users.is_active(healthy));
        assert!(!harness.users.is_active(failing));
    }

    #[test_log::test(tokio::test)]
    async fn override_users_keep_their_counters_reset_but_stay_put() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(false, true);
        for _ in 0..MONTHLY_CALL_GOAL {
            harness.engine.record_confirmed_call(user).await.unwrap();
        }

        harness.clock.set(mid_month(2025, 4));
        let report = harness
            .engine
            .run_monthly_reset(ResetJobOptions::default())
            .await
            .unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.notified, 0);
        assert!(!harness.users.is_active(user));

        let april = harness
            .store
            .get(user, month_start(mid_month(2025, 4)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(april.completed_calls_count, 0);
    }
}
