//! The counting/blocking/reset state machine.
//!
//! All increments, account flips, and month-rollover resets go through this
//! engine; the HTTP coordinators and the scheduled job are thin drivers
//! around it. Month rollover is handled in two places with the same
//! semantics: lazily in [`TrackerEngine::resolve_current`] when a stale
//! user is touched after the boundary, and in bulk by the scheduled job
//! (`reset_job`).

use std::sync::Arc;

use chrono::NaiveDate;

use lifeline_core::clock::Clock;
use lifeline_core::constants::MONTHLY_CALL_GOAL;
use lifeline_core::month::{month_label, month_start, previous_month};
use lifeline_db::model::tracker::MonthlyTracker;

use crate::error::ServiceResult;
use crate::notify::{Notifier, templates};

use super::store::{TrackerStore, UserDirectory};

/// Result of counting one confirmed call.
#[derive(Debug, Clone)]
pub struct CallCount {
    pub tracker: MonthlyTracker,
    /// True on the call that crossed the goal threshold, false before and
    /// after.
    pub goal_just_completed: bool,
}

/// What a month-rollover reset actually did.
#[derive(Debug, Clone, Default)]
pub struct ResetEffect {
    pub tracker: Option<MonthlyTracker>,
    pub unblocked: bool,
    pub notified: bool,
}

#[derive(Clone)]
pub struct TrackerEngine {
    store: Arc<dyn TrackerStore>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl TrackerEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn TrackerStore>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            users,
            clock,
            notifier,
        }
    }

    pub(crate) fn store(&self) -> &dyn TrackerStore {
        self.store.as_ref()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// ## Summary
    /// Returns the user's tracker for the current calendar month, creating
    /// it on first touch.
    ///
    /// When creation reveals a month boundary was crossed — the previous
    /// month's tracker completed its goal — the fresh tracker is run
    /// through `reset_for_new_month` before returning, so a blocked user
    /// is reactivated without waiting for the scheduled job.
    ///
    /// ## Errors
    /// Returns an error if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_current(&self, user_id: uuid::Uuid) -> ServiceResult<MonthlyTracker> {
        let month = month_start(self.clock.now());
        let (tracker, created) = self.store.get_or_create(user_id, month).await?;

        if created
            && let Some(prev) = self.store.get(user_id, previous_month(month)).await?
            && prev.monthly_goal_completed
        {
            tracing::info!(
                %user_id,
                stale_month = %prev.month,
                "Month rollover detected on access, resetting"
            );
            let effect = self.reset_for_new_month(user_id, month).await?;
            if let Some(tracker) = effect.tracker {
                return Ok(tracker);
            }
        }

        Ok(tracker)
    }

    /// ## Summary
    /// Counts one confirmed donation call for the user's current month.
    ///
    /// The count is bumped atomically in the store and the goal flip is
    /// guarded there too, so concurrent confirmations neither lose updates
    /// nor report the threshold transition twice.
    ///
    /// The account is not deactivated here; callers observe
    /// `goal_just_completed` and invoke [`TrackerEngine::block_for_goal`].
    ///
    /// ## Errors
    /// Returns an error if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn record_confirmed_call(&self, user_id: uuid::Uuid) -> ServiceResult<CallCount> {
        let current = self.resolve_current(user_id).await?;
        let now = self.clock.now();

        let tracker = self.store.increment(user_id, current.month, now).await?;

        let goal_just_completed = if tracker.completed_calls_count >= MONTHLY_CALL_GOAL {
            self.store
                .mark_goal_completed(user_id, tracker.month, now)
                .await?
        } else {
            false
        };

        tracing::info!(
            %user_id,
            count = tracker.completed_calls_count,
            goal_just_completed,
            "Confirmed call counted"
        );

        let tracker = if goal_just_completed {
            self.store
                .get(user_id, tracker.month)
                .await?
                .unwrap_or(tracker)
        } else {
            tracker
        };

        Ok(CallCount {
            tracker,
            goal_just_completed,
        })
    }

    /// ## Summary
    /// Deactivates the account after the monthly goal was reached.
    ///
    /// No-op when the account is already inactive or carries the manual
    /// admin override.
    ///
    /// ## Returns
    /// `true` iff the account was deactivated by this call.
    ///
    /// ## Errors
    /// Returns an error if the directory fails.
    #[tracing::instrument(skip(self))]
    pub async fn block_for_goal(&self, user_id: uuid::Uuid) -> ServiceResult<bool> {
        let blocked = self.users.block_for_goal(user_id, self.clock.now()).await?;

        if blocked {
            tracing::info!(%user_id, "Account blocked after completing monthly goal");
        }

        Ok(blocked)
    }

    /// ## Summary
    /// Resets the (user, month) tracker for a new month: zeroes the count,
    /// clears the goal flag and timestamp, and reactivates the account if
    /// it was auto-blocked.
    ///
    /// Idempotent: repeat calls are no-ops beyond redundant writes, the
    /// unblock happens at most once per blocked→unblocked transition, and
    /// the notification goes out only on that transition. A notification
    /// failure is logged and does not undo the reset.
    ///
    /// ## Errors
    /// Returns an error if the store or directory fails; never because of
    /// the notifier.
    #[tracing::instrument(skip(self))]
    pub async fn reset_for_new_month(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
    ) -> ServiceResult<ResetEffect> {
        let now = self.clock.now();

        let tracker = self.store.reset(user_id, month, now).await?;
        let unblocked = self.users.unblock_for_reset(user_id, now).await?;

        let mut notified = false;
        if unblocked {
            if let Some(user) = self.users.find_by_id(user_id).await? {
                let message = templates::monthly_unblock(&user, &month_label(month));
                match self.notifier.send(message).await {
                    Ok(()) => notified = true,
                    Err(e) => {
                        tracing::warn!(
                            %user_id,
                            user_email = %user.email,
                            error = %e,
                            "Failed to send unblock notification"
                        );
                    }
                }
            }

            tracing::info!(%user_id, %month, "Account unblocked for new month");
        }

        Ok(ResetEffect {
            tracker,
            unblocked,
            notified,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use lifeline_core::constants::MONTHLY_CALL_GOAL;
    use lifeline_core::month::month_start;

    use crate::tracker::store::TrackerStore;
    use crate::tracker::testing::{TestHarness, mid_month};

    #[test_log::test(tokio::test)]
    async fn first_touch_creates_zeroed_tracker() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(true, false);

        let tracker = harness.engine.resolve_current(user).await.unwrap();

        assert_eq!(tracker.month, month_start(mid_month(2025, 3)));
        assert_eq!(tracker.completed_calls_count, 0);
        assert!(!tracker.monthly_goal_completed);
        assert!(tracker.goal_completed_at.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn goal_completes_on_the_third_call_only() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(true, false);

        let first = harness.engine.record_confirmed_call(user).await.unwrap();
        assert_eq!(first.tracker.completed_calls_count, 1);
        assert!(!first.goal_just_completed);
        assert!(!first.tracker.monthly_goal_completed);

        let second = harness.engine.record_confirmed_call(user).await.unwrap();
        assert!(!second.goal_just_completed);

        let third = harness.engine.record_confirmed_call(user).await.unwrap();
        assert_eq!(third.tracker.completed_calls_count, MONTHLY_CALL_GOAL);
        assert!(third.goal_just_completed);
        assert!(third.tracker.monthly_goal_completed);
        assert!(third.tracker.goal_completed_at.is_some());
    }

    #[test_log::test(tokio::test)]
    async fn goal_timestamp_is_set_only_on_the_transition() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(true, false);

        for _ in 0..2 {
            harness.engine.record_confirmed_call(user).await.unwrap();
        }

        harness
            .clock
            .set(Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap());
        let third = harness.engine.record_confirmed_call(user).await.unwrap();
        let completed_at = third.tracker.goal_completed_at.unwrap();

        harness
            .clock
            .set(Utc.with_ymd_and_hms(2025, 3, 25, 9, 0, 0).unwrap());
        let fourth = harness.engine.record_confirmed_call(user).await.unwrap();

        assert!(!fourth.goal_just_completed);
        assert_eq!(fourth.tracker.completed_calls_count, 4);
        assert_eq!(fourth.tracker.goal_completed_at, Some(completed_at));
        assert!(fourth.tracker.monthly_goal_completed);
    }

    #[test_log::test(tokio::test)]
    async fn goal_flag_always_implies_threshold() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(true, false);

        for _ in 0..5 {
            let count = harness.engine.record_confirmed_call(user).await.unwrap();
            if count.tracker.monthly_goal_completed {
                assert!(count.tracker.completed_calls_count >= MONTHLY_CALL_GOAL);
            }
        }
    }

    #[test_log::test(tokio::test)]
    async fn block_fires_once_and_respects_existing_state() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(true, false);

        for _ in 0..MONTHLY_CALL_GOAL {
            harness.engine.record_confirmed_call(user).await.unwrap();
        }

        assert!(harness.engine.block_for_goal(user).await.unwrap());
        assert!(!harness.users.is_active(user));

        // Second attempt is a no-op: the account is already inactive.
        assert!(!harness.engine.block_for_goal(user).await.unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn block_respects_manual_override() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(true, true);

        assert!(!harness.engine.block_for_goal(user).await.unwrap());
        assert!(harness.users.is_active(user));
    }

    #[test_log::test(tokio::test)]
    async fn reset_is_idempotent_and_notifies_once() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(true, false);

        for _ in 0..MONTHLY_CALL_GOAL {
            harness.engine.record_confirmed_call(user).await.unwrap();
        }
        harness.engine.block_for_goal(user).await.unwrap();

        let month = month_start(mid_month(2025, 3));
        let first = harness.engine.reset_for_new_month(user, month).await.unwrap();
        assert!(first.unblocked);
        assert!(first.notified);
        let tracker = first.tracker.unwrap();
        assert_eq!(tracker.completed_calls_count, 0);
        assert!(!tracker.monthly_goal_completed);
        assert!(tracker.goal_completed_at.is_none());
        assert!(harness.users.is_active(user));

        let second = harness.engine.reset_for_new_month(user, month).await.unwrap();
        assert!(!second.unblocked);
        assert!(!second.notified);
        let tracker = second.tracker.unwrap();
        assert_eq!(tracker.completed_calls_count, 0);
        assert!(!tracker.monthly_goal_completed);

        assert_eq!(harness.notifier.sent_count(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn reset_never_reactivates_overridden_accounts() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(false, true);

        for _ in 0..MONTHLY_CALL_GOAL {
            harness.engine.record_confirmed_call(user).await.unwrap();
        }

        let month = month_start(mid_month(2025, 3));
        let effect = harness.engine.reset_for_new_month(user, month).await.unwrap();

        assert!(!effect.unblocked);
        assert!(!effect.notified);
        assert!(!harness.users.is_active(user));
        // Counters still reset even though the account stays as the admin
        // left it.
        assert_eq!(effect.tracker.unwrap().completed_calls_count, 0);
    }

    #[test_log::test(tokio::test)]
    async fn notification_failure_does_not_fail_the_reset() {
        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(true, false);

        for _ in 0..MONTHLY_CALL_GOAL {
            harness.engine.record_confirmed_call(user).await.unwrap();
        }
        harness.engine.block_for_goal(user).await.unwrap();
        harness.notifier.fail_next_sends(true);

        let month = month_start(mid_month(2025, 3));
        let effect = harness.engine.reset_for_new_month(user, month).await.unwrap();

        assert!(effect.unblocked);
        assert!(!effect.notified);
        assert!(harness.users.is_active(user));
    }

    #[test_log::test(tokio::test)]
    async fn stale_month_resets_lazily_on_access() {
        let harness = TestHarness::new(mid_month(2025, 1));
        let user = harness.add_user(true, false);

        for _ in 0..MONTHLY_CALL_GOAL {
            harness.engine.record_confirmed_call(user).await.unwrap();
        }
        harness.engine.block_for_goal(user).await.unwrap();
        assert!(!harness.users.is_active(user));

        // Cross the month boundary and touch the user again.
        harness.clock.set(mid_month(2025, 2));
        let tracker = harness.engine.resolve_current(user).await.unwrap();

        assert_eq!(tracker.month, month_start(mid_month(2025, 2)));
        assert_eq!(tracker.completed_calls_count, 0);
        assert!(!tracker.monthly_goal_completed);
        assert!(harness.users.is_active(user));
        assert_eq!(harness.notifier.sent_count(), 1);

        // January's tracker survives as the audit trail.
        let january = harness
            .store
            .get(user, month_start(mid_month(2025, 1)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(january.completed_calls_count, MONTHLY_CALL_GOAL);
        assert!(january.monthly_goal_completed);
    }

    #[test_log::test(tokio::test)]
    async fn rollover_without_completed_goal_does_not_notify() {
        let harness = TestHarness::new(mid_month(2025, 1));
        let user = harness.add_user(true, false);

        harness.engine.record_confirmed_call(user).await.unwrap();

        harness.clock.set(mid_month(2025, 2));
        let tracker = harness.engine.resolve_current(user).await.unwrap();

        assert_eq!(tracker.completed_calls_count, 0);
        assert_eq!(harness.notifier.sent_count(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn concurrent_confirmations_never_lose_updates() {
        const CONCURRENT_CALLS: usize = 20;

        let harness = TestHarness::new(mid_month(2025, 3));
        let user = harness.add_user(true, false);
        let engine = Arc::new(harness.engine.clone());

        let mut handles = Vec::with_capacity(CONCURRENT_CALLS);
        for _ in 0..CONCURRENT_CALLS {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.record_confirmed_call(user).await
            }));
        }

        let mut transitions = 0;
        for handle in handles {
            let count = handle.await.unwrap().unwrap();
            if count.goal_just_completed {
                transitions += 1;
            }
        }

        let tracker = harness
            .store
            .get(user, month_start(mid_month(2025, 3)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            tracker.completed_calls_count,
            i32::try_from(CONCURRENT_CALLS).unwrap()
        );
        // The threshold transition is observed by exactly one caller.
        assert_eq!(transitions, 1);
    }
}
