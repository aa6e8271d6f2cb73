//! In-memory fakes for engine and reset-job tests.
//!
//! Each fake honors the same contracts as the PostgreSQL store: the
//! increment is atomic (serialized by the store lock, never
//! read-modify-write by the caller), the goal flip reports `true` exactly
//! once, and the account flips are guarded by current state and the manual
//! override.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use futures::future::BoxFuture;

use lifeline_core::clock::Clock;
use lifeline_core::constants::MONTHLY_CALL_GOAL;
use lifeline_db::model::tracker::MonthlyTracker;
use lifeline_db::model::user::User;

use crate::error::{ServiceError, ServiceResult};
use crate::notify::{EmailMessage, Notifier, NotifyError, NotifyResult};

use super::engine::TrackerEngine;
use super::store::{TrackerStore, UserDirectory};

/// A 10:00 UTC timestamp on the 15th of the given month.
pub(crate) fn mid_month(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 15, 10, 0, 0).unwrap()
}

#[derive(Default)]
pub(crate) struct InMemoryTrackerStore {
    rows: Mutex<HashMap<(uuid::Uuid, NaiveDate), MonthlyTracker>>,
}

impl InMemoryTrackerStore {
    fn fresh(user_id: uuid::Uuid, month: NaiveDate) -> MonthlyTracker {
        let now = Utc::now();
        MonthlyTracker {
            id: uuid::Uuid::now_v7(),
            user_id,
            month,
            completed_calls_count: 0,
            monthly_goal_completed: false,
            goal_completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TrackerStore for InMemoryTrackerStore {
    fn get(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
    ) -> BoxFuture<'_, ServiceResult<Option<MonthlyTracker>>> {
        Box::pin(async move {
            Ok(self.rows.lock().unwrap().get(&(user_id, month)).cloned())
        })
    }

    fn get_or_create(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
    ) -> BoxFuture<'_, ServiceResult<(MonthlyTracker, bool)>> {
        Box::pin(async move {
            let mut rows = self.rows.lock().unwrap();
            if let Some(existing) = rows.get(&(user_id, month)) {
                return Ok((existing.clone(), false));
            }
            let tracker = Self::fresh(user_id, month);
            rows.insert((user_id, month), tracker.clone());
            Ok((tracker, true))
        })
    }

    fn increment(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<MonthlyTracker>> {
        Box::pin(async move {
            let mut rows = self.rows.lock().unwrap();
            let tracker = rows
                .get_mut(&(user_id, month))
                .ok_or_else(|| ServiceError::NotFound("tracker".to_string()))?;
            tracker.completed_calls_count += 1;
            tracker.updated_at = at;
            Ok(tracker.clone())
        })
    }

    fn mark_goal_completed(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<bool>> {
        Box::pin(async move {
            let mut rows = self.rows.lock().unwrap();
            let Some(tracker) = rows.get_mut(&(user_id, month)) else {
                return Ok(false);
            };
            if tracker.monthly_goal_completed
                || tracker.completed_calls_count < MONTHLY_CALL_GOAL
            {
                return Ok(false);
            }
            tracker.monthly_goal_completed = true;
            tracker.goal_completed_at = Some(at);
            tracker.updated_at = at;
            Ok(true)
        })
    }

    fn reset(
        &self,
        user_id: uuid::Uuid,
        month: NaiveDate,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<Option<MonthlyTracker>>> {
        Box::pin(async move {
            let mut rows = self.rows.lock().unwrap();
            let Some(tracker) = rows.get_mut(&(user_id, month)) else {
                return Ok(None);
            };
            tracker.completed_calls_count = 0;
            tracker.monthly_goal_completed = false;
            tracker.goal_completed_at = None;
            tracker.updated_at = at;
            Ok(Some(tracker.clone()))
        })
    }

    fn goal_completed_in(
        &self,
        month: NaiveDate,
    ) -> BoxFuture<'_, ServiceResult<Vec<MonthlyTracker>>> {
        Box::pin(async move {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|t| {
                    t.month == month
                        && t.monthly_goal_completed
                        && t.completed_calls_count >= MONTHLY_CALL_GOAL
                })
                .cloned()
                .collect())
        })
    }
}

#[derive(Default)]
pub(crate) struct InMemoryUserDirectory {
    users: Mutex<HashMap<uuid::Uuid, User>>,
    poisoned: Mutex<HashSet<uuid::Uuid>>,
}

impl InMemoryUserDirectory {
    pub(crate) fn add(&self, active: bool, manual_override: bool) -> uuid::Uuid {
        let id = uuid::Uuid::now_v7();
        let now = Utc::now();
        let user = User {
            id,
            name: format!("user-{id}"),
            email: format!("{id}@example.com"),
            password_hash: String::new(),
            otp_hash: None,
            otp_issued_at: None,
            is_verified: true,
            is_active: active,
            manual_block_override: manual_override,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().insert(id, user);
        id
    }

    pub(crate) fn is_active(&self, id: uuid::Uuid) -> bool {
        self.users
            .lock()
            .unwrap()
            .get(&id)
            .is_some_and(|u| u.is_active)
    }

    /// Makes every directory operation for this user fail, to exercise
    /// per-user error accumulation in the reset job.
    pub(crate) fn poison(&self, id: uuid::Uuid) {
        self.poisoned.lock().unwrap().insert(id);
    }

    fn check_poisoned(&self, id: uuid::Uuid) -> ServiceResult<()> {
        if self.poisoned.lock().unwrap().contains(&id) {
            return Err(ServiceError::InvariantViolation(
                "simulated directory failure",
            ));
        }
        Ok(())
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_by_id(&self, id: uuid::Uuid) -> BoxFuture<'_, ServiceResult<Option<User>>> {
        Box::pin(async move { Ok(self.users.lock().unwrap().get(&id).cloned()) })
    }

    fn block_for_goal(
        &self,
        id: uuid::Uuid,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<bool>> {
        Box::pin(async move {
            let mut users = self.users.lock().unwrap();
            let Some(user) = users.get_mut(&id) else {
                return Ok(false);
            };
            if !user.is_active || user.manual_block_override {
                return Ok(false);
            }
            user.is_active = false;
            user.updated_at = at;
            Ok(true)
        })
    }

    fn unblock_for_reset(
        &self,
        id: uuid::Uuid,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, ServiceResult<bool>> {
        Box::pin(async move {
            self.check_poisoned(id)?;
            let mut users = self.users.lock().unwrap();
            let Some(user) = users.get_mut(&id) else {
                return Ok(false);
            };
            if user.is_active || user.manual_block_override {
                return Ok(false);
            }
            user.is_active = true;
            user.updated_at = at;
            Ok(true)
        })
    }
}

pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(crate) fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub(crate) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn fail_next_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, NotifyResult> {
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(NotifyError::Send("simulated outage".to_string()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        })
    }
}

/// Engine wired to the in-memory fakes, plus handles to each of them.
pub(crate) struct TestHarness {
    pub engine: TrackerEngine,
    pub store: Arc<InMemoryTrackerStore>,
    pub users: Arc<InMemoryUserDirectory>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHarness {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        let store = Arc::new(InMemoryTrackerStore::default());
        let users = Arc::new(InMemoryUserDirectory::default());
        let clock = Arc::new(ManualClock::new(now));
        let notifier = Arc::new(RecordingNotifier::default());

        let engine = TrackerEngine::new(
            Arc::clone(&store) as Arc<dyn TrackerStore>,
            Arc::clone(&users) as Arc<dyn UserDirectory>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );

        Self {
            engine,
            store,
            users,
            clock,
            notifier,
        }
    }

    pub(crate) fn add_user(&self, active: bool, manual_override: bool) -> uuid::Uuid {
        self.users.add(active, manual_override)
    }
}
