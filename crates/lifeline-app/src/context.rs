//! Depot wiring for the shared collaborators: the notifier, the clock, and
//! a helper assembling the tracker engine from depot parts.

use std::sync::Arc;

use salvo::async_trait;

use lifeline_core::clock::Clock;
use lifeline_core::error::CoreError;
use lifeline_service::notify::Notifier;
use lifeline_service::tracker::{PgTrackerStore, PgUserDirectory, TrackerEngine};

use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

pub struct NotifierHandler {
    pub notifier: Arc<dyn Notifier>,
}

#[async_trait]
impl salvo::Handler for NotifierHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.notifier));
    }
}

pub struct ClockHandler {
    pub clock: Arc<dyn Clock>,
}

#[async_trait]
impl salvo::Handler for ClockHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.clock));
    }
}

/// ## Summary
/// Retrieves the notifier from the depot.
///
/// ## Errors
/// Returns an error if the notifier is not found in the depot.
pub fn get_notifier_from_depot(depot: &salvo::Depot) -> AppResult<Arc<dyn Notifier>> {
    depot
        .obtain::<Arc<dyn Notifier>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Notifier not found in depot").into())
}

/// ## Summary
/// Retrieves the clock from the depot.
///
/// ## Errors
/// Returns an error if the clock is not found in the depot.
pub fn get_clock_from_depot(depot: &salvo::Depot) -> AppResult<Arc<dyn Clock>> {
    depot
        .obtain::<Arc<dyn Clock>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Clock not found in depot").into())
}

/// ## Summary
/// Assembles the tracker engine over the request's depot collaborators.
///
/// ## Errors
/// Returns an error if any collaborator is missing from the depot.
pub fn engine_from_depot(depot: &salvo::Depot) -> AppResult<TrackerEngine> {
    let provider = get_db_from_depot(depot)?;
    let notifier = get_notifier_from_depot(depot)?;
    let clock = get_clock_from_depot(depot)?;

    Ok(TrackerEngine::new(
        Arc::new(PgTrackerStore::new(Arc::clone(&provider))),
        Arc::new(PgUserDirectory::new(provider)),
        clock,
        notifier,
    ))
}
