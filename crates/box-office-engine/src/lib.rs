//! :rocket: The box office engine: the shared show table, the fair
//! readers/writer lock guarding it, and the router serving requests.
//!
//! A [`Router`] is handed requests by a transport. Each request runs on a
//! worker thread against the one [`ShowTable`] shared by all workers.

use std::sync::Arc;

use box_office_core::{Config, Error};
use tracing::info;

mod fair_lock;
mod router;
mod table;

pub use fair_lock::{FairRwLock, ReadGuard, WriteGuard};
pub use router::Router;
pub use table::{Outcome, Reservation, ShowEntry, ShowTable};

/// Entrypoint of the engine
///
/// Creates the show table from `config` and starts a router serving it.
pub fn launch(config: &Config) -> Result<Router, Error> {
    let table = ShowTable::new(config)?;
    for entry in table.snapshot() {
        info!(show = %entry.id, seats = entry.seats, "show on sale");
    }
    Ok(Router::new(Arc::new(table), config.workers))
}
