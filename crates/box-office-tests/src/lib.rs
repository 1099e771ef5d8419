use std::sync::Arc;

use box_office_core::{ShowId, DEFAULT_CATALOG};
use box_office_engine::{Router, ShowTable};
use eyre::Result;

mod api;
pub use api::{Api, ApiError, Booking, Consultation};

pub struct TestCtxBuilder {
    /// Catalog with initial seat counts
    pub shows: Vec<(String, u8)>,
    /// Number of router worker threads
    pub workers: u32,
    /// Count of threads handing requests to the router
    pub dispatch_threads: u16,
}

impl Default for TestCtxBuilder {
    fn default() -> Self {
        TestCtxBuilder {
            shows: DEFAULT_CATALOG.iter().map(|id| (id.to_string(), 20)).collect(),
            workers: 4,
            dispatch_threads: 2,
        }
    }
}

impl TestCtxBuilder {
    /// Create a new test context builder with the default catalog, 20 seats
    /// per show
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog
    pub fn with_shows(mut self, shows: &[(&str, u8)]) -> Self {
        self.shows = shows.iter().map(|&(id, seats)| (id.into(), seats)).collect();
        self
    }

    /// Set the number of router worker threads
    pub fn with_workers(mut self, workers: u32) -> Self {
        assert_ne!(workers, 0);
        self.workers = workers;
        self
    }

    /// Set the number of threads handing requests to the router
    pub fn with_dispatch_threads(mut self, threads: u16) -> Self {
        assert_ne!(threads, 0);
        self.dispatch_threads = threads;
        self
    }

    /// Build the test context
    pub async fn build(self) -> Result<TestCtx> {
        let shows = self
            .shows
            .iter()
            .map(|(id, seats)| -> Result<(ShowId, u8)> { Ok((ShowId::new(id)?, *seats)) })
            .collect::<Result<Vec<_>>>()?;
        let table = ShowTable::with_seats(shows)?;
        let router = Router::new(Arc::new(table), self.workers);
        let (router, api) = api::mock::start(self.dispatch_threads, router).await;

        Ok(TestCtx {
            api,
            router,
            shows: self.shows,
            drop_bomb: DropBomb,
        })
    }
}

/// Test context
pub struct TestCtx {
    /// API allowing to interact with the box office
    pub api: Api,
    router: api::mock::MockRouter,
    /// Initial catalog
    pub shows: Vec<(String, u8)>,

    drop_bomb: DropBomb,
}

impl TestCtx {
    /// Initial seats of `show`
    pub fn initial_seats(&self, show: &str) -> Option<u8> {
        self.shows
            .iter()
            .find(|(id, _)| id == show)
            .map(|&(_, seats)| seats)
    }

    /// Current state of the whole table, read in one go
    pub fn snapshot(&self) -> Vec<(ShowId, u8)> {
        self.router.shows()
    }

    /// Shut the box office down and finish the test
    pub async fn finish(self) {
        std::mem::forget(self.drop_bomb);
        drop(self.api);
        self.router.shutdown().await;
    }
}

struct DropBomb;

impl Drop for DropBomb {
    fn drop(&mut self) {
        eprintln!("@TestAuthor: You should call `ctx.finish().await` to shut the box office down");
    }
}
