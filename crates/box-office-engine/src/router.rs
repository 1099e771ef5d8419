//! Implementation of the request router
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use box_office_core::{Request, RequestHandler, RequestKind, Response, ShowId};
use crossbeam::channel::{unbounded, Receiver, SendError, Sender};
use tracing::{debug, error, info};

use crate::table::{Outcome, ShowTable};

/// Routes requests to the [`ShowTable`]
///
/// Every request becomes an independent job for a pool of worker threads.
/// The router does not order requests against each other, the table's lock
/// does all the coordination.
///
/// The pool size caps the number of table operations in flight. Requests
/// beyond it wait in the queue until a worker is free.
pub struct Router {
    table: Arc<ShowTable>,
    sender: Sender<Request>,
    workers: Vec<JoinHandle<()>>,
}

impl Router {
    /// Create a new [`Router`] serving `table` with `workers` threads
    pub fn new(table: Arc<ShowTable>, workers: u32) -> Self {
        let (sender, receiver) = unbounded();
        let workers: Vec<_> = (0..workers.max(1))
            .map(|i| {
                let table = table.clone();
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("router_{i}"))
                    .spawn(move || work(&table, receiver))
                    .unwrap_or_else(|err| panic!("failed to spawn router worker {i}: {err}"))
            })
            .collect();

        info!(shows = table.len(), workers = workers.len(), "router started");
        Self {
            table,
            sender,
            workers,
        }
    }

    /// Serve a request for `show` on the calling thread
    pub fn dispatch(&self, show: &str, seats: u8) -> Response {
        dispatch(&self.table, show, seats)
    }

    /// The table behind this router
    pub fn table(&self) -> &Arc<ShowTable> {
        &self.table
    }
}

/// Worker loop, runs until the router is shut down and the queue is empty
fn work(table: &ShowTable, receiver: Receiver<Request>) {
    for rq in receiver {
        let response = dispatch(table, rq.show_id(), rq.seats_requested());
        rq.respond(response);
    }
}

/// Classify a request and run it against `table`
fn dispatch(table: &ShowTable, show: &str, seats: u8) -> Response {
    let kind = RequestKind::classify(seats);
    debug!(show, ?kind, "dispatching");
    match kind {
        RequestKind::Consult => match table.read(show) {
            Some((id, remaining)) => Response::consulted(id, remaining),
            None => Response::not_found(),
        },
        RequestKind::Reserve(requested) => match table.reserve(show, requested) {
            Some(r) if r.outcome == Outcome::Accepted => Response::reserved(r.show, r.seats),
            Some(r) => Response::refused(r.show, r.seats),
            None => Response::not_found(),
        },
    }
}

impl RequestHandler for Router {
    fn handle(&self, rq: Request) {
        if let Err(SendError(rq)) = self.sender.send(rq) {
            // all workers are gone, still answer
            let response = self.dispatch(rq.show_id(), rq.seats_requested());
            rq.respond(response);
        }
    }

    fn shows(&self) -> Vec<(ShowId, u8)> {
        self.table
            .snapshot()
            .into_iter()
            .map(|entry| (entry.id, entry.seats))
            .collect()
    }

    fn shutdown(self) {
        info!("router shutting down");
        drop(self.sender);
        for handle in self.workers {
            let name = handle.thread().name().unwrap_or_default().to_owned();
            if let Err(panic) = handle.join() {
                error!(worker = %name, "router worker panicked");
                std::panic::resume_unwind(panic);
            }
        }
        info!("router stopped");
    }
}
