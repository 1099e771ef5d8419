//! 🐌 A sequential implementation for reference
//!
//! Every request is served under one plain mutex, on the calling thread.
//! Consultations wait for each other, there is no fairness between readers
//! and writers. Handy to compare the router against.

use box_office_core::{Config, Error, Request, RequestHandler, RequestKind, Response, ShowId};
use parking_lot::Mutex;
use rand::Rng;

struct ServerInner {
    /// Shows with their remaining seats
    shows: Vec<(ShowId, u8)>,
}

impl ServerInner {
    fn serve(&mut self, show: &str, seats: u8) -> Response {
        let Some((id, remaining)) = self.shows.iter_mut().find(|(id, _)| id == show) else {
            return Response::not_found();
        };
        match RequestKind::classify(seats) {
            RequestKind::Consult => Response::consulted(*id, *remaining),
            RequestKind::Reserve(requested) if requested <= *remaining => {
                *remaining -= requested;
                Response::reserved(*id, *remaining)
            }
            RequestKind::Reserve(_) => Response::refused(*id, *remaining),
        }
    }
}

/// A request handler processing requests sequentially
pub struct Server(Mutex<ServerInner>);

impl RequestHandler for Server {
    fn handle(&self, request: Request) {
        let response = self
            .0
            .lock()
            .serve(request.show_id(), request.seats_requested());
        request.respond(response)
    }

    fn shows(&self) -> Vec<(ShowId, u8)> {
        self.0.lock().shows.clone()
    }

    fn shutdown(self) {
        // nothing to do
    }
}

impl Server {
    /// Create a new slug
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let mut rng = rand::thread_rng();
        let shows = config
            .catalog
            .iter()
            .map(|&id| (id, rng.gen_range(config.min_seats..=config.max_seats)))
            .collect();
        Ok(Self(Mutex::new(ServerInner { shows })))
    }
}
