//! 🏗 Shared vocabulary of the box office: show ids, requests, responses and
//! the wire frame exchanged with clients.
#![warn(missing_docs)]

mod error;
mod request;
mod show;
pub mod wire;

pub use error::Error;
pub use request::{RawRequest, Reply, Request, RequestHandler, RequestKind, Response};
pub use show::{ShowId, SHOW_ID_LEN};

/// Largest seat count a show may hold, and largest single reservation
pub const MAX_SEATS: u8 = 127;

/// Catalog served when no catalog file is given
pub const DEFAULT_CATALOG: [&str; 3] = ["NSY103", "RCP105", "NFP121"];

/// Configuration of the box office
#[derive(Clone, Debug)]
pub struct Config {
    /// Shows on sale, fixed for the lifetime of the process
    pub catalog: Vec<ShowId>,
    /// Lower bound (inclusive) of the randomly drawn initial seat count
    pub min_seats: u8,
    /// Upper bound (inclusive) of the randomly drawn initial seat count
    pub max_seats: u8,
    /// Number of router worker threads
    pub workers: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: DEFAULT_CATALOG
                .iter()
                .filter_map(|id| ShowId::new(id).ok())
                .collect(),
            min_seats: 16,
            max_seats: 30,
            workers: 8,
        }
    }
}

impl Config {
    /// Check that the catalog is usable and the seat range is sane
    pub fn validate(&self) -> Result<(), Error> {
        if self.catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        for (i, id) in self.catalog.iter().enumerate() {
            if self.catalog[..i].contains(id) {
                return Err(Error::DuplicateShow(*id));
            }
        }
        if self.min_seats == 0 || self.min_seats > self.max_seats || self.max_seats > MAX_SEATS {
            return Err(Error::InvalidSeatRange {
                min: self.min_seats,
                max: self.max_seats,
            });
        }
        Ok(())
    }
}
