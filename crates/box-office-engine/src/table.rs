//! Implementation of the shared table of shows

use box_office_core::{Config, Error, ShowId, MAX_SEATS};
use rand::Rng;
use tracing::{debug, trace};

use crate::fair_lock::FairRwLock;

/// A show together with its remaining seats
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ShowEntry {
    /// The show
    pub id: ShowId,
    /// Seats still available
    pub seats: u8,
}

/// Whether a reservation was granted
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// The seats were taken
    Accepted,
    /// Not enough seats were left, nothing changed
    Rejected,
}

/// Result of [`ShowTable::reserve()`]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Reservation {
    /// The show
    pub show: ShowId,
    /// Granted or not
    pub outcome: Outcome,
    /// Remaining seats after an accepted reservation, the unchanged
    /// availability after a rejected one
    pub seats: u8,
}

/// Table of all shows on sale
///
/// The ids are fixed at creation and looked up without locking. The seat
/// counts sit behind a [`FairRwLock`]: consultations share it, reservations
/// take it exclusively so that checking and decrementing is one step.
pub struct ShowTable {
    ids: Box<[ShowId]>,
    seats: FairRwLock<Box<[u8]>>,
}

impl ShowTable {
    /// Create a [`ShowTable`] for the catalog of `config`, drawing every
    /// show's seats from `config.min_seats..=config.max_seats`
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let mut rng = rand::thread_rng();
        Self::with_seats(
            config
                .catalog
                .iter()
                .map(|&id| (id, rng.gen_range(config.min_seats..=config.max_seats))),
        )
    }

    /// Create a [`ShowTable`] with the given seat counts
    pub fn with_seats(entries: impl IntoIterator<Item = (ShowId, u8)>) -> Result<Self, Error> {
        let mut ids = Vec::new();
        let mut seats = Vec::new();
        for (id, count) in entries {
            if ids.contains(&id) {
                return Err(Error::DuplicateShow(id));
            }
            if count > MAX_SEATS {
                return Err(Error::TooManySeats(count.into()));
            }
            ids.push(id);
            seats.push(count);
        }
        if ids.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        debug!(shows = ids.len(), "show table created");

        Ok(Self {
            ids: ids.into_boxed_slice(),
            seats: FairRwLock::new(seats.into_boxed_slice()),
        })
    }

    /// Find the index of `show`
    ///
    /// The ids never change, so this does not lock.
    pub fn lookup(&self, show: &str) -> Option<usize> {
        self.ids.iter().position(|id| id == show)
    }

    /// Get the remaining seats of `show`, [`None`] if there is no such show
    pub fn read(&self, show: &str) -> Option<(ShowId, u8)> {
        let index = self.lookup(show)?;
        let seats = self.seats.read()[index];
        trace!(show, seats, "consulted");
        Some((self.ids[index], seats))
    }

    /// Try to reserve `requested` seats of `show`, [`None`] if there is no
    /// such show
    ///
    /// `requested` must be in `1..=MAX_SEATS`; consultations go through
    /// [`Self::read()`].
    pub fn reserve(&self, show: &str, requested: u8) -> Option<Reservation> {
        debug_assert!((1..=MAX_SEATS).contains(&requested));
        let index = self.lookup(show)?;

        let mut seats = self.seats.write();
        let available = seats[index];
        let reservation = if requested <= available {
            seats[index] = available - requested;
            Reservation {
                show: self.ids[index],
                outcome: Outcome::Accepted,
                seats: seats[index],
            }
        } else {
            Reservation {
                show: self.ids[index],
                outcome: Outcome::Rejected,
                seats: available,
            }
        };
        drop(seats);

        debug!(
            show,
            requested,
            outcome = ?reservation.outcome,
            seats = reservation.seats,
            "reservation decided"
        );
        Some(reservation)
    }

    /// Copy all entries under a single shared acquisition
    pub fn snapshot(&self) -> Vec<ShowEntry> {
        let seats = self.seats.read();
        self.ids
            .iter()
            .zip(seats.iter())
            .map(|(&id, &seats)| ShowEntry { id, seats })
            .collect()
    }

    /// The shows on sale
    pub fn ids(&self) -> &[ShowId] {
        &self.ids
    }

    /// Number of shows
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always `false`, a table holds at least one show
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
