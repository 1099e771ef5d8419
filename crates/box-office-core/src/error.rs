use thiserror::Error;

use crate::ShowId;

/// Configuration and decoding failures
///
/// An unknown show or a refused reservation is not an error: both are
/// ordinary [`Response`](crate::Response) values.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The id is not exactly [`SHOW_ID_LEN`](crate::SHOW_ID_LEN) printable ASCII characters
    #[error("show id {0:?} must be exactly 6 printable ASCII characters")]
    InvalidShowId(String),

    /// The same show appears twice in a catalog
    #[error("show {0} appears more than once in the catalog")]
    DuplicateShow(ShowId),

    /// A catalog without any show
    #[error("the catalog does not contain any show")]
    EmptyCatalog,

    /// Initial seat range outside `1..=MAX_SEATS` or inverted
    #[error("seat range {min}..={max} must lie within 1..=127")]
    InvalidSeatRange {
        /// Lower bound
        min: u8,
        /// Upper bound
        max: u8,
    },

    /// A seat count larger than [`MAX_SEATS`](crate::MAX_SEATS)
    #[error("{0} seats exceed the limit of 127")]
    TooManySeats(u32),

    /// A wire frame of the wrong size
    #[error("expected a frame of {expected} bytes, got {got}")]
    FrameLength {
        /// Required frame length
        expected: usize,
        /// Length actually received
        got: usize,
    },

    /// The show id field of a frame is not NUL-terminated
    #[error("show id field is not NUL-terminated")]
    MissingTerminator,

    /// A request frame carrying a negative seat count
    #[error("requested seat count {0} is negative")]
    NegativeSeats(i8),
}
