use crate::ShowId;

/// Kind of the request, derived from the number of requested seats
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RequestKind {
    /// Ask how many seats remain
    Consult,
    /// Reserve the given (non-zero) number of seats
    Reserve(u8),
}

impl RequestKind {
    /// Zero requested seats is a consultation, anything else a reservation
    #[inline]
    pub fn classify(seats: u8) -> Self {
        match seats {
            0 => RequestKind::Consult,
            n => RequestKind::Reserve(n),
        }
    }
}

/// Request decoded by a transport
///
/// 📌 Hint: The show id is kept as received. A string that matches no show
/// (including a malformed one) is answered with [`Response::not_found()`].
pub struct Request {
    show: String,
    seats: u8,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("show", &self.show)
            .field("seats", &self.seats)
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// Interface for serving requests
///
/// 📌 Hint: The router implements this trait, the server's sequential
/// reference implementation does as well.
pub trait RequestHandler {
    /// Serve a request, answering it exactly once
    ///
    /// This method may be called concurrently from different threads.
    fn handle(&self, request: Request);

    /// Every show with its remaining seats, as one consistent view
    fn shows(&self) -> Vec<(ShowId, u8)>;

    /// Shut the box office down
    ///
    /// Requests already handed over are served before this method returns,
    /// and every thread spawned by the handler has terminated.
    fn shutdown(self);
}

/// The transport side of a request
pub trait RawRequest {
    /// Send the response back to the client
    fn respond(self: Box<Self>, response: Response);
}

impl Request {
    /// Create a new request from a [`RawRequest`]
    ///
    /// The transport must have checked `seats` against
    /// [`MAX_SEATS`](crate::MAX_SEATS) already.
    #[inline]
    pub fn from_raw(show: impl Into<String>, seats: u8, raw: Box<dyn RawRequest + Send>) -> Self {
        debug_assert!(seats <= crate::MAX_SEATS);
        Self {
            show: show.into(),
            seats,
            raw,
        }
    }

    /// The show id as sent by the client
    #[inline]
    pub fn show_id(&self) -> &str {
        &self.show
    }

    /// Number of seats requested, `0` for a consultation
    #[inline]
    pub fn seats_requested(&self) -> u8 {
        self.seats
    }

    /// Consultation or reservation
    #[inline]
    pub fn kind(&self) -> RequestKind {
        RequestKind::classify(self.seats)
    }

    /// Answer the request
    ///
    /// This method blocks until the transport has sent the response.
    #[inline]
    pub fn respond(self, response: Response) {
        self.raw.respond(response)
    }
}

/// Response to a [`Request`]
///
/// The seat value is overloaded:
/// - consultation: remaining seats
/// - granted reservation: remaining seats after the reservation
/// - refused reservation: the seats that were available, negated
///
/// A response without show id means the show does not exist. Check that
/// first, the seat value is meaningless then.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Response {
    show: Option<ShowId>,
    seats: i8,
}

/// A [`Response`] with its seat value interpreted
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reply {
    /// The show does not exist
    NotFound,
    /// Remaining seats, after the reservation if one was granted
    Seats(u8),
    /// The reservation was refused, only `available` seats were left
    Refused {
        /// Seats that could have been booked instead
        available: u8,
    },
}

impl Response {
    /// Answer to a consultation
    #[inline]
    pub fn consulted(show: ShowId, remaining: u8) -> Self {
        Self::with_value(show, remaining)
    }

    /// Answer to a granted reservation
    #[inline]
    pub fn reserved(show: ShowId, remaining: u8) -> Self {
        Self::with_value(show, remaining)
    }

    /// Answer to a refused reservation
    #[inline]
    pub fn refused(show: ShowId, available: u8) -> Self {
        let mut response = Self::with_value(show, available);
        response.seats = -response.seats;
        response
    }

    /// Answer for an unknown show
    #[inline]
    pub fn not_found() -> Self {
        Self {
            show: None,
            seats: 0,
        }
    }

    /// Build a response from its raw parts, e.g. after decoding
    #[inline]
    pub fn from_parts(show: Option<ShowId>, seats: i8) -> Self {
        match show {
            Some(show) => Self {
                show: Some(show),
                seats,
            },
            None => Self::not_found(),
        }
    }

    fn with_value(show: ShowId, seats: u8) -> Self {
        Self {
            show: Some(show),
            // seat counts never exceed MAX_SEATS
            seats: i8::try_from(seats).unwrap_or(i8::MAX),
        }
    }

    /// The show the response is about, [`None`] if it does not exist
    #[inline]
    pub fn show_id(&self) -> Option<ShowId> {
        self.show
    }

    /// The raw, signed seat value
    #[inline]
    pub fn seats_value(&self) -> i8 {
        self.seats
    }

    /// Whether the requested show does not exist
    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.show.is_none()
    }

    /// Interpret the seat value
    pub fn reply(&self) -> Reply {
        match (self.show, self.seats) {
            (None, _) => Reply::NotFound,
            (Some(_), n) if n < 0 => Reply::Refused {
                available: n.unsigned_abs(),
            },
            (Some(_), n) => Reply::Seats(n.unsigned_abs()),
        }
    }
}
