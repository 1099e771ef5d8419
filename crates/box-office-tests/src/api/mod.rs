use std::sync::Arc;

use box_office_core::{Reply, Response, ShowId, MAX_SEATS};
use eyre::{eyre, Result};
use flume::Sender;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

pub mod mock;

/// The box office answered in a way no client can make sense of
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("asked about {asked:?}, got an answer about {answered}")]
    WrongShow { asked: String, answered: ShowId },
    #[error("a consultation was answered with the negative value {0}")]
    NegativeConsultation(i8),
}

/// Answer to a consultation
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Consultation {
    NotFound,
    Seats(u8),
}

/// Answer to a reservation
///
/// A seat value of zero means either that the reservation took the last
/// seats or that it was refused with nothing left, the wire format does
/// not tell the two apart.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Booking {
    NotFound,
    Reserved { remaining: u8 },
    Refused { available: u8 },
    NoneLeft,
}

impl Booking {
    pub fn reserved(&self) -> Result<u8> {
        match self {
            Booking::Reserved { remaining } => Ok(*remaining),
            other => Err(eyre!("Reservation failed when it shall have succeeded: {other:?}")),
        }
    }
}

struct RequestMsg {
    show: String,
    seats: u8,
    response_channel: oneshot::Sender<Response>,
}

pub struct Api {
    /// One channel per dispatch thread
    channels: Arc<Vec<Sender<RequestMsg>>>,

    my_channel: Sender<RequestMsg>,
    my_index: usize,
}

impl Api {
    fn new(channels: Vec<Sender<RequestMsg>>) -> Self {
        let my_channel = channels[0].clone();
        Self {
            channels: Arc::new(channels),
            my_channel,
            my_index: 0,
        }
    }
}

impl Clone for Api {
    fn clone(&self) -> Self {
        let my_index = (self.my_index + 1) % self.channels.len();
        Self {
            channels: self.channels.clone(),
            my_channel: self.channels[my_index].clone(),
            my_index,
        }
    }
}

impl Api {
    /// Send a raw request, `seats == 0` being a consultation
    pub async fn request(&self, show: &str, seats: u8) -> Result<Response> {
        if seats > MAX_SEATS {
            return Err(eyre!("a transport never forwards {seats} seats"));
        }
        let (sender, receiver) = oneshot::channel();
        let msg = RequestMsg {
            show: show.into(),
            seats,
            response_channel: sender,
        };
        self.my_channel.send_async(msg).await?;
        let response = receiver.await?;
        debug!(show, seats, ?response, "answered");

        match response.show_id() {
            Some(answered) if answered != *show => Err(ApiError::WrongShow {
                asked: show.into(),
                answered,
            }
            .into()),
            _ => Ok(response),
        }
    }

    pub async fn consult(&self, show: &str) -> Result<Consultation> {
        Ok(match self.request(show, 0).await?.reply() {
            Reply::NotFound => Consultation::NotFound,
            Reply::Seats(seats) => Consultation::Seats(seats),
            Reply::Refused { available } => {
                return Err(ApiError::NegativeConsultation(-(available as i8)).into())
            }
        })
    }

    pub async fn reserve(&self, show: &str, seats: u8) -> Result<Booking> {
        if seats == 0 {
            return Err(eyre!("reserving zero seats is a consultation"));
        }
        Ok(match self.request(show, seats).await?.reply() {
            Reply::NotFound => Booking::NotFound,
            Reply::Seats(0) => Booking::NoneLeft,
            Reply::Seats(remaining) => Booking::Reserved { remaining },
            Reply::Refused { available } => Booking::Refused { available },
        })
    }
}
