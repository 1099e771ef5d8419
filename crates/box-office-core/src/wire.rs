//! 8-byte binary frame used by the TCP transport
//!
//! Layout, for requests and responses alike:
//!
//! ```text
//! +---------------------------+------+
//! | show id (6 bytes) + NUL   | seat |
//! +---------------------------+------+
//!   0                       6   7
//! ```
//!
//! Ids shorter than six bytes are NUL-padded. The seat byte is signed: a
//! request carries `0..=127`, a response `-127..=127`. A response with an
//! empty id (all zeros) means "show not found".

use crate::{Error, Response, ShowId, MAX_SEATS, SHOW_ID_LEN};

/// Size of every frame
pub const FRAME_LEN: usize = SHOW_ID_LEN + 2;

/// Encode a request for `show`, `seats == 0` being a consultation
pub fn encode_request(show: &str, seats: u8) -> Result<[u8; FRAME_LEN], Error> {
    if show.len() > SHOW_ID_LEN || show.as_bytes().contains(&0) {
        return Err(Error::InvalidShowId(show.into()));
    }
    if seats > MAX_SEATS {
        return Err(Error::TooManySeats(seats.into()));
    }
    let mut frame = [0; FRAME_LEN];
    frame[..show.len()].copy_from_slice(show.as_bytes());
    frame[FRAME_LEN - 1] = seats;
    Ok(frame)
}

/// Decode a request frame into the raw show id and the requested seats
///
/// The id is not validated, an unknown id is the router's business.
pub fn decode_request(frame: &[u8]) -> Result<(String, u8), Error> {
    let (id, seats) = split(frame)?;
    let seats = seats as i8;
    if seats < 0 {
        return Err(Error::NegativeSeats(seats));
    }
    Ok((String::from_utf8_lossy(id).into_owned(), seats.unsigned_abs()))
}

/// Encode a response, not-found becoming an all-zero frame
pub fn encode_response(response: &Response) -> [u8; FRAME_LEN] {
    let mut frame = [0; FRAME_LEN];
    if let Some(show) = response.show_id() {
        frame[..SHOW_ID_LEN].copy_from_slice(show.as_bytes());
        frame[FRAME_LEN - 1] = response.seats_value() as u8;
    }
    frame
}

/// Decode a response frame
pub fn decode_response(frame: &[u8]) -> Result<Response, Error> {
    let (id, seats) = split(frame)?;
    if id.is_empty() {
        return Ok(Response::not_found());
    }
    let id = std::str::from_utf8(id).map_err(|_| Error::InvalidShowId(format!("{id:?}")))?;
    Ok(Response::from_parts(Some(ShowId::new(id)?), seats as i8))
}

/// Split a frame into the id bytes before the first NUL and the seat byte
fn split(frame: &[u8]) -> Result<(&[u8], u8), Error> {
    let frame: &[u8; FRAME_LEN] = frame.try_into().map_err(|_| Error::FrameLength {
        expected: FRAME_LEN,
        got: frame.len(),
    })?;
    let id_field = &frame[..SHOW_ID_LEN + 1];
    let end = id_field
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::MissingTerminator)?;
    Ok((&id_field[..end], frame[FRAME_LEN - 1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reply;

    #[test]
    fn request_layout() {
        let frame = encode_request("NSY103", 15).unwrap();
        assert_eq!(&frame, b"NSY103\0\x0f");
        assert_eq!(decode_request(&frame).unwrap(), ("NSY103".into(), 15));
    }

    #[test]
    fn short_ids_are_padded() {
        let frame = encode_request("ZZ", 0).unwrap();
        assert_eq!(&frame, b"ZZ\0\0\0\0\0\0");
        assert_eq!(decode_request(&frame).unwrap(), ("ZZ".into(), 0));
    }

    #[test]
    fn refused_response_carries_negative_byte() {
        let show = ShowId::new("NSY103").unwrap();
        let frame = encode_response(&Response::refused(show, 5));
        assert_eq!(frame[FRAME_LEN - 1] as i8, -5);
        let decoded = decode_response(&frame).unwrap();
        assert_eq!(decoded.show_id(), Some(show));
        assert_eq!(decoded.reply(), Reply::Refused { available: 5 });
    }

    #[test]
    fn not_found_is_all_zeros() {
        let frame = encode_response(&Response::not_found());
        assert_eq!(frame, [0; FRAME_LEN]);
        assert!(decode_response(&frame).unwrap().is_not_found());
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert_eq!(
            decode_request(b"NSY103\0"),
            Err(Error::FrameLength {
                expected: FRAME_LEN,
                got: 7
            })
        );
        assert_eq!(
            decode_request(b"NSY1034\x01"),
            Err(Error::MissingTerminator)
        );
        assert_eq!(decode_request(b"NSY103\0\xff"), Err(Error::NegativeSeats(-1)));
        assert_eq!(
            encode_request("NSY103", 128),
            Err(Error::TooManySeats(128))
        );
        assert!(encode_request("NSY1034", 1).is_err());
    }
}
