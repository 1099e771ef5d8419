//! Binary TCP transport
//!
//! One request frame per connection, answered with one response frame, see
//! [`box_office_core::wire`].

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use box_office_core::wire::{self, FRAME_LEN};
use box_office_core::{RawRequest, Request, RequestHandler, Response};
use eyre::Result;
use tracing::{debug, error, warn};

/// How long a client may take to send its frame
const READ_TIMEOUT: Duration = Duration::from_secs(5);

struct TcpRequest(TcpStream);

impl RawRequest for TcpRequest {
    fn respond(self: Box<Self>, response: Response) {
        let mut stream = self.0;
        if let Err(err) = stream.write_all(&wire::encode_response(&response)) {
            warn!(%err, "TCP response failed");
        }
    }
}

/// Accept connections until `stopping` is set and the listener woken, or
/// accepting fails
///
/// Each connection gets its own reader thread, so a slow client only delays
/// itself.
pub fn serve<H: RequestHandler + Sync>(listener: &TcpListener, handler: &H, stopping: &AtomicBool) {
    thread::scope(|s| loop {
        let (stream, peer) = match listener.accept() {
            Ok(conn) => conn,
            Err(err) => {
                error!(%err, "TCP accept failed");
                return;
            }
        };
        if stopping.load(Ordering::SeqCst) {
            debug!("TCP listener stopping");
            return;
        }
        let spawned = thread::Builder::new()
            .name(format!("tcp_{peer}"))
            .spawn_scoped(s, move || receive(stream, peer, handler));
        if let Err(err) = spawned {
            warn!(%peer, %err, "cannot spawn TCP reader");
        }
    })
}

/// Wake a listener blocked in [`serve`] so that it notices `stopping`
pub fn wake(listener: &TcpListener) {
    if let Err(err) = listener.local_addr().and_then(TcpStream::connect) {
        warn!(%err, "cannot wake the TCP listener");
    }
}

fn receive<H: RequestHandler>(mut stream: TcpStream, peer: SocketAddr, handler: &H) {
    match read_request(&mut stream) {
        Ok((show, seats)) => {
            debug!(%peer, show = %show, seats, "frame received");
            handler.handle(Request::from_raw(show, seats, Box::new(TcpRequest(stream))));
        }
        // never hand a half-decoded request to the handler
        Err(err) => warn!(%peer, %err, "dropping malformed frame"),
    }
}

fn read_request(stream: &mut TcpStream) -> Result<(String, u8)> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut frame = [0; FRAME_LEN];
    stream.read_exact(&mut frame)?;
    Ok(wire::decode_request(&frame)?)
}
