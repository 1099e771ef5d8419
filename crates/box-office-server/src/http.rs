//! 🏗 HTTP transport
//!
//! ```text
//! GET  /api/shows                 every show with its remaining seats
//! GET  /api/shows/<id>            remaining seats of one show
//! POST /api/shows/<id>/reserve    reserve the number of seats in the body
//! ```
//!
//! Answers carry the show id in `X-Show-Id` and the signed seat value as
//! body. An unknown show is answered with status 404 and an empty
//! `X-Show-Id`.

use std::fmt::Write as _;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

use box_office_core::{RawRequest, Request, RequestHandler, Response, MAX_SEATS};
use tiny_http::{Header, Method};
use tracing::{debug, error, warn};
use uuid::Uuid;

const USAGE: &str = "🦀 could not find the service you are looking for!

Valid requests are:
  GET  /api/shows
  GET  /api/shows/<id>
  POST /api/shows/<id>/reserve";

/// Longest body accepted for a seat count
const MAX_BODY: usize = 8;

/// Longest declared body a request may be dropped with
///
/// tiny_http drains unread bodies on drop into a buffer of the remaining
/// declared length.
const MAX_DRAIN: usize = 64 * 1024;

struct HTTPRequest {
    rq: tiny_http::Request,
    id: Uuid,
}

impl RawRequest for HTTPRequest {
    fn respond(self: Box<Self>, response: Response) {
        let HTTPRequest { rq, id } = *self;
        let (status, body) = match response.show_id() {
            Some(_) => (200, response.seats_value().to_string()),
            None => (404, String::from("show not found")),
        };
        let show = response.show_id();
        let show = show.as_ref().map_or("", |id| id.as_str());
        debug!(request = %id, show, status, "responding");

        let mut res = tiny_http::Response::from_string(body).with_status_code(status);
        res.add_header(header("X-Show-Id", show));
        send(rq, res, id);
    }
}

/// What a parsed HTTP request asks for
enum Parsed {
    /// A consultation or reservation for the request handler
    Request(Request),
    /// The list of all shows
    Listing(tiny_http::Request, Uuid),
}

/// Serve HTTP requests until `stopping` is set and the thread unblocked, or
/// receiving fails
pub fn serve<H: RequestHandler>(server: &tiny_http::Server, handler: &H, stopping: &AtomicBool) {
    loop {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(_) if stopping.load(Ordering::SeqCst) => {
                debug!("HTTP thread stopping");
                return;
            }
            Err(err) => {
                error!(%err, "HTTP receive failed");
                return;
            }
        };
        match parse(rq) {
            Some(Parsed::Request(rq)) => handler.handle(rq),
            Some(Parsed::Listing(rq, id)) => {
                let mut body = String::new();
                for (show, seats) in handler.shows() {
                    let _ = writeln!(body, "{show} {seats}");
                }
                send(rq, tiny_http::Response::from_string(body), id);
            }
            None => {}
        }
    }
}

/// Parse the given HTTP request
///
/// If [`None`] is returned, the request was already answered with a
/// corresponding error message, or abandoned.
fn parse(mut rq: tiny_http::Request) -> Option<Parsed> {
    let id = rq
        .headers()
        .iter()
        .find(|hdr| hdr.field.equiv("x-request-id"))
        .and_then(|hdr| Uuid::parse_str(hdr.value.as_str()).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = rq.method().clone();
    let url = rq.url().split('?').next().unwrap_or_default().to_owned();
    let target = url.strip_prefix("/api/shows/");
    let reserve_target = target.and_then(|rest| rest.strip_suffix("/reserve"));

    if let Some(len) = rq.body_length().filter(|&len| len > MAX_DRAIN) {
        warn!(request = %id, len, "abandoning request with oversized body");
        // never answered: answering drops the request
        std::mem::forget(rq);
        return None;
    }

    let (show, seats) = match (&method, target, reserve_target) {
        (Method::Options, _, _) => {
            send(rq, tiny_http::Response::empty(204), id);
            return None;
        }
        (Method::Get, _, _) if url == "/api/shows" => return Some(Parsed::Listing(rq, id)),
        (Method::Get, Some(show), _) => (show.to_owned(), 0),
        (Method::Post, _, Some(show)) => match read_seats(&mut rq) {
            Some(seats) => (show.to_owned(), seats),
            None => {
                warn!(request = %id, show, "invalid seat count");
                let msg = format!("seat count must be a decimal between 1 and {MAX_SEATS}");
                send(
                    rq,
                    tiny_http::Response::from_string(msg).with_status_code(400),
                    id,
                );
                return None;
            }
        },
        (Method::Get, _, _) | (Method::Post, _, _) => {
            send(
                rq,
                tiny_http::Response::from_string(USAGE).with_status_code(404),
                id,
            );
            return None;
        }
        _ => {
            send(rq, tiny_http::Response::empty(405), id);
            return None;
        }
    };

    debug!(request = %id, show = %show, seats, "request received");
    Some(Parsed::Request(Request::from_raw(
        show,
        seats,
        Box::new(HTTPRequest { rq, id }),
    )))
}

/// Read the body as number of seats to reserve, `1..=MAX_SEATS`
fn read_seats(rq: &mut tiny_http::Request) -> Option<u8> {
    if rq.body_length().is_some_and(|len| len > MAX_BODY) {
        return None;
    }
    let mut body = Vec::with_capacity(MAX_BODY);
    rq.as_reader()
        .take(MAX_BODY as u64 + 1)
        .read_to_end(&mut body)
        .ok()?;
    if body.len() > MAX_BODY {
        return None;
    }
    let seats: u8 = std::str::from_utf8(&body).ok()?.trim().parse().ok()?;
    (1..=MAX_SEATS).contains(&seats).then_some(seats)
}

/// Add CORS and request id headers to `res` and send it
fn send<R: Read>(rq: tiny_http::Request, mut res: tiny_http::Response<R>, id: Uuid) {
    res.add_header(header("Access-Control-Request-Method", "*"));
    res.add_header(header("Access-Control-Allow-Origin", "*"));
    res.add_header(header("Access-Control-Allow-Headers", "*"));
    res.add_header(header("Access-Control-Expose-Headers", "*"));
    res.add_header(header("X-Request-Id", &id.hyphenated().to_string()));
    if let Err(err) = rq.respond(res) {
        warn!(request = %id, %err, "HTTP response failed");
    }
}

fn header(field: &str, value: &str) -> Header {
    Header::from_bytes(field.as_bytes(), value.as_bytes())
        .unwrap_or_else(|()| unreachable!("static header field {field} is valid"))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::sync::Arc;
    use std::thread;

    use box_office_core::ShowId;
    use box_office_engine::{Router, ShowTable};

    use super::*;

    /// A parsed HTTP answer
    pub(crate) struct Answer {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl Answer {
        pub fn header(&self, field: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(f, _)| f.eq_ignore_ascii_case(field))
                .map(|(_, value)| value.as_str())
        }
    }

    /// Send one request on a fresh connection and read the answer
    pub(crate) fn call(addr: SocketAddr, method: &str, path: &str, body: &str) -> Answer {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        read_answer(stream)
    }

    fn read_answer(stream: TcpStream) -> Answer {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let status = line.split_whitespace().nth(1).unwrap().parse().unwrap();

        let mut headers = Vec::new();
        loop {
            line.clear();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            let (field, value) = line.split_once(':').unwrap();
            headers.push((field.to_owned(), value.trim().to_owned()));
        }

        let len = headers
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case("content-length"))
            .map_or(0, |(_, value)| value.parse().unwrap());
        let mut body = vec![0; len];
        reader.read_exact(&mut body).unwrap();
        Answer {
            status,
            headers,
            body: String::from_utf8(body).unwrap(),
        }
    }

    fn start(seats: u8) -> (SocketAddr, Arc<Router>) {
        let table = ShowTable::with_seats([(ShowId::new("NSY103").unwrap(), seats)]).unwrap();
        let router = Arc::new(Router::new(Arc::new(table), 2));
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        {
            let router = router.clone();
            thread::spawn(move || serve(&server, &*router, &AtomicBool::new(false)));
        }
        (addr, router)
    }

    #[test]
    #[ntest::timeout(10_000)]
    fn reservations_answer_signed_values() {
        let (addr, _router) = start(20);

        let answer = call(addr, "POST", "/api/shows/NSY103/reserve", "15");
        assert_eq!((answer.status, answer.body.as_str()), (200, "5"));
        assert_eq!(answer.header("X-Show-Id"), Some("NSY103"));
        assert!(answer.header("X-Request-Id").is_some());

        let answer = call(addr, "POST", "/api/shows/NSY103/reserve", "10\n");
        assert_eq!((answer.status, answer.body.as_str()), (200, "-5"));

        let answer = call(addr, "GET", "/api/shows/NSY103", "");
        assert_eq!((answer.status, answer.body.as_str()), (200, "5"));
    }

    #[test]
    #[ntest::timeout(10_000)]
    fn unknown_shows_are_404_with_empty_id() {
        let (addr, _router) = start(20);

        let answer = call(addr, "GET", "/api/shows/ZZZZZZ", "");
        assert_eq!(answer.status, 404);
        assert_eq!(answer.header("X-Show-Id"), Some(""));

        let answer = call(addr, "POST", "/api/shows/ZZZZZZ/reserve", "5");
        assert_eq!(answer.status, 404);
        assert_eq!(answer.header("X-Show-Id"), Some(""));
    }

    #[test]
    #[ntest::timeout(10_000)]
    fn bad_seat_counts_never_reach_the_table() {
        let (addr, router) = start(20);

        for body in ["0", "128", "200", "-3", "abc", "", "000000005"] {
            let answer = call(addr, "POST", "/api/shows/NSY103/reserve", body);
            assert_eq!(answer.status, 400, "body {body:?}");
            assert_eq!(answer.header("X-Show-Id"), None);
        }
        assert_eq!(router.dispatch("NSY103", 0).seats_value(), 20);
    }

    #[test]
    #[ntest::timeout(10_000)]
    fn listing_shows_the_current_seats() {
        let (addr, _router) = start(20);

        call(addr, "POST", "/api/shows/NSY103/reserve", "5");
        let answer = call(addr, "GET", "/api/shows", "");
        assert_eq!((answer.status, answer.body.as_str()), (200, "NSY103 15\n"));
    }

    #[test]
    #[ntest::timeout(10_000)]
    fn huge_declared_bodies_leave_the_server_running() {
        let (addr, router) = start(20);

        let mut greedy = TcpStream::connect(addr).unwrap();
        write!(
            greedy,
            "POST /api/shows/NSY103/reserve HTTP/1.1\r\nHost: localhost\r\n\
             Content-Length: 9223372036854775000\r\n\r\n5"
        )
        .unwrap();
        let mut chunked = TcpStream::connect(addr).unwrap();
        write!(
            chunked,
            "POST /api/shows/NSY103/reserve HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
             Transfer-Encoding: chunked\r\n\r\n10\r\n0000000000000005\r\n0\r\n\r\n"
        )
        .unwrap();
        assert_eq!(read_answer(chunked).status, 400);

        let answer = call(addr, "GET", "/api/shows/NSY103", "");
        assert_eq!((answer.status, answer.body.as_str()), (200, "20"));
        assert_eq!(router.dispatch("NSY103", 0).seats_value(), 20);
        drop(greedy);
    }
}
