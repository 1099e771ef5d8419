//! Server implementation

#![warn(missing_docs)]

mod catalog;
mod http;
mod signal;
pub mod slug;
mod tcp;

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use box_office_core::{Config, RequestHandler};
use eyre::{eyre, Result, WrapErr};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::CatalogFile;

/// Command line options
#[derive(Debug)]
struct Opts {
    /// Configuration of the box office
    config: Config,

    /// Port for the HTTP server to listen on
    port: u16,
    /// Host for the HTTP and TCP servers to listen on
    host: String,
    /// Port for the binary TCP protocol, disabled if absent
    tcp_port: Option<u16>,
    /// Number of threads accepting HTTP requests
    http_threads: u32,

    /// Run the sequential “slug” implementation 🐌
    slug: bool,
}

impl Opts {
    fn from_args() -> Result<Self> {
        let mut opts = Opts {
            port: 8585,
            host: String::from("127.0.0.1"),
            tcp_port: None,
            config: Config::default(),
            http_threads: 16,
            slug: false,
        };
        let mut catalog: Option<PathBuf> = None;
        let mut min_seats = None;
        let mut max_seats = None;

        let mut option: Option<String> = None;
        for arg in std::env::args().skip(1) {
            if let Some(opt) = option {
                match opt.as_str() {
                    "-port" => opts.port = arg.parse().wrap_err("-port takes a decimal u16")?,
                    "-host" => opts.host = arg,
                    "-tcp-port" => {
                        opts.tcp_port = Some(arg.parse().wrap_err("-tcp-port takes a decimal u16")?)
                    }
                    "-http-threads" => {
                        opts.http_threads =
                            arg.parse().wrap_err("-http-threads takes a decimal u32")?
                    }
                    "-workers" => {
                        opts.config.workers = arg.parse().wrap_err("-workers takes a decimal u32")?
                    }
                    "-min-seats" => {
                        min_seats = Some(arg.parse().wrap_err("-min-seats takes a decimal u8")?)
                    }
                    "-max-seats" => {
                        max_seats = Some(arg.parse().wrap_err("-max-seats takes a decimal u8")?)
                    }
                    "-catalog" => catalog = Some(arg.into()),
                    _ => return Err(eyre!("unknown option {opt}")),
                }
                option = None;
            } else {
                match arg.as_str() {
                    "-slug" => opts.slug = true,
                    _ => option = Some(arg),
                }
            }
        }
        if let Some(opt) = option {
            return Err(eyre!("leftover option {opt}"));
        }

        // command line flags win over the catalog file
        if let Some(path) = catalog {
            CatalogFile::load(&path)?.apply(&mut opts.config)?;
        }
        if let Some(min) = min_seats {
            opts.config.min_seats = min;
        }
        if let Some(max) = max_seats {
            opts.config.max_seats = max;
        }
        opts.config.validate()?;
        if opts.http_threads == 0 {
            return Err(eyre!("-http-threads must be at least 1"));
        }

        Ok(opts)
    }
}

/// Abort on any panic: a panicking worker may leave the show table's
/// coordination state broken, serving on is not safe
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!(%info, "fatal error, aborting");
        default_hook(info);
        std::process::abort();
    }));
}

/// Bound HTTP and TCP sockets
struct Listeners {
    http: tiny_http::Server,
    tcp: Option<TcpListener>,
}

impl Listeners {
    fn bind(opts: &Opts) -> Result<Self> {
        let http = tiny_http::Server::http((opts.host.as_str(), opts.port))
            .map_err(|err| eyre!("cannot listen on {}:{}: {err}", opts.host, opts.port))?;
        info!(host = %opts.host, port = opts.port, "HTTP listening");

        let tcp = opts
            .tcp_port
            .map(|port| TcpListener::bind((opts.host.as_str(), port)))
            .transpose()
            .wrap_err("cannot bind the TCP port")?;
        if let Some(port) = opts.tcp_port {
            info!(host = %opts.host, port, "TCP listening");
        }
        Ok(Self { http, tcp })
    }
}

/// Serve until `stop` yields, then stop accepting, drain the handler and
/// shut it down
fn serve<H: RequestHandler + Sync>(
    listeners: Listeners,
    http_threads: u32,
    handler: H,
    stop: flume::Receiver<()>,
) -> Result<()> {
    let stopping = AtomicBool::new(false);

    let spawned = thread::scope(|s| {
        let (server, handler, stopping) = (&listeners.http, &handler, &stopping);
        let spawned = (|| {
            for i in 0..http_threads {
                thread::Builder::new()
                    .name(format!("http_{i}"))
                    .spawn_scoped(s, move || http::serve(server, handler, stopping))
                    .wrap_err("cannot spawn HTTP thread")?;
            }
            if let Some(listener) = &listeners.tcp {
                thread::Builder::new()
                    .name("tcp".into())
                    .spawn_scoped(s, move || tcp::serve(listener, handler, stopping))
                    .wrap_err("cannot spawn TCP thread")?;
            }
            Ok::<_, eyre::Report>(())
        })();

        if spawned.is_ok() {
            let _ = stop.recv();
        }
        info!("no longer accepting requests");
        stopping.store(true, Ordering::SeqCst);
        for _ in 0..http_threads {
            server.unblock();
        }
        if let Some(listener) = &listeners.tcp {
            tcp::wake(listener);
        }
        spawned
    });

    // requests already handed over are answered before this returns
    handler.shutdown();
    info!("box office closed");
    spawned
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
    install_panic_hook();

    let opts = Opts::from_args()?;

    let listeners = Listeners::bind(&opts)?;
    let (stop_tx, stop_rx) = flume::bounded(1);
    signal::notify_on_shutdown(stop_tx.clone())?;

    let served = if opts.slug {
        let slug = slug::Server::new(&opts.config)?;
        serve(listeners, opts.http_threads, slug, stop_rx)
    } else {
        let router = box_office_engine::launch(&opts.config)?;
        serve(listeners, opts.http_threads, router, stop_rx)
    };
    drop(stop_tx);
    served
}
