//! infodex-server - an in-memory development engine for infodex
//!
//! Serves the subset of the Elasticsearch REST API the `infodex-rs` access
//! layer speaks, so the client can be run and tested without a cluster.
//!
//! # Embedded Usage
//!
//! ```rust,no_run
//! use actix_web::web;
//! use infodex_server::{bind, AppState};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let state = web::Data::new(AppState::new(Default::default()));
//!     let (server, addr) = bind(state, "127.0.0.1:0", 1)?;
//!     println!("engine listening on {addr}");
//!     server.await
//! }
//! ```
//!
//! # Server Usage
//!
//! Run the binary to start the engine on the configured port:
//! ```bash
//! infodex-server
//! ```

use std::io;
use std::net::SocketAddr;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;

pub use infodex_core;

pub mod api;
pub mod dsl;
pub mod engine;
pub mod telemetry;

pub use api::{configure, AppState};
pub use engine::MemoryEngine;

/// Bind the engine's HTTP server, returning it unstarted with its local address
///
/// Binding to port 0 picks a free port; the returned address carries it.
pub fn bind(
    state: web::Data<AppState>,
    addr: &str,
    workers: usize,
) -> io::Result<(Server, SocketAddr)> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .workers(workers.max(1))
    .bind(addr)?;

    let local = server
        .addrs()
        .first()
        .copied()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no address bound"))?;

    Ok((server.run(), local))
}
