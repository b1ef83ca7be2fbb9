//! Development server with live reload support.
//!
//! The HTTP server reads through the merged filesystem on every request,
//! so rebuilt resources are served as soon as the pipeline writes them.

mod content;
mod data;
mod handler;
mod lifecycle;
mod path;
mod response;

use crate::{config::DevConfig, core::register_server, log};
use anyhow::{Context, Result};
use handler::Handler;
use std::sync::Arc;
use tiny_http::{Request, Server};

/// Request pool size.
const REQUEST_THREADS: usize = 4;

/// Serve until Ctrl+C.
pub fn serve(config: &DevConfig) -> Result<()> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    let ctx = lifecycle::start(config)?;
    log!("serve"; "http://{}", addr);

    run_request_loop(&server, &ctx.handler())?;
    lifecycle::shutdown(ctx);
    Ok(())
}

/// Dispatch requests to a thread pool until the server is unblocked.
fn run_request_loop(server: &Server, handler: &Handler) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .thread_name(|i| format!("http-{i}"))
        .build()
        .context("failed to create the request pool")?;

    for request in server.incoming_requests() {
        let handler = handler.clone();
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &handler) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, handler: &Handler) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }
    crate::debug!("serve"; "{} {}", request.method(), request.url());
    handler.handle(request)
}
