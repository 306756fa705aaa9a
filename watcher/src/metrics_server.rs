//! Prometheus scrape endpoint (§6: "HTTP server bound to `0.0.0.0:8000`, started on the first
//! processed (non-negative) slot"). Q3: unavailable during the pre-genesis countdown by design.

use std::sync::Arc;

use warp::Filter;

use metrics::MetricsRegistry;

pub fn spawn(registry: Arc<MetricsRegistry>) {
    let route = warp::path("metrics").map(move || {
        warp::reply::with_header(registry.encode(), "content-type", "text/plain; version=0.0.4")
    });
    tokio::spawn(warp::serve(route).run(([0, 0, 0, 0], 8000)));
}
