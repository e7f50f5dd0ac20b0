use tracing::trace;

// Counters are emitted as trace events; the Prometheus recorder installed in
// `main` only renders what the exporter itself records.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "pricesync.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn sync_computed(marketplaces: usize, pushed: bool, elapsed_us: u128) {
    trace!(
        target = "pricesync.metrics",
        marketplaces = marketplaces as u64,
        pushed = pushed,
        elapsed_us = elapsed_us as u64,
        "sync_computed"
    );
}

pub fn pricing_rejected(code: &'static str) {
    trace!(
        target = "pricesync.metrics",
        code = code,
        "pricing_rejected_inc"
    );
}
