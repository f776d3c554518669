//! Liveness and readiness probes on a dedicated listener.
//!
//! `/live` answers as long as the process runs. `/health` and `/ready`
//! follow the readiness flag, which is raised once the main listener is
//! bound and lowered again when shutdown starts.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::sync::watch;

/// Readiness flag shared between the server and the probe listener.
pub struct Readiness {
    tx: watch::Sender<bool>,
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

impl Readiness {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn set_ready(&self) {
        self.tx.send_replace(true);
    }

    pub fn set_not_ready(&self) {
        self.tx.send_replace(false);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Router of the probe listener.
#[must_use]
pub fn router(readiness: &Readiness) -> Router {
    Router::new()
        .route("/live", get(|| async { "OK" }))
        .route(
            "/health",
            get(|State(ready): State<watch::Receiver<bool>>| async move { status(&ready) }),
        )
        .route(
            "/ready",
            get(|State(ready): State<watch::Receiver<bool>>| async move { status(&ready) }),
        )
        .with_state(readiness.subscribe())
}

fn status(ready: &watch::Receiver<bool>) -> (StatusCode, &'static str) {
    if *ready.borrow() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}
