//! tollgate engine binary.
//!
//! Loads the strict YAML config, wires the admission stack (demo ledger,
//! guard chain, rate limiter), and serves the HTTP operations surface.

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use tollgate_engine::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = config::load_from_file("tollgate.yaml").expect("config load failed");
    let listen: SocketAddr = cfg
        .service
        .listen
        .parse()
        .expect("service.listen must be a valid SocketAddr");

    let state = app_state::AppState::new(cfg).expect("state build failed");
    let app = router::build_router(state);

    tracing::info!(%listen, "tollgate-engine starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .expect("failed to bind");

    axum::serve(listener, app).await.expect("server failed");
}
