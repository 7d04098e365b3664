use docparse::{api, config, logging, processing};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();
    let app = api::create_router(Arc::new(processing::ProcessingService::new().await));

    let (listener, port) = bind_listener().await.expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.unwrap();
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let port = config::get_config().server_port;
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    // Port 0 asks the OS for a free port; report the one actually bound.
    let bound = listener.local_addr()?.port();
    tracing::debug!(port = bound, "Bound server port");
    Ok((listener, bound))
}
