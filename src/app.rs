//! Application struct that encapsulates server assembly and serving logic.

use crate::cli::RunArgs;
use loggate_core::config::Config;
use loggate_core::lifecycle::signal::SignalHandler;
use loggate_core::lifecycle::{self, Lifecycle};
use std::net::SocketAddr;

pub struct Application {
    addr: String,
    app_router: axum::Router,
    lifecycle: Box<dyn Lifecycle>,
}

impl Application {
    /// Apply CLI overrides to the loaded config and assemble the router.
    pub fn build(mut config: Config, args: &RunArgs) -> Self {
        if let Some(ref host) = args.host {
            config.host = host.clone();
        }
        if let Some(port) = args.port {
            config.port = port;
        }

        let addr = format!("{}:{}", config.host, config.port);
        let state = loggate_server::AppState::new(config);
        let app_router = loggate_server::build_router(state);

        Self {
            addr,
            app_router,
            lifecycle: lifecycle::detect_lifecycle(),
        }
    }

    /// Serve HTTP until a shutdown signal arrives, then drain gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let Self {
            addr,
            app_router,
            lifecycle,
        } = self;

        let (signal_handler, mut shutdown_rx) = SignalHandler::new();
        tokio::spawn(signal_handler.run());

        tracing::info!("Starting HTTP server on {addr}");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        lifecycle.on_ready();

        let shutdown = async move {
            let _ = shutdown_rx.wait_for(|v| *v).await;
        };

        // Connection info supplies the client address for the user logging layer.
        axum::serve(
            listener,
            app_router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        lifecycle.on_stopping();
        tracing::info!("Server shut down.");
        Ok(())
    }
}
