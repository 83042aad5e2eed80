//! Server Implementation
//!
//! HTTP server startup and background task supervision.

use crate::core::{BackgroundTasks, Config, ServerState, TaskKind};
use crate::orders::payment_expiry;
use std::time::Duration;

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (tests, embedded use)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        let mut tasks = BackgroundTasks::new();
        self.spawn_payment_sweep(&mut tasks, state.clone());

        let app = crate::api::app(state);

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("Storefront server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
            })
            .await?;

        tasks.shutdown().await;

        Ok(())
    }

    /// Periodic sweep expiring unpaid STRIPE/MOMO orders
    fn spawn_payment_sweep(&self, tasks: &mut BackgroundTasks, state: ServerState) {
        let token = tasks.shutdown_token();
        let interval_secs = self.config.payment_sweep_interval_secs;

        tasks.spawn("payment_expiry_sweep", TaskKind::Periodic, async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // First tick fires immediately; skip straight to the cadence.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let now = shared::util::now_millis();
                        match payment_expiry::sweep(&state.pool, &state.config, now).await {
                            Ok(0) => {}
                            Ok(n) => tracing::info!(expired = n, "Payment expiry sweep cancelled unpaid orders"),
                            Err(e) => tracing::error!(error = %e, "Payment expiry sweep failed"),
                        }
                    }
                }
            }
        });
    }
}
