use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app::core::Application;
use crate::flush;
use crate::listener;

/// Task manager, responsible for starting and managing all background tasks
pub struct Tasks {
    pub tasks: Vec<JoinHandle<()>>,
    cancellation_token: CancellationToken,
}

impl Default for Tasks {
    fn default() -> Self {
        Self::new()
    }
}

impl Tasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start all background tasks
    pub fn spawn_all_tasks(&mut self, app: &Application) {
        let listener_task = self.spawn_listener_task(app);
        self.tasks.push(listener_task);

        let flush_task = self.spawn_flush_task(app);
        self.tasks.push(flush_task);

        let management_task = self.spawn_management_task(app);
        self.tasks.push(management_task);
    }

    /// wait for tasks to complete or receive shutdown signal
    pub async fn wait_for_completion(&mut self) -> Result<()> {
        let signal_handler = {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                let mut sigint = signal(SignalKind::interrupt())?;

                tokio::spawn(async move {
                    tokio::select! {
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, initiating graceful shutdown");
                        }
                        _ = sigint.recv() => {
                            tracing::info!("Received SIGINT, initiating graceful shutdown");
                        }
                    }
                })
            }
            #[cfg(not(unix))]
            {
                tokio::spawn(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl+C: {e}");
                    }
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                })
            }
        };

        tokio::select! {
            _ = signal_handler => {
                tracing::info!("Shutdown signal received, cancelling all tasks");
                self.cancellation_token.cancel();
                self.wait_for_tasks_with_timeout(Duration::from_secs(10)).await;
            }
            // Wait for any task to complete unexpectedly
            result = futures::future::select_all(&mut self.tasks) => {
                let (result, _index, _remaining) = result;
                self.cancellation_token.cancel();
                if let Err(e) = result {
                    tracing::error!("Task completed with error: {e}");
                    return Err(e.into());
                }
                tracing::warn!("Task completed unexpectedly");
                anyhow::bail!("background task exited unexpectedly");
            }
        }

        Ok(())
    }

    async fn wait_for_tasks_with_timeout(&mut self, timeout: Duration) {
        tokio::time::timeout(timeout, async {
            for task in &mut self.tasks {
                if let Err(e) = task.await {
                    tracing::error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            tracing::warn!("Task shutdown timed out after {:?}", timeout);
        });
    }

    fn spawn_listener_task(&self, app: &Application) -> JoinHandle<()> {
        let listen_addr = app.daemon_args().listen_addr.clone();
        let store = app.services().store.clone();
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tracing::info!("Starting statsd listener task");
            if let Err(e) = listener::run_statsd_listener(&listen_addr, store, token).await {
                tracing::error!("statsd listener failed: {e:?}");
            } else {
                tracing::info!("statsd listener task completed");
            }
        })
    }

    fn spawn_flush_task(&self, app: &Application) -> JoinHandle<()> {
        let store = app.services().store.clone();
        let exporter = app.services().exporter.clone();
        let settings = app.services().flush_settings.clone();
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tracing::info!(
                interval_ms = settings.flush_interval_ms,
                "Starting flush task"
            );
            flush::run_flush_loop(store, exporter, settings, token).await;
            tracing::info!("Flush task completed");
        })
    }

    fn spawn_management_task(&self, app: &Application) -> JoinHandle<()> {
        let mgmt_addr = app.daemon_args().mgmt_addr.clone();
        let management = app.services().management.clone();
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tracing::info!("Starting management interface task");
            if let Err(e) = management.run(&mgmt_addr, token).await {
                tracing::error!("Management interface failed: {e:?}");
            } else {
                tracing::info!("Management interface task completed");
            }
        })
    }
}
