//! TCP management interface.
//!
//! Line based commands: `stats` prints uptime and the backend status
//! fields, `health` prints the health state, `quit` closes the connection.

use std::sync::Arc;

use error_stack::Report;
use error_stack::ResultExt;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::error::DaemonError;
use crate::status::ExportStatus;

pub struct ManagementServer {
    status: Arc<ExportStatus>,
    startup_time: i64,
}

impl ManagementServer {
    pub fn new(status: Arc<ExportStatus>, startup_time: i64) -> Self {
        Self {
            status,
            startup_time,
        }
    }

    /// Render the response to one command; `None` closes the connection.
    pub fn respond(&self, command: &str, now: i64) -> Option<String> {
        let response = match command.trim() {
            "stats" => {
                let mut out = format!("uptime: {}\n", now - self.startup_time);
                self.status.report(|namespace, field, value| {
                    out.push_str(&format!("{namespace}.{field}: {value}\n"));
                });
                out.push_str("END\n\n");
                out
            }
            "health" => "health: up\n".to_string(),
            "quit" => return None,
            "help" | "" => "Commands: stats, health, quit\n\n".to_string(),
            other => format!("ERROR: unknown command `{other}`\n"),
        };
        Some(response)
    }

    pub async fn run(
        self: Arc<Self>,
        listen_addr: &str,
        token: CancellationToken,
    ) -> Result<(), Report<DaemonError>> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .change_context(DaemonError::Bind {
                what: "management",
                addr: listen_addr.to_string(),
            })?;
        tracing::info!("Management interface listening on {listen_addr}");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let server = self.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.serve(stream).await {
                                tracing::debug!(%peer, error = %e, "management connection closed");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to accept management connection"),
                },
            }
        }
        Ok(())
    }

    async fn serve(&self, stream: TcpStream) -> std::io::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            if !self.write_response(&line, &mut writer).await? {
                break;
            }
        }
        Ok(())
    }

    async fn write_response<W: AsyncWrite + Unpin>(
        &self,
        command: &str,
        writer: &mut W,
    ) -> std::io::Result<bool> {
        let now = chrono::Utc::now().timestamp();
        match self.respond(command, now) {
            Some(response) => {
                writer.write_all(response.as_bytes()).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
