use std::sync::Arc;
use std::sync::Mutex;

use error_stack::Report;
use error_stack::ResultExt;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::error::DaemonError;
use crate::store::MetricStore;

const MAX_PACKET_SIZE: usize = 65_535;

/// Receive statsd packets on `listen_addr` into `store` until cancelled.
pub async fn run_statsd_listener(
    listen_addr: &str,
    store: Arc<Mutex<MetricStore>>,
    token: CancellationToken,
) -> Result<(), Report<DaemonError>> {
    let socket = UdpSocket::bind(listen_addr)
        .await
        .change_context(DaemonError::Bind {
            what: "statsd",
            addr: listen_addr.to_string(),
        })?;
    tracing::info!("statsd listener bound to {listen_addr}");

    receive_packets(socket, store, token).await;
    Ok(())
}

async fn receive_packets(
    socket: UdpSocket,
    store: Arc<Mutex<MetricStore>>,
    token: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => {
                    let packet = String::from_utf8_lossy(&buf[..len]);
                    let bad_lines = store.lock().expect("poisoned").ingest_packet(&packet);
                    if bad_lines > 0 {
                        tracing::debug!(%peer, bad_lines, "rejected statsd lines");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to receive statsd packet"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;

    #[test(tokio::test)]
    async fn packets_land_in_store() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind listener");
        let addr = socket.local_addr().expect("local addr");
        let store = Arc::new(Mutex::new(MetricStore::new()));
        let token = CancellationToken::new();

        let handle = tokio::spawn(receive_packets(socket, store.clone(), token.clone()));

        let client = UdpSocket::bind("127.0.0.1:0").await.expect("bind client");
        client
            .send_to(b"hits:3|c\nlat:12|ms", addr)
            .await
            .expect("send");

        let mut snapshot = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let snap = store.lock().expect("poisoned").take_snapshot(&[], 1000);
            if snap.counters.get("hits").copied().unwrap_or_default() > 0.0 {
                snapshot = Some(snap);
                break;
            }
        }
        token.cancel();
        handle.await.expect("listener joins");

        let snapshot = snapshot.expect("packet received");
        assert_eq!(snapshot.counters["hits"], 3.0);
        assert_eq!(snapshot.timers["lat"], vec![12.0]);
    }

    #[test(tokio::test)]
    async fn bind_failure_is_reported() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let addr = taken.local_addr().expect("local addr").to_string();

        let err = run_statsd_listener(
            &addr,
            Arc::new(Mutex::new(MetricStore::new())),
            CancellationToken::new(),
        )
        .await
        .expect_err("address in use");
        assert!(matches!(err.current_context(), DaemonError::Bind { .. }));
    }
}
