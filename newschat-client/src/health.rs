//! Backend health monitoring
//!
//! The backend may take tens of seconds to wake from a cold start, so the
//! monitor keeps pinging and publishes readiness over a watch channel. The
//! first successful ping flips it to ready; later failures flip it back so
//! presentation layers can show an outage banner.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::backend::BackendClient;

/// Polls the backend health endpoint on a background task
pub struct HealthMonitor {
    rx: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start polling at the given interval
    pub fn start(client: BackendClient, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                let ready = match client.ping().await {
                    Ok(()) => true,
                    Err(e) => {
                        debug!("Backend not ready: {}", e);
                        false
                    }
                };
                if tx.send(ready).is_err() {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        });

        Self { rx, task }
    }

    /// Subscribe to readiness updates
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Whether the last ping succeeded
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Stop polling
    pub fn stop(&self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_monitor_reports_ready_backend() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), Duration::from_secs(5));
        let monitor = HealthMonitor::start(client, Duration::from_millis(50));

        let mut rx = monitor.subscribe();
        // The first poll happens immediately
        while !*rx.borrow() {
            rx.changed().await.unwrap();
        }
        assert!(monitor.is_ready());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_monitor_reports_failing_backend() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(503)
            .with_body("down")
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), Duration::from_secs(5));
        let monitor = HealthMonitor::start(client, Duration::from_millis(50));

        let mut rx = monitor.subscribe();
        // Wait for the first poll result; it must still be not-ready
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
        monitor.stop();
    }
}
