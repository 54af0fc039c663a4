//! Request monitoring as a single-owner actor. The counters live inside
//! one task and are touched from nowhere else; the HTTP layer talks to
//! them through a bounded message queue. Once a minute the live counters
//! are swapped into a "last completed minute" snapshot, which is what the
//! monitoring endpoint always reports; a partial minute is never exposed.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// How long a snapshot request may wait for the actor before the HTTP
/// boundary reports an internal error.
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(3);
const SWAP_INTERVAL: Duration = Duration::from_secs(60);
const QUEUE_DEPTH: usize = 32;

/// Timing and status of one finished HTTP response.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub method: String,
    pub uri: String,
    pub status: u16,
    pub elapsed: Duration,
    pub user_agent: Option<String>,
}

/// The last completed minute's counters. Field names and the nanosecond
/// `ResponseTimeSum` are the published wire format of the monitoring
/// endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorSummary {
    #[serde(rename = "ResponseCount")]
    pub response_count: u64,
    #[serde(rename = "ResponseTimeSum")]
    pub response_time_sum_ns: u64,
    #[serde(rename = "ResponseCodeOkCount")]
    pub response_code_ok_count: u64,
    #[serde(rename = "ResponseCodeNgCount")]
    pub response_code_ng_count: u64,
}

impl MonitorSummary {
    fn observe(&mut self, info: &ResponseInfo) {
        self.response_count += 1;
        self.response_time_sum_ns += u64::try_from(info.elapsed.as_nanos()).unwrap_or(u64::MAX);
        if info.status < 400 {
            self.response_code_ok_count += 1;
        } else {
            self.response_code_ng_count += 1;
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("monitor did not answer within {SNAPSHOT_TIMEOUT:?}")]
    Timeout,
    #[error("monitor has shut down")]
    Closed,
}

enum MonitorRequest {
    Record(ResponseInfo),
    Snapshot(oneshot::Sender<MonitorSummary>),
}

/// Cheap cloneable handle to the monitor actor.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<MonitorRequest>,
}

impl MonitorHandle {
    /// Spawns the owning task. It runs until `shutdown` flips or every
    /// handle is dropped.
    pub fn spawn(shutdown: watch::Receiver<bool>) -> (MonitorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let task = tokio::spawn(run_monitor(rx, shutdown));
        (MonitorHandle { tx }, task)
    }

    /// Feeds one finished response into the counters. Losing a sample to
    /// a shutting-down monitor is fine; serving the response is not.
    pub async fn record(&self, info: ResponseInfo) {
        let _ = self.tx.send(MonitorRequest::Record(info)).await;
    }

    /// The last completed minute, bounded by [`SNAPSHOT_TIMEOUT`].
    pub async fn snapshot(&self) -> Result<MonitorSummary, MonitorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(MonitorRequest::Snapshot(reply_tx))
            .await
            .map_err(|_| MonitorError::Closed)?;
        match tokio::time::timeout(SNAPSHOT_TIMEOUT, reply_rx).await {
            Err(_elapsed) => Err(MonitorError::Timeout),
            Ok(Err(_dropped)) => Err(MonitorError::Closed),
            Ok(Ok(summary)) => Ok(summary),
        }
    }

    #[cfg(test)]
    fn from_sender(tx: mpsc::Sender<MonitorRequest>) -> MonitorHandle {
        MonitorHandle { tx }
    }
}

async fn run_monitor(mut rx: mpsc::Receiver<MonitorRequest>, mut shutdown: watch::Receiver<bool>) {
    let mut live = MonitorSummary::default();
    let mut last_minute = MonitorSummary::default();

    let mut tick = tokio::time::interval(SWAP_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tick.tick().await; // the immediate first tick would swap an empty minute

    loop {
        tokio::select! {
            // Shutdown and the minute swap take priority over the queue so
            // a busy request stream cannot starve either.
            biased;
            _ = shutdown.changed() => {
                info!("request monitor stopped");
                return;
            }
            _ = tick.tick() => {
                last_minute = live;
                live = MonitorSummary::default();
            }
            request = rx.recv() => match request {
                Some(MonitorRequest::Record(info)) => {
                    live.observe(&info);
                    info!(
                        target: "epidaily::access",
                        method = %info.method,
                        uri = %info.uri,
                        status = info.status,
                        elapsed_us = info.elapsed.as_micros() as u64,
                        user_agent = info.user_agent.as_deref().unwrap_or("-"),
                        "request"
                    );
                }
                Some(MonitorRequest::Snapshot(reply)) => {
                    debug!("snapshot requested");
                    let _ = reply.send(last_minute);
                }
                None => return,
            },
        }
    }
}
