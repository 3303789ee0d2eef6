//! Network reachability probes consulted before any remote I/O

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;

/// Answers "is there connectivity right now?"
#[async_trait]
pub trait Connectivity: Send + Sync {
    /// `Err` carries a human-readable reason
    async fn check(&self) -> Result<(), String>;
}

/// For purely local or always-mounted media
pub struct AlwaysOnline;

#[async_trait]
impl Connectivity for AlwaysOnline {
    async fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Connects to `host:port` with a timeout
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn check(&self) -> Result<(), String> {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(format!("cannot reach {}: {}", self.addr, e)),
            Err(_) => Err(format!("probe to {} timed out after {:?}", self.addr, self.timeout)),
        }
    }
}

/// Flag-driven probe, flipped by the caller
#[derive(Default)]
pub struct ManualConnectivity {
    offline: AtomicBool,
}

impl ManualConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for ManualConnectivity {
    async fn check(&self) -> Result<(), String> {
        if self.offline.load(Ordering::SeqCst) {
            Err("offline".to_string())
        } else {
            Ok(())
        }
    }
}
