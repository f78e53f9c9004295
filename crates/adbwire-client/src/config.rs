use adbwire_frame::FrameConfig;
use adbwire_transport::DaemonAddr;

use crate::error::Result;

/// Default push chunk size: 64 KiB.
pub const DEFAULT_SYNC_CHUNK_SIZE: usize = 64 * 1024;

/// Client tunables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bytes per `DATA` chunk when pushing.
    pub sync_chunk_size: usize,
    /// Limits applied when decoding daemon replies.
    pub frame: FrameConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sync_chunk_size: DEFAULT_SYNC_CHUNK_SIZE,
            frame: FrameConfig::default(),
        }
    }
}

/// Everything an operation needs to reach the daemon.
///
/// Passed explicitly to every operation; nothing is process-global.
#[derive(Debug, Clone, Default)]
pub struct Context {
    addr: DaemonAddr,
    config: ClientConfig,
}

impl Context {
    pub fn new(addr: DaemonAddr) -> Self {
        Self {
            addr,
            config: ClientConfig::default(),
        }
    }

    /// Daemon address from `ANDROID_ADB_SERVER_ADDRESS` / `ANDROID_ADB_SERVER_PORT`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(DaemonAddr::from_env()?))
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn addr(&self) -> &DaemonAddr {
        &self.addr
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
