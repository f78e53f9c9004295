//! Devices as listed by the daemon, plus per-device conveniences.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use adbwire_frame::{DirEntry, FileStat};
use serde::Serialize;
use tracing::debug;

use crate::config::Context;
use crate::connection::with_connection;
use crate::error::Result;
use crate::host;
use crate::shell;
use crate::sync::{self, TransferProgress};

/// Well-known system property names.
pub mod props {
    pub const BUILD_ID: &str = "ro.build.id";
    pub const BUILD_TYPE: &str = "ro.build.type";
    pub const BUILD_VERSION_RELEASE: &str = "ro.build.version.release";
    pub const BUILD_VERSION_SDK: &str = "ro.build.version.sdk";
    pub const PRODUCT_BRAND: &str = "ro.product.brand";
    pub const PRODUCT_DEVICE: &str = "ro.product.device";
    pub const PRODUCT_MANUFACTURER: &str = "ro.product.manufacturer";
    pub const PRODUCT_MODEL: &str = "ro.product.model";
    pub const PRODUCT_NAME: &str = "ro.product.name";
    pub const PRODUCT_CPU_ABI: &str = "ro.product.cpu.abi";
    pub const SERIALNO: &str = "ro.serialno";
    pub const DEBUGGABLE: &str = "ro.debuggable";
    pub const SECURE: &str = "ro.secure";
}

/// Connection state reported for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Offline,
    Device,
    Bootloader,
    Recovery,
    Unauthorized,
    /// Any state word this library does not know.
    Unknown,
}

impl DeviceState {
    /// Look up a state word from the device list. Unknown words map to
    /// [`DeviceState::Unknown`].
    pub fn from_wire(word: &str) -> Self {
        match word {
            "offline" => Self::Offline,
            "device" => Self::Device,
            "bootloader" => Self::Bootloader,
            "recovery" => Self::Recovery,
            "unauthorized" => Self::Unauthorized,
            _ => Self::Unknown,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Device => "device",
            Self::Bootloader => "bootloader",
            Self::Recovery => "recovery",
            Self::Unauthorized => "unauthorized",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for DeviceState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match Self::from_wire(s) {
            Self::Unknown if s != "unknown" => Err(format!("unknown device state: {s}")),
            state => Ok(state),
        }
    }
}

/// A device known to the daemon.
///
/// Holds no connection; each operation opens its own.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    serial: String,
    state: DeviceState,
    #[serde(skip)]
    properties: Option<HashMap<String, String>>,
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.serial == other.serial && self.state == other.state
    }
}

impl Eq for Device {}

impl Device {
    pub fn new(serial: impl Into<String>, state: DeviceState) -> Self {
        Self {
            serial: serial.into(),
            state,
            properties: None,
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state == DeviceState::Device
    }

    pub fn is_emulator(&self) -> bool {
        self.serial.starts_with("emulator-")
    }

    /// Run a shell command, handing each output line to `consumer`.
    pub fn shell<F>(&self, ctx: &Context, command: &str, consumer: F) -> Result<()>
    where
        F: FnMut(String),
    {
        shell::run(ctx, &self.serial, command, consumer)
    }

    /// Run a shell command and collect its output lines.
    pub fn shell_output(&self, ctx: &Context, command: &str) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        self.shell(ctx, command, |line| lines.push(line))?;
        Ok(lines)
    }

    pub fn push<F>(
        &self,
        ctx: &Context,
        local: &Path,
        remote: &str,
        permissions: u32,
        progress: F,
    ) -> Result<u64>
    where
        F: FnMut(TransferProgress),
    {
        sync::push(ctx, &self.serial, local, remote, permissions, progress)
    }

    pub fn pull<F>(&self, ctx: &Context, remote: &str, local: &Path, progress: F) -> Result<u64>
    where
        F: FnMut(TransferProgress),
    {
        sync::pull(ctx, &self.serial, remote, local, progress)
    }

    pub fn pull_into<W, F>(&self, ctx: &Context, remote: &str, dest: W, progress: F) -> Result<u64>
    where
        W: Write,
        F: FnMut(TransferProgress),
    {
        sync::pull_into(ctx, &self.serial, remote, dest, progress)
    }

    pub fn stat(&self, ctx: &Context, remote: &str) -> Result<FileStat> {
        sync::stat(ctx, &self.serial, remote)
    }

    pub fn list(&self, ctx: &Context, remote: &str) -> Result<Vec<DirEntry>> {
        sync::list(ctx, &self.serial, remote)
    }

    pub fn forward(&self, ctx: &Context, local: &str, remote: &str, no_rebind: bool) -> Result<()> {
        host::forward(ctx, &self.serial, local, remote, no_rebind)
    }

    pub fn kill_forward(&self, ctx: &Context, local: &str) -> Result<()> {
        host::kill_forward(ctx, &self.serial, local)
    }

    /// System properties, fetched with `getprop` on first use and cached.
    pub fn properties(&mut self, ctx: &Context) -> Result<&HashMap<String, String>> {
        if self.properties.is_none() {
            let lines = self.shell_output(ctx, "getprop")?;
            let parsed = parse_properties(&lines);
            debug!(serial = %self.serial, count = parsed.len(), "cached device properties");
            self.properties = Some(parsed);
        }
        Ok(self.properties.get_or_insert_with(HashMap::new))
    }

    /// One system property, from the cache.
    pub fn property(&mut self, ctx: &Context, name: &str) -> Result<Option<String>> {
        Ok(self.properties(ctx)?.get(name).cloned())
    }

    /// Reboot the device, optionally into `target` (`bootloader`, `recovery`, ...).
    pub fn reboot(&self, ctx: &Context, target: Option<&str>) -> Result<()> {
        with_connection(ctx, |conn| {
            conn.select_device(&self.serial)?;
            conn.send_request(&format!("reboot:{}", target.unwrap_or_default()))
        })
    }
}

/// Parse `getprop` output lines of the form `[name]: [value]`.
///
/// Lines in any other shape are skipped.
pub fn parse_properties<S: AsRef<str>>(lines: &[S]) -> HashMap<String, String> {
    lines
        .iter()
        .filter_map(|line| {
            let line = line.as_ref().trim_end_matches('\r');
            let (name, value) = line.strip_prefix('[')?.split_once("]: [")?;
            let value = value.strip_suffix(']')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
