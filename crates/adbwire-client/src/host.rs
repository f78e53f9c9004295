//! Host requests: queries answered by the daemon itself.
//!
//! Every function opens its own connection and releases it before
//! returning. Response parsing is split into pure `parse_*` functions.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::Context;
use crate::connection::with_connection;
use crate::device::{Device, DeviceState};
use crate::error::{ClientError, Result};

/// Forwards grouped by device serial, then local spec to remote spec.
pub type ForwardMap = BTreeMap<String, BTreeMap<String, String>>;

/// Send `host:<command>` and return the length-prefixed response.
pub fn query(ctx: &Context, command: &str) -> Result<String> {
    with_connection(ctx, |conn| {
        conn.send_request(&format!("host:{command}"))?;
        conn.read_response()
    })
}

/// Send `host:<command>`; only the status is expected back.
pub fn command(ctx: &Context, command: &str) -> Result<()> {
    with_connection(ctx, |conn| conn.send_request(&format!("host:{command}")))
}

/// List devices, optionally keeping only those in `filter` state.
pub fn devices(ctx: &Context, filter: Option<DeviceState>) -> Result<Vec<Device>> {
    let listing = query(ctx, "devices")?;
    let devices = parse_devices(&listing, filter);
    debug!(count = devices.len(), "listed devices");
    Ok(devices)
}

/// Features supported by the daemon.
pub fn features(ctx: &Context) -> Result<Vec<String>> {
    Ok(parse_features(&query(ctx, "features")?))
}

/// The daemon's internal protocol version.
pub fn version(ctx: &Context) -> Result<u32> {
    parse_version(&query(ctx, "version")?)
}

/// Ask the daemon to exit.
pub fn kill_server(ctx: &Context) -> Result<()> {
    command(ctx, "kill")?;
    info!(addr = %ctx.addr(), "daemon asked to exit");
    Ok(())
}

/// Remove every port forward on every device.
pub fn kill_forward_all(ctx: &Context) -> Result<()> {
    command(ctx, "killforward-all")
}

/// All port forwards.
pub fn list_forward(ctx: &Context) -> Result<ForwardMap> {
    parse_forwards(&query(ctx, "list-forward")?)
}

/// Forward `local` on the host to `remote` on the device, e.g.
/// `tcp:8080` to `tcp:80`.
///
/// With `no_rebind`, an existing forward on `local` is an error instead of
/// being replaced.
pub fn forward(
    ctx: &Context,
    serial: &str,
    local: &str,
    remote: &str,
    no_rebind: bool,
) -> Result<()> {
    let mode = if no_rebind { "forward:norebind" } else { "forward" };
    with_connection(ctx, |conn| {
        // One status for reaching the device, one for setting up the forward.
        conn.send_request(&format!("host-serial:{serial}:{mode}:{local};{remote}"))?;
        conn.read_status()
    })
}

/// Remove the forward on `local` for one device.
pub fn kill_forward(ctx: &Context, serial: &str, local: &str) -> Result<()> {
    with_connection(ctx, |conn| {
        conn.send_request(&format!("host-serial:{serial}:killforward:{local}"))
    })
}

/// Ask the daemon to connect to a networked device.
///
/// Returns whether the daemon reported the device as connected.
pub fn remote_connect(ctx: &Context, host: &str, port: u16) -> Result<bool> {
    let response = query(ctx, &format!("connect:{host}:{port}"))?;
    let connected = connect_succeeded(&response);
    if connected {
        info!(host, port, "remote device connected");
    } else {
        info!(host, port, response = %response, "remote connect refused");
    }
    Ok(connected)
}

/// Disconnect a networked device, or all of them when `host` is `None`.
///
/// Returns the daemon's response text.
pub fn remote_disconnect(ctx: &Context, host: Option<&str>, port: Option<u16>) -> Result<String> {
    query(ctx, &format!("disconnect:{}", disconnect_target(host, port)))
}

/// Parse the `host:devices` listing.
///
/// Each line is a serial and a state word separated by whitespace. Parsing
/// stops at the first empty line. A line without a state word is reported as
/// [`DeviceState::Unknown`] and is kept only by an `Unknown` filter.
pub fn parse_devices(listing: &str, filter: Option<DeviceState>) -> Vec<Device> {
    listing
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .take_while(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let serial = tokens.next()?;
            let state = tokens
                .next()
                .map_or(DeviceState::Unknown, DeviceState::from_wire);
            Some(Device::new(serial, state))
        })
        .filter(|device| filter.is_none_or(|state| device.state() == state))
        .collect()
}

/// Parse a comma-separated feature list. Empty entries are dropped.
pub fn parse_features(response: &str) -> Vec<String> {
    response
        .trim()
        .split(',')
        .filter(|feature| !feature.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a hexadecimal version number.
pub fn parse_version(response: &str) -> Result<u32> {
    let text = response.trim();
    u32::from_str_radix(text, 16)
        .map_err(|_| ClientError::ProtocolViolation(format!("invalid version response: {text:?}")))
}

/// Parse `list-forward` lines of `<serial> <local> <remote>`.
pub fn parse_forwards(listing: &str) -> Result<ForwardMap> {
    let mut forwards = ForwardMap::new();
    for line in listing.lines().filter(|line| !line.trim().is_empty()) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [serial, local, remote] = tokens.as_slice() else {
            return Err(ClientError::ProtocolViolation(format!(
                "malformed forward entry: {line:?}"
            )));
        };
        forwards
            .entry((*serial).to_string())
            .or_default()
            .insert((*local).to_string(), (*remote).to_string());
    }
    Ok(forwards)
}

/// Whether a `host:connect` response reports success.
pub fn connect_succeeded(response: &str) -> bool {
    response.contains("connected")
}

/// The argument of a `host:disconnect` request.
pub fn disconnect_target(host: Option<&str>, port: Option<u16>) -> String {
    match (host, port) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDaemon;

    #[test]
    fn parses_single_device_listing() {
        let devices = parse_devices("emulator-5554\tdevice\n\n", None);
        assert_eq!(
            devices,
            vec![Device::new("emulator-5554", DeviceState::Device)]
        );
    }

    #[test]
    fn filter_without_match_is_empty() {
        let devices = parse_devices(
            "emulator-5554\tdevice\n\n",
            Some(DeviceState::Bootloader),
        );
        assert!(devices.is_empty());
    }

    #[test]
    fn listing_stops_at_first_blank_line() {
        let listing = "A1\tdevice\nB2\toffline\n\nC3\tdevice\n";
        let serials: Vec<String> = parse_devices(listing, None)
            .iter()
            .map(|d| d.serial().to_string())
            .collect();
        assert_eq!(serials, ["A1", "B2"]);
    }

    #[test]
    fn stateless_line_does_not_pass_a_state_filter() {
        let listing = "lonely\nA1\tdevice\n";
        let online = parse_devices(listing, Some(DeviceState::Device));
        assert_eq!(online, vec![Device::new("A1", DeviceState::Device)]);

        let unknown = parse_devices(listing, Some(DeviceState::Unknown));
        assert_eq!(unknown, vec![Device::new("lonely", DeviceState::Unknown)]);
    }

    #[test]
    fn listing_filters_by_state() {
        let listing = "A1\tdevice\nB2\tbootloader\nC3\trecovery\nD4\tunauthorized\n";
        let devices = parse_devices(listing, Some(DeviceState::Bootloader));
        assert_eq!(devices, vec![Device::new("B2", DeviceState::Bootloader)]);
    }

    #[test]
    fn listing_handles_odd_lines() {
        let listing = "lonely\nX9\tsideload\r\nY0 device extra tokens\n";
        let devices = parse_devices(listing, None);
        assert_eq!(
            devices,
            vec![
                Device::new("lonely", DeviceState::Unknown),
                Device::new("X9", DeviceState::Unknown),
                Device::new("Y0", DeviceState::Device),
            ]
        );
        assert!(parse_devices("", None).is_empty());
    }

    #[test]
    fn parses_features() {
        assert_eq!(
            parse_features("shell_v2,cmd,stat_v2\n"),
            ["shell_v2", "cmd", "stat_v2"]
        );
        assert!(parse_features("").is_empty());
    }

    #[test]
    fn parses_hex_version() {
        assert_eq!(parse_version("0029").expect("valid version"), 41);
        assert!(matches!(
            parse_version("zz"),
            Err(ClientError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn parses_forwards_into_nested_map() {
        let forwards = parse_forwards("S1 tcp:8080 tcp:80\nS1 tcp:9000 tcp:90\n")
            .expect("listing should parse");
        assert_eq!(forwards.len(), 1);
        assert_eq!(forwards["S1"]["tcp:8080"], "tcp:80");
        assert_eq!(forwards["S1"]["tcp:9000"], "tcp:90");
        assert!(parse_forwards("").expect("empty listing").is_empty());
    }

    #[test]
    fn malformed_forward_line_is_protocol_violation() {
        assert!(matches!(
            parse_forwards("S1 tcp:8080\n"),
            Err(ClientError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn connect_result_detection() {
        assert!(connect_succeeded("connected to 10.0.0.2:5555"));
        assert!(connect_succeeded("already connected to 10.0.0.2:5555"));
        assert!(!connect_succeeded("unable to connect to 10.0.0.2:5555"));
    }

    #[test]
    fn disconnect_targets() {
        assert_eq!(disconnect_target(Some("10.0.0.2"), Some(5555)), "10.0.0.2:5555");
        assert_eq!(disconnect_target(Some("10.0.0.2"), None), "10.0.0.2");
        assert_eq!(disconnect_target(None, Some(5555)), "");
    }

    #[test]
    fn devices_over_the_wire() {
        let daemon = FakeDaemon::serve(|side| {
            side.expect_request("host:devices");
            side.okay();
            side.respond("emulator-5554\tdevice\n\n");
        });

        let devices = devices(&daemon.context(), None).expect("devices should succeed");
        assert_eq!(
            devices,
            vec![Device::new("emulator-5554", DeviceState::Device)]
        );
        daemon.join();
    }

    #[test]
    fn rejected_query_carries_daemon_message() {
        let daemon = FakeDaemon::serve(|side| {
            side.expect_request("host:features");
            side.fail("no devices/emulators found");
        });

        let err = features(&daemon.context()).expect_err("query should be rejected");
        assert!(
            matches!(err, ClientError::RemoteRejected(msg) if msg == "no devices/emulators found")
        );
        daemon.join();
    }

    #[test]
    fn version_over_the_wire() {
        let daemon = FakeDaemon::serve(|side| {
            side.expect_request("host:version");
            side.okay();
            side.respond("0029");
        });

        assert_eq!(version(&daemon.context()).expect("version"), 0x29);
        daemon.join();
    }

    #[test]
    fn kill_server_needs_only_status() {
        let daemon = FakeDaemon::serve(|side| {
            side.expect_request("host:kill");
            side.okay();
        });

        kill_server(&daemon.context()).expect("kill should succeed");
        daemon.join();
    }

    #[test]
    fn remote_connect_reports_outcome() {
        let daemon = FakeDaemon::serve_many(2, |index, side| {
            side.expect_request("host:connect:10.0.0.2:5555");
            side.okay();
            if index == 0 {
                side.respond("connected to 10.0.0.2:5555");
            } else {
                side.respond("unable to connect to 10.0.0.2:5555");
            }
        });
        let ctx = daemon.context();

        assert!(remote_connect(&ctx, "10.0.0.2", 5555).expect("first connect"));
        assert!(!remote_connect(&ctx, "10.0.0.2", 5555).expect("second connect"));
        daemon.join();
    }

    #[test]
    fn remote_disconnect_all() {
        let daemon = FakeDaemon::serve(|side| {
            side.expect_request("host:disconnect:");
            side.okay();
            side.respond("disconnected everything");
        });

        let response =
            remote_disconnect(&daemon.context(), None, None).expect("disconnect should succeed");
        assert_eq!(response, "disconnected everything");
        daemon.join();
    }

    #[test]
    fn forward_reads_two_statuses() {
        let daemon = FakeDaemon::serve_many(2, |index, side| {
            if index == 0 {
                side.expect_request("host-serial:S1:forward:norebind:tcp:8080;tcp:80");
                side.okay();
                side.fail("cannot rebind existing socket");
            } else {
                side.expect_request("host-serial:S1:forward:tcp:8080;tcp:80");
                side.okay();
                side.okay();
            }
        });
        let ctx = daemon.context();

        let err = forward(&ctx, "S1", "tcp:8080", "tcp:80", true).expect_err("no rebind");
        assert!(matches!(err, ClientError::RemoteRejected(msg) if msg.contains("rebind")));
        forward(&ctx, "S1", "tcp:8080", "tcp:80", false).expect("forward should succeed");
        daemon.join();
    }

    #[test]
    fn list_forward_over_the_wire() {
        let daemon = FakeDaemon::serve(|side| {
            side.expect_request("host:list-forward");
            side.okay();
            side.respond("S1 tcp:8080 tcp:80\n");
        });

        let forwards = list_forward(&daemon.context()).expect("list should succeed");
        assert_eq!(forwards["S1"]["tcp:8080"], "tcp:80");
        daemon.join();
    }
}
