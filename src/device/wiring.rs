//! One-shot OS wiring for the tap interface.
//!
//! Runs before any session starts and is never touched again. Failures are
//! logged and otherwise ignored: an interface that stays down shows up later
//! as `DeviceNotReady` on reads.

use tokio::process::Command;

/// Tool used to bring the interface administratively up.
pub const IFCONFIG: &str = "/sbin/ifconfig";

/// Tool used to attach the interface to a bridge.
pub const BRCTL: &str = "/sbin/brctl";

/// Bring `device` administratively up (`ifconfig <device> up`).
pub async fn bring_up(device: &str) {
    run(IFCONFIG, &[device, "up"]).await;
}

/// Add `device` to `bridge` (`brctl addif <bridge> <device>`).
pub async fn attach_to_bridge(bridge: &str, device: &str) {
    run(BRCTL, &["addif", bridge, device]).await;
}

/// Run a setup command, reporting but never propagating failure.
///
/// Returns whether the command ran and exited successfully.
async fn run(program: &str, args: &[&str]) -> bool {
    match Command::new(program).args(args).status().await {
        Ok(status) if status.success() => {
            tracing::info!("{} {}", program, args.join(" "));
            true
        }
        Ok(status) => {
            tracing::warn!("{} {} exited with {}", program, args.join(" "), status);
            false
        }
        Err(e) => {
            tracing::warn!("{} {} could not run: {}", program, args.join(" "), e);
            false
        }
    }
}
