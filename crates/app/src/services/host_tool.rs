//! Interpretation of host Bluetooth tool output.

use omnihub_domain::address::BtAddress;

use crate::ports::ToolOutput;

/// `pair` output meaning the device was already paired.
#[must_use]
pub fn already_paired(output: &ToolOutput) -> bool {
    let text = output.combined_lowercase();
    text.contains("already paired")
        || text.contains("alreadyexists")
        || text.contains("already exists")
}

/// `trust` output meaning the device was already trusted.
#[must_use]
pub fn already_trusted(output: &ToolOutput) -> bool {
    let text = output.combined_lowercase();
    text.contains("already trusted") || text.contains("trusted devices:")
}

/// Whether the agent script reported a registered default agent.
#[must_use]
pub fn agent_registered(output: &ToolOutput) -> bool {
    let text = format!("{} {}", output.stdout, output.stderr);
    text.contains("Default agent request successful") || text.contains("Agent registered")
}

/// `bluetoothctl <action> <target> failed: <detail>`
#[must_use]
pub fn format_tool_error(action: &str, target: &str, output: &ToolOutput) -> String {
    format!("bluetoothctl {action} {target} failed: {}", output.detail())
}

/// A `Device <address> <name>` line of a device listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedDevice {
    pub address: String,
    pub name: Option<String>,
}

/// Parse `devices` / `paired-devices` output, skipping unparsable lines.
#[must_use]
pub fn parse_device_listing(text: &str) -> Vec<ListedDevice> {
    text.lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (raw_address, name) = match rest.split_once(char::is_whitespace) {
                Some((address, name)) => (address, name.trim()),
                None => (rest, ""),
            };
            let address = BtAddress::parse(raw_address).ok()?;
            Some(ListedDevice {
                address: address.to_string(),
                name: Some(name.to_string()).filter(|name| !name.is_empty()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fakes::{failed_output, ok_output};

    #[test]
    fn should_treat_already_exists_as_already_paired() {
        assert!(already_paired(&failed_output(
            "Failed to pair: org.bluez.Error.AlreadyExists"
        )));
        assert!(already_paired(&ok_output("Device AA:BB is already paired")));
        assert!(!already_paired(&failed_output(
            "Failed to pair: org.bluez.Error.AuthenticationFailed"
        )));
    }

    #[test]
    fn should_treat_trusted_listing_as_already_trusted() {
        assert!(already_trusted(&ok_output("Trusted devices: AA:BB:CC:DD:EE:FF")));
        assert!(already_trusted(&failed_output("already trusted")));
        assert!(!already_trusted(&failed_output("not available")));
    }

    #[test]
    fn should_detect_agent_registration_in_either_stream() {
        assert!(agent_registered(&ok_output("Agent registered")));
        assert!(agent_registered(&failed_output(
            "Default agent request successful"
        )));
        assert!(!agent_registered(&ok_output("")));
    }

    #[test]
    fn should_format_tool_error_with_best_detail() {
        let output = ToolOutput {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(
            format_tool_error("pair", "AA:BB:CC:DD:EE:FF", &output),
            "bluetoothctl pair AA:BB:CC:DD:EE:FF failed: exit code 1"
        );
    }

    #[test]
    fn should_parse_device_listing_lines() {
        let listing = "Device AA:BB:CC:DD:EE:FF Living Room TV\n\
                       [CHG] Controller 00:11 Discovering: yes\n\
                       Device 11:22:33:44:55:66\n\
                       Device not-an-address Foo\n";
        let devices = parse_device_listing(listing);
        assert_eq!(
            devices,
            vec![
                ListedDevice {
                    address: "AA:BB:CC:DD:EE:FF".to_string(),
                    name: Some("Living Room TV".to_string()),
                },
                ListedDevice {
                    address: "11:22:33:44:55:66".to_string(),
                    name: None,
                },
            ]
        );
    }
}
