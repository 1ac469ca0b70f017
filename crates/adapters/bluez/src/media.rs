//! AVRCP transport controls scripted through the `bluetoothctl` player menu.

use omnihub_domain::address::BtAddress;
use omnihub_domain::capability::MediaAction;

use crate::error::BluezError;

/// D-Bus object path of the first media player BlueZ exposes for `address`.
pub(crate) fn player_path(adapter: &str, address: &str) -> Result<String, BluezError> {
    let address = BtAddress::parse(address)
        .map_err(|_| BluezError::InvalidAddress(address.to_string()))?;
    let device = address.as_str().replace(':', "_");
    Ok(format!("/org/bluez/{adapter}/dev_{device}/player0"))
}

/// Script selecting `player` and sending `action` to it.
pub(crate) fn media_script(player: &str, action: MediaAction) -> String {
    format!("menu player\nselect {player}\n{action}\nback\nquit\n")
}
