//! Hardware address normalization.
//!
//! UIs, debug prints and host tools spell the same Bluetooth address in many
//! ways (`aabbccddeeff`, `aa_bb_cc_dd_ee_ff`, `AA-BB-CC-DD-EE-FF`,
//! `dev_AA_BB_CC_DD_EE_FF`). [`BtAddress::parse`] reduces all of them to the
//! canonical uppercase colon-separated form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Prefixes stripped before hex extraction, longest first so that `device_`
/// is not mistaken for `dev` followed by hex digits.
const PREFIXES: &[&str] = &[
    "bluetooth:",
    "device_",
    "device:",
    "device-",
    "device",
    "dev_",
    "dev:",
    "dev-",
    "dev",
];

/// A canonical `AA:BB:CC:DD:EE:FF` Bluetooth hardware address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BtAddress(String);

impl BtAddress {
    /// Normalize a raw address.
    ///
    /// Known prefixes are stripped, every non-hex character is dropped and
    /// exactly 12 hex digits must remain.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyAddress`] for blank input and
    /// [`ValidationError::InvalidAddress`] when the hex digit count is not 12.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }

        let lowered = trimmed.to_ascii_lowercase();
        let rest = PREFIXES
            .iter()
            .find_map(|prefix| lowered.strip_prefix(prefix))
            .unwrap_or(&lowered);

        let digits: Vec<char> = rest.chars().filter(char::is_ascii_hexdigit).collect();
        if digits.len() != 12 {
            return Err(ValidationError::InvalidAddress {
                input: raw.to_string(),
            });
        }

        let formatted = digits
            .chunks(2)
            .map(|pair| pair.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(":")
            .to_ascii_uppercase();
        Ok(Self(formatted))
    }

    /// The canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase hex digits without separators (`aabbccddeeff`).
    #[must_use]
    pub fn slug(&self) -> String {
        self.0.replace(':', "").to_ascii_lowercase()
    }
}

impl fmt::Display for BtAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BtAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BtAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BtAddress> for String {
    fn from(value: BtAddress) -> Self {
        value.0
    }
}
