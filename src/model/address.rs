use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use data_encoding::HEXLOWER_PERMISSIVE;
use rand::Rng;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

pub const ADDRESS_LEN: usize = 20;

/// An externally-verifiable account identifier. The ledger never sees keys or
/// credentials, only the address the substrate resolved the caller to.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The null identity. Never a valid voter or admin.
    pub const ZERO: Address = Address([0; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a stable address from an arbitrary label, e.g. a public key or a
    /// fixture name: the first 20 bytes of its SHA-256.
    pub fn from_label(label: impl AsRef<[u8]>) -> Self {
        let digest = Sha256::digest(label.as_ref());
        let mut bytes = [0; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        let mut bytes = [0; ADDRESS_LEN];
        rng.fill(&mut bytes);
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", HEXLOWER_PERMISSIVE.encode(&self.0))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// Failure to parse an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed address: {0}")]
pub struct AddressParseError(String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        let decoded = HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| AddressParseError(e.to_string()))?;
        let bytes: [u8; ADDRESS_LEN] = decoded
            .try_into()
            .map_err(|_| AddressParseError(format!("expected {ADDRESS_LEN} bytes")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Address {
        pub fn owner_example() -> Self {
            Self::from_label("owner")
        }

        pub fn admin_example(n: u8) -> Self {
            Self::from_label(format!("admin{n}"))
        }

        pub fn voter_example(n: u8) -> Self {
            Self::from_label(format!("voter{n}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let address = Address::from_label("alice");
        let text = address.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 2 * ADDRESS_LEN);
        assert_eq!(text.parse::<Address>().unwrap(), address);
        // Upper case and a missing prefix are both accepted.
        assert_eq!(
            text[2..].to_uppercase().parse::<Address>().unwrap(),
            address
        );
    }

    #[test]
    fn bad_addresses() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not hex at all".parse::<Address>().is_err());
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_label("alice").is_zero());
    }

    #[test]
    fn serde_as_string() {
        let address = Address::voter_example(1);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{address}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
