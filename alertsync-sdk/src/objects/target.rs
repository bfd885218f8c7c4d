//! Target keys: the addressable entities an alert instance watches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing a target key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetKeyError {
    #[error("target key `{0}` must have the form network:subnet:address")]
    MissingSegment(String),
    #[error("target key `{0}` has an empty segment")]
    EmptySegment(String),
}

/// A monitorable entity on a given network, written `network:subnet:address`.
///
/// Keys are normalized on construction so that the same entity always maps to
/// the same index entry: network and subnet are lowercased, and hex addresses
/// (`0x`-prefixed) are lowercased because they compare case-insensitively.
/// Other address encodings (base58, bech32) are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetKey {
    network: String,
    subnet: String,
    address: String,
}

impl TargetKey {
    pub fn new(network: &str, subnet: &str, address: &str) -> Result<Self, TargetKeyError> {
        let (network, subnet, address) = (network.trim(), subnet.trim(), address.trim());
        if network.is_empty() || subnet.is_empty() || address.is_empty() {
            return Err(TargetKeyError::EmptySegment(format!(
                "{network}:{subnet}:{address}"
            )));
        }
        let address = if address.starts_with("0x") || address.starts_with("0X") {
            address.to_ascii_lowercase()
        } else {
            address.to_owned()
        };
        Ok(Self {
            network: network.to_ascii_lowercase(),
            subnet: subnet.to_ascii_lowercase(),
            address,
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn subnet(&self) -> &str {
        &self.subnet
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl FromStr for TargetKey {
    type Err = TargetKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(network), Some(subnet), Some(address)) => Self::new(network, subnet, address),
            _ => Err(TargetKeyError::MissingSegment(s.to_owned())),
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.network, self.subnet, self.address)
    }
}

impl TryFrom<String> for TargetKey {
    type Error = TargetKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetKey> for String {
    fn from(value: TargetKey) -> Self {
        value.to_string()
    }
}
