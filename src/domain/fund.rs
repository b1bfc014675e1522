//! Spendable fund records supplied by the wallet.
//!
//! [`FundId`] is the opaque byte identity of a fund (a UTXO commitment).
//! It renders and serializes as lowercase hex so it can be used as a map
//! key, a log field and a JSON value alike.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unique identity of a spendable fund record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FundId(Vec<u8>);

impl FundId {
    /// Wraps raw identity bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw identity bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the lowercase hex encoding of the identity.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for FundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for FundId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s).map(Self)
    }
}

impl From<Vec<u8>> for FundId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for FundId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FundId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Point-in-time view of one spendable fund held by the wallet.
///
/// Snapshots are immutable; the gateway never mutates wallet state
/// directly, it only reserves identities while a spend is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRecord {
    /// Unique identity (commitment) of the fund.
    #[serde(rename = "commitment")]
    pub id: FundId,
    /// Value in base units.
    pub amount: u64,
    /// Whether the fund is currently staked and therefore unspendable.
    #[serde(default)]
    pub staked: bool,
}

impl FundRecord {
    /// Creates a fund record.
    #[must_use]
    pub fn new(id: impl Into<FundId>, amount: u64, staked: bool) -> Self {
        Self {
            id: id.into(),
            amount,
            staked,
        }
    }
}
