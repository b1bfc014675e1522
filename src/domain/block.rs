//! Chain block notifications and their wire payload.
//!
//! The wallet collaborator yields [`BlockEvent`]s; the gateway converts
//! each one into a [`BlockData`] JSON document which is what WebSocket
//! subscribers and the `/blocks` endpoint receive.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A block as reported by the chain service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvent {
    /// Raw block identifier.
    #[serde(with = "hex")]
    pub block_id: Vec<u8>,
    /// Block height.
    pub height: u32,
    /// Identifier of the producing validator, already rendered as a string.
    /// Empty for the genesis block.
    #[serde(default)]
    pub producer_id: String,
    /// Raw transaction identifiers in block order.
    #[serde(default, with = "hex_list")]
    pub txids: Vec<Vec<u8>>,
}

/// JSON payload describing one block, as pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlockData {
    /// Hex-encoded block identifier.
    #[serde(rename = "blockID")]
    pub block_id: String,
    /// Block height.
    pub height: u32,
    /// Producer identifier.
    #[serde(rename = "producerID")]
    pub producer_id: String,
    /// Hex-encoded transaction identifiers.
    pub txids: Vec<String>,
}

impl From<&BlockEvent> for BlockData {
    fn from(event: &BlockEvent) -> Self {
        Self {
            block_id: hex::encode(&event.block_id),
            height: event.height,
            producer_id: event.producer_id.clone(),
            txids: event.txids.iter().map(hex::encode).collect(),
        }
    }
}

mod hex_list {
    use serde::{Deserialize, Deserializer, Serializer, ser::SerializeSeq};

    pub fn serialize<S: Serializer>(list: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(list.len()))?;
        for item in list {
            seq.serialize_element(&hex::encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
