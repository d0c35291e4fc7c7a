//! Canonical block codec (§4.2, §6).
//!
//! Every block starts with a one-byte type tag so a decoder can dispatch
//! without external context, followed by `bincode`'s fixed-integer-width,
//! stable field-order encoding of the tagged payload. No block type uses a
//! `HashMap` or other iteration-order-dependent field, which is what makes
//! the encoding canonical (I4 depends on it: the same logical node always
//! produces identical bytes).

use crate::config::ChunkStrategy;
use crate::error::{ProllyError, Result};
use crate::node::Node;
use crate::node::TreeHeader;
use serde::{de::DeserializeOwned, Serialize};

const TAG_LEAF: u8 = 0;
const TAG_INTERNAL: u8 = 1;
const TAG_HEADER: u8 = 2;
const TAG_CONFIG: u8 = 3;

type BincodeOpts = bincode::config::WithOtherIntEncoding<
    bincode::config::WithOtherEndian<bincode::DefaultOptions, bincode::config::LittleEndian>,
    bincode::config::FixintEncoding,
>;

fn bincode_opts() -> BincodeOpts {
    use bincode::Options;
    bincode::DefaultOptions::new().with_little_endian().with_fixint_encoding()
}

fn encode_tagged<T: Serialize>(tag: u8, value: &T) -> Result<Vec<u8>> {
    use bincode::Options;
    let mut bytes = Vec::with_capacity(64);
    bytes.push(tag);
    bincode_opts()
        .serialize_into(&mut bytes, value)
        .map_err(|e| ProllyError::codec(e.to_string()))?;
    Ok(bytes)
}

fn decode_tagged<T: DeserializeOwned>(expected_tag: u8, bytes: &[u8]) -> Result<T> {
    use bincode::Options;
    let (tag, rest) = bytes
        .split_first()
        .ok_or_else(|| ProllyError::codec("empty block"))?;
    if *tag != expected_tag {
        return Err(ProllyError::codec(format!(
            "unexpected block tag {tag}, expected {expected_tag}"
        )));
    }
    bincode_opts()
        .deserialize(rest)
        .map_err(|e| ProllyError::codec(e.to_string()))
}

/// Reads just the tag byte, for callers that need to branch on block kind
/// before committing to a concrete decode (the mutator's untouched-subtree
/// re-emission path never needs this; it trusts digests blindly).
pub fn peek_tag(bytes: &[u8]) -> Result<u8> {
    bytes
        .first()
        .copied()
        .ok_or_else(|| ProllyError::codec("empty block"))
}

pub fn encode_node(node: &Node) -> Result<Vec<u8>> {
    match node {
        Node::Leaf { entries } => encode_tagged(TAG_LEAF, entries),
        Node::Internal { level, entries } => encode_tagged(TAG_INTERNAL, &(*level, entries)),
    }
}

pub fn decode_node(bytes: &[u8]) -> Result<Node> {
    match peek_tag(bytes)? {
        TAG_LEAF => {
            let entries = decode_tagged(TAG_LEAF, bytes)?;
            Ok(Node::Leaf { entries })
        }
        TAG_INTERNAL => {
            let (level, entries) = decode_tagged(TAG_INTERNAL, bytes)?;
            Ok(Node::Internal { level, entries })
        }
        other => Err(ProllyError::codec(format!("not a node block (tag {other})"))),
    }
}

pub fn encode_header(header: &TreeHeader) -> Result<Vec<u8>> {
    encode_tagged(TAG_HEADER, header)
}

pub fn decode_header(bytes: &[u8]) -> Result<TreeHeader> {
    decode_tagged(TAG_HEADER, bytes)
}

pub fn encode_config(config: &ChunkStrategy) -> Result<Vec<u8>> {
    encode_tagged(TAG_CONFIG, config)
}

pub fn decode_config(bytes: &[u8]) -> Result<ChunkStrategy> {
    decode_tagged(TAG_CONFIG, bytes)
}
