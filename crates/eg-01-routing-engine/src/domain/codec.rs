//! Encoding of an assignment's node list as a single store value.
//!
//! Format: node ids joined by `,`. On decode entries are trimmed, empty
//! entries are dropped and repeated ids keep only their first occurrence.
//! There is no escaping; ids containing the delimiter are rejected by
//! [`NodeId::new`] before they can be encoded.

use std::collections::HashSet;

use super::errors::CodecError;
use super::value_objects::NodeId;

pub const DELIMITER: char = ',';

pub fn encode_node_list(nodes: &[NodeId]) -> Vec<u8> {
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(node.as_str());
    }
    out.into_bytes()
}

pub fn decode_node_list(raw: &[u8]) -> Result<Vec<NodeId>, CodecError> {
    let text = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)?;
    let mut seen = HashSet::new();
    Ok(text
        .split(DELIMITER)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| seen.insert(*entry))
        .map(NodeId::from_trusted)
        .collect())
}
