//! Encoding of the namespaced merkle tree nodes stored in the [`Blockstore`].
//!
//! A leaf is stored as `0x00 || namespace || share` and an inner node as
//! `0x01 || left child hash || right child hash`. Both are addressed by the CID wrapping
//! their namespaced hash.
//!
//! [`Blockstore`]: lumina_blockstore::Blockstore

use cid::CidGeneric;
use lumina_blockstore::block::{Block, CidError};
use lumina_da_types::consts::{
    LEAF_PREFIX, MAX_MH_SIZE, NAMESPACED_HASH_SIZE, NODE_PREFIX, NS_SIZE,
};
use lumina_da_types::nmt::{
    cid_from_namespaced_hash, hasher, namespaced_hash_from_cid, MerkleHash, NamespacedHash,
    NamespacedHashExt,
};

const INNER_NODE_SIZE: usize = 1 + 2 * NAMESPACED_HASH_SIZE;

/// A node of the namespaced merkle tree in its stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NmtNode {
    /// Leaf of the tree.
    Leaf {
        /// Hash of the leaf.
        hash: NamespacedHash,
        /// Encoded leaf.
        encoded: Vec<u8>,
    },
    /// Inner node of the tree.
    Internal {
        /// Hash of the node.
        hash: NamespacedHash,
        /// Encoded node.
        encoded: Vec<u8>,
    },
}

impl NmtNode {
    /// Create a leaf out of its hash and the namespace prefixed share.
    pub fn leaf(hash: NamespacedHash, payload: &[u8]) -> NmtNode {
        let mut encoded = Vec::with_capacity(1 + payload.len());
        encoded.push(LEAF_PREFIX);
        encoded.extend_from_slice(payload);

        NmtNode::Leaf { hash, encoded }
    }

    /// Create an inner node out of its hash and the raw hashes of its children.
    pub fn internal(hash: NamespacedHash, left: &[u8], right: &[u8]) -> Result<NmtNode, CidError> {
        for child in [left, right] {
            if child.len() != NAMESPACED_HASH_SIZE {
                return Err(CidError::InvalidDataFormat(format!(
                    "child hash of {} bytes",
                    child.len()
                )));
            }
        }

        let mut encoded = Vec::with_capacity(INNER_NODE_SIZE);
        encoded.push(NODE_PREFIX);
        encoded.extend_from_slice(left);
        encoded.extend_from_slice(right);

        Ok(NmtNode::Internal { hash, encoded })
    }

    /// Decode the node stored under the `cid`, verifying its hash.
    pub fn decode<const S: usize>(cid: &CidGeneric<S>, bytes: &[u8]) -> Result<NmtNode, CidError> {
        let hash = namespaced_hash_from_cid(cid)?;

        let (prefix, body) = bytes
            .split_first()
            .ok_or_else(|| CidError::InvalidDataFormat("empty node".to_string()))?;

        let computed = match *prefix {
            LEAF_PREFIX => {
                if body.len() < NS_SIZE {
                    return Err(CidError::InvalidDataFormat(format!(
                        "leaf of {} bytes",
                        body.len()
                    )));
                }

                hasher().hash_leaf(body)
            }
            NODE_PREFIX => {
                if bytes.len() != INNER_NODE_SIZE {
                    return Err(CidError::InvalidDataFormat(format!(
                        "inner node of {} bytes",
                        bytes.len()
                    )));
                }

                let (left, right) = body.split_at(NAMESPACED_HASH_SIZE);
                let left = raw_to_hash(left)?;
                let right = raw_to_hash(right)?;

                // hashing children in a wrong order panics
                if left.max_namespace() > right.min_namespace() {
                    return Err(CidError::InvalidDataFormat(
                        "children out of namespace order".to_string(),
                    ));
                }

                hasher().hash_nodes(&left, &right)
            }
            prefix => {
                return Err(CidError::InvalidDataFormat(format!(
                    "unknown node prefix {prefix}"
                )))
            }
        };

        if computed != hash {
            return Err(CidError::InvalidCid("hash mismatch".to_string()));
        }

        let encoded = bytes.to_vec();

        Ok(match *prefix {
            LEAF_PREFIX => NmtNode::Leaf { hash, encoded },
            _ => NmtNode::Internal { hash, encoded },
        })
    }

    /// Hash of the node.
    pub fn hash(&self) -> &NamespacedHash {
        match self {
            NmtNode::Leaf { hash, .. } | NmtNode::Internal { hash, .. } => hash,
        }
    }

    /// Encoded form of the node.
    pub fn encode(&self) -> &[u8] {
        match self {
            NmtNode::Leaf { encoded, .. } | NmtNode::Internal { encoded, .. } => encoded,
        }
    }

    /// Consumes the node returning its encoded form.
    pub fn into_encoded(self) -> Vec<u8> {
        match self {
            NmtNode::Leaf { encoded, .. } | NmtNode::Internal { encoded, .. } => encoded,
        }
    }

    /// Returns the namespace prefixed share of a leaf.
    pub fn leaf_payload(&self) -> Option<&[u8]> {
        match self {
            NmtNode::Leaf { encoded, .. } => Some(&encoded[1..]),
            NmtNode::Internal { .. } => None,
        }
    }

    /// Returns the hashes of the children of an inner node.
    pub fn children(&self) -> Option<(NamespacedHash, NamespacedHash)> {
        match self {
            NmtNode::Leaf { .. } => None,
            NmtNode::Internal { encoded, .. } => {
                let (left, right) = encoded[1..].split_at(NAMESPACED_HASH_SIZE);
                Some((raw_to_hash(left).ok()?, raw_to_hash(right).ok()?))
            }
        }
    }

    /// Computes the CID of the node.
    pub fn cid(&self) -> Result<CidGeneric<MAX_MH_SIZE>, CidError> {
        cid_from_namespaced_hash(self.hash())
    }
}

impl Block<MAX_MH_SIZE> for NmtNode {
    fn cid(&self) -> Result<CidGeneric<MAX_MH_SIZE>, CidError> {
        NmtNode::cid(self)
    }

    fn data(&self) -> &[u8] {
        self.encode()
    }
}

fn raw_to_hash(bytes: &[u8]) -> Result<NamespacedHash, CidError> {
    NamespacedHash::from_raw(bytes).map_err(|e| CidError::InvalidDataFormat(e.to_string()))
}
