//! Constants used across the data availability layer.

/// Size of the namespace in bytes.
pub const NS_SIZE: usize = 8;

/// Size of the SHA-256 digest in bytes.
pub const HASH_SIZE: usize = 32;

/// Size of the namespaced hash: min namespace, max namespace and the digest.
pub const NAMESPACED_HASH_SIZE: usize = 2 * NS_SIZE + HASH_SIZE;

/// The smallest share that can still carry a namespace.
pub const MIN_SHARE_SIZE: usize = NS_SIZE;

/// Maximum width of the original data square.
///
/// Reed-Solomon over GF(2^8) supports at most 256 shards per codeword.
pub const MAX_ODS_WIDTH: usize = 128;

/// Minimum width of the extended data square.
pub const MIN_EXTENDED_SQUARE_WIDTH: usize = 2;

/// Maximum width of the extended data square.
pub const MAX_EXTENDED_SQUARE_WIDTH: usize = MAX_ODS_WIDTH * 2;

/// Codec of the CIDs addressing namespaced merkle tree nodes.
pub const NMT_CODEC: u64 = 0x7700;

/// Multihash code of the `sha2-256-namespace8-flagged` hash of tree nodes.
pub const NMT_MULTIHASH_CODE: u64 = 0x7701;

/// Maximum multihash size of the CIDs handled by the node.
pub const MAX_MH_SIZE: usize = 64;

/// Leaf node domain separation prefix.
pub const LEAF_PREFIX: u8 = 0x00;

/// Inner node domain separation prefix.
pub const NODE_PREFIX: u8 = 0x01;
