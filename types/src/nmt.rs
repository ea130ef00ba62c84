//! Namespaced merkle trees over the rows and columns of the extended data square.
//!
//! Leaves are sorted by their [`Namespace`], and every inner node of the tree commits to the
//! range of namespaces found in its subtree. Trees are built with the
//! [`NmtBuilder`], which reports every node it creates to a [`NodeVisitor`].

use cid::CidGeneric;
use lumina_blockstore::block::CidError;
use multihash::Multihash;

use crate::consts::{
    MAX_MH_SIZE, NAMESPACED_HASH_SIZE, NMT_CODEC, NMT_MULTIHASH_CODE, NS_SIZE,
};
use crate::{Error, Result};

mod builder;
mod namespaced_hash;

pub use self::builder::{build_tree, NmtBuilder, NodeVisitor};
pub use self::namespaced_hash::NamespacedHashExt;
pub use nmt_rs::simple_merkle::tree::MerkleHash;
pub use nmt_rs::NamespaceMerkleHasher;

/// Hash of a tree node, prefixed with the minimal and maximal namespace of its subtree.
pub type NamespacedHash = nmt_rs::NamespacedHash<NS_SIZE>;
/// Hasher used for the trees of the extended data square.
pub type NamespacedSha2Hasher = nmt_rs::NamespacedSha2Hasher<NS_SIZE>;

/// Returns the hasher used for the trees of the extended data square.
///
/// The parity namespace is ignored when computing the maximal namespace of a node, so that
/// the roots of rows with parity shares only cover the data namespaces.
pub fn hasher() -> NamespacedSha2Hasher {
    NamespacedSha2Hasher::with_ignore_max_ns(true)
}

/// Fixed-size namespace attached to every share.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Ord, PartialOrd)]
pub struct Namespace(nmt_rs::NamespaceId<NS_SIZE>);

impl Namespace {
    /// Lowest possible namespace.
    pub const MIN: Namespace = Namespace(nmt_rs::NamespaceId([0; NS_SIZE]));

    /// Namespace of the erasure coded shares. Sorts after every data namespace.
    pub const PARITY_SHARE: Namespace = Namespace(nmt_rs::NamespaceId([0xff; NS_SIZE]));

    /// Create a namespace from its bytes.
    pub const fn new(bytes: [u8; NS_SIZE]) -> Self {
        Namespace(nmt_rs::NamespaceId(bytes))
    }

    /// Create a namespace from a slice, which must be exactly [`NS_SIZE`] bytes long.
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; NS_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::InvalidNamespaceSize(bytes.len()))?;

        Ok(Namespace::new(bytes))
    }

    /// Returns the bytes of the namespace.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0 .0
    }

    /// Returns `true` if this is the namespace of the erasure coded shares.
    pub fn is_parity(&self) -> bool {
        *self == Namespace::PARITY_SHARE
    }
}

impl std::ops::Deref for Namespace {
    type Target = nmt_rs::NamespaceId<NS_SIZE>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Namespace> for nmt_rs::NamespaceId<NS_SIZE> {
    fn from(value: Namespace) -> Self {
        value.0
    }
}

impl From<nmt_rs::NamespaceId<NS_SIZE>> for Namespace {
    fn from(value: nmt_rs::NamespaceId<NS_SIZE>) -> Self {
        Namespace(value)
    }
}

/// Computes the CID under which a tree node with the given hash is stored.
///
/// The CID is version 1, uses the [`NMT_CODEC`] codec and wraps the full namespaced hash in
/// a multihash with the [`NMT_MULTIHASH_CODE`] code.
pub fn cid_from_namespaced_hash(
    hash: &NamespacedHash,
) -> Result<CidGeneric<MAX_MH_SIZE>, CidError> {
    let mh = Multihash::<MAX_MH_SIZE>::wrap(NMT_MULTIHASH_CODE, &hash.to_array())
        .map_err(|_| CidError::InvalidMultihashLength(NAMESPACED_HASH_SIZE))?;

    Ok(CidGeneric::new_v1(NMT_CODEC, mh))
}

/// Extracts the namespaced hash from a CID of a tree node.
pub fn namespaced_hash_from_cid<const S: usize>(
    cid: &CidGeneric<S>,
) -> Result<NamespacedHash, CidError> {
    let codec = cid.codec();
    if codec != NMT_CODEC {
        return Err(CidError::InvalidCidCodec(codec));
    }

    let hash = cid.hash();

    let size = hash.size() as usize;
    if size != NAMESPACED_HASH_SIZE {
        return Err(CidError::InvalidMultihashLength(size));
    }

    let code = hash.code();
    if code != NMT_MULTIHASH_CODE {
        return Err(CidError::InvalidMultihashCode(code, NMT_MULTIHASH_CODE));
    }

    NamespacedHash::from_raw(hash.digest()).map_err(|e| CidError::InvalidCid(e.to_string()))
}
