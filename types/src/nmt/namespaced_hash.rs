use crate::consts::NAMESPACED_HASH_SIZE;
use crate::nmt::NamespacedHash;
use crate::{Error, Result};

/// Conversions between [`NamespacedHash`] and its raw byte representation.
///
/// The raw form is the minimal namespace, followed by the maximal namespace and the
/// 32 bytes of the sha256 digest.
pub trait NamespacedHashExt {
    /// Parse a namespaced hash from exactly [`NAMESPACED_HASH_SIZE`] bytes.
    fn from_raw(bytes: &[u8]) -> Result<NamespacedHash>;

    /// Returns the raw bytes of the hash.
    fn to_array(&self) -> [u8; NAMESPACED_HASH_SIZE];

    /// Returns the raw bytes of the hash as a vector.
    fn to_vec(&self) -> Vec<u8>;
}

impl NamespacedHashExt for NamespacedHash {
    fn from_raw(bytes: &[u8]) -> Result<NamespacedHash> {
        if bytes.len() != NAMESPACED_HASH_SIZE {
            return Err(Error::InvalidNamespacedHash);
        }

        bytes.try_into().map_err(|_| Error::InvalidNamespacedHash)
    }

    fn to_array(&self) -> [u8; NAMESPACED_HASH_SIZE] {
        let mut out = [0; NAMESPACED_HASH_SIZE];
        let (min, rest) = out.split_at_mut(crate::consts::NS_SIZE);
        let (max, digest) = rest.split_at_mut(crate::consts::NS_SIZE);

        min.copy_from_slice(&self.min_namespace().0);
        max.copy_from_slice(&self.max_namespace().0);
        digest.copy_from_slice(&self.hash());

        out
    }

    fn to_vec(&self) -> Vec<u8> {
        self.to_array().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::NS_SIZE;
    use crate::nmt::{hasher, MerkleHash};

    #[test]
    fn raw_layout() {
        let mut leaf = vec![3; NS_SIZE];
        leaf.extend_from_slice(b"share data");
        let hash = hasher().hash_leaf(&leaf);

        let raw = hash.to_array();
        assert_eq!(&raw[..NS_SIZE], &[3; NS_SIZE]);
        assert_eq!(&raw[NS_SIZE..2 * NS_SIZE], &[3; NS_SIZE]);
        assert_eq!(&raw[2 * NS_SIZE..], &hash.hash());

        assert_eq!(NamespacedHash::from_raw(&raw).unwrap(), hash);
        assert_eq!(hash.to_vec(), raw.to_vec());
    }

    #[test]
    fn from_raw_wrong_length() {
        assert!(matches!(
            NamespacedHash::from_raw(&[0; NAMESPACED_HASH_SIZE - 1]).unwrap_err(),
            Error::InvalidNamespacedHash
        ));
        assert!(matches!(
            NamespacedHash::from_raw(&[]).unwrap_err(),
            Error::InvalidNamespacedHash
        ));
    }
}
