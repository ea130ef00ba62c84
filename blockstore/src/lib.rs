#![cfg_attr(docs_rs, feature(doc_cfg))]
#![doc = "Content addressed block storage with atomic batched writes."]

use async_trait::async_trait;
use cid::CidGeneric;
use multihash::Multihash;

use crate::block::{Block, CidError};

pub use crate::batch::Batch;
pub use crate::in_memory_blockstore::InMemoryBlockstore;

mod batch;
pub mod block;
mod in_memory_blockstore;
#[cfg(test)]
mod test_utils;

/// Error returned when performing operations on [`Blockstore`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockstoreError {
    /// Provided CID is larger than max length supported by the blockstore
    #[error("CID length longer that max allowed by the store")]
    CidTooLong,

    /// Error occured when trying to compute CID.
    #[error("Error generating CID: {0}")]
    CidError(#[from] CidError),

    /// Storage backend refused or failed the write.
    #[error("Backing store reported an error: {0}")]
    BackingStoreError(String),
}

/// Alias for a [`Result`] with the error type [`BlockstoreError`].
///
/// [`Result`]: std::result::Result
pub type Result<T, E = BlockstoreError> = std::result::Result<T, E>;

/// An IPLD blockstore capable of holding arbitrary data indexed by CID.
///
/// Implementations can impose limit on supported CID length, and any operations on longer CIDs
/// will fail with [`CidTooLong`].
///
/// [`CidTooLong`]: BlockstoreError::CidTooLong
#[async_trait]
pub trait Blockstore: Send + Sync {
    /// Gets the block from the blockstore
    async fn get<const S: usize>(&self, cid: &CidGeneric<S>) -> Result<Option<Vec<u8>>>;

    /// Inserts the data with pre-computed CID.
    /// Use [`put`], if you want CID to be computed.
    ///
    /// Inserting data under an already existing CID is not an error, the store keeps
    /// the first copy.
    ///
    /// [`put`]: Blockstore::put
    async fn put_keyed<const S: usize>(&self, cid: &CidGeneric<S>, data: &[u8]) -> Result<()>;

    /// Inserts all the blocks with pre-computed CIDs as a single write.
    ///
    /// Either every block of the iterator lands in the store or none of them does.
    async fn put_many_keyed<const S: usize, D, I>(&self, blocks: I) -> Result<()>
    where
        D: AsRef<[u8]> + Send + Sync,
        I: IntoIterator<Item = (CidGeneric<S>, D)> + Send,
        <I as IntoIterator>::IntoIter: Send;

    /// Checks whether blockstore has block for provided CID
    async fn has<const S: usize>(&self, cid: &CidGeneric<S>) -> Result<bool> {
        Ok(self.get(cid).await?.is_some())
    }

    /// Inserts the data into the blockstore, computing CID using [`Block`] trait.
    async fn put<const S: usize, B>(&self, block: B) -> Result<()>
    where
        B: Block<S>,
    {
        let cid = block.cid()?;
        self.put_keyed(&cid, block.data()).await
    }
}

pub(crate) fn convert_cid<const S: usize, const NEW_S: usize>(
    cid: &CidGeneric<S>,
) -> Result<CidGeneric<NEW_S>> {
    let hash = Multihash::<NEW_S>::wrap(cid.hash().code(), cid.hash().digest())
        .map_err(|_| BlockstoreError::CidTooLong)?;

    CidGeneric::new(cid.version(), cid.codec(), hash).map_err(|_| BlockstoreError::CidTooLong)
}
