use std::fmt;
use std::mem;
use std::sync::Arc;

use cid::CidGeneric;

use crate::block::{Block, CidError};
use crate::{Blockstore, Result};

/// Queue of blocks that are written to the [`Blockstore`] with a single
/// [`put_many_keyed`] call.
///
/// Nothing is visible in the store until [`Batch::commit`] succeeds.
///
/// [`put_many_keyed`]: Blockstore::put_many_keyed
pub struct Batch<B, const S: usize> {
    blockstore: Arc<B>,
    blocks: Vec<(CidGeneric<S>, Vec<u8>)>,
}

impl<B, const S: usize> Batch<B, S>
where
    B: Blockstore,
{
    /// Create an empty batch writing into `blockstore`.
    pub fn new(blockstore: Arc<B>) -> Self {
        Batch {
            blockstore,
            blocks: Vec::new(),
        }
    }

    /// Queue the data under a pre-computed CID.
    pub fn add(&mut self, cid: CidGeneric<S>, data: impl Into<Vec<u8>>) {
        self.blocks.push((cid, data.into()));
    }

    /// Queue the block, computing its CID using [`Block`] trait.
    pub fn put<T>(&mut self, block: &T) -> Result<(), CidError>
    where
        T: Block<S>,
    {
        let cid = block.cid()?;
        self.add(cid, block.data());
        Ok(())
    }

    /// Number of blocks waiting for the commit.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if nothing was queued since the last commit.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The store this batch writes into.
    pub fn blockstore(&self) -> &Arc<B> {
        &self.blockstore
    }

    /// Drop all the queued blocks without writing them.
    pub fn discard(&mut self) {
        self.blocks.clear();
    }

    /// Write all the queued blocks in one atomic submission.
    ///
    /// The queue is emptied regardless of the outcome.
    pub async fn commit(&mut self) -> Result<()> {
        let blocks = mem::take(&mut self.blocks);

        if blocks.is_empty() {
            return Ok(());
        }

        self.blockstore.put_many_keyed(blocks).await
    }
}

impl<B, const S: usize> fmt::Debug for Batch<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("queued", &self.blocks.len())
            .finish_non_exhaustive()
    }
}
