//! Bridge between the namespaced merkle tree construction and the [`Blockstore`].
//!
//! [`NmtNodeAdder`] is a [`NodeVisitor`] which turns every node reported by the tree
//! builder into an [`NmtNode`] and queues it into a single [`Batch`]. Nothing reaches the
//! store until [`NmtNodeAdder::commit`] is called, and a pass which hit an error is
//! never committed.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;

use cid::CidGeneric;
use lumina_blockstore::block::CidError;
use lumina_blockstore::{Batch, Blockstore, BlockstoreError};
use lumina_da_types::consts::MAX_MH_SIZE;
use lumina_da_types::nmt::{cid_from_namespaced_hash, NamespacedHash, NodeVisitor};
use lumina_da_types::{DataAvailabilityHeader, ExtendedDataSquare};
use tracing::debug;

use crate::dag::NmtNode;

type Result<T, E = NmtAdderError> = std::result::Result<T, E>;

/// Representation of all the errors that can occur when storing tree nodes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NmtAdderError {
    /// Tree builder reported a node which is neither a leaf nor a binary inner node.
    #[error("Unexpected number of node children: {0}")]
    UnexpectedArity(usize),

    /// CID of a node couldn't be computed.
    #[error(transparent)]
    Cid(#[from] CidError),

    /// An error propagated from the [`Blockstore`].
    #[error(transparent)]
    Blockstore(#[from] BlockstoreError),

    /// An error propagated from the tree construction.
    #[error(transparent)]
    Types(#[from] lumina_da_types::Error),
}

/// Counters of the nodes seen during a single pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdderStats {
    /// Leaves queued for storing.
    pub leaves: usize,
    /// Leaves skipped because the same leaf was already queued.
    pub duplicate_leaves: usize,
    /// Inner nodes queued for storing.
    pub internal_nodes: usize,
}

/// [`NodeVisitor`] storing the nodes of the built trees in the [`Blockstore`].
///
/// An adder is meant for a single pass over the trees of one block. The first error it
/// encounters is latched, every later visit is refused and [`commit`] returns that error.
///
/// [`commit`]: NmtNodeAdder::commit
pub struct NmtNodeAdder<B>
where
    B: Blockstore,
{
    batch: Batch<B, MAX_MH_SIZE>,
    seen_leaves: HashSet<CidGeneric<MAX_MH_SIZE>>,
    error: Option<NmtAdderError>,
    stats: AdderStats,
}

impl<B> NmtNodeAdder<B>
where
    B: Blockstore,
{
    /// Create an adder with a new batch into the `blockstore`.
    pub fn new(blockstore: Arc<B>) -> Self {
        NmtNodeAdder::with_batch(Batch::new(blockstore))
    }

    /// Create an adder queueing nodes into an existing batch.
    pub fn with_batch(batch: Batch<B, MAX_MH_SIZE>) -> Self {
        NmtNodeAdder {
            batch,
            seen_leaves: HashSet::new(),
            error: None,
            stats: AdderStats::default(),
        }
    }

    /// Returns the batch the nodes are queued into.
    pub fn node_adder(&mut self) -> &mut Batch<B, MAX_MH_SIZE> {
        &mut self.batch
    }

    /// Consumes the adder returning its batch.
    pub fn into_node_adder(self) -> Batch<B, MAX_MH_SIZE> {
        self.batch
    }

    /// Returns the first error hit during this pass.
    pub fn latched_error(&self) -> Option<&NmtAdderError> {
        self.error.as_ref()
    }

    /// Returns the counters of this pass.
    pub fn stats(&self) -> AdderStats {
        self.stats
    }

    /// Write all the queued nodes into the [`Blockstore`] with a single atomic submission.
    ///
    /// # Errors
    ///
    /// Returns the latched error if the pass failed, without writing anything.
    pub async fn commit(&mut self) -> Result<()> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }

        debug!(
            "Committing {} nodes ({} duplicate leaves skipped)",
            self.batch.len(),
            self.stats.duplicate_leaves
        );

        self.batch.commit().await?;

        Ok(())
    }

    fn add_leaf(&mut self, hash: &NamespacedHash, payload: &[u8]) -> Result<()> {
        let cid = cid_from_namespaced_hash(hash)?;

        // the same share is visited from its row and its column
        if !self.seen_leaves.insert(cid) {
            self.stats.duplicate_leaves += 1;
            return Ok(());
        }

        let node = NmtNode::leaf(hash.clone(), payload);
        self.batch.add(cid, node.into_encoded());
        self.stats.leaves += 1;

        Ok(())
    }

    fn add_internal(&mut self, hash: &NamespacedHash, left: &[u8], right: &[u8]) -> Result<()> {
        let node = NmtNode::internal(hash.clone(), left, right)?;
        let cid = node.cid()?;

        self.batch.add(cid, node.into_encoded());
        self.stats.internal_nodes += 1;

        Ok(())
    }

    fn latch(&mut self, error: NmtAdderError) -> ControlFlow<()> {
        debug!("Node adder pass aborted: {error}");

        // nothing of a broken pass may reach the store
        self.batch.discard();
        self.error = Some(error);

        ControlFlow::Break(())
    }
}

impl<B> NodeVisitor for NmtNodeAdder<B>
where
    B: Blockstore,
{
    fn visit(&mut self, hash: &NamespacedHash, children: &[&[u8]]) -> ControlFlow<()> {
        if self.error.is_some() {
            return ControlFlow::Break(());
        }

        let res = match children {
            [payload] => self.add_leaf(hash, payload),
            [left, right] => self.add_internal(hash, left, right),
            _ => Err(NmtAdderError::UnexpectedArity(children.len())),
        };

        match res {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => self.latch(e),
        }
    }
}

/// Compute the [`DataAvailabilityHeader`] of the square, storing the nodes of all its trees
/// through the `adder`.
///
/// If the adder aborted the construction, its latched error is returned as is.
pub fn derive_header<B>(
    eds: &ExtendedDataSquare,
    adder: &mut NmtNodeAdder<B>,
) -> Result<DataAvailabilityHeader>
where
    B: Blockstore,
{
    match DataAvailabilityHeader::from_eds_with_visitor(eds, &mut *adder) {
        Ok(dah) => Ok(dah),
        Err(e) => match adder.latched_error() {
            Some(latched) => Err(latched.clone()),
            None => Err(e.into()),
        },
    }
}
