//! Interface of the consensus client supplying raw blocks.

use async_trait::async_trait;
use futures::stream::BoxStream;
use lumina_da_types::RawBlock;
use tendermint::block::Commit;
use tendermint::validator;

/// Stream of the new blocks produced by the consensus.
pub type NewBlockStream = BoxStream<'static, Result<RawBlock, FetcherError>>;

/// Representation of all the errors that can occur when interacting with the [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetcherError {
    /// Requested height isn't known to the consensus client.
    #[error("Height {0} not found")]
    NotFound(u64),

    /// Subscription to the new blocks couldn't be created or broke.
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Consensus client failed to respond.
    #[error("Fetcher transport error: {0}")]
    Transport(String),
}

/// Client of the consensus layer.
///
/// Only the subscription methods are used by the [`BlockService`].
///
/// [`BlockService`]: crate::block_service::BlockService
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Get the raw block at the given height.
    async fn get_block(&self, height: u64) -> Result<RawBlock, FetcherError>;

    /// Get the commit of the block at the given height.
    async fn commit(&self, height: u64) -> Result<Commit, FetcherError>;

    /// Get the validator set which signed the block at the given height.
    async fn validator_set(&self, height: u64) -> Result<validator::Set, FetcherError>;

    /// Subscribe to the blocks produced from now on.
    async fn subscribe_new_block_event(&self) -> Result<NewBlockStream, FetcherError>;

    /// Close the subscription.
    ///
    /// Calling it when there is no subscription is not an error, and it must be safe to
    /// call while new blocks are being sent.
    async fn unsubscribe_new_block_event(&self) -> Result<(), FetcherError>;
}
