//! Component extending the blocks announced by the consensus, storing their namespaced
//! merkle trees and serving the extended blocks.
//!
//! Processing of a single block comprises the following steps:
//!
//! 1. Data of the [`RawBlock`] is extended into an [`ExtendedDataSquare`].
//! 2. Namespaced merkle trees of all rows and columns are built. Every tree node is
//!    queued through a single [`NmtNodeAdder`] and the roots form the
//!    [`DataAvailabilityHeader`].
//! 3. Consensus header is validated against the hash of the [`DataAvailabilityHeader`].
//! 4. All queued nodes are written to the [`Blockstore`] in one batch.
//! 5. Assembled [`Block`] is added to the cache and anyone waiting for it is woken up.
//!
//! If any of the steps fails, the block is dropped and the service moves on to the next one.
//! An error of the subscription itself stops the service.
//!
//! [`ExtendedDataSquare`]: lumina_da_types::ExtendedDataSquare

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use lumina_blockstore::Blockstore;
use lumina_da_types::{Block, DataAvailabilityHeader, ExtendedHeader, RawBlock};
use serde::{Deserialize, Serialize};
use tokio::select;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::block_cache::{BlockCache, CachePolicy};
use crate::events::{EventPublisher, NodeEvent};
use crate::executor::{spawn, spawn_blocking};
use crate::fetcher::{Fetcher, FetcherError, NewBlockStream};
use crate::nmt_adder::{derive_header, NmtAdderError, NmtNodeAdder};

type Result<T, E = BlockServiceError> = std::result::Result<T, E>;

/// Representation of all the errors that can occur when interacting with the [`BlockService`].
#[derive(Debug, thiserror::Error)]
pub enum BlockServiceError {
    /// Service was started while it was already running.
    #[error("Block service is already running")]
    AlreadyRunning,

    /// Service was stopped while it wasn't running.
    #[error("Block service is not running")]
    NotRunning,

    /// Requested block didn't appear in time.
    #[error("Timeout while waiting for the block")]
    Timeout,

    /// An error propagated from the [`Fetcher`].
    #[error(transparent)]
    Fetcher(#[from] FetcherError),

    /// An error propagated from the [`NmtNodeAdder`].
    #[error(transparent)]
    NodeAdder(#[from] NmtAdderError),

    /// An error propagated from [`lumina_da_types`].
    #[error(transparent)]
    Types(#[from] lumina_da_types::Error),

    /// Background task panicked or was aborted.
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Configuration of the [`BlockService`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockServiceConfig {
    /// Eviction policy of the processed blocks.
    #[serde(default)]
    pub cache_policy: CachePolicy,
}

/// Arguments used to configure the [`BlockService`].
pub struct BlockServiceArgs<F, B>
where
    F: Fetcher,
    B: Blockstore,
{
    /// Client of the consensus layer.
    pub fetcher: Arc<F>,
    /// Storage of the tree nodes.
    pub blockstore: Arc<B>,
    /// Service configuration.
    pub config: BlockServiceConfig,
    /// Event publisher.
    pub event_pub: EventPublisher,
}

/// Service turning the raw blocks of the consensus into extended blocks.
pub struct BlockService<F, B>
where
    F: Fetcher,
    B: Blockstore + 'static,
{
    fetcher: Arc<F>,
    blockstore: Arc<B>,
    cache: Arc<BlockCache>,
    event_pub: EventPublisher,
    state: Mutex<State>,
}

enum State {
    Stopped,
    Running {
        cancellation_token: CancellationToken,
        worker: JoinHandle<Result<()>>,
    },
}

impl<F, B> BlockService<F, B>
where
    F: Fetcher,
    B: Blockstore + 'static,
{
    /// Create a stopped [`BlockService`].
    pub fn new(args: BlockServiceArgs<F, B>) -> Self {
        BlockService {
            fetcher: args.fetcher,
            blockstore: args.blockstore,
            cache: Arc::new(BlockCache::new(args.config.cache_policy)),
            event_pub: args.event_pub,
            state: Mutex::new(State::Stopped),
        }
    }

    /// Subscribe to the new blocks and start processing them.
    ///
    /// # Errors
    ///
    /// Fails if the service is already running or the subscription couldn't be created.
    /// A service whose worker stopped because of a fatal error can be started again.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        if let State::Running { worker, .. } = &*state {
            if !worker.is_finished() {
                return Err(BlockServiceError::AlreadyRunning);
            }
        }

        // worker died because of a fatal error, clean up after it before resubscribing
        if let State::Running {
            cancellation_token,
            worker,
        } = mem::replace(&mut *state, State::Stopped)
        {
            if let Err(e) = self.shutdown(cancellation_token, worker).await {
                warn!("Restarting block service after an error: {e}");
            }
        }

        let blocks = self.fetcher.subscribe_new_block_event().await?;
        let cancellation_token = CancellationToken::new();

        let worker = Worker {
            cancellation_token: cancellation_token.child_token(),
            blockstore: self.blockstore.clone(),
            cache: self.cache.clone(),
            event_pub: self.event_pub.clone(),
        };
        let event_pub = self.event_pub.clone();

        let worker = spawn(async move {
            let res = worker.run(blocks).await;

            if let Err(e) = &res {
                error!("Block service stopped because of a fatal error: {e}");

                event_pub.send(NodeEvent::FatalBlockServiceError {
                    error: e.to_string(),
                });
            }

            res
        });

        *state = State::Running {
            cancellation_token,
            worker,
        };

        info!("Block service started");
        self.event_pub.send(NodeEvent::BlockServiceStarted);

        Ok(())
    }

    /// Stop processing the new blocks and wait for the worker to finish.
    ///
    /// Blocks processed so far stay available.
    ///
    /// # Errors
    ///
    /// Fails if the service isn't running. If the worker stopped because of a fatal error,
    /// that error is returned.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        match mem::replace(&mut *state, State::Stopped) {
            State::Stopped => Err(BlockServiceError::NotRunning),
            State::Running {
                cancellation_token,
                worker,
            } => self.shutdown(cancellation_token, worker).await,
        }
    }

    async fn shutdown(
        &self,
        cancellation_token: CancellationToken,
        worker: JoinHandle<Result<()>>,
    ) -> Result<()> {
        cancellation_token.cancel();
        let unsubscribe_res = self.fetcher.unsubscribe_new_block_event().await;

        let worker_res = match worker.await {
            Ok(res) => res,
            Err(e) => Err(BlockServiceError::TaskFailed(e.to_string())),
        };

        info!("Block service stopped");
        self.event_pub.send(NodeEvent::BlockServiceStopped);

        worker_res?;
        unsubscribe_res?;

        Ok(())
    }

    /// Returns `true` if the service was started and its worker is still alive.
    pub async fn is_running(&self) -> bool {
        match &*self.state.lock().await {
            State::Stopped => false,
            State::Running { worker, .. } => !worker.is_finished(),
        }
    }

    /// Get the extended block committed to by the `dah`, waiting for it up to `timeout`.
    ///
    /// Dropping the returned future stops waiting.
    ///
    /// # Errors
    ///
    /// Returns [`BlockServiceError::Timeout`] if the block wasn't processed in time.
    pub async fn get_block_data(
        &self,
        dah: &DataAvailabilityHeader,
        timeout: Duration,
    ) -> Result<Arc<Block>> {
        let hash = dah.hash();

        tokio::time::timeout(timeout, self.cache.wait(&hash))
            .await
            .map_err(|_| BlockServiceError::Timeout)
    }

    /// Get the extended block committed to by the `dah` if it was already processed.
    pub async fn try_get_block_data(&self, dah: &DataAvailabilityHeader) -> Option<Arc<Block>> {
        self.cache.get(&dah.hash()).await
    }

    /// Get a processed block by its height.
    pub async fn get_block_by_height(&self, height: u64) -> Option<Arc<Block>> {
        self.cache.get_by_height(height).await
    }

    /// Number of blocks held in the cache.
    pub async fn cached_blocks(&self) -> usize {
        self.cache.len().await
    }
}

impl<F, B> Drop for BlockService<F, B>
where
    F: Fetcher,
    B: Blockstore + 'static,
{
    fn drop(&mut self) {
        if let State::Running {
            cancellation_token,
            ..
        } = self.state.get_mut()
        {
            cancellation_token.cancel();
        }
    }
}

struct Worker<B>
where
    B: Blockstore + 'static,
{
    cancellation_token: CancellationToken,
    blockstore: Arc<B>,
    cache: Arc<BlockCache>,
    event_pub: EventPublisher,
}

impl<B> Worker<B>
where
    B: Blockstore,
{
    async fn run(&self, mut blocks: NewBlockStream) -> Result<()> {
        loop {
            select! {
                _ = self.cancellation_token.cancelled() => break,
                block = blocks.next() => {
                    match block {
                        Some(Ok(raw)) => self.on_new_block(raw).await,
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            debug!("New block subscription ended");
                            break;
                        }
                    }
                }
            }
        }

        debug!("Block service worker stopped");
        Ok(())
    }

    async fn on_new_block(&self, raw: RawBlock) {
        let height = raw.height();

        match self.process_block(raw).await {
            Ok(block) => {
                debug!("Block {height} processed");

                self.event_pub.send(NodeEvent::BlockProcessed {
                    height,
                    square_width: block.square_width(),
                    dah_hash: block.dah().hash().to_string(),
                });
            }
            Err(e) => {
                warn!("Dropping block {height}: {e}");

                self.event_pub.send(NodeEvent::BlockDropped {
                    height,
                    error: e.to_string(),
                });
            }
        }
    }

    async fn process_block(&self, raw: RawBlock) -> Result<Arc<Block>> {
        let blockstore = self.blockstore.clone();

        // extension and hashing are CPU bound
        let (block, mut adder) = spawn_blocking(move || -> Result<_> {
            let eds = raw.extend()?;
            let mut adder = NmtNodeAdder::new(blockstore);
            let dah = derive_header(&eds, &mut adder)?;
            let header = ExtendedHeader::new(raw.header, dah)?;
            let block = Block::new(header, eds)?;

            Ok((block, adder))
        })
        .await
        .map_err(|e| BlockServiceError::TaskFailed(e.to_string()))??;

        adder.commit().await?;

        let block = Arc::new(block);
        self.cache.insert(block.clone()).await;

        Ok(block)
    }
}
