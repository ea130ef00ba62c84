//! In-memory cache of the processed blocks.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::pin::pin;
use std::sync::Arc;

use lru::LruCache;
use lumina_da_types::hash::Hash;
use lumina_da_types::Block;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

/// Eviction policy of the block cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Keep every block for the lifetime of the service.
    #[default]
    Unbounded,
    /// Keep at most the given amount of the most recently used blocks.
    Lru(NonZeroUsize),
}

/// Blocks keyed by the hash of their [`DataAvailabilityHeader`], with an index by height.
///
/// Blocks are inserted fully assembled, so readers either see the whole block or nothing.
///
/// [`DataAvailabilityHeader`]: lumina_da_types::DataAvailabilityHeader
#[derive(Debug)]
pub(crate) struct BlockCache {
    inner: Mutex<CacheInner>,
    /// Notify when a new block is added
    block_added_notifier: Notify,
}

#[derive(Debug)]
struct CacheInner {
    blocks: LruCache<Hash, Arc<Block>>,
    heights: HashMap<u64, Hash>,
}

impl BlockCache {
    pub(crate) fn new(policy: CachePolicy) -> Self {
        let blocks = match policy {
            CachePolicy::Unbounded => LruCache::unbounded(),
            CachePolicy::Lru(capacity) => LruCache::new(capacity),
        };

        BlockCache {
            inner: Mutex::new(CacheInner {
                blocks,
                heights: HashMap::new(),
            }),
            block_added_notifier: Notify::new(),
        }
    }

    pub(crate) async fn insert(&self, block: Arc<Block>) {
        let hash = block.dah().hash();
        let height = block.height();

        {
            let mut inner = self.inner.lock().await;

            // `push` returns either the evicted entry or the replaced one with the same hash.
            // Blocks at different heights can share the hash when their squares are identical.
            if let Some((evicted_hash, evicted)) = inner.blocks.push(hash, block) {
                let evicted_height = evicted.height();

                if evicted_height != height
                    && inner.heights.get(&evicted_height) == Some(&evicted_hash)
                {
                    inner.heights.remove(&evicted_height);
                }
            }

            inner.heights.insert(height, hash);
        }

        self.block_added_notifier.notify_waiters();
    }

    pub(crate) async fn get(&self, hash: &Hash) -> Option<Arc<Block>> {
        self.inner.lock().await.blocks.get(hash).cloned()
    }

    pub(crate) async fn get_by_height(&self, height: u64) -> Option<Arc<Block>> {
        let mut inner = self.inner.lock().await;
        let hash = *inner.heights.get(&height)?;

        inner
            .blocks
            .get(&hash)
            .filter(|block| block.height() == height)
            .cloned()
    }

    pub(crate) async fn len(&self) -> usize {
        self.inner.lock().await.blocks.len()
    }

    /// Wait until a block with the given hash is in the cache.
    pub(crate) async fn wait(&self, hash: &Hash) -> Arc<Block> {
        let mut notifier = pin!(self.block_added_notifier.notified());

        loop {
            if let Some(block) = self.get(hash).await {
                return block;
            }

            // Await for a notification
            notifier.as_mut().await;

            // Reset notifier
            notifier.set(self.block_added_notifier.notified());
        }
    }
}
