//! Utilities for writing tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cid::CidGeneric;
use dashmap::DashSet;
use futures::channel::mpsc;
use futures::StreamExt;
use lumina_blockstore::{Blockstore, BlockstoreError, InMemoryBlockstore, Result as StoreResult};
use lumina_da_types::consts::MAX_MH_SIZE;
use lumina_da_types::RawBlock;
use tendermint::block::Commit;
use tendermint::validator;

use crate::fetcher::{Fetcher, FetcherError, NewBlockStream};

type Announcement = Result<RawBlock, FetcherError>;

/// [`Fetcher`] fed by the tests through a [`MockFetcherHandle`].
///
/// Announcements made while nobody is subscribed are delivered to the next subscriber.
#[derive(Debug)]
pub struct MockFetcher {
    inner: Arc<Mutex<MockFetcherInner>>,
}

/// Handle driving a [`MockFetcher`].
#[derive(Debug, Clone)]
pub struct MockFetcherHandle {
    inner: Arc<Mutex<MockFetcherInner>>,
}

#[derive(Debug, Default)]
struct MockFetcherInner {
    sender: Option<mpsc::UnboundedSender<Announcement>>,
    pending: Vec<Announcement>,
    blocks: HashMap<u64, RawBlock>,
    subscribe_error: Option<FetcherError>,
    subscriptions: usize,
}

impl MockFetcher {
    /// Create a new fetcher with a handle to it.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (MockFetcher, MockFetcherHandle) {
        let inner = Arc::new(Mutex::new(MockFetcherInner::default()));

        (
            MockFetcher {
                inner: inner.clone(),
            },
            MockFetcherHandle { inner },
        )
    }
}

impl MockFetcherHandle {
    /// Announce a new block to the subscriber.
    pub fn announce(&self, block: RawBlock) {
        let mut inner = self.inner.lock().expect("poisoned lock");
        inner.blocks.insert(block.height(), block.clone());
        inner.send(Ok(block));
    }

    /// Break the subscription stream with an error.
    pub fn announce_error(&self, error: FetcherError) {
        self.inner.lock().expect("poisoned lock").send(Err(error));
    }

    /// Make the next subscription attempts fail.
    pub fn fail_subscription(&self, error: FetcherError) {
        self.inner.lock().expect("poisoned lock").subscribe_error = Some(error);
    }

    /// Returns `true` if someone is subscribed to the new blocks.
    pub fn is_subscribed(&self) -> bool {
        self.inner.lock().expect("poisoned lock").sender.is_some()
    }

    /// Number of successful subscriptions so far.
    pub fn subscriptions(&self) -> usize {
        self.inner.lock().expect("poisoned lock").subscriptions
    }
}

impl MockFetcherInner {
    fn send(&mut self, announcement: Announcement) {
        match &self.sender {
            Some(sender) => {
                if let Err(e) = sender.unbounded_send(announcement) {
                    // subscriber is gone, keep it for the next one
                    self.sender = None;
                    self.pending.push(e.into_inner());
                }
            }
            None => self.pending.push(announcement),
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get_block(&self, height: u64) -> Result<RawBlock, FetcherError> {
        let inner = self.inner.lock().expect("poisoned lock");
        inner
            .blocks
            .get(&height)
            .cloned()
            .ok_or(FetcherError::NotFound(height))
    }

    async fn commit(&self, height: u64) -> Result<Commit, FetcherError> {
        Err(FetcherError::NotFound(height))
    }

    async fn validator_set(&self, height: u64) -> Result<validator::Set, FetcherError> {
        Err(FetcherError::NotFound(height))
    }

    async fn subscribe_new_block_event(&self) -> Result<NewBlockStream, FetcherError> {
        let mut inner = self.inner.lock().expect("poisoned lock");

        if let Some(e) = inner.subscribe_error.clone() {
            return Err(e);
        }

        let (tx, rx) = mpsc::unbounded();

        for announcement in inner.pending.drain(..) {
            // receiver is alive, it was just created
            let _ = tx.unbounded_send(announcement);
        }

        inner.sender = Some(tx);
        inner.subscriptions += 1;

        Ok(rx.boxed())
    }

    async fn unsubscribe_new_block_event(&self) -> Result<(), FetcherError> {
        self.inner.lock().expect("poisoned lock").sender.take();
        Ok(())
    }
}

/// [`Blockstore`] which refuses whole writes containing any of the poisoned CIDs.
///
/// Refused writes return [`BlockstoreError::BackingStoreError`] and store nothing.
#[derive(Debug, Default)]
pub struct FailingBlockstore {
    inner: InMemoryBlockstore<MAX_MH_SIZE>,
    poisoned: DashSet<Vec<u8>>,
    write_calls: AtomicUsize,
}

impl FailingBlockstore {
    /// Create an empty store.
    pub fn new() -> Self {
        FailingBlockstore::default()
    }

    /// Fail every write which contains the `cid`.
    pub fn fail_on<const S: usize>(&self, cid: &CidGeneric<S>) {
        self.poisoned.insert(cid.to_bytes());
    }

    /// Number of write submissions, including the refused ones.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if nothing was stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn check<const S: usize>(&self, cid: &CidGeneric<S>) -> StoreResult<()> {
        if self.poisoned.contains(&cid.to_bytes()) {
            return Err(BlockstoreError::BackingStoreError(format!(
                "write of {cid} refused"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Blockstore for FailingBlockstore {
    async fn get<const S: usize>(&self, cid: &CidGeneric<S>) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(cid).await
    }

    async fn put_keyed<const S: usize>(&self, cid: &CidGeneric<S>, data: &[u8]) -> StoreResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.check(cid)?;
        self.inner.put_keyed(cid, data).await
    }

    async fn put_many_keyed<const S: usize, D, I>(&self, blocks: I) -> StoreResult<()>
    where
        D: AsRef<[u8]> + Send + Sync,
        I: IntoIterator<Item = (CidGeneric<S>, D)> + Send,
        <I as IntoIterator>::IntoIter: Send,
    {
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        let blocks: Vec<_> = blocks.into_iter().collect();

        for (cid, _) in &blocks {
            self.check(cid)?;
        }

        self.inner.put_many_keyed(blocks).await
    }
}
