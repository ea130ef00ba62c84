use std::sync::Arc;
use std::time::Duration;

use lumina_blockstore::Blockstore;
use lumina_da_node::events::{EventChannel, EventSubscriber, NodeEvent};
use lumina_da_node::test_utils::{MockFetcher, MockFetcherHandle};
use lumina_da_node::{BlockService, BlockServiceArgs, BlockServiceConfig};
use lumina_da_types::{DataAvailabilityHeader, RawBlock};
use tokio::time::timeout;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestService<B>
where
    B: Blockstore + 'static,
{
    pub service: BlockService<MockFetcher, B>,
    pub fetcher: MockFetcherHandle,
    pub events: EventSubscriber,
    // keeps the event channel open
    _channel: EventChannel,
}

pub fn new_service<B>(blockstore: Arc<B>, config: BlockServiceConfig) -> TestService<B>
where
    B: Blockstore + 'static,
{
    let (fetcher, handle) = MockFetcher::new();
    let channel = EventChannel::new();
    let events = channel.subscribe();

    let service = BlockService::new(BlockServiceArgs {
        fetcher: Arc::new(fetcher),
        blockstore,
        config,
        event_pub: channel.publisher(),
    });

    TestService {
        service,
        fetcher: handle,
        events,
        _channel: channel,
    }
}

pub fn dah_of(raw: &RawBlock) -> DataAvailabilityHeader {
    DataAvailabilityHeader::from_eds(&raw.extend().unwrap()).unwrap()
}

/// Skip events until one matching the predicate arrives.
pub async fn wait_for_event<P>(events: &mut EventSubscriber, mut predicate: P) -> NodeEvent
where
    P: FnMut(&NodeEvent) -> bool,
{
    timeout(TIMEOUT, async {
        loop {
            let event = events.recv().await.unwrap().event;

            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event not received")
}
