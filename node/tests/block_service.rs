use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lumina_blockstore::{Blockstore, InMemoryBlockstore};
use lumina_da_node::dag::NmtNode;
use lumina_da_node::events::NodeEvent;
use lumina_da_node::test_utils::FailingBlockstore;
use lumina_da_node::{BlockServiceConfig, BlockServiceError, CachePolicy, FetcherError};
use lumina_da_types::consts::MAX_MH_SIZE;
use lumina_da_types::hash::Hash;
use lumina_da_types::nmt::cid_from_namespaced_hash;
use lumina_da_types::test_utils::RawBlockGenerator;
use tokio::time::{sleep, timeout};

use crate::utils::{dah_of, new_service, wait_for_event, TIMEOUT};

mod utils;

#[tokio::test]
async fn extend_store_and_serve_blocks() {
    let blockstore = Arc::new(InMemoryBlockstore::<MAX_MH_SIZE>::new());
    let mut t = new_service(blockstore.clone(), BlockServiceConfig::default());
    let raws = RawBlockGenerator::new(1, 40).next_many(3);

    t.service.start().await.unwrap();
    wait_for_event(&mut t.events, |ev| *ev == NodeEvent::BlockServiceStarted).await;

    for raw in &raws {
        t.fetcher.announce(raw.clone());
    }

    for raw in &raws {
        let eds = raw.extend().unwrap();
        let expected = dah_of(raw);

        let block = t.service.get_block_data(&expected, TIMEOUT).await.unwrap();

        assert_eq!(block.height(), raw.height());
        assert_eq!(block.square_width(), 2);
        assert_eq!(block.data, eds);
        assert_eq!(block.row_roots(), expected.row_roots());
        assert_eq!(block.column_roots(), expected.column_roots());

        // every root is stored as a valid node
        for root in expected.row_roots().iter().chain(expected.column_roots()) {
            let cid = cid_from_namespaced_hash(root).unwrap();
            let bytes = blockstore.get(&cid).await.unwrap().expect("root not stored");
            let node = NmtNode::decode(&cid, &bytes).unwrap();
            assert_eq!(node.hash(), root);
        }
    }

    for raw in &raws {
        let height = raw.height();
        let event =
            wait_for_event(&mut t.events, |ev| matches!(ev, NodeEvent::BlockProcessed { .. }))
                .await;

        assert_eq!(
            event,
            NodeEvent::BlockProcessed {
                height,
                square_width: 2,
                dah_hash: dah_of(raw).hash().to_string(),
            }
        );
    }

    assert_eq!(t.service.cached_blocks().await, 3);
    t.service.stop().await.unwrap();

    // processed blocks outlive the service
    let block = t.service.get_block_by_height(2).await.unwrap();
    assert_eq!(block.dah(), &dah_of(&raws[1]));
}

#[tokio::test]
async fn wait_for_block_until_processed() {
    let blockstore = Arc::new(InMemoryBlockstore::<MAX_MH_SIZE>::new());
    let t = new_service(blockstore, BlockServiceConfig::default());
    let raw = RawBlockGenerator::new(2, 64).next();
    let dah = dah_of(&raw);

    t.service.start().await.unwrap();

    let err = t
        .service
        .get_block_data(&dah, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, BlockServiceError::Timeout));

    let (block, _) = tokio::join!(t.service.get_block_data(&dah, TIMEOUT), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        t.fetcher.announce(raw.clone());
    });

    assert_eq!(block.unwrap().height(), raw.height());
}

#[tokio::test]
async fn failed_commit_drops_only_that_block() {
    let blockstore = Arc::new(FailingBlockstore::new());
    let mut t = new_service(blockstore.clone(), BlockServiceConfig::default());
    let raws = RawBlockGenerator::new(2, 40).next_many(3);
    let dahs: Vec<_> = raws.iter().map(dah_of).collect();

    let poisoned = cid_from_namespaced_hash(&dahs[1].row_root(0).unwrap()).unwrap();
    blockstore.fail_on(&poisoned);

    t.service.start().await.unwrap();

    for raw in &raws {
        t.fetcher.announce(raw.clone());
    }

    // blocks are processed in order, so the second one is already handled
    t.service.get_block_data(&dahs[2], TIMEOUT).await.unwrap();

    let event =
        wait_for_event(&mut t.events, |ev| matches!(ev, NodeEvent::BlockDropped { .. })).await;
    assert!(matches!(event, NodeEvent::BlockDropped { height: 2, .. }));

    assert!(t.service.try_get_block_data(&dahs[0]).await.is_some());
    assert!(t.service.try_get_block_data(&dahs[1]).await.is_none());
    assert!(t.service.get_block_by_height(2).await.is_none());

    // nothing of the dropped block reached the store
    let column_root = cid_from_namespaced_hash(&dahs[1].column_root(0).unwrap()).unwrap();
    assert!(!blockstore.has(&column_root).await.unwrap());
    assert!(!blockstore.has(&poisoned).await.unwrap());

    // one write per block
    assert_eq!(blockstore.write_calls(), 3);
    assert!(t.service.is_running().await);
}

#[tokio::test]
async fn mismatched_data_hash_is_dropped() {
    let blockstore = Arc::new(InMemoryBlockstore::<MAX_MH_SIZE>::new());
    let mut t = new_service(blockstore.clone(), BlockServiceConfig::default());
    let mut gen = RawBlockGenerator::new(1, 40);

    let mut forged = gen.next();
    let other = gen.next();
    forged.header.data_hash = other.header.data_hash;

    let mut uncommitted = gen.next();
    uncommitted.header.data_hash = Hash::None;

    t.service.start().await.unwrap();
    t.fetcher.announce(forged.clone());
    t.fetcher.announce(uncommitted.clone());

    let event =
        wait_for_event(&mut t.events, |ev| matches!(ev, NodeEvent::BlockDropped { .. })).await;
    assert!(matches!(event, NodeEvent::BlockDropped { height: 1, .. }));

    // blocks without data commitment are accepted
    let block = t
        .service
        .get_block_data(&dah_of(&uncommitted), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(block.height(), 3);

    assert!(t.service.get_block_by_height(1).await.is_none());
    let root = cid_from_namespaced_hash(&dah_of(&forged).row_root(0).unwrap()).unwrap();
    assert!(!blockstore.has(&root).await.unwrap());
}

#[tokio::test]
async fn invalid_square_is_dropped() {
    let blockstore = Arc::new(InMemoryBlockstore::<MAX_MH_SIZE>::new());
    let mut t = new_service(blockstore.clone(), BlockServiceConfig::default());
    let mut gen = RawBlockGenerator::new(2, 40);

    let mut broken = gen.next();
    broken.data.pop();
    let valid = gen.next();

    t.service.start().await.unwrap();
    t.fetcher.announce(broken);
    t.fetcher.announce(valid.clone());

    let event =
        wait_for_event(&mut t.events, |ev| matches!(ev, NodeEvent::BlockDropped { .. })).await;
    assert!(matches!(event, NodeEvent::BlockDropped { height: 1, .. }));

    t.service
        .get_block_data(&dah_of(&valid), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(t.service.cached_blocks().await, 1);
}

#[tokio::test]
async fn start_stop_state_errors() {
    let blockstore = Arc::new(InMemoryBlockstore::<MAX_MH_SIZE>::new());
    let t = new_service(blockstore, BlockServiceConfig::default());

    assert!(matches!(
        t.service.stop().await.unwrap_err(),
        BlockServiceError::NotRunning
    ));

    t.service.start().await.unwrap();
    assert!(matches!(
        t.service.start().await.unwrap_err(),
        BlockServiceError::AlreadyRunning
    ));
    assert_eq!(t.fetcher.subscriptions(), 1);

    t.service.stop().await.unwrap();
    assert!(matches!(
        t.service.stop().await.unwrap_err(),
        BlockServiceError::NotRunning
    ));
}

#[tokio::test]
async fn subscription_stream_error_is_fatal() {
    let blockstore = Arc::new(InMemoryBlockstore::<MAX_MH_SIZE>::new());
    let mut t = new_service(blockstore, BlockServiceConfig::default());
    let error = FetcherError::Subscription("connection reset".to_string());

    t.service.start().await.unwrap();
    t.fetcher.announce_error(error.clone());

    let event = wait_for_event(&mut t.events, |ev| {
        matches!(ev, NodeEvent::FatalBlockServiceError { .. })
    })
    .await;
    assert_eq!(
        event,
        NodeEvent::FatalBlockServiceError {
            error: error.to_string()
        }
    );

    match t.service.stop().await.unwrap_err() {
        BlockServiceError::Fetcher(e) => assert_eq!(e, error),
        e => panic!("unexpected error: {e}"),
    }

    assert!(!t.service.is_running().await);
}

#[tokio::test]
async fn restart_after_fatal_stream_error() {
    let blockstore = Arc::new(InMemoryBlockstore::<MAX_MH_SIZE>::new());
    let mut t = new_service(blockstore, BlockServiceConfig::default());
    let raw = RawBlockGenerator::new(1, 40).next();

    t.service.start().await.unwrap();
    t.fetcher
        .announce_error(FetcherError::Subscription("stream closed".to_string()));

    wait_for_event(&mut t.events, |ev| {
        matches!(ev, NodeEvent::FatalBlockServiceError { .. })
    })
    .await;

    timeout(TIMEOUT, async {
        while t.service.is_running().await {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    // no explicit stop needed
    t.service.start().await.unwrap();
    assert!(t.service.is_running().await);
    assert_eq!(t.fetcher.subscriptions(), 2);

    t.fetcher.announce(raw.clone());
    let block = t.service.get_block_data(&dah_of(&raw), TIMEOUT).await.unwrap();
    assert_eq!(block.height(), raw.height());

    t.service.stop().await.unwrap();
}

#[tokio::test]
async fn failed_subscription_keeps_service_stopped() {
    let blockstore = Arc::new(InMemoryBlockstore::<MAX_MH_SIZE>::new());
    let t = new_service(blockstore, BlockServiceConfig::default());
    let error = FetcherError::Transport("consensus client unreachable".to_string());

    t.fetcher.fail_subscription(error.clone());

    match t.service.start().await.unwrap_err() {
        BlockServiceError::Fetcher(e) => assert_eq!(e, error),
        e => panic!("unexpected error: {e}"),
    }

    assert!(!t.service.is_running().await);
    assert!(matches!(
        t.service.stop().await.unwrap_err(),
        BlockServiceError::NotRunning
    ));
}

#[tokio::test]
async fn lru_cache_evicts_old_blocks() {
    let blockstore = Arc::new(InMemoryBlockstore::<MAX_MH_SIZE>::new());
    let config = BlockServiceConfig {
        cache_policy: CachePolicy::Lru(NonZeroUsize::new(2).unwrap()),
    };
    let t = new_service(blockstore.clone(), config);
    let raws = RawBlockGenerator::new(1, 40).next_many(3);

    t.service.start().await.unwrap();

    for raw in &raws {
        t.fetcher.announce(raw.clone());
    }

    t.service
        .get_block_data(&dah_of(&raws[2]), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(t.service.cached_blocks().await, 2);
    assert!(t.service.try_get_block_data(&dah_of(&raws[0])).await.is_none());
    assert!(t.service.get_block_by_height(1).await.is_none());
    assert!(t.service.get_block_by_height(2).await.is_some());

    // eviction doesn't touch the stored trees
    let root = cid_from_namespaced_hash(&dah_of(&raws[0]).row_root(0).unwrap()).unwrap();
    assert!(blockstore.has(&root).await.unwrap());
}
