#![cfg_attr(docs_rs, feature(doc_cfg))]
#![doc = "Block service of the data availability layer: extends the raw blocks of the \
consensus, stores their namespaced merkle trees in a content addressed blockstore and \
serves the extended blocks."]

pub mod block_cache;
pub mod block_service;
pub mod dag;
pub mod events;
mod executor;
pub mod fetcher;
pub mod nmt_adder;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::block_cache::CachePolicy;
pub use crate::block_service::{
    BlockService, BlockServiceArgs, BlockServiceConfig, BlockServiceError,
};
pub use crate::fetcher::{Fetcher, FetcherError};
