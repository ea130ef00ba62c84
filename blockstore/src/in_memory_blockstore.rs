use cid::CidGeneric;
use dashmap::DashMap;

use crate::{convert_cid, Blockstore, Result};

/// Simple in-memory blockstore implementation.
#[derive(Debug)]
pub struct InMemoryBlockstore<const MAX_MULTIHASH_SIZE: usize> {
    map: DashMap<CidGeneric<MAX_MULTIHASH_SIZE>, Vec<u8>>,
}

impl<const MAX_MULTIHASH_SIZE: usize> InMemoryBlockstore<MAX_MULTIHASH_SIZE> {
    /// Create new empty in-memory blockstore
    pub fn new() -> Self {
        InMemoryBlockstore {
            map: DashMap::new(),
        }
    }

    /// Number of blocks held by the store.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the store holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn get_cid(&self, cid: &CidGeneric<MAX_MULTIHASH_SIZE>) -> Option<Vec<u8>> {
        self.map.get(cid).as_deref().cloned()
    }

    fn insert_cid(&self, cid: CidGeneric<MAX_MULTIHASH_SIZE>, data: &[u8]) {
        self.map.entry(cid).or_insert_with(|| data.to_vec());
    }
}

#[async_trait::async_trait]
impl<const MAX_MULTIHASH_SIZE: usize> Blockstore for InMemoryBlockstore<MAX_MULTIHASH_SIZE> {
    async fn get<const S: usize>(&self, cid: &CidGeneric<S>) -> Result<Option<Vec<u8>>> {
        let cid = convert_cid(cid)?;
        Ok(self.get_cid(&cid))
    }

    async fn put_keyed<const S: usize>(&self, cid: &CidGeneric<S>, data: &[u8]) -> Result<()> {
        let cid = convert_cid(cid)?;
        self.insert_cid(cid, data);
        Ok(())
    }

    async fn put_many_keyed<const S: usize, D, I>(&self, blocks: I) -> Result<()>
    where
        D: AsRef<[u8]> + Send + Sync,
        I: IntoIterator<Item = (CidGeneric<S>, D)> + Send,
        <I as IntoIterator>::IntoIter: Send,
    {
        // Conversion is the only fallible step, so do all of it before touching the map.
        let blocks = blocks
            .into_iter()
            .map(|(cid, data)| {
                convert_cid::<S, MAX_MULTIHASH_SIZE>(&cid).map(|cid| (cid, data))
            })
            .collect::<Result<Vec<_>>>()?;

        for (cid, data) in blocks {
            self.insert_cid(cid, data.as_ref());
        }

        Ok(())
    }

    async fn has<const S: usize>(&self, cid: &CidGeneric<S>) -> Result<bool> {
        let cid = convert_cid(cid)?;
        Ok(self.map.contains_key(&cid))
    }
}

impl<const MAX_MULTIHASH_SIZE: usize> Default for InMemoryBlockstore<MAX_MULTIHASH_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::test_utils::{cid_v1, TestBlock};
    use crate::BlockstoreError;

    #[tokio::test]
    async fn get_what_was_put() {
        let store = InMemoryBlockstore::<64>::new();
        let cid = cid_v1::<64>(b"node");

        assert_eq!(store.get(&cid).await.unwrap(), None);
        assert!(!store.has(&cid).await.unwrap());

        store.put_keyed(&cid, b"data").await.unwrap();

        assert_eq!(store.get(&cid).await.unwrap().unwrap(), b"data");
        assert!(store.has(&cid).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn first_copy_wins() {
        let store = InMemoryBlockstore::<64>::new();
        let cid = cid_v1::<64>(b"node");

        store.put_keyed(&cid, b"first").await.unwrap();
        store.put_keyed(&cid, b"second").await.unwrap();
        store
            .put_many_keyed([(cid, b"third".to_vec())])
            .await
            .unwrap();

        assert_eq!(store.get(&cid).await.unwrap().unwrap(), b"first");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn cid_size_is_converted() {
        let store = InMemoryBlockstore::<128>::new();

        store.put_keyed(&cid_v1::<32>(b"1"), b"data").await.unwrap();

        for data in [
            store.get(&cid_v1::<32>(b"1")).await.unwrap(),
            store.get(&cid_v1::<64>(b"1")).await.unwrap(),
            store.get(&cid_v1::<128>(b"1")).await.unwrap(),
        ] {
            assert_eq!(data.unwrap(), b"data");
        }
    }

    #[tokio::test]
    async fn too_long_cid() {
        let store = InMemoryBlockstore::<8>::new();
        let fits = cid_v1::<64>([1; 8]);
        let too_long = cid_v1::<64>([1; 48]);

        store.put_keyed(&fits, b"1").await.unwrap();

        assert_eq!(
            store.put_keyed(&too_long, b"1").await.unwrap_err(),
            BlockstoreError::CidTooLong
        );
        assert_eq!(
            store.get(&too_long).await.unwrap_err(),
            BlockstoreError::CidTooLong
        );
        assert_eq!(
            store.has(&too_long).await.unwrap_err(),
            BlockstoreError::CidTooLong
        );
    }

    #[tokio::test]
    async fn put_many_blocks() {
        let store = InMemoryBlockstore::<8>::new();
        let blocks: Vec<_> = (0..8).map(|i| TestBlock([0, 0, 0, i])).collect();
        let missing = TestBlock([1, 0, 0, 0]);

        store
            .put_many_keyed(blocks.iter().map(|b| (b.cid().unwrap(), b.0)))
            .await
            .unwrap();

        for block in &blocks {
            let data = store.get(&block.cid().unwrap()).await.unwrap().unwrap();
            assert_eq!(data, block.data());
        }
        assert!(!store.has(&missing.cid().unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn put_many_keyed_is_all_or_nothing() {
        let store = InMemoryBlockstore::<16>::new();

        let small = cid_v1::<64>([1; 4]);
        let too_long = cid_v1::<64>([2; 32]);

        let err = store
            .put_many_keyed(vec![(small, b"a".to_vec()), (too_long, b"b".to_vec())])
            .await
            .unwrap_err();
        assert_eq!(err, BlockstoreError::CidTooLong);

        assert!(!store.has(&small).await.unwrap());
        assert!(store.is_empty());
    }
}
