//! Utilities for writing tests.

use rand::{Rng, RngCore};

use crate::consts::NS_SIZE;
use crate::nmt::Namespace;
use crate::{DataAvailabilityHeader, ExtendedDataSquare, RawBlock, RawHeader, Share};

/// [`RawBlock`] generator for testing purposes.
///
/// Generated blocks have random data sorted by namespace and commit to the hash of
/// their [`DataAvailabilityHeader`].
///
/// **WARNING: ALL METHODS PANIC! DO NOT USE IT IN PRODUCTION!**
#[derive(Debug, Clone)]
pub struct RawBlockGenerator {
    ods_width: usize,
    share_size: usize,
    next_height: u64,
}

impl RawBlockGenerator {
    /// Creates new `RawBlockGenerator` producing original squares of `ods_width` with
    /// shares of `share_size` bytes.
    pub fn new(ods_width: usize, share_size: usize) -> RawBlockGenerator {
        RawBlockGenerator::new_from_height(1, ods_width, share_size)
    }

    /// Creates new `RawBlockGenerator` starting from specified height.
    ///
    /// ```
    /// use lumina_da_types::test_utils::RawBlockGenerator;
    ///
    /// let mut gen = RawBlockGenerator::new_from_height(5, 1, 40);
    /// let block5 = gen.next();
    /// assert_eq!(block5.height(), 5);
    /// ```
    pub fn new_from_height(height: u64, ods_width: usize, share_size: usize) -> RawBlockGenerator {
        assert!(share_size >= NS_SIZE, "share can't hold a namespace");

        RawBlockGenerator {
            ods_width,
            share_size,
            next_height: height,
        }
    }

    /// Generates the next block.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> RawBlock {
        let data = random_ods(self.ods_width, self.share_size);
        let eds = ExtendedDataSquare::from_ods(data.clone()).expect("invalid ods");
        let dah = DataAvailabilityHeader::from_eds(&eds).expect("invalid eds");

        let header = RawHeader {
            height: self.next_height,
            data_hash: dah.hash(),
        };
        self.next_height += 1;

        RawBlock { header, data }
    }

    /// Generates the next amount of blocks.
    pub fn next_many(&mut self, amount: u64) -> Vec<RawBlock> {
        (0..amount).map(|_| self.next()).collect()
    }
}

/// Generate a random namespace, never equal to [`Namespace::PARITY_SHARE`].
pub fn random_namespace() -> Namespace {
    let mut rng = rand::thread_rng();
    let mut bytes = [0; NS_SIZE];
    rng.fill_bytes(&mut bytes);
    bytes[0] = rng.gen_range(0..0xff);

    Namespace::new(bytes)
}

/// Generate shares of the given namespace with random payloads.
pub fn random_shares_with_namespace(
    namespace: Namespace,
    amount: usize,
    share_size: usize,
) -> Vec<Share> {
    let mut rng = rand::thread_rng();

    (0..amount)
        .map(|_| {
            let mut payload = vec![0; share_size - NS_SIZE];
            rng.fill_bytes(&mut payload);
            Share::new(namespace, &payload)
        })
        .collect()
}

/// Generate a random original data square of `ods_width` with shares sorted by namespace.
pub fn random_ods(ods_width: usize, share_size: usize) -> Vec<Share> {
    let amount = ods_width * ods_width;

    let mut namespaces: Vec<_> = (0..amount).map(|_| random_namespace()).collect();
    namespaces.sort();

    namespaces
        .into_iter()
        .flat_map(|ns| random_shares_with_namespace(ns, 1, share_size))
        .collect()
}

/// Generate a random [`ExtendedDataSquare`] out of the original square of `ods_width`.
pub fn generate_eds(ods_width: usize, share_size: usize) -> ExtendedDataSquare {
    ExtendedDataSquare::from_ods(random_ods(ods_width, share_size)).expect("invalid ods")
}
