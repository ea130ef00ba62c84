//! Systematic Reed-Solomon code over GF(2^8) used to extend the data square.
//!
//! An axis of the extended square consists of `k` data shards followed by `k` parity
//! shards. Any `k` of the `2k` shards are enough to recover the whole axis.

use reed_solomon_erasure::galois_8::ReedSolomon;

use crate::{Error, Result};

/// Reed-Solomon codec producing as many parity shards as there are data shards.
#[derive(Debug)]
pub struct Codec {
    inner: ReedSolomon,
    data_shards: usize,
}

impl Codec {
    /// Create a codec for axes with `data_shards` original shards.
    pub fn new(data_shards: usize) -> Result<Self> {
        let inner = ReedSolomon::new(data_shards, data_shards)?;

        Ok(Codec { inner, data_shards })
    }

    /// Number of original shards in an axis.
    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    /// Fill the second half of `shards` with the parity of the first half.
    ///
    /// Parity shards are resized to the length of the data shards.
    pub fn encode(&self, shards: &mut [Vec<u8>]) -> Result<()> {
        let len = shards.first().map(Vec::len).unwrap_or_default();

        for shard in shards.iter_mut().skip(self.data_shards) {
            shard.resize(len, 0);
        }

        self.inner.encode(shards)?;

        Ok(())
    }

    /// Recover all the missing shards of an axis in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEnoughShares`] if less than a half of the shards is present.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> Result<()> {
        let available = shards.iter().filter(|shard| shard.is_some()).count();

        if available < self.data_shards {
            return Err(Error::NotEnoughShares {
                available,
                required: self.data_shards,
            });
        }

        self.inner.reconstruct(shards)?;

        Ok(())
    }
}

/// Recover a whole row or column of the extended square from any half of its shares.
///
/// Missing shares are `None`, the length of `shares` must be even.
pub fn reconstruct_axis(shares: &mut [Option<Vec<u8>>]) -> Result<()> {
    if shares.is_empty() || shares.len() % 2 != 0 {
        return Err(Error::InvalidInputShape(format!(
            "axis of {} shares can't be reconstructed",
            shares.len()
        )));
    }

    Codec::new(shares.len() / 2)?.reconstruct(shares)
}

#[cfg(test)]
mod tests {
    use rand::RngCore;
    use rstest::rstest;

    use super::*;

    fn random_axis(k: usize, shard_len: usize) -> Vec<Vec<u8>> {
        let mut rng = rand::thread_rng();
        let mut shards = vec![vec![0; shard_len]; 2 * k];

        for shard in shards.iter_mut().take(k) {
            rng.fill_bytes(shard);
        }

        Codec::new(k).unwrap().encode(&mut shards).unwrap();
        shards
    }

    #[test]
    fn encoding_keeps_data_shards() {
        let mut shards = vec![vec![1; 40], vec![2; 40], vec![], vec![]];
        Codec::new(2).unwrap().encode(&mut shards).unwrap();

        assert_eq!(shards[0], vec![1; 40]);
        assert_eq!(shards[1], vec![2; 40]);
        assert_eq!(shards[2].len(), 40);
        assert_eq!(shards[3].len(), 40);
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut first = vec![vec![5; 16], vec![9; 16], vec![0; 16], vec![0; 16]];
        let mut second = first.clone();

        Codec::new(2).unwrap().encode(&mut first).unwrap();
        Codec::new(2).unwrap().encode(&mut second).unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(4)]
    #[case(8)]
    fn any_half_recovers_axis(#[case] k: usize) {
        let shards = random_axis(k, 40);

        // drop the first k, the last k and every second shard
        let patterns: Vec<Box<dyn Fn(usize) -> bool>> = vec![
            Box::new(|i: usize| i < k),
            Box::new(|i: usize| i >= k),
            Box::new(|i: usize| i % 2 == 0),
        ];

        for missing in patterns {
            let mut partial: Vec<_> = shards
                .iter()
                .enumerate()
                .map(|(i, shard)| (!missing(i)).then(|| shard.clone()))
                .collect();

            reconstruct_axis(&mut partial).unwrap();

            let recovered: Vec<_> = partial.into_iter().map(Option::unwrap).collect();
            assert_eq!(recovered, shards);
        }
    }

    #[test]
    fn too_few_shares() {
        let shards = random_axis(4, 40);
        let mut partial: Vec<_> = shards
            .into_iter()
            .enumerate()
            .map(|(i, shard)| (i < 3).then_some(shard))
            .collect();

        let err = reconstruct_axis(&mut partial).unwrap_err();
        assert!(matches!(
            err,
            Error::NotEnoughShares {
                available: 3,
                required: 4
            }
        ));
    }

    #[test]
    fn odd_axis_length() {
        let mut shards = vec![Some(vec![0; 8]), None, None];
        assert!(matches!(
            reconstruct_axis(&mut shards).unwrap_err(),
            Error::InvalidInputShape(_)
        ));
        assert!(matches!(
            reconstruct_axis(&mut []).unwrap_err(),
            Error::InvalidInputShape(_)
        ));
    }
}
