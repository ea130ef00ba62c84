use cid::CidGeneric;
use multihash::Multihash;

use crate::block::{Block, CidError};

const RAW_CODEC: u64 = 0x55;
const IDENTITY_CODE: u64 = 0x00;

/// Block addressed by the identity multihash of its 4 bytes.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct TestBlock(pub [u8; 4]);

impl Block<8> for TestBlock {
    fn cid(&self) -> Result<CidGeneric<8>, CidError> {
        let mh = Multihash::wrap(IDENTITY_CODE, &self.0)
            .map_err(|_| CidError::InvalidMultihashLength(self.0.len()))?;
        Ok(CidGeneric::new_v1(RAW_CODEC, mh))
    }

    fn data(&self) -> &[u8] {
        &self.0
    }
}

/// CID with the `digest` wrapped verbatim.
pub fn cid_v1<const S: usize>(digest: impl AsRef<[u8]>) -> CidGeneric<S> {
    CidGeneric::new_v1(RAW_CODEC, Multihash::wrap(IDENTITY_CODE, digest.as_ref()).unwrap())
}
