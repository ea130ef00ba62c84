//! Hash related types and traits.

/// The hash type used for block commitments.
pub type Hash = tendermint::hash::Hash;
