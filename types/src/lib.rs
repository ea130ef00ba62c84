#![doc = "Core types of the data availability layer: shares, the erasure coded \
extended data square, namespaced merkle trees and the data availability header."]

mod block;
pub mod codec;
pub mod consts;
mod data_availability_header;
pub mod eds;
mod error;
mod extended_header;
pub mod hash;
pub mod nmt;
mod share;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod validate;

pub use crate::block::*;
pub use crate::data_availability_header::*;
pub use crate::eds::{AxisType, ExtendedDataSquare};
pub use crate::error::*;
pub use crate::extended_header::*;
pub use crate::share::*;
pub use crate::validate::*;
