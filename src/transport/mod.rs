//! Fabric controller access: the push subscription and out-of-band fetches.

mod replay;
mod traits;

pub use replay::*;
pub use traits::*;
