//! Key-affine job routing, backlog bounds and liveness supervision of the
//! worker pool.

mod dispatcher;
mod liveness;
mod session;

pub use dispatcher::*;
pub use liveness::*;
pub use session::*;

#[cfg(test)]
mod dispatcher_test;
#[cfg(test)]
mod session_test;
