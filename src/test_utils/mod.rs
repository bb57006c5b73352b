//! Fixtures shared by the unit tests of every module.
mod event_builder;
mod fakes;
mod store_contract;

pub use event_builder::*;
pub use fakes::*;
pub use store_contract::*;
