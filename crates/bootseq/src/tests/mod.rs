//! Test suites for the boot sequence.

mod lib_api;
pub(crate) mod support;
mod unit;
