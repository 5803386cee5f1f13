//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no USB stack or
//! flash driver.

mod dispatch_tests;
mod link_tests;
mod mock_hw;
mod registry_tests;
