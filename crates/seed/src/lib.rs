#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Seed-data staging for berth fixtures
//!
//! This crate extracts zip seed archives into caller-owned staging roots
//! and removes staged trees when a fixture is done with them. Extraction
//! guards every entry against zip-slip (paths escaping the root); cleanup
//! deletes deepest-first and treats individual stubborn paths as
//! best-effort. Staged roots are typically bind-mounted into a service
//! container before it starts.

mod archive;
mod cleanup;
mod paths;
mod staging;

pub use archive::stage;
pub use cleanup::unstage;
pub use staging::SeedStage;
