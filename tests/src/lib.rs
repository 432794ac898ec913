//! # Speaker Test Suite
//!
//! Unified test crate for the speaker workspace.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── registry_benchmarks.rs   # Registry and reply-handler throughput
//! └── src/
//!     ├── fixtures.rs              # Shared bus/speaker/responder harness
//!     └── integration/
//!         ├── scatter_gather.rs    # One speaker, many responders
//!         └── multi_speaker.rs     # Speakers sharing channels
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p speaker-tests
//!
//! # By category
//! cargo test -p speaker-tests integration::scatter_gather::
//! cargo test -p speaker-tests integration::multi_speaker::
//!
//! # Benchmarks
//! cargo bench -p speaker-tests
//! ```

pub mod fixtures;
pub mod integration;
