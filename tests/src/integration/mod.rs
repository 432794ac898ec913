//! # Integration Tests
//!
//! End-to-end flows over the in-memory bus: speakers, responders and raw
//! bus connections wired together the way a deployment wires them.

pub mod multi_speaker;
