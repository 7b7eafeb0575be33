//! The matching engine stub.

mod engine;

pub use engine::MatchingEngine;
