//! In-process vote store for tests and local development.

mod memory_vote_store;

pub use memory_vote_store::{MemoryVoteStore, StoreCall};
