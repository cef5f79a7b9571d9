mod event_stream;
mod http_vote_store;

pub use http_vote_store::HttpVoteStore;
