mod tally_hub;

pub use tally_hub::TallyHub;
