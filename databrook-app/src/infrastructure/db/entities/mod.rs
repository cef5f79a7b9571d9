pub mod outcome;
pub mod user;
pub mod video;
pub mod vote;

pub use outcome::Entity as Outcome;
pub use user::Entity as User;
pub use video::Entity as Video;
pub use vote::Entity as Vote;
