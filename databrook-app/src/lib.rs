pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(feature = "server")]
mod app_context;

#[cfg(feature = "server")]
pub use app_context::AppContext;
