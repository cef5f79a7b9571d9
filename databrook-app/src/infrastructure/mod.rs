pub mod memory;
pub mod realtime;
pub mod session;

#[cfg(feature = "server")]
pub mod db;

#[cfg(feature = "server")]
pub mod auth;

#[cfg(feature = "client")]
pub mod http;
