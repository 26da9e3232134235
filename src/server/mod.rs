//! Network listener serving the application.

mod listener;

pub use listener::Server;
