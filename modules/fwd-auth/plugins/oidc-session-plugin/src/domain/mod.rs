pub mod client;
pub mod service;
pub mod session;
