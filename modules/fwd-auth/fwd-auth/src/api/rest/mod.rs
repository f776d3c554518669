pub mod handlers;
pub mod problem;
pub mod response;
pub mod routes;
pub mod views;
