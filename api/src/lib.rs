// API library surface, shared by the binary and the integration tests

pub mod handlers;
pub mod routes;
pub mod state;
