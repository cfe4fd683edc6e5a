#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod extract;
pub mod routes;
pub mod server;
pub mod utils;
