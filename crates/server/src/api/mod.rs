pub mod catalog;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod update;
pub mod ws;

pub use routes::create_router;
