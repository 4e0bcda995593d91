pub mod dupcheck;
pub mod entries;
pub mod handlers;
pub mod middleware;
pub mod queue;
pub mod routes;
pub mod trackers;

pub use routes::create_router;
