pub mod handlers;
pub mod routes;
pub mod source_address;

pub use routes::create_router;
