pub mod error;
pub mod middleware;
pub mod routes;

pub use routes::{create_router, serve, AppState, BoxedStore, StoreFactory, TRUNCATED_HEADER};
