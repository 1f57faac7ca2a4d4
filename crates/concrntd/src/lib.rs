//! concrntd library surface: the HTTP/WebSocket router and shared state,
//! factored out of the binary so integration tests can drive the router
//! with [`tower::ServiceExt::oneshot`] without a real socket.

pub mod error;
pub mod routes;
pub mod state;
