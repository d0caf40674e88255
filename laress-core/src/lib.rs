// Core library for the Laress runtime
// Bindings, containers, service providers and the application/request scopes built on them

pub mod application;
pub mod binding;
pub mod config;
pub mod container;
pub mod error;
pub mod handler;
pub mod http;
pub mod logging;
pub mod provider;
pub mod request;
pub mod server;
pub mod service_manager;

// Re-export commonly used types
pub use application::*;
pub use binding::{Binding, ResolutionPolicy, ResolverFn, Value};
pub use config::*;
pub use container::*;
pub use error::*;
pub use handler::*;
pub use http::*;
pub use provider::*;
pub use request::*;
pub use service_manager::*;
