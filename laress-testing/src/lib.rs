//! Testing utilities for Laress.
//!
//! This crate provides helpers for exercising containers and service
//! providers in tests.
//!
//! ## Overriding Bindings
//!
//! ```
//! use laress_testing::TestContainer;
//!
//! let container = TestContainer::new();
//! container.singleton("clock", |_| Ok(1_700_000_000u64));
//!
//! // Overrides win even over singletons
//! container.override_with("clock", 0u64);
//! assert_eq!(*container.get::<u64>("clock").unwrap(), 0);
//! ```
//!
//! ## Counting Resolutions
//!
//! ```
//! use laress_testing::TestContainer;
//!
//! let container = TestContainer::new();
//! container.counted("db", |_| Ok("sqlite::memory:".to_string()), true);
//!
//! container.get::<String>("db").unwrap();
//! container.get::<String>("db").unwrap();
//! assert_eq!(container.resolutions("db"), 1);
//! ```
//!
//! ## Spy Providers
//!
//! ```
//! use laress_core::Container;
//! use laress_testing::{CallLog, SpyProvider};
//!
//! let log = CallLog::new();
//! let container = Container::new();
//! container
//!     .services()
//!     .add_provider(SpyProvider::new("session", &log).binds("session", 7u32).deferred("session"))
//!     .unwrap();
//!
//! assert_eq!(*container.get::<u32>("session").unwrap(), 7);
//! assert_eq!(log.entries(), ["session:register"]);
//! ```

mod mock;
mod test_container;

pub use mock::{CallLog, SpyProvider};
pub use test_container::TestContainer;
