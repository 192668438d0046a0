//! # Settings Storage
//!
//! Key-value store clients used by the settings engine.
//!
//! The engine only needs get/put/list over string keys, so every backend is
//! reached through the [`KvStore`] trait:
//! - [`redis::RedisKvStore`] talks to a remote Redis server with bounded
//!   timeouts and retry
//! - [`memory::InMemoryKvStore`] keeps everything in a `DashMap`, for tests and
//!   single-process deployments

pub mod details;
pub mod keys;
pub mod kv;
pub mod memory;
pub mod redis;

pub use details::StoreDetails;
pub use keys::KeyLayout;
pub use kv::KvStore;
pub use memory::InMemoryKvStore;
pub use redis::RedisKvStore;
