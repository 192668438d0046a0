//! Request context resolution for the settings engine.
//!
//! The settings proxy never reads request state directly. It asks an
//! installed [`RequestContextResolver`] for the current [`RequestContext`],
//! whose only job is to carry the optional config set selector. Strategies:
//!
//! 1. [`ThreadLocalResolver`] for thread-per-request hosts
//! 2. [`TaskLocalResolver`] for tokio tasks
//! 3. [`FixedResolver`] for explicit context passing and tests
//! 4. [`NoRequestResolver`] when no dynamic overlay is ever wanted
//!
//! The [`locator`] module is an independent utility that finds a marker file
//! by walking up parent directories.
//!
//! # Example
//!
//! ```rust,ignore
//! use context::{RequestContext, ResolverKind};
//!
//! let resolver = "task_local".parse::<ResolverKind>()?.build();
//! let ctx = RequestContext::from_headers([("X-Dynamic-Setting", "foo")]);
//! context::TaskLocalResolver::scope(ctx, async move {
//!     assert_eq!(resolver.current().unwrap().selector(), Some("foo"));
//! })
//! .await;
//! ```

pub mod locator;
mod request;
mod resolver;

pub use locator::{find_marker, locate_entry_script, locate_entry_script_from};
pub use request::{DEFAULT_SELECTOR_HEADER, RequestContext};
pub use resolver::{
    FixedResolver, NoRequestResolver, RequestContextResolver, RequestScopeGuard, ResolverKind,
    TaskLocalResolver, ThreadLocalResolver
};
