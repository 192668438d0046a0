//! Strategies answering "which request is this?" for the settings proxy.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::request::RequestContext;

/// Source of the current request's context.
///
/// Implementations must isolate concurrent callers: each caller observes only
/// its own request's context, never another's.
pub trait RequestContextResolver: Send + Sync + fmt::Debug {
    fn current(&self) -> Option<RequestContext>;
}

/// Always reports that no request is in flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRequestResolver;

impl RequestContextResolver for NoRequestResolver {
    fn current(&self) -> Option<RequestContext> {
        None
    }
}

/// Returns the same context on every call.
#[derive(Debug, Clone, Default)]
pub struct FixedResolver {
    context: Option<RequestContext>
}

impl FixedResolver {
    pub fn new(context: RequestContext) -> Self {
        Self {
            context: Some(context)
        }
    }

    pub fn selecting(selector: impl Into<String>) -> Self {
        Self::new(RequestContext::with_selector(selector))
    }
}

impl RequestContextResolver for FixedResolver {
    fn current(&self) -> Option<RequestContext> {
        self.context.clone()
    }
}

thread_local! {
    static THREAD_REQUEST: RefCell<Option<RequestContext>> = const { RefCell::new(None) };
}

/// Per-thread storage for hosts that run one request per thread.
///
/// The host enters a request with [`ThreadLocalResolver::enter`] (or
/// [`ThreadLocalResolver::scope`]) and the previous value is restored when
/// the guard drops.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadLocalResolver;

impl ThreadLocalResolver {
    pub fn enter(context: RequestContext) -> RequestScopeGuard {
        let previous = THREAD_REQUEST.with(|slot| slot.replace(Some(context)));
        trace!("Entered thread-local request scope");
        RequestScopeGuard {
            previous,
            _not_send: PhantomData
        }
    }

    pub fn scope<R>(context: RequestContext, f: impl FnOnce() -> R) -> R {
        let _guard = Self::enter(context);
        f()
    }
}

impl RequestContextResolver for ThreadLocalResolver {
    fn current(&self) -> Option<RequestContext> {
        THREAD_REQUEST.with(|slot| slot.borrow().clone())
    }
}

/// Restores the thread's previous request context on drop.
///
/// Not `Send`: it must be dropped on the thread that created it.
#[must_use = "the request context is cleared as soon as the guard is dropped"]
pub struct RequestScopeGuard {
    previous: Option<RequestContext>,
    _not_send: PhantomData<*const ()>
}

impl fmt::Debug for RequestScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScopeGuard").finish_non_exhaustive()
    }
}

impl Drop for RequestScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        THREAD_REQUEST.with(|slot| *slot.borrow_mut() = previous);
    }
}

tokio::task_local! {
    static TASK_REQUEST: RequestContext;
}

/// Per-task storage for tokio hosts.
///
/// The context follows the future passed to [`TaskLocalResolver::scope`]
/// across `.await` points and worker threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalResolver;

impl TaskLocalResolver {
    pub async fn scope<F: Future>(context: RequestContext, future: F) -> F::Output {
        TASK_REQUEST.scope(context, future).await
    }
}

impl RequestContextResolver for TaskLocalResolver {
    fn current(&self) -> Option<RequestContext> {
        TASK_REQUEST.try_with(RequestContext::clone).ok()
    }
}

/// Named resolver strategy, selected once at startup from configuration.
///
/// Deserialization goes through [`FromStr`], so serde sources accept the same
/// spellings as plain strings (`"threaded"`, `"Task-Local"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ResolverKind {
    #[default]
    None,
    ThreadLocal,
    TaskLocal
}

impl ResolverKind {
    pub fn build(self) -> Arc<dyn RequestContextResolver> {
        match self {
            ResolverKind::None => Arc::new(NoRequestResolver),
            ResolverKind::ThreadLocal => Arc::new(ThreadLocalResolver),
            ResolverKind::TaskLocal => Arc::new(TaskLocalResolver)
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::None => write!(f, "none"),
            ResolverKind::ThreadLocal => write!(f, "thread_local"),
            ResolverKind::TaskLocal => write!(f, "task_local")
        }
    }
}

impl FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "none" | "" => Ok(ResolverKind::None),
            "thread_local" | "threaded" => Ok(ResolverKind::ThreadLocal),
            "task_local" => Ok(ResolverKind::TaskLocal),
            other => Err(format!("unknown request resolver: {other}"))
        }
    }
}

impl TryFrom<String> for ResolverKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
