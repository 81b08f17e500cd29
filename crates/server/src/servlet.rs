//! Servlets and their operation tables.
//!
//! Each servlet registers its operations by name at startup. Lookup goes
//! through [`MethodTable::resolve`], which only ever returns operations whose
//! name starts with an ASCII upper-case letter.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::Method;
use tracing::{debug, warn};

use crate::envelope::{Envelope, HandlerOutput};
use crate::errors::StartupError;

/// Operation invoked when the request names no method.
pub const DEFAULT_OPERATION: &str = "Serve";

pub type HandlerFuture = Pin<Box<dyn Future<Output = Option<Envelope>> + Send>>;

/// A registered operation. Takes the request as its only argument.
pub type Operation = Arc<dyn Fn(ServletRequest) -> HandlerFuture + Send + Sync>;

/// What an operation gets to see of the HTTP request.
#[derive(Debug, Clone)]
pub struct ServletRequest {
    pub http_method: Method,
    pub path: String,
    params: HashMap<String, String>,
}

impl ServletRequest {
    pub fn new(http_method: Method, path: impl Into<String>, params: HashMap<String, String>) -> Self {
        Self { http_method, path: path.into(), params }
    }

    /// Trimmed parameter value; blank counts as absent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    /// Raw parameter value without trimming, for secrets such as passwords.
    pub fn raw_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Like [`ServletRequest::param`], but a missing value is a client error.
    pub fn require(&self, name: &str) -> Result<&str, Envelope> {
        self.param(name).ok_or_else(|| Envelope::client_error(format!("Missing parameter {name}")))
    }

    pub fn require_raw(&self, name: &str) -> Result<&str, Envelope> {
        self.raw_param(name).ok_or_else(|| Envelope::client_error(format!("Missing parameter {name}")))
    }
}

/// Public operations start with an ASCII upper-case letter.
pub fn is_public(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Requested method name as it is looked up: blank becomes
/// [`DEFAULT_OPERATION`], otherwise the first character is upper-cased.
///
/// ```
/// use server::servlet::normalize_method;
/// assert_eq!(normalize_method(""), "Serve");
/// assert_eq!(normalize_method("login"), "Login");
/// assert_eq!(normalize_method("Check"), "Check");
/// ```
pub fn normalize_method(requested: &str) -> String {
    let requested = requested.trim();
    let mut chars = requested.chars();
    match chars.next() {
        None => DEFAULT_OPERATION.to_string(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Adapt `f(service, request)` to the single-argument operation shape by
/// capturing a shared handle to `service`.
pub fn bind<S, F, Fut>(service: &Arc<S>, f: F) -> impl Fn(ServletRequest) -> Fut + Send + Sync + 'static
where
    S: Send + Sync + 'static + ?Sized,
    F: Fn(Arc<S>, ServletRequest) -> Fut + Send + Sync + 'static,
{
    let service = Arc::clone(service);
    move |req| f(Arc::clone(&service), req)
}

/// Operations of one servlet, split into public and internal ones.
pub struct MethodTable {
    servlet: &'static str,
    public: HashMap<String, Operation>,
    internal: HashMap<String, Operation>,
}

impl MethodTable {
    pub fn new(servlet: &'static str) -> Self {
        Self { servlet, public: HashMap::new(), internal: HashMap::new() }
    }

    pub fn servlet(&self) -> &'static str {
        self.servlet
    }

    /// Register `name`. Names that are not public are kept as internal
    /// operations and are never reachable through [`MethodTable::resolve`].
    pub fn op<F, Fut, O>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(ServletRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: HandlerOutput,
    {
        let op: Operation = Arc::new(move |req: ServletRequest| -> HandlerFuture {
            let fut = f(req);
            Box::pin(async move { fut.await.into_envelope() })
        });
        let slot = if is_public(name) { &mut self.public } else { &mut self.internal };
        if slot.insert(name.to_string(), op).is_some() {
            warn!(servlet = self.servlet, op = name, "operation registered twice; last one wins");
        }
        self
    }

    /// Exact-match lookup after [`normalize_method`].
    pub fn resolve(&self, requested: &str) -> Option<(String, Operation)> {
        let name = normalize_method(requested);
        if !is_public(&name) {
            return None;
        }
        self.public.get(&name).map(|op| (name, Arc::clone(op)))
    }

    pub fn public_names(&self) -> Vec<&str> {
        sorted_names(&self.public)
    }

    /// Registered but never dispatched over HTTP.
    pub fn internal_names(&self) -> Vec<&str> {
        sorted_names(&self.internal)
    }
}

fn sorted_names(ops: &HashMap<String, Operation>) -> Vec<&str> {
    let mut names: Vec<&str> = ops.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Path → servlet table. Built once at startup; read-only afterwards.
#[derive(Default)]
pub struct ServletRegistry {
    by_path: HashMap<String, Arc<MethodTable>>,
}

impl ServletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `table` at `path`. Paths are unique.
    pub fn mount(mut self, path: &str, table: MethodTable) -> Result<Self, StartupError> {
        let path = canonical_path(path);
        if self.by_path.contains_key(&path) {
            return Err(StartupError::DuplicateServlet(path));
        }
        debug!(
            %path,
            servlet = table.servlet(),
            ops = ?table.public_names(),
            internal = ?table.internal_names(),
            "servlet mounted"
        );
        self.by_path.insert(path, Arc::new(table));
        Ok(self)
    }

    pub fn lookup(&self, path: &str) -> Option<Arc<MethodTable>> {
        self.by_path.get(&canonical_path(path)).cloned()
    }
}

/// `/session/` and `/session` name the same servlet.
fn canonical_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() }
}
