//! Request dispatch: path → servlet → operation → envelope → response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use configs::StatusPolicy;
use tracing::{debug, error, info};

use crate::envelope::Envelope;
use crate::metrics::{FAILURES_TOTAL, REQUESTS_TOTAL, REQUEST_DURATION};
use crate::servlet::{normalize_method, ServletRegistry, ServletRequest};

/// Largest form body read into the parameter map.
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

/// Sent when even the envelope could not be serialized.
const FALLBACK_BODY: &[u8] = br#"{"Success":0,"Return":null,"Error":"Internal server error"}"#;

pub struct Dispatcher {
    registry: ServletRegistry,
    status_policy: StatusPolicy,
}

/// axum fallback handler; every path not claimed by another route lands here.
pub async fn dispatch(State(dispatcher): State<Arc<Dispatcher>>, req: Request) -> Response {
    dispatcher.handle(req).await
}

impl Dispatcher {
    pub fn new(registry: ServletRegistry, status_policy: StatusPolicy) -> Self {
        Self { registry, status_policy }
    }

    pub async fn handle(&self, req: Request) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let mut log = AccessLog::start(method.clone(), path.clone());

        let Some(table) = self.registry.lookup(&path) else {
            debug!(%path, "no servlet mounted");
            return self.respond(Envelope::not_found(format!("No matching servlet for path {path}")), &mut log);
        };
        log.servlet = Some(table.servlet());

        let params = match read_params(req).await {
            Ok(params) => params,
            Err(why) => {
                debug!(%path, error = %why, "unreadable request parameters");
                return self.respond(Envelope::client_error("Malformed request parameters"), &mut log);
            }
        };

        let requested = params.get("method").map(String::as_str).unwrap_or_default();
        let Some((op_name, op)) = table.resolve(requested) else {
            let name = normalize_method(requested);
            debug!(servlet = table.servlet(), method = %name, "no matching method");
            return self.respond(
                Envelope::client_error(format!("No matching method {name} on servlet {}", table.servlet())),
                &mut log,
            );
        };
        log.operation = Some(op_name.clone());

        // Own task, so a panicking operation only takes itself down
        let outcome = tokio::spawn(op(ServletRequest::new(method, path, params))).await;
        let envelope = match outcome {
            Ok(Some(envelope)) => match envelope.validate() {
                Ok(()) => envelope,
                Err(why) => {
                    error!(servlet = table.servlet(), op = %op_name, why, "operation returned a malformed envelope");
                    Envelope::server_error()
                }
            },
            Ok(None) => {
                error!(servlet = table.servlet(), op = %op_name, "operation returned no envelope");
                Envelope::server_error()
            }
            Err(join) => {
                FAILURES_TOTAL.with_label_values(&["panic"]).inc();
                error!(servlet = table.servlet(), op = %op_name, error = %join, "operation panicked");
                Envelope::server_error()
            }
        };
        self.respond(envelope, &mut log)
    }

    fn respond(&self, envelope: Envelope, log: &mut AccessLog) -> Response {
        if !envelope.success {
            let kind = match envelope.status_code {
                404 => "not_found",
                400..=499 => "client",
                _ => "server",
            };
            FAILURES_TOTAL.with_label_values(&[kind]).inc();
        }

        let (body, code) = match envelope.to_body() {
            Ok(body) => (body, envelope.status_code),
            Err(e) => {
                error!(error = %e, "envelope serialization failed");
                (FALLBACK_BODY.to_vec(), 500)
            }
        };
        let status = self.transport_status(envelope.success && code == 200, code);
        log.status = status.as_u16();
        log.bytes = body.len();
        (status, [(header::CONTENT_TYPE, "application/json")], Body::from(body)).into_response()
    }

    fn transport_status(&self, success: bool, code: u16) -> StatusCode {
        match self.status_policy {
            StatusPolicy::Legacy if success => StatusCode::OK,
            StatusPolicy::Legacy => StatusCode::INTERNAL_SERVER_ERROR,
            StatusPolicy::Mirror => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

/// Query string and form body merged into one parameter set; body fields win.
/// A request without a content type has no body fields. Any content type
/// other than urlencoded form data is rejected.
async fn read_params(req: Request) -> Result<HashMap<String, String>, String> {
    let mut params: HashMap<String, String> = match req.uri().query() {
        Some(query) => serde_urlencoded::from_str(query).map_err(|e| format!("query: {e}"))?,
        None => HashMap::new(),
    };

    let Some(content_type) = req.headers().get(header::CONTENT_TYPE) else {
        return Ok(params);
    };
    let is_form = content_type
        .to_str()
        .map(|ct| ct.trim_start().starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if !is_form {
        return Err(format!("unsupported content type {content_type:?}"));
    }

    let bytes = axum::body::to_bytes(req.into_body(), MAX_FORM_BYTES)
        .await
        .map_err(|e| format!("body: {e}"))?;
    let body: HashMap<String, String> = serde_urlencoded::from_bytes(&bytes).map_err(|e| format!("body: {e}"))?;
    params.extend(body);
    Ok(params)
}

/// One access-log line per request, written on drop so early returns and
/// abandoned requests are covered. Status 0 means no response was built.
struct AccessLog {
    method: Method,
    path: String,
    servlet: Option<&'static str>,
    operation: Option<String>,
    status: u16,
    bytes: usize,
    started: Instant,
}

impl AccessLog {
    fn start(method: Method, path: String) -> Self {
        Self { method, path, servlet: None, operation: None, status: 0, bytes: 0, started: Instant::now() }
    }
}

impl Drop for AccessLog {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let servlet = self.servlet.unwrap_or("-");
        let status = self.status.to_string();
        REQUESTS_TOTAL.with_label_values(&[servlet, status.as_str()]).inc();
        REQUEST_DURATION.with_label_values(&[servlet]).observe(elapsed.as_secs_f64());
        info!(
            target: "access",
            method = %self.method,
            path = %self.path,
            servlet,
            operation = self.operation.as_deref().unwrap_or("-"),
            status = self.status,
            bytes = self.bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            "request"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servlet::MethodTable;
    use serde_json::{json, Value};

    fn registry() -> ServletRegistry {
        let table = MethodTable::new("demo")
            .op("Serve", |_req| async { Envelope::success(json!({"Hello": "world"})) })
            .op("Echo", |req: ServletRequest| async move { Envelope::success(req.param("text").unwrap_or("").to_string()) })
            .op("Fail", |_req| async { Envelope::client_error("nope") })
            .op("Teapot", |_req| async { Envelope::error_with_code("short and stout", 418) })
            .op("Nothing", |_req| async { None::<Envelope> })
            .op("Broken", |_req| async {
                Envelope { success: true, payload: None, error_message: Some("both".into()), status_code: 200 }
            })
            .op("Explode", |_req| async {
                if true {
                    panic!("operation blew up");
                }
                Envelope::ok()
            })
            .op("hidden", |_req| async { Envelope::success("internal") });
        ServletRegistry::new().mount("/demo", table).unwrap()
    }

    async fn send(d: &Dispatcher, req: Request) -> (StatusCode, Value) {
        let resp = d.handle(req).await;
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request {
        Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
    }

    fn legacy() -> Dispatcher {
        Dispatcher::new(registry(), StatusPolicy::Legacy)
    }

    #[tokio::test]
    async fn default_operation_is_serve() {
        let (status, v) = send(&legacy(), get("/demo")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v, json!({"Success": 1, "Return": {"Hello": "world"}, "Error": null}));
    }

    #[tokio::test]
    async fn unknown_path() {
        let (status, v) = send(&legacy(), get("/nonexistent")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(v["Success"], 0);
        assert_eq!(v["Error"], "No matching servlet for path /nonexistent");
    }

    #[tokio::test]
    async fn unknown_and_internal_methods() {
        let (_, v) = send(&legacy(), get("/demo?method=missing")).await;
        assert_eq!(v["Error"], "No matching method Missing on servlet demo");
        let (_, v) = send(&legacy(), get("/demo?method=hidden")).await;
        assert_eq!(v["Error"], "No matching method Hidden on servlet demo");
        assert_eq!(v["Return"], Value::Null);
    }

    #[tokio::test]
    async fn post_form_body_and_lowercase_method() {
        let req = Request::builder()
            .method("POST")
            .uri("/demo")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("method=echo&text=hi+there"))
            .unwrap();
        let (status, v) = send(&legacy(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["Return"], "hi there");
    }

    #[tokio::test]
    async fn post_reads_method_from_query_string() {
        let req = Request::builder()
            .method("POST")
            .uri("/demo?method=Echo&text=hi")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::empty())
            .unwrap();
        let (_, v) = send(&legacy(), req).await;
        assert_eq!(v["Return"], "hi");
    }

    #[tokio::test]
    async fn body_fields_override_query_fields() {
        let req = Request::builder()
            .method("POST")
            .uri("/demo?method=Echo&text=from-query")
            .header("content-type", "application/x-www-form-urlencoded; charset=utf-8")
            .body(Body::from("text=from-body"))
            .unwrap();
        let (_, v) = send(&legacy(), req).await;
        assert_eq!(v["Return"], "from-body");
    }

    #[tokio::test]
    async fn post_without_content_type_uses_query_only() {
        let req = Request::builder().method("POST").uri("/demo?method=Echo&text=hi").body(Body::empty()).unwrap();
        let (status, v) = send(&legacy(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["Return"], "hi");

        let req = Request::builder().method("POST").uri("/demo").body(Body::empty()).unwrap();
        let (_, v) = send(&legacy(), req).await;
        assert_eq!(v["Return"], json!({"Hello": "world"}));
    }

    #[tokio::test]
    async fn malformed_body_is_client_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/demo")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let d = Dispatcher::new(registry(), StatusPolicy::Mirror);
        let (status, v) = send(&d, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["Error"], "Malformed request parameters");
    }

    #[tokio::test]
    async fn bad_handler_results_become_server_errors() {
        for op in ["Nothing", "Broken", "Explode"] {
            let (status, v) = send(&legacy(), get(&format!("/demo?method={op}"))).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{op}");
            assert_eq!(v, json!({"Success": 0, "Return": null, "Error": "Internal server error"}), "{op}");
        }
    }

    #[tokio::test]
    async fn mirror_policy_uses_embedded_code() {
        let d = Dispatcher::new(registry(), StatusPolicy::Mirror);
        assert_eq!(send(&d, get("/demo?method=Fail")).await.0, StatusCode::BAD_REQUEST);
        assert_eq!(send(&d, get("/demo?method=Teapot")).await.0, StatusCode::IM_A_TEAPOT);
        assert_eq!(send(&d, get("/nowhere")).await.0, StatusCode::NOT_FOUND);
        assert_eq!(send(&d, get("/demo")).await.0, StatusCode::OK);

        let legacy = legacy();
        assert_eq!(send(&legacy, get("/demo?method=Teapot")).await.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
