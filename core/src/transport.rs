//! Request execution and the response interceptor.
//!
//! # Design
//! A `Transport` performs one round-trip and reports any response the server
//! sent as data, whatever its status. `intercept` then classifies the outcome:
//! 2xx passes through untouched, everything else becomes a `TransportError`
//! which is logged and returned as-is. Nothing here retries or recovers.

use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes a single HTTP round-trip.
///
/// Implementations return `Ok` for every response actually received
/// (including 4xx/5xx) and `Err` only when no response exists.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

/// Blocking transport backed by a shared `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.timeout)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &request.headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), &request.headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), &request.headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), &request.headers).send_empty(),
        };

        let mut response = result.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::NoResponse(format!("reading response body: {e}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Map a `ureq` failure onto the three transport classifications.
fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::StatusCode(status) => TransportError::ServerResponded {
            status,
            body: String::new(),
        },
        err @ (ureq::Error::BadUri(_) | ureq::Error::Http(_) | ureq::Error::InvalidProxyUrl) => {
            TransportError::RequestConstruction(err.to_string())
        }
        other => TransportError::NoResponse(other.to_string()),
    }
}

/// Classify and log the outcome of one round-trip.
///
/// Successful responses are returned unchanged. Failures are logged and
/// returned unchanged as well; the caller always sees the error.
pub fn intercept(
    request: &HttpRequest,
    outcome: Result<HttpResponse, TransportError>,
) -> Result<HttpResponse, TransportError> {
    let err = match outcome {
        Ok(response) if response.is_success() => return Ok(response),
        Ok(response) => TransportError::ServerResponded {
            status: response.status,
            body: response.body,
        },
        Err(err) => err,
    };
    log_failure(Some(request), &err);
    Err(err)
}

/// Emit the structured record for a classified failure. `request` is `None`
/// when the failure happened before a request existed.
pub fn log_failure(request: Option<&HttpRequest>, err: &TransportError) {
    let method = request.map(|r| r.method.to_string()).unwrap_or_default();
    let url = request.map(|r| r.url.as_str()).unwrap_or_default();
    let kind = err.kind();
    match err {
        TransportError::ServerResponded { status, body } => {
            tracing::error!(%kind, %method, url, status, body = %body, "API error");
        }
        TransportError::NoResponse(reason) => {
            tracing::error!(%kind, %method, url, reason = %reason, "network error: no response received");
        }
        TransportError::RequestConstruction(reason) => {
            tracing::error!(%kind, %method, url, reason = %reason, "request error");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, captured.text())
    }

    fn request() -> HttpRequest {
        HttpRequest::json(
            HttpMethod::Post,
            "http://localhost:3000/brain-dumps".to_string(),
            Some("{}".to_string()),
        )
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn success_passes_through_without_logging() {
        let (out, logs) = with_captured_logs(|| intercept(&request(), Ok(response(201, "{}"))));
        assert_eq!(out.unwrap(), response(201, "{}"));
        assert!(logs.is_empty());
    }

    #[test]
    fn non_2xx_is_logged_and_returned() {
        let (out, logs) = with_captured_logs(|| {
            intercept(&request(), Ok(response(500, r#"{"error":"timeout"}"#)))
        });
        assert_eq!(
            out.unwrap_err(),
            TransportError::ServerResponded {
                status: 500,
                body: r#"{"error":"timeout"}"#.to_string()
            }
        );
        assert!(logs.contains("API error"));
        assert!(logs.contains("server_responded"));
        assert!(logs.contains("status=500"));
    }

    #[test]
    fn transport_failure_is_logged_and_returned_unchanged() {
        let original = TransportError::NoResponse("timed out".to_string());
        let (out, logs) = with_captured_logs(|| intercept(&request(), Err(original.clone())));
        assert_eq!(out.unwrap_err(), original);
        assert!(logs.contains("no_response"));

        let original = TransportError::RequestConstruction("bad uri".to_string());
        let (out, logs) = with_captured_logs(|| intercept(&request(), Err(original.clone())));
        assert_eq!(out.unwrap_err(), original);
        assert!(logs.contains("request_construction"));
    }

    #[test]
    fn closures_are_transports() {
        let transport = |req: &HttpRequest| Ok::<_, TransportError>(response(200, &req.url));
        let out = transport.execute(&request()).unwrap();
        assert_eq!(out.body, "http://localhost:3000/brain-dumps");
    }

    #[test]
    fn unreachable_host_is_no_response() {
        let transport = UreqTransport::new(Duration::from_secs(2));
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let req = HttpRequest::json(HttpMethod::Get, format!("http://{addr}/"), None);
        let err = transport.execute(&req).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::NoResponse);
    }

    #[test]
    fn malformed_url_is_request_construction() {
        let transport = UreqTransport::new(Duration::from_secs(2));
        let req = HttpRequest::json(HttpMethod::Get, "not a url".to_string(), None);
        let err = transport.execute(&req).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::RequestConstruction);
    }
}
