//! HTTP delivery of report snapshots.
//!
//! Each snapshot is POSTed as JSON to `<endpoint>/PostEvent`. Only a `200`
//! response counts as delivered; failures are returned to the caller and
//! never retried here.

use crate::core::windowing::ReportSnapshot;
use std::time::Duration;

/// Path the collection endpoint accepts reports on.
pub const POST_EVENT_PATH: &str = "/PostEvent";

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 200;

/// Remote endpoint configuration.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL, e.g. `http://192.168.1.10:5001`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// The URL reports are posted to.
    pub fn post_event_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), POST_EVENT_PATH)
    }
}

/// Delivery error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The client could not be built
    Config(String),
    /// Connection, DNS or timeout failure
    Network(String),
    /// The endpoint answered with something other than 200
    Status { status: u16, body: String },
}

impl TransportError {
    /// The HTTP status code, when the endpoint answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Config(msg) => write!(f, "Transport config error: {msg}"),
            TransportError::Network(msg) => write!(f, "Transport network error: {msg}"),
            TransportError::Status { status, body } if body.is_empty() => {
                write!(f, "POST failed with response code {status}")
            }
            TransportError::Status { status, body } => {
                write!(f, "POST failed with response code {status}: {body}")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Something that can deliver a snapshot to a URL.
pub trait Transport {
    fn send(&self, url: &str, snapshot: &ReportSnapshot) -> Result<(), TransportError>;
}

/// Blocking HTTP transport backed by `reqwest` on a private runtime.
pub struct HttpTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpTransport {
    /// Create a new transport with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::Config(format!("Failed to create runtime: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, runtime })
    }

    async fn post(&self, url: &str, snapshot: &ReportSnapshot) -> Result<(), TransportError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(snapshot)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(TransportError::Status {
                status,
                body: body.trim().to_string(),
            });
        }

        Ok(())
    }
}

impl Transport for HttpTransport {
    fn send(&self, url: &str, snapshot: &ReportSnapshot) -> Result<(), TransportError> {
        self.runtime.block_on(self.post(url, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Accept one connection, capture the request and answer with `status`.
    fn one_shot_server(status: u16) -> (String, std::thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status} Status\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn snapshot() -> ReportSnapshot {
        ReportSnapshot {
            date: "2024-01-22 10:00:00".to_string(),
            keyboard_events: 5,
            mouse_events: 2,
        }
    }

    #[test]
    fn test_post_event_url() {
        let config = EndpointConfig::new("http://127.0.0.1:5001/", Duration::from_secs(10));
        assert_eq!(config.post_event_url(), "http://127.0.0.1:5001/PostEvent");

        let config = EndpointConfig::new("http://example.org:5001", Duration::from_secs(10));
        assert_eq!(config.post_event_url(), "http://example.org:5001/PostEvent");
    }

    #[test]
    fn test_error_display_includes_code() {
        let err = TransportError::Status {
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("503"));
        assert_eq!(TransportError::Network("refused".into()).status(), None);
    }

    #[test]
    fn test_http_post_success() {
        let (base, server) = one_shot_server(200);
        let endpoint = EndpointConfig::new(base, Duration::from_secs(5));
        let transport = HttpTransport::new(endpoint.timeout).unwrap();

        transport
            .send(&endpoint.post_event_url(), &snapshot())
            .unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /PostEvent "));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.contains("\"keyboard_events\":5"));
        assert!(request.contains("\"mouse_events\":2"));
        assert!(request.contains("\"date\":\"2024-01-22 10:00:00\""));
    }

    #[test]
    fn test_non_200_is_failure() {
        let (base, server) = one_shot_server(201);
        let endpoint = EndpointConfig::new(base, Duration::from_secs(5));
        let transport = HttpTransport::new(endpoint.timeout).unwrap();

        let err = transport
            .send(&endpoint.post_event_url(), &snapshot())
            .unwrap_err();
        assert_eq!(err.status(), Some(201));
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_endpoint_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let endpoint = EndpointConfig::new(format!("http://127.0.0.1:{port}"), Duration::from_secs(2));
        let transport = HttpTransport::new(endpoint.timeout).unwrap();

        let err = transport
            .send(&endpoint.post_event_url(), &snapshot())
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
