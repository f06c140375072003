//! Test helpers and utilities

use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use weaver::{Server, ServerConfig, Weaver};

/// In-process weaver server on a random local port.
pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
}

/// Server tuning for a test.
#[derive(Default)]
pub struct Options {
    pub threads: usize,
    pub shuffle: bool,
    pub request_timeout: Option<Duration>,
}

#[allow(dead_code)]
impl TestServer {
    /// Start a server whose worker file holds `lines`.
    pub async fn start(lines: &[&str]) -> Self {
        Self::start_with(lines, Options::default()).await
    }

    pub async fn start_with(lines: &[&str], options: Options) -> Self {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create worker file");
        for line in lines {
            writeln!(file, "{}", line).expect("Failed to write worker file");
        }
        Self::from_file(file.path(), options).await
    }

    /// Start a server from an existing worker file.
    pub async fn from_file(path: &Path, options: Options) -> Self {
        let mut weaver = Weaver::default();
        weaver.load_file(path).expect("Failed to load worker file");
        let dispatcher = Arc::new(
            weaver
                .start(options.threads, options.shuffle)
                .expect("Failed to start dispatcher"),
        );

        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap())
            .with_request_timeout(options.request_timeout);
        let server = Arc::new(
            Server::bind(config, dispatcher)
                .await
                .expect("Failed to bind server"),
        );
        let addr = server.local_addr();

        let running = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = running.run().await;
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{}", addr),
            addr,
            client,
            server,
        }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Make a POST request with a raw body
    pub async fn post(&self, path: &str, body: &'static str) -> Response {
        self.post_with_headers(path, body, &[]).await
    }

    /// Make a POST request with a raw body and custom headers
    pub async fn post_with_headers(
        &self,
        path: &str,
        body: &'static str,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut req = self.client.post(format!("{}{}", self.base_url, path)).body(body);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        req.send().await.expect("POST request failed")
    }

    /// Send a bare HTTP/1.1 request and return the status line.
    pub async fn raw_status_line(&self, path: &str) -> String {
        let mut stream = TcpStream::connect(self.addr)
            .await
            .expect("Failed to connect");
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path, self.addr
        );
        stream
            .write_all(request.as_bytes())
            .await
            .expect("Failed to write request");

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .await
            .expect("Failed to read response");
        String::from_utf8_lossy(&raw)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.trigger_shutdown();
        self.server.shutdown();
    }
}

/// Path of a file under tests/fixtures.
pub fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response has header present
pub fn assert_has_header(response: &Response, name: &str) {
    assert!(
        response.headers().contains_key(name),
        "Header '{}' not found",
        name
    );
}

/// Assert that response contains header
pub fn assert_header(response: &Response, name: &str, expected: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert_eq!(value, expected, "Header '{}' mismatch", name);
}

/// Assert the exact response body
pub async fn assert_body(response: Response, expected: &str) {
    let body = response.text().await.expect("Failed to read body");
    assert_eq!(body, expected);
}
