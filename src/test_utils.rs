//! Shared test utilities for the dashboard crate.
//!
//! Builders for account hierarchies with sensible defaults, plus a one-shot
//! local HTTP server for exercising the API client without a real backend.

use crate::{
    api::client::ApiClient,
    config::{app::AppConfig, session::RequestContext},
    core::{accounts::Account, money::MonetaryAmount},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

/// Creates an account with the given shape.
///
/// # Defaults
/// * `description`: `"Cuenta <code>"`
/// * `balance`: 0
pub fn account(code: &str, is_header: bool, parent: Option<&str>, children: Vec<Account>) -> Account {
    Account {
        code: code.to_string(),
        description: format!("Cuenta {code}"),
        is_header,
        parent_code: parent.map(str::to_string),
        balance: MonetaryAmount::Number(0.0),
        children,
        ..Account::default()
    }
}

/// Detail account without children.
pub fn detail(code: &str, parent: Option<&str>) -> Account {
    account(code, false, parent, Vec::new())
}

/// Header account with the given children.
pub fn header(code: &str, parent: Option<&str>, children: Vec<Account>) -> Account {
    account(code, true, parent, children)
}

/// Small chart of accounts with siblings deliberately out of order:
///
/// ```text
/// 2
///   2.1
/// 1
///   1.2
///   1.10
///     1.10.01
///   1.1
/// ```
pub fn sample_tree() -> Vec<Account> {
    vec![
        header("2", None, vec![detail("2.1", Some("2"))]),
        header(
            "1",
            None,
            vec![
                detail("1.2", Some("1")),
                header("1.10", Some("1"), vec![detail("1.10.01", Some("1.10"))]),
                detail("1.1", Some("1")),
            ],
        ),
    ]
}

/// A single chain `n` levels deep, built bottom-up without recursion.
pub fn deep_chain(n: usize) -> Account {
    let mut node = detail(&format!("n{}", n.saturating_sub(1)), None);
    for level in (0..n.saturating_sub(1)).rev() {
        node.parent_code = Some(format!("n{level}"));
        node = header(&format!("n{level}"), None, vec![node]);
    }
    node
}

/// Client pointed at `base_url` with default settings.
#[allow(clippy::unwrap_used)]
pub fn client_for(base_url: &str, context: RequestContext) -> ApiClient {
    let config = AppConfig {
        backend_url: base_url.to_string(),
        ..AppConfig::default()
    };
    ApiClient::new(&config, context).unwrap()
}

/// Serves exactly one request with `status` and a JSON `body`.
///
/// Returns the base URL to point a client at, and a handle resolving to the
/// raw request text (request line, headers and body) the server received.
#[allow(clippy::unwrap_used)]
pub async fn spawn_json_server(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            reason_phrase(status),
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (base_url, handle)
}

#[allow(clippy::unwrap_used)]
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    let header_end = loop {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            return String::from_utf8_lossy(&buffer).into_owned();
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    String::from_utf8_lossy(&buffer).into_owned()
}

const fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}
