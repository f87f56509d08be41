// Shared by the integration suites; not every suite uses every helper.
#![allow(dead_code)]

use murmur_core::{Clock, SystemClock};
use murmur_server::{build_router, AppState, ServerConfig};
use murmur_store::EntityStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub async fn spawn_app() -> (SocketAddr, AppState) {
    spawn_app_with_clock(Arc::new(SystemClock)).await
}

pub async fn spawn_app_with_clock(clock: Arc<dyn Clock>) -> (SocketAddr, AppState) {
    let media_root = tempfile::tempdir().expect("tempdir").into_path();
    let config = ServerConfig {
        media_root,
        session_secret: "test-secret".to_string(),
        ..ServerConfig::default()
    };
    let store = EntityStore::open_in_memory().expect("in-memory store");
    let state = AppState::with_clock(store, config, clock);
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    (addr, state)
}

/// Sends one raw HTTP/1.1 request and returns (status, head, body bytes).
pub async fn send_request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<(&str, Vec<u8>)>,
) -> (u16, String, Vec<u8>) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    let mut payload = Vec::new();
    if let Some((content_type, bytes)) = body {
        req.push_str(&format!(
            "Content-Type: {content_type}\r\nContent-Length: {}\r\n",
            bytes.len()
        ));
        payload = bytes;
    }
    req.push_str("\r\n");

    stream.write_all(req.as_bytes()).await.expect("write head");
    stream.write_all(&payload).await.expect("write body");

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("read response");
    let separator = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("http response separator");
    let head = String::from_utf8_lossy(&response[..separator]).to_string();
    let body = response[separator + 4..].to_vec();
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, head, body)
}

/// GET returning the body as text, for HTML pages.
pub async fn get(addr: SocketAddr, path: &str, cookie: Option<&str>) -> (u16, String, String) {
    let (status, head, body) = get_bytes(addr, path, cookie).await;
    (status, head, String::from_utf8_lossy(&body).to_string())
}

pub async fn get_bytes(
    addr: SocketAddr,
    path: &str,
    cookie: Option<&str>,
) -> (u16, String, Vec<u8>) {
    let mut headers: Vec<(&str, &str)> = Vec::new();
    if let Some(cookie) = cookie {
        headers.push(("Cookie", cookie));
    }
    send_request(addr, "GET", path, &headers, None).await
}

pub async fn post_form(
    addr: SocketAddr,
    path: &str,
    cookie: Option<&str>,
    form: &str,
) -> (u16, String, String) {
    let mut headers: Vec<(&str, &str)> = Vec::new();
    if let Some(cookie) = cookie {
        headers.push(("Cookie", cookie));
    }
    let (status, head, body) = send_request(
        addr,
        "POST",
        path,
        &headers,
        Some(("application/x-www-form-urlencoded", form.as_bytes().to_vec())),
    )
    .await;
    (status, head, String::from_utf8_lossy(&body).to_string())
}

const BOUNDARY: &str = "murmurtestboundary";

pub fn multipart_body(
    text: &str,
    group: Option<i64>,
    image: Option<(&str, &[u8])>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{text}\r\n")
            .as_bytes(),
    );
    if let Some(group) = group {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"group\"\r\n\r\n{group}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn post_multipart(
    addr: SocketAddr,
    path: &str,
    cookie: Option<&str>,
    text: &str,
    group: Option<i64>,
    image: Option<(&str, &[u8])>,
) -> (u16, String, String) {
    let (content_type, body) = multipart_body(text, group, image);
    let mut headers: Vec<(&str, &str)> = Vec::new();
    if let Some(cookie) = cookie {
        headers.push(("Cookie", cookie));
    }
    let (status, head, body) =
        send_request(addr, "POST", path, &headers, Some((&content_type, body))).await;
    (status, head, String::from_utf8_lossy(&body).to_string())
}

pub fn header_value(head: &str, name: &str) -> Option<String> {
    let prefix = format!("{}:", name.to_ascii_lowercase());
    head.lines().find_map(|line| {
        line.to_ascii_lowercase()
            .starts_with(&prefix)
            .then(|| line[prefix.len()..].trim().to_string())
    })
}

/// Logs `username` in and returns the session cookie pair to send back.
pub async fn login(addr: SocketAddr, username: &str) -> String {
    let (status, head, _) =
        post_form(addr, "/auth/login/", None, &format!("username={username}")).await;
    assert_eq!(status, 303, "login should redirect");
    let set_cookie = header_value(&head, "set-cookie").expect("session cookie issued");
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}
