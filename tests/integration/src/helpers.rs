//! Test helpers for integration tests
//!
//! Provides a test server bound to an ephemeral port, HTTP shortcuts and
//! WebSocket client utilities.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use totalk_common::AppConfig;
use totalk_gateway::{create_app, create_gateway_state, GatewayState};

/// How long a test waits for anything to happen
pub const WAIT: Duration = Duration::from_secs(2);

/// Client side of a WebSocket session
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: GatewayState,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let state = create_gateway_state(config).await?;
        let app = create_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            state,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Make a POST request without a body
    pub async fn post_empty(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).send().await?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.delete(&url).send().await?)
    }

    /// Open a notification session for `user_id`, waiting until it is registered
    pub async fn connect_notify(&self, user_id: &str) -> Result<WsClient> {
        let url = format!("ws://{}/ws/notify?user_id={}", self.addr, user_id);
        let (ws, _) = connect_async(url).await?;

        let hub = self.state.notify_hub();
        eventually(|| hub.contains(user_id)).await?;
        Ok(ws)
    }

    /// Open a chat session, waiting until the room holds `expected` sessions
    pub async fn connect_chat(&self, chat_id: &str, user_id: &str, expected: usize) -> Result<WsClient> {
        let url = format!("ws://{}/ws/chat/{}?user_id={}", self.addr, chat_id, user_id);
        let (ws, _) = connect_async(url).await?;

        let rooms = self.state.rooms();
        eventually(|| rooms.get(chat_id).is_some_and(|room| room.len() == expected)).await?;
        Ok(ws)
    }
}

/// Test configuration: in-memory repositories, fast keepalive and scheduler
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.session.ping_interval_ms = 200;
    config.session.read_timeout_ms = 2_000;
    config.session.write_timeout_ms = 1_000;
    config.notifications.schedule_interval_ms = 50;
    config
}

/// Poll `condition` until it holds or `WAIT` passes
pub async fn eventually<F: Fn() -> bool>(condition: F) -> Result<()> {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        if Instant::now() > deadline {
            bail!("condition not met within {WAIT:?}");
        }
        sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

/// Next data frame parsed as a JSON envelope, skipping keepalive frames
pub async fn next_envelope(ws: &mut WsClient) -> Result<Value> {
    loop {
        match next_frame(ws).await? {
            Message::Text(text) => return Ok(serde_json::from_str(&text)?),
            Message::Ping(_) | Message::Pong(_) => {}
            other => bail!("unexpected frame: {other:?}"),
        }
    }
}

/// Close code of the session, skipping anything sent before it
pub async fn next_close_code(ws: &mut WsClient) -> Result<u16> {
    loop {
        match next_frame(ws).await? {
            Message::Close(Some(frame)) => return Ok(frame.code.into()),
            Message::Close(None) => bail!("close frame without a code"),
            _ => {}
        }
    }
}

async fn next_frame(ws: &mut WsClient) -> Result<Message> {
    let frame = timeout(WAIT, ws.next())
        .await
        .map_err(|_| anyhow!("timed out waiting for a frame"))?
        .ok_or_else(|| anyhow!("socket closed"))??;
    Ok(frame)
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert an error response carries `code`
pub async fn assert_error(response: Response, expected_status: StatusCode, code: &str) -> Result<()> {
    let body: Value = assert_json(response, expected_status).await?;
    if body["code"] != code {
        bail!("Expected error code {code}, got {body}");
    }
    Ok(())
}
