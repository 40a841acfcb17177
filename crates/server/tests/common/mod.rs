//! # Common Test Utilities
//!
//! `TestApp` spawns a real server on a random port whose vision provider points
//! at an `httpmock::MockServer`, so endpoint tests exercise the full stack from
//! multipart parsing down to the outbound chat-completions request.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use httpmock::MockServer;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use std::net::SocketAddr;
use stockmeta_server::{
    config::{AppConfig, ExportConfig, PipelineConfig, ProviderConfig, UploadsConfig},
    router::create_router,
    state::build_app_state,
};
use tokio::{net::TcpListener, task::JoinHandle};

pub const CHAT_PATH: &str = "/v1/chat/completions";

/// A configuration that talks to `api_url` with the OpenAI-compatible provider.
pub fn test_config(api_url: String) -> AppConfig {
    AppConfig {
        port: 0,
        provider: ProviderConfig {
            provider: "openai".to_string(),
            api_url: Some(api_url),
            api_key: Some("test-key".to_string()),
            model_name: "mock-vision-model".to_string(),
            json_mode: false,
        },
        pipeline: PipelineConfig::default(),
        export: ExportConfig::default(),
        uploads: UploadsConfig::default(),
    }
}

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub config: AppConfig,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the server with the default test configuration.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_, _| {}).await
    }

    /// Spawns the server after letting the caller adjust the configuration.
    /// The closure also receives the server's own base address.
    pub async fn spawn_with(customize: impl FnOnce(&mut AppConfig, &str)) -> Result<Self> {
        stockmeta_test_utils::setup_tracing();

        let mock_server = MockServer::start_async().await;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let mut config = test_config(mock_server.url(CHAT_PATH));
        customize(&mut config, &address);

        let app_state = build_app_state(config.clone()).await?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        // Give the server a moment to start up.
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            config,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Posts a multipart form to `/generate`, with an optional query string.
    pub async fn generate(&self, query: &str, form: Form) -> Result<reqwest::Response> {
        let url = if query.is_empty() {
            format!("{}/generate", self.address)
        } else {
            format!("{}/generate?{query}", self.address)
        };
        Ok(self.client.post(url).multipart(form).send().await?)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A multipart part carrying one image under the `images` field.
pub fn image_part(filename: &str, mime: &str, bytes: &[u8]) -> Result<Part> {
    Ok(Part::bytes(bytes.to_vec())
        .file_name(filename.to_string())
        .mime_str(mime)?)
}

/// A form with one JPEG per `(filename, bytes)` pair, in order.
pub fn jpeg_form(images: &[(&str, &[u8])]) -> Result<Form> {
    let mut form = Form::new();
    for (filename, bytes) in images {
        form = form.part("images", image_part(filename, "image/jpeg", bytes)?);
    }
    Ok(form)
}
