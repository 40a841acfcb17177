mod common;

use anyhow::Result;
use common::TestApp;
use reqwest::StatusCode;

#[tokio::test]
async fn test_root_and_health_check() -> Result<()> {
    let app = TestApp::spawn().await?;

    let root = app.client.get(format!("{}/", app.address)).send().await?;
    assert_eq!(root.status(), StatusCode::OK);
    assert_eq!(root.text().await?, "stockmeta server is running.");

    let health = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await?;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_uploads_are_not_served_for_inline_encoding() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .get(format!("{}/uploads/anything.jpg", app.address))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_generate_requires_post() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .get(format!("{}/generate", app.address))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn test_generate_rejects_non_multipart_body() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .post(format!("{}/generate", app.address))
        .json(&serde_json::json!({ "images": [] }))
        .send()
        .await?;
    assert!(response.status().is_client_error());
    Ok(())
}
