//! Integration tests for `POST /generate-floor`.
//!
//! The external generative API is substituted with the mock provider; no
//! network access is needed.
//!
//! Run with: cargo test -p floorviz-service --test generate_floor

use std::io::Cursor;
use std::sync::Arc;

use floorviz_service::config::{FloorvizConfig, GoogleConfig, ModelConfig, ServerConfig};
use floorviz_service::services::providers::mock::MockImageProvider;
use floorviz_service::services::providers::{ImageProvider, InlineImage};
use floorviz_service::startup::Application;
use image::{DynamicImage, Rgb, RgbImage};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use service_core::config::Config as CoreConfig;

fn test_config(mock_mode: bool) -> FloorvizConfig {
    FloorvizConfig {
        common: CoreConfig { port: 0 },
        google: GoogleConfig { api_key: None },
        models: ModelConfig {
            image_model: "gemini-2.5-flash-image".to_string(),
        },
        server: ServerConfig {
            mock_mode,
            frontend_url: None,
        },
    }
}

async fn spawn_app(config: FloorvizConfig, provider: Option<Arc<dyn ImageProvider>>) -> u16 {
    let app = Application::build_with_provider(config, provider)
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    port
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 80, 40])));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageOutputFormat::Png)
        .expect("Failed to encode PNG");
    buffer.into_inner()
}

fn generate_form(room: Vec<u8>, floor: Vec<u8>, aspect_ratio: Option<&str>) -> Form {
    let mut form = Form::new()
        .part(
            "room_image",
            Part::bytes(room)
                .file_name("room.png")
                .mime_str("image/png")
                .expect("invalid mime"),
        )
        .part(
            "floor_sample",
            Part::bytes(floor)
                .file_name("floor.png")
                .mime_str("image/png")
                .expect("invalid mime"),
        );

    if let Some(ratio) = aspect_ratio {
        form = form.text("aspect_ratio", ratio.to_string());
    }

    form
}

#[tokio::test]
async fn mock_mode_echoes_room_image_bytes() {
    let port = spawn_app(test_config(true), None).await;
    let client = Client::new();

    let room = png_bytes(512, 512);
    // The floor sample is never read in mock mode, so garbage is fine here.
    let form = generate_form(room.clone(), b"not even an image".to_vec(), Some("9:16"));

    let response = client
        .post(format!("http://localhost:{}/generate-floor", port))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("image/png")
    );

    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.as_ref(), room.as_slice());
}

#[tokio::test]
async fn stubbed_single_part_response_is_returned_verbatim() {
    let rendered = b"\x89PNG fake rendered bytes".to_vec();
    let mock = Arc::new(MockImageProvider::new(vec![InlineImage {
        mime_type: Some("image/png".to_string()),
        data: rendered.clone(),
    }]));
    let provider: Arc<dyn ImageProvider> = mock.clone();

    let port = spawn_app(test_config(false), Some(provider)).await;
    let client = Client::new();

    let form = generate_form(png_bytes(512, 512), png_bytes(256, 256), Some("9:16"));

    let response = client
        .post(format!("http://localhost:{}/generate-floor", port))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("image/png")
    );

    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.as_ref(), rendered.as_slice());

    let request = mock.last_request().expect("provider was not called");
    assert_eq!(request.aspect_ratio, "9:16");
    assert_eq!(request.image_sizes.len(), 2);
    assert!(request.prompt.contains("Realistic Floor Replacement"));
}

#[tokio::test]
async fn empty_part_response_falls_back_to_room_image_with_500() {
    let provider: Arc<dyn ImageProvider> = Arc::new(MockImageProvider::new(Vec::new()));

    let port = spawn_app(test_config(false), Some(provider)).await;
    let client = Client::new();

    let room = png_bytes(512, 512);
    let form = generate_form(room.clone(), png_bytes(256, 256), Some("9:16"));

    let response = client
        .post(format!("http://localhost:{}/generate-floor", port))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("image/png")
    );

    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.as_ref(), room.as_slice());
}

#[tokio::test]
async fn invalid_aspect_ratio_is_silently_corrected() {
    let mock = Arc::new(MockImageProvider::new(vec![InlineImage {
        mime_type: Some("image/png".to_string()),
        data: b"rendered".to_vec(),
    }]));
    let provider: Arc<dyn ImageProvider> = mock.clone();

    let port = spawn_app(test_config(false), Some(provider)).await;
    let client = Client::new();

    let form = generate_form(png_bytes(64, 64), png_bytes(32, 32), Some("banana"));

    let response = client
        .post(format!("http://localhost:{}/generate-floor", port))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    // Silent correction: no validation error surfaces to the caller.
    assert_eq!(response.status().as_u16(), 200);

    let request = mock.last_request().expect("provider was not called");
    assert_eq!(request.aspect_ratio, "16:9");
}

#[tokio::test]
async fn missing_aspect_ratio_defaults_to_sixteen_by_nine() {
    let mock = Arc::new(MockImageProvider::new(vec![InlineImage {
        mime_type: None,
        data: b"rendered".to_vec(),
    }]));
    let provider: Arc<dyn ImageProvider> = mock.clone();

    let port = spawn_app(test_config(false), Some(provider)).await;
    let client = Client::new();

    let form = generate_form(png_bytes(64, 64), png_bytes(32, 32), None);

    let response = client
        .post(format!("http://localhost:{}/generate-floor", port))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);

    let request = mock.last_request().expect("provider was not called");
    assert_eq!(request.aspect_ratio, "16:9");
}

#[tokio::test]
async fn unconfigured_provider_is_an_external_call_error() {
    let port = spawn_app(test_config(false), None).await;
    let client = Client::new();

    let form = generate_form(png_bytes(64, 64), png_bytes(32, 32), Some("1:1"));

    let response = client
        .post(format!("http://localhost:{}/generate-floor", port))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 500);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "external_call_error");
}

#[tokio::test]
async fn undecodable_room_image_is_a_decode_error() {
    let provider: Arc<dyn ImageProvider> =
        Arc::new(MockImageProvider::new(vec![InlineImage {
            mime_type: None,
            data: b"rendered".to_vec(),
        }]));

    let port = spawn_app(test_config(false), Some(provider)).await;
    let client = Client::new();

    let form = generate_form(b"garbage".to_vec(), png_bytes(32, 32), Some("1:1"));

    let response = client
        .post(format!("http://localhost:{}/generate-floor", port))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 500);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "decode_error");
}
