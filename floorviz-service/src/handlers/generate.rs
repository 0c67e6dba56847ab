use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use image::GenericImageView;

use crate::error::FloorError;
use crate::services::aspect::AspectRatio;
use crate::services::codec::JPEG_QUALITY;
use crate::services::providers::{EncodedImage, InlineImage, ProviderError};
use crate::startup::AppState;

/// Instruction sent to the image model together with the two photos.
const FLOOR_PROMPT: &str = "\
Task: Realistic Floor Replacement.
Input 1: A photo of a room with an existing floor (which may be wood, concrete, tile, or carpet).
Input 2: A texture sample of a new flooring (which may be wood or rubber).

Instructions:
1. Identify the floor area in Input 1. accurately using perspective.
2. Replace the material of the floor in Input 1 with the texture from Input 2.
3. CRITICAL: Preserve all original lighting, shadows, and reflections from Input 1. The new wood must appear to be under the same lighting conditions.
4. CRITICAL: Do not cover, add, or alter any furniture, rugs rug edges, baseboards, or decor items sitting on the floor. Mask them out perfectly.
5. CRITICAL: Do not alter or add any elements other than the floor within the image.
6. If the sample is wood planks, orient the wood planks to flow with the room's main perspective lines (vanishing point).
7. Ensure the wood grain scale or sample pattern matches the scale of the room.

Output: A photorealistic image of the room with the new flooring.";

/// `POST /generate-floor`: render the room with the sampled flooring.
///
/// Fields: `room_image`, `floor_sample` (binary), `aspect_ratio` (optional).
/// In mock mode the room upload is echoed back and the floor sample is
/// never read off the wire.
pub async fn generate_floor(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, FloorError> {
    let mock_mode = state.config.server.mock_mode;

    let mut room_data: Option<Vec<u8>> = None;
    let mut floor_data: Option<Vec<u8>> = None;
    let mut aspect_input: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        FloorError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        match field.name() {
            Some("room_image") => {
                let data = field.bytes().await.map_err(|e| {
                    FloorError::BadRequest(format!("Failed to read room image: {}", e))
                })?;
                room_data = Some(data.to_vec());
            }
            Some("floor_sample") if !mock_mode => {
                let data = field.bytes().await.map_err(|e| {
                    FloorError::BadRequest(format!("Failed to read floor sample: {}", e))
                })?;
                floor_data = Some(data.to_vec());
            }
            Some("aspect_ratio") => {
                let text = field.text().await.map_err(|e| {
                    FloorError::BadRequest(format!("Failed to read aspect ratio: {}", e))
                })?;
                aspect_input = Some(text);
            }
            _ => {}
        }
    }

    let room_data = room_data
        .ok_or_else(|| FloorError::BadRequest("Missing room_image upload".to_string()))?;

    let (aspect_ratio, corrected) =
        AspectRatio::normalize(aspect_input.as_deref().unwrap_or_default());
    if corrected && aspect_input.is_some() {
        tracing::warn!(
            received = aspect_input.as_deref().unwrap_or(""),
            using = %aspect_ratio,
            "Invalid aspect ratio received, using default"
        );
    }

    if mock_mode {
        tracing::info!("Running in mock mode, returning original room image");
        return Ok(png_response(StatusCode::OK, room_data));
    }

    let floor_data = floor_data
        .ok_or_else(|| FloorError::BadRequest("Missing floor_sample upload".to_string()))?;

    let provider = state.provider.as_deref().ok_or_else(|| {
        FloorError::ExternalCall(ProviderError::NotConfigured(
            "NANO_BANANA_API_KEY is not set".to_string(),
        ))
    })?;

    let room_img = state.codec.decode(&room_data).map_err(|err| {
        tracing::error!(input_bytes = room_data.len(), error = %err, "Failed to decode room image");
        err
    })?;
    let floor_img = state.codec.decode(&floor_data).map_err(|err| {
        tracing::error!(input_bytes = floor_data.len(), error = %err, "Failed to decode floor sample");
        err
    })?;

    let (room_width, room_height) = room_img.dimensions();
    let (floor_width, floor_height) = floor_img.dimensions();
    tracing::info!(
        room_width = room_width,
        room_height = room_height,
        floor_width = floor_width,
        floor_height = floor_height,
        aspect_ratio = %aspect_ratio,
        "Generating floor replacement"
    );

    let images = [
        EncodedImage {
            mime_type: "image/jpeg",
            data: state.codec.to_jpeg(&room_img, JPEG_QUALITY)?,
        },
        EncodedImage {
            mime_type: "image/jpeg",
            data: state.codec.to_jpeg(&floor_img, JPEG_QUALITY)?,
        },
    ];

    let parts = provider
        .generate(&images, FLOOR_PROMPT, &aspect_ratio)
        .await
        .map_err(|err| {
            tracing::error!(aspect_ratio = %aspect_ratio, error = %err, "Error generating floor");
            err
        })?;

    match first_inline_image(parts) {
        Ok(image) => Ok(png_response(StatusCode::OK, image.data)),
        Err(err) => {
            // Degraded fallback kept for client compatibility: the original
            // room image as a displayable body under an error status.
            tracing::error!(
                error = %err,
                room_bytes = room_data.len(),
                aspect_ratio = %aspect_ratio,
                "No image parts in response, returning original room image"
            );
            Ok(png_response(StatusCode::INTERNAL_SERVER_ERROR, room_data))
        }
    }
}

fn first_inline_image(parts: Vec<InlineImage>) -> Result<InlineImage, FloorError> {
    parts.into_iter().next().ok_or(FloorError::EmptyResult)
}

fn png_response(status: StatusCode, bytes: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}
