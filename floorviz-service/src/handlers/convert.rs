use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use image::GenericImageView;

use crate::error::FloorError;
use crate::services::codec::JPEG_QUALITY;
use crate::startup::AppState;

/// `POST /convert-image`: re-encode an uploaded image as JPEG.
///
/// Accepts anything the codec can decode, HEIC/HEIF included when that
/// capability is compiled in. Alpha and palette sources are flattened to
/// RGB since JPEG cannot carry them.
pub async fn convert_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, FloorError> {
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        FloorError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        if field.name() == Some("file") {
            let data = field.bytes().await.map_err(|e| {
                FloorError::BadRequest(format!("Failed to read file bytes: {}", e))
            })?;
            file_data = Some(data.to_vec());
        }
    }

    let data = file_data.ok_or_else(|| FloorError::BadRequest("No file uploaded".to_string()))?;

    let img = state.codec.decode(&data).map_err(|err| {
        tracing::error!(input_bytes = data.len(), error = %err, "Error converting image");
        err
    })?;

    let jpeg = state.codec.to_jpeg(&img, JPEG_QUALITY)?;

    let (width, height) = img.dimensions();
    tracing::info!(
        width = width,
        height = height,
        input_bytes = data.len(),
        output_bytes = jpeg.len(),
        "Image converted to JPEG"
    );

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response())
}
