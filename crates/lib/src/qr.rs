//! QR rendering for login payloads: PNG data URL for HTTP clients, unicode blocks for the terminal.

use base64::Engine;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::render::unicode;
use qrcode::QrCode;
use std::io::Cursor;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";
/// Pixels per module in the PNG.
const MODULE_PX: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("encoding QR symbol: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("writing PNG: {0}")]
    Png(#[from] image::ImageError),
}

/// Encode `payload` as a QR code PNG and return it as a `data:image/png;base64,...` URL.
pub fn to_data_url(payload: &str) -> Result<String, QrError> {
    let code = QrCode::new(payload.as_bytes())?;
    let img = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PX, MODULE_PX)
        .build();
    let mut png = Vec::new();
    DynamicImage::ImageLuma8(img).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    let mut out = String::with_capacity(DATA_URL_PREFIX.len() + png.len() * 4 / 3 + 4);
    out.push_str(DATA_URL_PREFIX);
    base64::engine::general_purpose::STANDARD.encode_string(&png, &mut out);
    Ok(out)
}

/// Render `payload` as a compact unicode QR code for log output.
pub fn to_terminal(payload: &str) -> Result<String, QrError> {
    let code = QrCode::new(payload.as_bytes())?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}
