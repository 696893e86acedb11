//! Framebuffer readback helpers and PNG encoding.

use image::{ImageBuffer, Rgba};

/// Error type for capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Invalid image data: expected {expected} bytes, got {actual}")]
    InvalidImageData { expected: usize, actual: usize },

    #[error("Image encoding error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("GPU buffer mapping failed")]
    BufferMapFailed,

    #[error("Renderer is not ready for capture")]
    NotReady,
}

/// Row stride of a texture-to-buffer copy, rounded up to wgpu's alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Whether pixels of this format come back in BGRA order.
pub fn is_bgra(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    )
}

/// Strips the per-row padding of a mapped staging buffer.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_bytes_per_row: u32) -> Vec<u8> {
    let row_bytes = (width * 4) as usize;
    data.chunks(padded_bytes_per_row as usize)
        .take(height as usize)
        .flat_map(|row| &row[..row_bytes.min(row.len())])
        .copied()
        .collect()
}

/// Converts tightly packed pixels to an in-memory PNG.
///
/// `bgra` swaps the B and R channels first (wgpu surfaces are usually
/// `Bgra8Unorm`). wgpu uses a top-left origin, so no vertical flip is needed.
pub fn encode_png(pixels: &[u8], width: u32, height: u32, bgra: bool) -> Result<Vec<u8>, CaptureError> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected || expected == 0 {
        return Err(CaptureError::InvalidImageData {
            expected,
            actual: pixels.len(),
        });
    }

    let mut rgba = pixels.to_vec();
    if bgra {
        for chunk in rgba.chunks_exact_mut(4) {
            chunk.swap(0, 2);
        }
    }

    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width, height, rgba).ok_or(CaptureError::InvalidImageData {
            expected,
            actual: pixels.len(),
        })?;

    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn test_unpad_rows() {
        // 2x2 image, rows padded to 12 bytes
        let data = [
            1, 2, 3, 4, 5, 6, 7, 8, 0, 0, 0, 0, //
            9, 10, 11, 12, 13, 14, 15, 16, 0, 0, 0, 0,
        ];
        let pixels = unpad_rows(&data, 2, 2, 12);
        assert_eq!(pixels, (1..=16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_encode_png_swizzles_bgra() {
        let bgra = [0u8, 0, 255, 255]; // red in BGRA order
        let png = encode_png(&bgra, 1, 1, true).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_encode_png_rejects_wrong_length() {
        assert!(matches!(
            encode_png(&[0u8; 7], 1, 2, false),
            Err(CaptureError::InvalidImageData { expected: 8, actual: 7 })
        ));
        assert!(encode_png(&[], 0, 0, false).is_err());
    }

    #[test]
    fn test_bgra_formats() {
        assert!(is_bgra(wgpu::TextureFormat::Bgra8UnormSrgb));
        assert!(!is_bgra(wgpu::TextureFormat::Rgba8Unorm));
    }
}
