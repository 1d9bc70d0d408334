//! Frame capture for the visible and identity targets.

use std::path::Path;

use image::{ImageBuffer, Rgba};

use crate::error::{RenderError, RenderResult};

/// Options for saving captured frames.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Force every alpha byte to 255.
    ///
    /// Identity colours of low handles have alpha 0 and would otherwise
    /// save as fully transparent pixels.
    pub opaque: bool,
}

/// Calculates bytes per row with proper alignment for wgpu buffer copies.
pub(crate) fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4; // RGBA8
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

/// Copies an RGBA8 texture into tightly packed rows, top row first.
pub(crate) fn read_texture_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> RenderResult<Vec<u8>> {
    let bytes_per_row = aligned_bytes_per_row(width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("capture readback buffer"),
        size: u64::from(bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("capture copy encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| RenderError::PollFailed(e.to_string()))?;
    rx.recv()
        .map_err(|e| RenderError::BufferMapFailed(e.to_string()))?
        .map_err(|e| RenderError::BufferMapFailed(e.to_string()))?;

    // Copy data, removing row padding
    let data = buffer_slice.get_mapped_range();
    let row_bytes = width as usize * 4;
    let mut result = Vec::with_capacity(row_bytes * height as usize);
    for row in data.chunks_exact(bytes_per_row as usize) {
        result.extend_from_slice(&row[..row_bytes]);
    }
    drop(data);
    buffer.unmap();

    Ok(result)
}

fn to_image(
    data: &[u8],
    width: u32,
    height: u32,
    options: &CaptureOptions,
) -> RenderResult<ImageBuffer<Rgba<u8>, Vec<u8>>> {
    let mut rgba = data.to_vec();
    if options.opaque {
        for pixel in rgba.chunks_exact_mut(4) {
            pixel[3] = 255;
        }
    }
    // wgpu uses a top-left origin, so no vertical flip is needed
    ImageBuffer::from_raw(width, height, rgba).ok_or_else(|| {
        RenderError::ImageSaveFailed(format!(
            "{} bytes do not form a {width}x{height} RGBA image",
            data.len()
        ))
    })
}

/// Saves RGBA pixel rows (top row first) to a `.png`, `.jpg` or `.jpeg` file.
pub fn save_image(
    filename: impl AsRef<Path>,
    data: &[u8],
    width: u32,
    height: u32,
    options: &CaptureOptions,
) -> RenderResult<()> {
    let path = filename.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_image(data, width, height, options)?;
    let saved = match extension.as_str() {
        "png" => img.save_with_format(path, image::ImageFormat::Png),
        "jpg" | "jpeg" => image::DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .save_with_format(path, image::ImageFormat::Jpeg),
        _ => {
            return Err(RenderError::ImageSaveFailed(format!(
                "unsupported image format '{extension}'"
            )))
        }
    };
    saved.map_err(|e| RenderError::ImageSaveFailed(e.to_string()))?;
    log::info!("saved {width}x{height} capture to {}", path.display());
    Ok(())
}

/// Encodes RGBA pixel rows (top row first) as PNG in memory.
pub fn encode_png(
    data: &[u8],
    width: u32,
    height: u32,
    options: &CaptureOptions,
) -> RenderResult<Vec<u8>> {
    let img = to_image(data, width, height, options)?;
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| RenderError::ImageSaveFailed(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(aligned_bytes_per_row(1), 256);
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
        assert_eq!(aligned_bytes_per_row(1200), 4864);
    }

    #[test]
    fn test_opaque_png_forces_alpha() {
        let data = [3, 0, 0, 0, 255, 255, 255, 255];
        let png = encode_png(&data, 2, 1, &CaptureOptions { opaque: true }).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [3, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_png_keeps_alpha_by_default() {
        let data = [3, 0, 0, 0];
        let png = encode_png(&data, 1, 1, &CaptureOptions::default()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [3, 0, 0, 0]);
    }

    #[test]
    fn test_mismatched_data_is_rejected() {
        let result = encode_png(&[0; 7], 2, 1, &CaptureOptions::default());
        assert!(matches!(result, Err(RenderError::ImageSaveFailed(_))));
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let path = std::env::temp_dir().join("chromapick_capture_test.bmpx");
        let result = save_image(&path, &[0; 4], 1, 1, &CaptureOptions::default());
        assert!(matches!(result, Err(RenderError::ImageSaveFailed(_))));
    }

    #[test]
    fn test_save_png_round_trips_through_disk() {
        let path = std::env::temp_dir().join("chromapick_capture_test.png");
        let data = [10, 20, 30, 255, 40, 50, 60, 255];
        save_image(&path, &data, 1, 2, &CaptureOptions::default()).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (1, 2));
        assert_eq!(loaded.get_pixel(0, 1).0, [40, 50, 60, 255]);
        let _ = std::fs::remove_file(&path);
    }
}
