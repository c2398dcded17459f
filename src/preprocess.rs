//! Image preparation before upload: decode, shrink to fit, re-encode as JPEG.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{AnalysisError, Result};
use crate::models::EncodedImage;

pub const OUTPUT_MEDIA_TYPE: &str = "image/jpeg";

/// A user-supplied image as received; never persisted.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PrepareOptions {
    pub max_edge: u32,
    pub jpeg_quality: u8,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            max_edge: 1024,
            jpeg_quality: 80,
        }
    }
}

/// Aspect-preserving dimensions whose longer side is at most `max_edge`.
/// Images already inside the bound keep their size. A zero bound is treated as 1.
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let max_edge = max_edge.max(1);
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width, height);
    }

    let scale = |side: u32| -> u32 {
        let scaled = (side as f64 * max_edge as f64 / longest as f64).round() as u32;
        scaled.clamp(1, max_edge)
    };

    if width >= height {
        (max_edge, scale(height))
    } else {
        (scale(width), max_edge)
    }
}

pub fn prepare(source: &SourceImage, options: &PrepareOptions) -> Result<EncodedImage> {
    let decoded = image::load_from_memory(&source.bytes)
        .map_err(|e| AnalysisError::Decode(format!("{} ({})", e, source.media_type)))?;

    let (width, height) = (decoded.width(), decoded.height());
    let (target_w, target_h) = fit_within(width, height, options.max_edge);

    let rgb = if (target_w, target_h) == (width, height) {
        decoded.into_rgb8()
    } else {
        decoded
            .resize_exact(target_w, target_h, FilterType::Triangle)
            .into_rgb8()
    };

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut jpeg), options.jpeg_quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| AnalysisError::Internal(format!("JPEG encode failed: {}", e)))?;

    info!(
        "Prepared image: {}x{} {} -> {}x{} {} ({} bytes)",
        width,
        height,
        source.media_type,
        target_w,
        target_h,
        OUTPUT_MEDIA_TYPE,
        jpeg.len()
    );

    Ok(EncodedImage {
        data: STANDARD.encode(&jpeg),
        media_type: OUTPUT_MEDIA_TYPE.to_string(),
    })
}

/// Prepares every image concurrently and waits for the whole batch.
/// One failure fails the batch; the remaining tasks are aborted.
pub async fn prepare_batch(
    sources: Vec<SourceImage>,
    options: PrepareOptions,
) -> Result<Vec<EncodedImage>> {
    let total = sources.len();
    let mut tasks = JoinSet::new();

    for (index, source) in sources.into_iter().enumerate() {
        tasks.spawn_blocking(move || (index, prepare(&source, &options)));
    }

    let mut prepared: Vec<Option<EncodedImage>> = vec![None; total];

    while let Some(joined) = tasks.join_next().await {
        let (index, result) =
            joined.map_err(|e| AnalysisError::Internal(format!("image task failed: {}", e)))?;

        match result {
            Ok(image) => prepared[index] = Some(image),
            Err(e) => {
                warn!("Image {} of {} failed, aborting batch: {}", index + 1, total, e);
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    Ok(prepared.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40])))
    }

    fn png(width: u32, height: u32) -> SourceImage {
        SourceImage {
            bytes: encode(solid(width, height), ImageFormat::Png),
            media_type: "image/png".to_string(),
        }
    }

    fn decoded_size(encoded: &EncodedImage) -> (u32, u32) {
        let bytes = STANDARD.decode(&encoded.data).unwrap();
        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        (image.width(), image.height())
    }

    #[test]
    fn fit_portrait() {
        assert_eq!(fit_within(2000, 3000, 1024), (683, 1024));
    }

    #[test]
    fn fit_landscape() {
        assert_eq!(fit_within(4032, 3024, 1024), (1024, 768));
    }

    #[test]
    fn fit_square_and_small() {
        assert_eq!(fit_within(2048, 2048, 1024), (1024, 1024));
        assert_eq!(fit_within(640, 480, 1024), (640, 480));
        assert_eq!(fit_within(1024, 10, 1024), (1024, 10));
    }

    #[test]
    fn fit_never_collapses_to_zero() {
        assert_eq!(fit_within(10_000, 2, 1024), (1024, 1));
    }

    #[test]
    fn fit_zero_bound_does_not_panic() {
        assert_eq!(fit_within(300, 200, 0), (1, 1));
    }

    #[test]
    fn prepare_downscales_to_jpeg() {
        let encoded = prepare(&png(2000, 3000), &PrepareOptions::default()).unwrap();
        assert_eq!(encoded.media_type, OUTPUT_MEDIA_TYPE);
        assert_eq!(decoded_size(&encoded), (683, 1024));
    }

    #[test]
    fn prepare_keeps_small_images() {
        let encoded = prepare(&png(300, 200), &PrepareOptions::default()).unwrap();
        assert_eq!(decoded_size(&encoded), (300, 200));
    }

    #[test]
    fn prepare_downscales_jpeg_source() {
        let source = SourceImage {
            bytes: encode(solid(3000, 1500), ImageFormat::Jpeg),
            media_type: "image/jpeg".to_string(),
        };
        let encoded = prepare(&source, &PrepareOptions::default()).unwrap();
        assert_eq!(encoded.media_type, OUTPUT_MEDIA_TYPE);
        assert_eq!(decoded_size(&encoded), (1024, 512));
    }

    #[test]
    fn prepare_flattens_alpha() {
        let rgba =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 40, image::Rgba([0, 0, 0, 128])));
        let source = SourceImage {
            bytes: encode(rgba, ImageFormat::Png),
            media_type: "image/png".to_string(),
        };
        let encoded = prepare(&source, &PrepareOptions::default()).unwrap();
        assert_eq!(encoded.media_type, "image/jpeg");
    }

    #[test]
    fn prepare_rejects_garbage() {
        let source = SourceImage {
            bytes: b"definitely not an image".to_vec(),
            media_type: "image/jpeg".to_string(),
        };
        let err = prepare(&source, &PrepareOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let encoded = prepare_batch(vec![png(1500, 500), png(100, 400)], PrepareOptions::default())
            .await
            .unwrap();
        assert_eq!(encoded.len(), 2);
        assert_eq!(decoded_size(&encoded[0]), (1024, 341));
        assert_eq!(decoded_size(&encoded[1]), (100, 400));
    }

    #[tokio::test]
    async fn batch_fails_as_a_unit() {
        let broken = SourceImage {
            bytes: vec![0xFF, 0xD8, 0x00],
            media_type: "image/jpeg".to_string(),
        };
        let err = prepare_batch(vec![png(64, 64), broken, png(64, 64)], PrepareOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let encoded = prepare_batch(vec![], PrepareOptions::default()).await.unwrap();
        assert!(encoded.is_empty());
    }
}
