use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::Deserialize;
use tracing::{info, warn};

use super::{JobError, JobHandler};
use crate::object_store::{variant_key, ObjectStore};
use crate::queue::Job;
use crate::service::THUMBNAIL_WIDTHS;
use crate::storage::Database;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailPayload {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
}

/// Generates the fixed-width thumbnails of an uploaded image.
pub struct ThumbnailPipeline {
    db: Database,
    object_store: Arc<dyn ObjectStore>,
}

impl ThumbnailPipeline {
    pub fn new(db: Database, object_store: Arc<dyn ObjectStore>) -> Self {
        Self { db, object_store }
    }

    /// Write every thumbnail width for the content at `content_ref`.
    ///
    /// Each width stands alone: a failure is logged and the remaining widths
    /// are still attempted. Returns how many widths were written.
    pub async fn generate(&self, content_ref: &str) -> Result<usize, JobError> {
        let source = self.object_store.get(content_ref).await?;
        let mut written = 0;

        for width in THUMBNAIL_WIDTHS {
            let input = source.clone();
            let rendered =
                tokio::task::spawn_blocking(move || render_thumbnail(&input, width)).await;

            let thumbnail = match rendered {
                Ok(Ok(thumbnail)) => thumbnail,
                Ok(Err(e)) => {
                    warn!(content_ref, width, error = %e, "Failed to render thumbnail");
                    continue;
                }
                Err(e) => {
                    warn!(content_ref, width, error = %e, "Thumbnail task panicked");
                    continue;
                }
            };

            let key = variant_key(content_ref, width);
            match self.object_store.put(&key, Bytes::from(thumbnail)).await {
                Ok(()) => written += 1,
                Err(e) => warn!(content_ref, width, error = %e, "Failed to store thumbnail"),
            }
        }

        Ok(written)
    }
}

#[async_trait]
impl JobHandler for ThumbnailPipeline {
    async fn handle(&self, job: &Job) -> Result<(), JobError> {
        let payload: ThumbnailPayload =
            serde_json::from_value(job.payload.clone()).unwrap_or_default();
        let file_id = payload.file_id.ok_or(JobError::MissingField("fileId"))?;
        let user_id = payload.user_id.ok_or(JobError::MissingField("userId"))?;

        let node = self
            .db
            .get_owned_node(&user_id, &file_id)?
            .ok_or(JobError::FileNotFound)?;
        let content_ref = node.content.content_ref().ok_or(JobError::NoContent)?;

        let written = self.generate(content_ref).await?;
        info!(
            node_id = %node.id,
            written,
            expected = THUMBNAIL_WIDTHS.len(),
            "Generated thumbnails"
        );
        Ok(())
    }
}

/// Resize an encoded image to `width` pixels wide, keeping its aspect ratio,
/// and re-encode it in the source format (PNG if that format cannot be written).
pub fn render_thumbnail(source: &[u8], width: u32) -> Result<Vec<u8>, image::ImageError> {
    let format = image::guess_format(source)?;
    let image = image::load_from_memory_with_format(source, format)?;

    let height = (u64::from(image.height()) * u64::from(width) / u64::from(image.width().max(1)))
        .clamp(1, u64::from(u32::MAX)) as u32;
    let resized = image.resize_exact(width, height, FilterType::Lanczos3);

    let (output, format) = match format {
        ImageFormat::Jpeg => (DynamicImage::ImageRgb8(resized.to_rgb8()), format),
        f if f.writing_enabled() => (DynamicImage::ImageRgba8(resized.to_rgba8()), f),
        _ => (DynamicImage::ImageRgba8(resized.to_rgba8()), ImageFormat::Png),
    };

    let mut buffer = Cursor::new(Vec::new());
    output.write_to(&mut buffer, format)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_render_keeps_aspect_ratio() {
        let thumbnail = render_thumbnail(&png(800, 400), 250).unwrap();
        let decoded = image::load_from_memory(&thumbnail).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (250, 125));
        assert_eq!(image::guess_format(&thumbnail).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_render_jpeg_stays_jpeg() {
        let img = image::RgbImage::from_pixel(300, 300, image::Rgb([10, 20, 30]));
        let mut source = Cursor::new(Vec::new());
        img.write_to(&mut source, ImageFormat::Jpeg).unwrap();

        let thumbnail = render_thumbnail(source.get_ref(), 100).unwrap();
        assert_eq!(image::guess_format(&thumbnail).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_render_rejects_non_images() {
        assert!(render_thumbnail(b"definitely not an image", 100).is_err());
    }

    #[test]
    fn test_thin_strip_keeps_one_pixel_height() {
        let thumbnail = render_thumbnail(&png(1000, 1), 100).unwrap();
        let decoded = image::load_from_memory(&thumbnail).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 1));
    }
}
