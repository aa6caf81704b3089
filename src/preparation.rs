use crate::{
    config::PreparationConfig,
    error::{Result, StudioError},
    models::{PreparedImage, RawImage},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, ColorType, GenericImageView};

/// Validates uploads and turns them into bounded JPEG data URLs.
#[derive(Debug, Clone)]
pub struct ImagePreparer {
    config: PreparationConfig,
}

impl ImagePreparer {
    pub fn new(config: PreparationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreparationConfig {
        &self.config
    }

    /// Cheap checks that need no decoding.
    pub fn validate(&self, raw: &RawImage) -> Result<()> {
        if !raw.media_type.starts_with("image/") {
            return Err(StudioError::ValidationError(
                "Please select a valid image file".into(),
            ));
        }
        if raw.size() > self.config.max_file_size {
            return Err(StudioError::ValidationError(format!(
                "File size must be less than {}",
                format_file_size(self.config.max_file_size).replace(' ', "")
            )));
        }
        Ok(())
    }

    pub fn prepare(&self, raw: RawImage) -> Result<PreparedImage> {
        self.validate(&raw)?;

        let decoded = image::load_from_memory(&raw.bytes)?;
        let (width, height) = decoded.dimensions();
        let (target_width, target_height) =
            scaled_dimensions(width, height, self.config.max_dimension);

        let image = if (target_width, target_height) != (width, height) {
            log::debug!(
                "Downscaling {} from {}x{} to {}x{}",
                raw.file_name,
                width,
                height,
                target_width,
                target_height
            );
            decoded.resize_exact(target_width, target_height, FilterType::Triangle)
        } else {
            decoded
        };

        let rgb = image.to_rgb8();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.config.jpeg_quality).encode(
            rgb.as_raw(),
            target_width,
            target_height,
            ColorType::Rgb8,
        )?;

        log::info!(
            "Prepared {} ({} -> {})",
            raw.file_name,
            format_file_size(raw.size()),
            format_file_size(jpeg.len() as u64)
        );

        Ok(PreparedImage {
            data_url: format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)),
            file_name: raw.file_name,
            width: target_width,
            height: target_height,
            original_size: raw.bytes.len() as u64,
        })
    }

    /// Runs `prepare` on the blocking pool; decoding and resizing are CPU bound.
    pub async fn prepare_async(&self, raw: RawImage) -> Result<PreparedImage> {
        let preparer = self.clone();
        tokio::task::spawn_blocking(move || preparer.prepare(raw))
            .await
            .map_err(|e| StudioError::InternalError(format!("preparation task failed: {}", e)))?
    }
}

/// Scales the longer side down to `max_dimension`, keeping the aspect ratio.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let scale = |side: u32, longer: u32| -> u32 {
        ((side as u64 * max_dimension as u64) / longer as u64).max(1) as u32
    };
    if width > height {
        (max_dimension, scale(height, width))
    } else {
        (scale(width, height), max_dimension)
    }
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 40, 90]),
        ));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn decode_data_url(data_url: &str) -> DynamicImage {
        let payload = data_url
            .strip_prefix("data:image/jpeg;base64,")
            .expect("jpeg data url");
        let bytes = STANDARD.decode(payload).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_rejects_non_image_media_type() {
        let preparer = ImagePreparer::new(PreparationConfig::default());
        let raw = RawImage::new("notes.txt", "text/plain", b"hello".to_vec());
        let err = preparer.prepare(raw).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("valid image file"));
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let preparer = ImagePreparer::new(PreparationConfig::default());
        let raw = RawImage::new("huge.png", "image/png", vec![0; 10 * 1024 * 1024 + 1]);
        let err = preparer.prepare(raw).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("10MB"));
    }

    #[test]
    fn test_undecodable_bytes_are_an_image_error() {
        let preparer = ImagePreparer::new(PreparationConfig::default());
        let raw = RawImage::new("broken.png", "image/png", b"definitely not png".to_vec());
        assert!(matches!(
            preparer.prepare(raw),
            Err(StudioError::ImageError(_))
        ));
    }

    #[test]
    fn test_downscales_wide_image() {
        let preparer = ImagePreparer::new(PreparationConfig::default());
        let raw = RawImage::new("wide.png", "image/png", png_bytes(3000, 1500));
        let prepared = preparer.prepare(raw).unwrap();

        assert_eq!((prepared.width, prepared.height), (1920, 960));
        let decoded = decode_data_url(&prepared.data_url);
        assert_eq!(decoded.dimensions(), (1920, 960));
        assert_eq!(prepared.file_name, "wide.png");
    }

    #[test]
    fn test_small_image_keeps_size_but_is_reencoded() {
        let preparer = ImagePreparer::new(PreparationConfig::default());
        let raw = RawImage::new("small.png", "image/png", png_bytes(64, 48));
        let prepared = preparer.prepare(raw).unwrap();

        assert_eq!((prepared.width, prepared.height), (64, 48));
        assert!(prepared.data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_prepare_async_matches_sync() {
        let preparer =
            ImagePreparer::new(PreparationConfig::default().with_max_dimension(100));
        let raw = RawImage::new("tall.png", "image/png", png_bytes(50, 400));
        let prepared = preparer.prepare_async(raw).await.unwrap();
        assert_eq!((prepared.width, prepared.height), (12, 100));
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(800, 600, 1920), (800, 600));
        assert_eq!(scaled_dimensions(1920, 1920, 1920), (1920, 1920));
        assert_eq!(scaled_dimensions(1080, 4000, 1920), (518, 1920));
        assert_eq!(scaled_dimensions(4000, 4000, 1920), (1920, 1920));
        assert_eq!(scaled_dimensions(10000, 1, 1920), (1920, 1));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    }
}
