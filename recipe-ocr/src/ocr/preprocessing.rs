use crate::config::OnDeviceConfig;
use crate::error::{OcrError, Result};
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader};

/// Prepare a photographed page for Tesseract.
///
/// Decodes the bytes, rejects images below the minimum dimension, downscales
/// anything above the maximum (keeping the aspect ratio), flattens to 8-bit
/// grayscale without alpha and stretches the histogram. The result is PNG.
///
/// Undecodable or undersized images are `InvalidInput`: no engine will do
/// better with them.
pub fn preprocess_image(bytes: &[u8], config: &OnDeviceConfig) -> Result<Vec<u8>> {
    let img = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OcrError::InvalidInput(format!("Failed to read image: {e}")))?
        .decode()
        .map_err(|e| OcrError::InvalidInput(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(OcrError::InvalidInput(format!(
            "Image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    let img = downscale(img, config.max_image_dimension);
    let gray = stretch_contrast(to_gray(img));

    let mut output = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| OcrError::Engine(format!("Failed to encode image: {e}")))?;

    Ok(output)
}

/// Shrink so the longest side is at most `max_dim`, using Lanczos3.
fn downscale(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = max_dim as f32 / width.max(height) as f32;
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

/// Luma conversion drops any alpha channel along the way.
fn to_gray(img: DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray,
        other => other.to_luma8(),
    }
}

/// Map the darkest pixel to 0 and the lightest to 255. Flat images are
/// returned untouched.
fn stretch_contrast(gray: GrayImage) -> GrayImage {
    let (min_val, max_val) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max_val <= min_val {
        return gray;
    }

    let range = (max_val - min_val) as f32;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0];
        let normalized = (value - min_val) as f32 / range;
        image::Luma([(normalized * 255.0).round() as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> OnDeviceConfig {
        OnDeviceConfig {
            languages: "eng".to_string(),
            timeout_secs: 60,
            max_image_dimension: 4096,
            min_image_dimension: 50,
        }
    }

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), format)
            .unwrap();
        output
    }

    #[test]
    fn test_preprocess_valid_image() {
        let config = create_test_config();
        let png = encode(DynamicImage::new_rgb8(100, 100), ImageFormat::Png);

        let processed = preprocess_image(&png, &config).unwrap();
        let decoded = image::load_from_memory(&processed).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
        assert_eq!(decoded.dimensions(), (100, 100));
    }

    #[test]
    fn test_reject_tiny_image() {
        let config = create_test_config();
        let tiny = encode(DynamicImage::new_rgb8(10, 10), ImageFormat::Png);

        let err = preprocess_image(&tiny, &config).unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput(_)));
        assert!(err.to_string().contains("10x10"), "{err}");
    }

    #[test]
    fn test_reject_one_side_too_small() {
        let config = create_test_config();
        let narrow = encode(DynamicImage::new_rgb8(40, 200), ImageFormat::Png);
        assert!(preprocess_image(&narrow, &config).is_err());
    }

    #[test]
    fn test_invalid_image_data() {
        let config = create_test_config();
        let result = preprocess_image(&[0u8, 1, 2, 3, 4, 5], &config);
        assert!(matches!(result, Err(OcrError::InvalidInput(_))));
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let config = OnDeviceConfig {
            max_image_dimension: 500,
            ..create_test_config()
        };
        let large = encode(DynamicImage::new_rgb8(2000, 1000), ImageFormat::Png);

        let processed = preprocess_image(&large, &config).unwrap();
        let decoded = image::load_from_memory(&processed).unwrap();
        assert_eq!(decoded.dimensions(), (500, 250));
    }

    #[test]
    fn test_rgba_and_jpeg_inputs() {
        let config = create_test_config();
        let rgba = encode(DynamicImage::new_rgba8(100, 100), ImageFormat::Png);
        let jpeg = encode(DynamicImage::new_rgb8(100, 100), ImageFormat::Jpeg);

        assert!(preprocess_image(&rgba, &config).is_ok());
        assert!(preprocess_image(&jpeg, &config).is_ok());
    }

    #[test]
    fn test_downscale_keeps_aspect_ratio() {
        let resized = downscale(DynamicImage::new_rgb8(500, 2000), 1000);
        assert_eq!(resized.dimensions(), (250, 1000));

        let untouched = downscale(DynamicImage::new_rgb8(500, 500), 1000);
        assert_eq!(untouched.dimensions(), (500, 500));
    }

    #[test]
    fn test_stretch_contrast_uses_full_range() {
        let mut gray = GrayImage::new(10, 10);
        for (i, pixel) in gray.pixels_mut().enumerate() {
            pixel[0] = (50 + i % 90) as u8;
        }

        let stretched = stretch_contrast(gray);
        let min = stretched.pixels().map(|p| p[0]).min().unwrap();
        let max = stretched.pixels().map(|p| p[0]).max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn test_stretch_contrast_flat_image_unchanged() {
        let gray = GrayImage::from_pixel(10, 10, image::Luma([100]));
        let stretched = stretch_contrast(gray);
        assert!(stretched.pixels().all(|p| p[0] == 100));
    }
}
