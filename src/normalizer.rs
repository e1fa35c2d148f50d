use std::path::PathBuf;

use fast_image_resize::{FilterType, ResizeAlg, ResizeOptions, Resizer};
use image::DynamicImage;
use ndarray::Array4;
use tracing::debug;

use crate::config::{InputConfig, TensorLayout};
use crate::error::{GateError, Result};

/// One still image as handed over by whatever acquired it.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    /// Encoded bytes (jpeg, png, ...).
    Bytes(Vec<u8>),
    Image(DynamicImage),
}

impl ImageSource {
    pub fn decode(self) -> Result<DynamicImage> {
        let image = match self {
            ImageSource::Path(path) => image::open(&path)
                .map_err(|e| GateError::Conversion(format!("{}: {e}", path.display())))?,
            ImageSource::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(GateError::conversion("empty image buffer"));
                }
                image::load_from_memory(&bytes).map_err(GateError::conversion)?
            }
            ImageSource::Image(image) => image,
        };

        if image.width() == 0 || image.height() == 0 {
            return Err(GateError::Conversion(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(image)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Image(image)
    }
}

/// Model input: a batch of one image as a 4-D tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub tensor: Array4<f32>,
    pub source_width: u32,
    pub source_height: u32,
}

#[derive(Debug)]
pub struct Normalizer {
    config: InputConfig,
    resizer: Resizer,
    resize_options: ResizeOptions,
}

impl Normalizer {
    pub fn new(config: InputConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            resizer: Resizer::new(),
            resize_options: ResizeOptions {
                algorithm: ResizeAlg::Convolution(FilterType::CatmullRom),
                mul_div_alpha: false,
                ..Default::default()
            },
        })
    }

    /// Decodes `source` and converts it into the tensor the model expects.
    pub fn normalize_source(&mut self, source: ImageSource) -> Result<NormalizedImage> {
        let image = source.decode()?;
        self.normalize(&image)
    }

    pub fn normalize(&mut self, image: &DynamicImage) -> Result<NormalizedImage> {
        let (src_w, src_h) = (image.width(), image.height());
        if src_w == 0 || src_h == 0 {
            return Err(GateError::Conversion(format!(
                "image has no pixels ({src_w}x{src_h})"
            )));
        }

        let InputConfig {
            width,
            height,
            layout,
            mean,
            std,
        } = self.config;

        // alpha and exotic pixel formats are dropped here
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut resized = DynamicImage::new_rgb8(width, height);
        self.resizer
            .resize(&rgb, &mut resized, &self.resize_options)
            .map_err(GateError::conversion)?;
        let resized = resized.to_rgb8();

        let (w, h) = (width as usize, height as usize);
        let mut tensor = match layout {
            TensorLayout::Nchw => Array4::zeros((1, 3, h, w)),
            TensorLayout::Nhwc => Array4::zeros((1, h, w, 3)),
        };
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let value = (pixel[c] as f32 / 255. - mean[c]) / std[c];
                match layout {
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                }
            }
        }

        debug!(src_w, src_h, width, height, ?layout, "image normalized");

        Ok(NormalizedImage {
            tensor,
            source_width: src_w,
            source_height: src_h,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
    use std::io::Cursor;

    fn identity_config(width: u32, height: u32, layout: TensorLayout) -> InputConfig {
        InputConfig {
            width,
            height,
            layout,
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(color)))
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.5 / 255.
    }

    #[test]
    fn nchw_tensor_has_channels_first() {
        let mut normalizer =
            Normalizer::new(identity_config(32, 16, TensorLayout::Nchw)).unwrap();
        let out = normalizer.normalize(&solid(100, 100, [255, 0, 0])).unwrap();

        assert_eq!(out.tensor.shape(), &[1, 3, 16, 32]);
        assert_eq!((out.source_width, out.source_height), (100, 100));
        assert!(close(out.tensor[[0, 0, 0, 0]], 1.0));
        assert!(close(out.tensor[[0, 1, 8, 16]], 0.0));
        assert!(close(out.tensor[[0, 2, 15, 31]], 0.0));
    }

    #[test]
    fn nhwc_tensor_has_channels_last() {
        let mut normalizer =
            Normalizer::new(identity_config(8, 8, TensorLayout::Nhwc)).unwrap();
        let out = normalizer.normalize(&solid(20, 40, [0, 0, 255])).unwrap();

        assert_eq!(out.tensor.shape(), &[1, 8, 8, 3]);
        assert!(close(out.tensor[[0, 4, 4, 2]], 1.0));
        assert!(close(out.tensor[[0, 4, 4, 0]], 0.0));
    }

    #[test]
    fn applies_mean_and_std() {
        let config = InputConfig {
            width: 4,
            height: 4,
            ..InputConfig::default()
        };
        let mut normalizer = Normalizer::new(config).unwrap();
        let out = normalizer.normalize(&solid(10, 10, [128, 128, 128])).unwrap();

        for c in 0..3 {
            let expected = (128. / 255. - config.mean[c]) / config.std[c];
            assert!((out.tensor[[0, c, 2, 2]] - expected).abs() < 0.03);
        }
    }

    #[test]
    fn drops_alpha_channel() {
        let rgba = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(5, 5, Rgba([0, 255, 0, 10])));
        let mut normalizer =
            Normalizer::new(identity_config(5, 5, TensorLayout::Nchw)).unwrap();
        let out = normalizer.normalize(&rgba).unwrap();

        assert_eq!(out.tensor.shape(), &[1, 3, 5, 5]);
        assert!(close(out.tensor[[0, 1, 2, 2]], 1.0));
    }

    #[test]
    fn decodes_encoded_bytes() {
        let mut bytes = Vec::new();
        solid(6, 3, [10, 20, 30])
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let image = ImageSource::from(bytes).decode().unwrap();
        assert_eq!((image.width(), image.height()), (6, 3));
    }

    #[test]
    fn empty_bytes_are_a_conversion_error() {
        let err = ImageSource::Bytes(Vec::new()).decode().unwrap_err();
        assert!(matches!(err, GateError::Conversion(_)));
    }

    #[test]
    fn garbage_bytes_are_a_conversion_error() {
        let err = ImageSource::Bytes(b"definitely not an image".to_vec())
            .decode()
            .unwrap_err();
        assert!(matches!(err, GateError::Conversion(_)));
    }

    #[test]
    fn missing_file_is_a_conversion_error() {
        let err = ImageSource::Path(PathBuf::from("/nonexistent/hotdog.jpg"))
            .decode()
            .unwrap_err();
        assert!(matches!(err, GateError::Conversion(_)));
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        let err = ImageSource::Image(DynamicImage::new_rgb8(0, 0))
            .decode()
            .unwrap_err();
        assert!(matches!(err, GateError::Conversion(_)));

        let mut normalizer = Normalizer::new(InputConfig::default()).unwrap();
        assert!(normalizer.normalize(&DynamicImage::new_rgb8(0, 4)).is_err());
    }

    #[test]
    fn invalid_input_config_is_rejected() {
        let err = Normalizer::new(identity_config(0, 10, TensorLayout::Nchw)).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }
}
