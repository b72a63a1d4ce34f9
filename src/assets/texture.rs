//! Texture decoding

use std::path::Path;

use super::{AssetError, AssetResult};

/// Decoded RGBA8 pixels ready for GPU upload
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    pub fn from_image(img: image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            pixels: rgba.into_raw(),
        }
    }

    /// A single pixel texture of the given colour
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }
}

/// Loads any supported image file into RGBA8
pub fn load_texture(path: impl AsRef<Path>) -> AssetResult<TextureData> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AssetError::NotFound(path.to_path_buf()));
    }

    let img = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(io) => AssetError::Io {
            path: path.to_path_buf(),
            source: io,
        },
        other => AssetError::Image {
            path: path.to_path_buf(),
            source: other,
        },
    })?;

    let data = TextureData::from_image(img);
    log::info!(
        "Loaded texture {:?} ({}x{})",
        path,
        data.width,
        data.height
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_into_rgba() {
        let dir = std::env::temp_dir().join("earthview_texture_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checker.png");

        let img = image::RgbImage::from_fn(3, 2, |x, _| {
            if x == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        img.save(&path).unwrap();

        let data = load_texture(&path).unwrap();
        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(data.pixels.len(), 3 * 2 * 4);
        assert_eq!(&data.pixels[0..4], &[255, 0, 0, 255]);
        assert_eq!(&data.pixels[4..8], &[0, 0, 255, 255]);
    }

    #[test]
    fn missing_texture_is_not_found() {
        let err = load_texture("/definitely/not/here/earth_day.jpg").unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }

    #[test]
    fn garbage_file_is_an_image_error() {
        let dir = std::env::temp_dir().join("earthview_texture_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("garbage.jpg");
        std::fs::write(&path, b"not a jpeg at all").unwrap();

        let err = load_texture(&path).unwrap_err();
        assert!(matches!(
            err,
            AssetError::Image { .. } | AssetError::Io { .. }
        ));
    }

    #[test]
    fn solid_texture_is_one_pixel() {
        let data = TextureData::solid([1, 2, 3, 4]);
        assert_eq!((data.width, data.height), (1, 1));
        assert_eq!(data.pixels, vec![1, 2, 3, 4]);
    }
}
