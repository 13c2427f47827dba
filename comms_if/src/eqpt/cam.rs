//! # Camera Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc, serde::ts_milliseconds};
use image::{DynamicImage, RgbImage};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An individual encoded frame from the forward camera
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CamFrame {

    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The format of this frame
    pub format: ImageFormat,

    /// The formatted image data, base64 encoded
    pub data: String
}

/// A decoded camera frame.
#[derive(Clone)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: RgbImage
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible formats for camera images. This is used rather than image::ImageFormat to:
///     1. Restrict the formats that can be sent back and forth
///     2. Allow serialisation as image::ImageFormat does not implement serde.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG image
    Png,

    /// JPEG image with a quality value between 1 and 100, where 100 is best.
    Jpeg(u8)
}

/// Errors converting between frames and images.
#[derive(Debug, thiserror::Error)]
pub enum CamFrameError {
    #[error("Frame data is not valid base64: {0}")]
    Base64Error(base64::DecodeError),

    #[error("Could not decode or encode the image: {0}")]
    ImageError(image::ImageError)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamFrame {
    /// Convert this camera frame into a camera image
    pub fn to_cam_image(&self) -> Result<CamImage, CamFrameError>  {
        let bytes = base64::decode(&self.data).map_err(CamFrameError::Base64Error)?;

        let format = match self.format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg(_) => image::ImageFormat::Jpeg
        };

        let image = image::load_from_memory_with_format(&bytes, format)
            .map_err(CamFrameError::ImageError)?;

        Ok(CamImage {
            timestamp: self.timestamp,
            image: image.to_rgb8()
        })
    }
}

impl CamImage {
    /// Convert this camera image into a camera frame with the given format
    pub fn to_cam_frame(&self, format: ImageFormat) -> Result<CamFrame, CamFrameError> {
        // Write data to the buffer
        let mut data = Vec::<u8>::new();

        // Get the output format type
        let output_format = match format {
            ImageFormat::Png => image::ImageOutputFormat::Png,
            ImageFormat::Jpeg(q)  => image::ImageOutputFormat::Jpeg(q)
        };

        DynamicImage::ImageRgb8(self.image.clone())
            .write_to(&mut data, output_format)
            .map_err(CamFrameError::ImageError)?;

        Ok(CamFrame {
            timestamp: self.timestamp,
            format,
            data: base64::encode(&data)
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_png_frame_is_lossless() {
        let image = RgbImage::from_fn(8, 4, |x, y| Rgb([x as u8 * 30, y as u8 * 60, 40]));
        let cam_image = CamImage { timestamp: Utc::now(), image };

        let frame = cam_image.to_cam_frame(ImageFormat::Png).unwrap();
        let decoded = frame.to_cam_image().unwrap();

        assert_eq!(decoded.image, cam_image.image);
    }

    #[test]
    fn test_bad_base64_is_rejected() {
        let frame = CamFrame {
            timestamp: Utc::now(),
            format: ImageFormat::Png,
            data: String::from("not*base64!")
        };

        assert!(matches!(frame.to_cam_image(), Err(CamFrameError::Base64Error(_))));
    }
}
