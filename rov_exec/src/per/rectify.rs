//! # Perspective rectification
//!
//! Warps the forward camera image into a top-down view using a projective transform fixed by
//! four calibrated point correspondences.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use ndarray::Array2;

use super::PerError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Minimum absolute value of the homogeneous coordinate for a projected point to be finite.
const MIN_HOMOGENEOUS_W: f64 = 1e-12;

/// Minimum doubled triangle area for three quadrilateral corners to be considered non-collinear.
///
/// Units: pixels^2
const MIN_CORNER_AREA_PX2: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Four image-space points, in order around the quadrilateral.
pub type Quad = [[f64; 2]; 4];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Stateless warp of camera images into the top-down view.
#[derive(Debug, Clone)]
pub struct Rectifier {
    /// Transform from camera image to top-down image
    transform: Matrix3<f64>,

    /// Transform from top-down image back to camera image, used for resampling
    inverse: Matrix3<f64>,

    width: u32,
    height: u32,
}

/// Output of the rectifier.
#[derive(Debug, Clone)]
pub struct Rectified {
    /// The top-down image, same dimensions as the input. Pixels outside the footprint are black.
    pub image: RgbImage,

    /// True for each (row, col) of `image` which sampled inside the camera frame.
    pub footprint: Array2<bool>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Rectifier {
    /// Build a rectifier mapping `src` onto `dst` for images of the given size.
    pub fn new(src: &Quad, dst: &Quad, width: u32, height: u32) -> Result<Self, PerError> {
        if width == 0 || height == 0 {
            return Err(PerError::InvalidImageSize(width, height));
        }

        let transform = perspective_transform(src, dst)?;
        let inverse = transform
            .try_inverse()
            .ok_or(PerError::SingularTransform)?;

        Ok(Self {
            transform,
            inverse,
            width,
            height,
        })
    }

    /// Project a point in the camera image into the top-down image.
    #[cfg(test)]
    fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        apply(&self.transform, x, y)
    }

    /// Resample the full image through the transform using bilinear interpolation.
    pub fn warp(&self, img: &RgbImage) -> Result<Rectified, PerError> {
        if img.dimensions() != (self.width, self.height) {
            return Err(PerError::UnexpectedImageSize {
                expected: (self.width, self.height),
                found: img.dimensions(),
            });
        }

        let mut image = RgbImage::new(self.width, self.height);
        let mut footprint = Array2::from_elem((self.height as usize, self.width as usize), false);

        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;

        for (col, row, pixel) in image.enumerate_pixels_mut() {
            let (sx, sy) = match apply(&self.inverse, col as f64, row as f64) {
                Some(p) => p,
                None => continue,
            };

            if sx < 0.0 || sy < 0.0 || sx > max_x || sy > max_y {
                continue;
            }

            *pixel = sample_bilinear(img, sx, sy);
            footprint[[row as usize, col as usize]] = true;
        }

        Ok(Rectified { image, footprint })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute the projective transform which maps each `src` corner onto the matching `dst` corner.
///
/// Both quadrilaterals must be non-degenerate (no three corners collinear).
pub fn perspective_transform(src: &Quad, dst: &Quad) -> Result<Matrix3<f64>, PerError> {
    check_quad(src, "source")?;
    check_quad(dst, "destination")?;

    // Standard eight equation system with h33 fixed to 1
    let mut a = DMatrix::<f64>::zeros(8, 8);
    let mut b = DVector::<f64>::zeros(8);

    for i in 0..4 {
        let [x, y] = src[i];
        let [u, v] = dst[i];

        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -x * u;
        a[(r, 7)] = -y * u;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -x * v;
        a[(r + 1, 7)] = -y * v;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b).ok_or(PerError::SingularTransform)?;

    if h.iter().any(|v| !v.is_finite()) {
        return Err(PerError::SingularTransform);
    }

    Ok(Matrix3::new(
        h[0], h[1], h[2],
        h[3], h[4], h[5],
        h[6], h[7], 1.0,
    ))
}

fn check_quad(quad: &Quad, which: &'static str) -> Result<(), PerError> {
    if quad.iter().flatten().any(|v| !v.is_finite()) {
        return Err(PerError::DegenerateQuad(which));
    }

    // Every choice of three corners must span a non-zero area
    for skip in 0..4 {
        let pts: Vec<&[f64; 2]> = quad
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, p)| p)
            .collect();

        let area2 = (pts[1][0] - pts[0][0]) * (pts[2][1] - pts[0][1])
            - (pts[1][1] - pts[0][1]) * (pts[2][0] - pts[0][0]);

        if area2.abs() < MIN_CORNER_AREA_PX2 {
            return Err(PerError::DegenerateQuad(which));
        }
    }

    Ok(())
}

fn apply(m: &Matrix3<f64>, x: f64, y: f64) -> Option<(f64, f64)> {
    let p = m * Vector3::new(x, y, 1.0);

    if p.z.abs() < MIN_HOMOGENEOUS_W {
        return None;
    }

    Some((p.x / p.z, p.y / p.z))
}

fn sample_bilinear(img: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = img.dimensions();

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().max(0.0).min(255.0) as u8;
    }

    Rgb(out)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
