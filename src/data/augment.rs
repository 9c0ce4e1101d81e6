use rand::Rng;

use crate::math::tensor::Tensor;

/// Random geometric augmentation applied to training images only.
///
/// Every field is the half-width of a symmetric sampling range: a rotation
/// of 15.0 draws an angle in [-15°, +15°], a shift of 0.1 draws an offset
/// up to 10% of the image side, and so on. Pixels sampled outside the image
/// are filled with the nearest edge pixel.
#[derive(Debug, Clone)]
pub struct Augment {
    pub rotation_deg: f64,
    pub shift_frac: f64,
    pub shear_frac: f64,
    pub zoom_frac: f64,
    pub horizontal_flip: bool,
}

impl Default for Augment {
    fn default() -> Augment {
        Augment {
            rotation_deg: 15.0,
            shift_frac: 0.1,
            shear_frac: 0.1,
            zoom_frac: 0.1,
            horizontal_flip: true,
        }
    }
}

fn sample_range<R: Rng>(rng: &mut R, half_width: f64) -> f64 {
    if half_width == 0.0 {
        0.0
    } else {
        rng.gen_range(-half_width..=half_width)
    }
}

impl Augment {
    /// Produces a randomly warped copy of a single-channel image tensor.
    ///
    /// The warp is computed as an inverse mapping: for each output pixel the
    /// source coordinate is found by undoing shift, rotation, shear, zoom and
    /// flip in turn, then sampled with nearest-neighbor lookup clamped to the
    /// image bounds.
    pub fn apply<R: Rng>(&self, input: &Tensor, rng: &mut R) -> Tensor {
        let (h, w, c) = (input.shape.h, input.shape.w, input.shape.c);
        let cx = (w as f64 - 1.0) / 2.0;
        let cy = (h as f64 - 1.0) / 2.0;

        let theta = sample_range(rng, self.rotation_deg).to_radians();
        let (sin_t, cos_t) = theta.sin_cos();
        let shear = sample_range(rng, self.shear_frac);
        let zoom_x = 1.0 + sample_range(rng, self.zoom_frac);
        let zoom_y = 1.0 + sample_range(rng, self.zoom_frac);
        let shift_x = sample_range(rng, self.shift_frac) * w as f64;
        let shift_y = sample_range(rng, self.shift_frac) * h as f64;
        let flip = self.horizontal_flip && rng.gen_bool(0.5);

        let mut out = Tensor::zeros(input.shape);
        for y in 0..h {
            for x in 0..w {
                let dx = x as f64 - cx - shift_x;
                let dy = y as f64 - cy - shift_y;

                // Inverse rotation.
                let rx = cos_t * dx + sin_t * dy;
                let ry = -sin_t * dx + cos_t * dy;
                // Inverse shear along x.
                let sx = rx - shear * ry;
                let sy = ry;
                // Inverse zoom.
                let ux = sx / zoom_x;
                let uy = sy / zoom_y;
                // Inverse horizontal flip.
                let fx = if flip { -ux } else { ux };

                let src_x = (cx + fx).round().clamp(0.0, w as f64 - 1.0) as usize;
                let src_y = (cy + uy).round().clamp(0.0, h as f64 - 1.0) as usize;
                for ch in 0..c {
                    *out.at_mut(y, x, ch) = input.at(src_y, src_x, ch);
                }
            }
        }
        out
    }
}
