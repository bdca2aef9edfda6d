use crate::enums::Interpolation;

use ndarray::ArrayView2;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Sample `slice` at the continuous index `(y, x)`.
    ///
    /// Coordinates are clamped to the slice, so samples past the last voxel
    /// repeat the edge value.
    #[inline]
    pub(crate) fn sample(
        interpolation: Interpolation,
        slice: &ArrayView2<f32>,
        y: f32,
        x: f32,
    ) -> f32 {
        let (height, width) = slice.dim();
        let y = y.clamp(0.0, (height - 1) as f32);
        let x = x.clamp(0.0, (width - 1) as f32);
        match interpolation {
            Interpolation::Linear => Self::bilinear_interpolate(slice, y, x),
            Interpolation::Nearest => slice[[y.round() as usize, x.round() as usize]],
        }
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<f32>, y: f32, x: f32) -> f32 {
        let (height, width) = slice.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let v00 = slice[[y0, x0]];
        let v01 = slice[[y0, x1]];
        let v10 = slice[[y1, x0]];
        let v11 = slice[[y1, x1]];

        let v0 = v00.mul_add(one_minus_dx, v01 * dx);
        let v1 = v10.mul_add(one_minus_dx, v11 * dx);

        v0.mul_add(one_minus_dy, v1 * dy)
    }
}
