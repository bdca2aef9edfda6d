use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray::Zip;

pub const IDENTITY_DIRECTION: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// A scan volume together with its physical geometry.
///
/// The voxel array is ordered `(depth, height, width)`. `spacing` and
/// `origin` follow the on-disk axis order `(x, y, z)`, i.e. width first.
/// Pipeline stages never mutate a `Volume`; each returns a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    pub data: Array3<f32>,
    pub spacing: (f64, f64, f64),
    pub origin: (f64, f64, f64),
    pub direction: [[f64; 3]; 3],
}

impl Volume {
    /// Unit spacing, origin at zero, identity direction.
    pub fn new(data: Array3<f32>) -> Self {
        Self::with_geometry(data, (1.0, 1.0, 1.0), (0.0, 0.0, 0.0))
    }

    pub fn with_geometry(
        data: Array3<f32>,
        spacing: (f64, f64, f64),
        origin: (f64, f64, f64),
    ) -> Self {
        Self {
            data,
            spacing,
            origin,
            direction: IDENTITY_DIRECTION,
        }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn depth(&self) -> usize {
        self.data.dim().0
    }

    /// In-plane size as (height, width).
    pub fn in_plane_size(&self) -> (usize, usize) {
        let (_, height, width) = self.data.dim();
        (height, width)
    }

    /// Physical extent along (x, y, z): size times spacing per axis.
    pub fn extent(&self) -> (f64, f64, f64) {
        let (depth, height, width) = self.data.dim();
        (
            width as f64 * self.spacing.0,
            height as f64 * self.spacing.1,
            depth as f64 * self.spacing.2,
        )
    }

    /// Global minimum and maximum intensity, `None` for an empty volume.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        min_max(self.data.iter().copied())
    }

    pub fn get_slice(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.depth()).then(|| self.data.index_axis(Axis(0), index))
    }

    pub fn slices(&self) -> impl Iterator<Item = ArrayView2<'_, f32>> {
        self.data.axis_iter(Axis(0))
    }

    /// True when every voxel is an integer in `0..=255`.
    pub fn is_u8_range(&self) -> bool {
        Zip::from(&self.data).all(|&v| (0.0..=255.0).contains(&v) && v.fract() == 0.0)
    }
}

pub(crate) fn min_max(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    values.fold(None, |acc, v| {
        if v.is_nan() {
            return acc;
        }
        match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        }
    })
}
