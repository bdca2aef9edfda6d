use crate::config::TargetSize;
use crate::enums::Interpolation;
use crate::interpolator::Interpolator;
use crate::volume::Volume;

use ndarray::{Array2, Array3, Axis, s};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("resample target must be at least 1x1, got {height}x{width}")]
    ZeroTarget { height: usize, width: usize },

    #[error("derived spacing along {axis} is not positive: {spacing}")]
    NonPositiveSpacing { axis: char, spacing: f64 },

    #[error("volume has an empty axis: {dim:?}")]
    EmptyVolume { dim: (usize, usize, usize) },
}

/// Output grid of an in-plane resample. Depth size and spacing never change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResampleSpec {
    pub target: TargetSize,
    /// New spacing along (x, y, z).
    pub spacing: (f64, f64, f64),
}

impl ResampleSpec {
    pub fn for_volume(volume: &Volume, target: TargetSize) -> Result<Self, GeometryError> {
        if target.height == 0 || target.width == 0 {
            return Err(GeometryError::ZeroTarget {
                height: target.height,
                width: target.width,
            });
        }
        if volume.data.is_empty() {
            return Err(GeometryError::EmptyVolume { dim: volume.dim() });
        }
        let (height, width) = volume.in_plane_size();
        let (sx, sy, sz) = volume.spacing;

        let spacing = (
            sx * (width as f64 / target.width as f64),
            sy * (height as f64 / target.height as f64),
            sz,
        );
        for (axis, value) in [('x', spacing.0), ('y', spacing.1), ('z', spacing.2)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(GeometryError::NonPositiveSpacing {
                    axis,
                    spacing: value,
                });
            }
        }
        Ok(Self { target, spacing })
    }
}

/// Resample the in-plane axes to exactly `target` with linear interpolation.
pub fn resample(volume: &Volume, target: TargetSize) -> Result<Volume, GeometryError> {
    resample_with(volume, target, Interpolation::Linear)
}

/// Resample the in-plane axes to exactly `target`.
///
/// Output voxel `(i, j)` sits at the same physical position as the input's
/// continuous index `(i * sy' / sy, j * sx' / sx)`: the origin is shared and
/// only the spacing changes. Slices are processed independently; depth is
/// passed through.
pub fn resample_with(
    volume: &Volume,
    target: TargetSize,
    interpolation: Interpolation,
) -> Result<Volume, GeometryError> {
    let spec = ResampleSpec::for_volume(volume, target)?;
    let (depth, _, _) = volume.dim();
    let scale_x = (spec.spacing.0 / volume.spacing.0) as f32;
    let scale_y = (spec.spacing.1 / volume.spacing.1) as f32;

    let slices: Vec<Array2<f32>> = volume
        .data
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|slice| {
            Array2::from_shape_fn((target.height, target.width), |(i, j)| {
                Interpolator::sample(interpolation, &slice, i as f32 * scale_y, j as f32 * scale_x)
            })
        })
        .collect();

    let mut data = Array3::<f32>::zeros((depth, target.height, target.width));
    for (index, slice) in slices.iter().enumerate() {
        data.slice_mut(s![index, .., ..]).assign(slice);
    }

    log::debug!(
        "resampled {:?} -> {:?}, spacing {:?} -> {:?}",
        volume.dim(),
        data.dim(),
        volume.spacing,
        spec.spacing
    );

    Ok(Volume {
        data,
        spacing: spec.spacing,
        origin: volume.origin,
        direction: volume.direction,
    })
}
