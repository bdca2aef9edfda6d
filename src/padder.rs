//! Constant padding of the in-plane axes up to a target size.

use crate::config::TargetSize;
use crate::volume::Volume;

use ndarray::{Array3, s};
use thiserror::Error;

/// Background level of CT-like data (air in Hounsfield units). Used as the pad
/// value whenever a volume holds any negative voxel.
pub const HOUNSFIELD_BACKGROUND: f32 = -1024.0;

/// Pad value for volumes without negative intensities.
pub const NEUTRAL_BACKGROUND: f32 = 0.0;

#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("target size must be at least 1x1, got {height}x{width}")]
    ZeroTarget { height: usize, width: usize },

    #[error("volume has an empty axis: {dim:?}")]
    EmptyVolume { dim: (usize, usize, usize) },
}

/// How a volume is padded to reach a target in-plane size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaddingSpec {
    pub target: TargetSize,
    pub pad_height: usize,
    pub pad_width: usize,
    pub fill_value: f32,
}

impl PaddingSpec {
    pub fn for_volume(volume: &Volume, target: TargetSize) -> Result<Self, ShapeError> {
        if target.height == 0 || target.width == 0 {
            return Err(ShapeError::ZeroTarget {
                height: target.height,
                width: target.width,
            });
        }
        let (min, _) = volume.min_max().ok_or(ShapeError::EmptyVolume {
            dim: volume.dim(),
        })?;

        let (height, width) = volume.in_plane_size();
        let fill_value = if min < 0.0 {
            HOUNSFIELD_BACKGROUND
        } else {
            NEUTRAL_BACKGROUND
        };

        Ok(Self {
            target,
            pad_height: target.height.saturating_sub(height),
            pad_width: target.width.saturating_sub(width),
            fill_value,
        })
    }

    /// Origin after padding. Only x and y move, by half the added extent.
    pub fn recentered_origin(&self, volume: &Volume) -> (f64, f64, f64) {
        let (ox, oy, oz) = volume.origin;
        let (sx, sy, _) = volume.spacing;
        (
            ox - self.pad_width as f64 * sx / 2.0,
            oy - self.pad_height as f64 * sy / 2.0,
            oz,
        )
    }
}

/// Pad the in-plane axes of `volume` so both reach at least `target`.
///
/// All padding goes after the existing rows and columns; nothing is ever
/// cropped. The origin is still shifted by half the padded extent, so the
/// result lines up with volumes padded the same way.
pub fn pad(volume: &Volume, target: TargetSize) -> Result<Volume, ShapeError> {
    let spec = PaddingSpec::for_volume(volume, target)?;
    Ok(apply(volume, &spec))
}

pub(crate) fn apply(volume: &Volume, spec: &PaddingSpec) -> Volume {
    let (depth, height, width) = volume.dim();
    let mut data = Array3::from_elem(
        (depth, height + spec.pad_height, width + spec.pad_width),
        spec.fill_value,
    );
    data.slice_mut(s![.., ..height, ..width]).assign(&volume.data);

    log::debug!(
        "padded {:?} -> {:?} (fill {})",
        volume.dim(),
        data.dim(),
        spec.fill_value
    );

    Volume {
        data,
        spacing: volume.spacing,
        origin: spec.recentered_origin(volume),
        direction: volume.direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn ramp(shape: (usize, usize, usize), offset: f32) -> Array3<f32> {
        Array3::from_shape_fn(shape, |(z, y, x)| (z + y + x) as f32 + offset)
    }

    #[test]
    fn reaches_target_and_keeps_original_region() {
        let original = Volume::new(ramp((3, 5, 7), 1.0));
        let padded = pad(&original, TargetSize::new(8, 9)).unwrap();

        assert_eq!(padded.dim(), (3, 8, 9));
        assert_eq!(padded.data.slice(s![.., ..5, ..7]), original.data);
        assert!(padded.data.slice(s![.., 5.., ..]).iter().all(|&v| v == 0.0));
        assert!(padded.data.slice(s![.., .., 7..]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn negative_voxel_selects_hounsfield_fill() {
        let mut data = ramp((2, 2, 2), 100.0);
        data[[1, 1, 1]] = -1.0;
        let padded = pad(&Volume::new(data), TargetSize::new(3, 3)).unwrap();

        assert!(padded.data.slice(s![.., 2.., ..]).iter().all(|&v| v == -1024.0));
        assert!(padded.data.slice(s![.., .., 2..]).iter().all(|&v| v == -1024.0));
    }

    #[test]
    fn concrete_ct_scenario() {
        let mut data = Array3::<f32>::zeros((5, 100, 150));
        data[[0, 0, 0]] = -500.0;
        let volume = Volume::with_geometry(data, (0.8, 1.2, 2.0), (10.0, 20.0, 30.0));

        let spec = PaddingSpec::for_volume(&volume, TargetSize::square(256)).unwrap();
        assert_eq!(spec.pad_height, 156);
        assert_eq!(spec.pad_width, 106);
        assert_eq!(spec.fill_value, HOUNSFIELD_BACKGROUND);

        let padded = pad(&volume, TargetSize::square(256)).unwrap();
        let expected = (10.0 - 106.0 * 0.8 / 2.0, 20.0 - 156.0 * 1.2 / 2.0, 30.0);
        assert!((padded.origin.0 - expected.0).abs() < 1e-9);
        assert!((padded.origin.1 - expected.1).abs() < 1e-9);
        assert_eq!(padded.origin.2, 30.0);
        assert_eq!(padded.spacing, volume.spacing);
        assert_eq!(padded.dim(), (5, 256, 256));
    }

    #[test]
    fn never_crops_larger_volumes() {
        let volume = Volume::new(ramp((1, 300, 40), 0.0));
        let padded = pad(&volume, TargetSize::square(256)).unwrap();
        assert_eq!(padded.dim(), (1, 300, 256));
        assert_eq!(padded.origin.1, 0.0);
    }

    #[test]
    fn source_volume_is_untouched() {
        let volume = Volume::new(ramp((2, 3, 3), -5.0));
        let before = volume.clone();
        let _ = pad(&volume, TargetSize::square(6)).unwrap();
        assert_eq!(volume, before);
    }

    #[test]
    fn rejects_zero_target_and_empty_volume() {
        let volume = Volume::new(ramp((1, 2, 2), 0.0));
        assert_eq!(
            pad(&volume, TargetSize::new(0, 4)),
            Err(ShapeError::ZeroTarget {
                height: 0,
                width: 4
            })
        );
        let empty = Volume::new(Array3::zeros((0, 2, 2)));
        assert_eq!(
            pad(&empty, TargetSize::square(4)),
            Err(ShapeError::EmptyVolume { dim: (0, 2, 2) })
        );
    }
}
