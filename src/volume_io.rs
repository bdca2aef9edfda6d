use crate::volume::{IDENTITY_DIRECTION, Volume};

use ndarray::{Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// NIFTI_XFORM_SCANNER_ANAT
const XFORM_SCANNER_ANAT: i16 = 1;
/// NIFTI_UNITS_MM
const UNITS_MM: u8 = 2;

#[derive(Debug, Error)]
pub enum VolumeIoError {
    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::error::NiftiError),

    #[error("{path}: expected a 3-D volume, found {ndim} dimensions")]
    Dimensionality { path: PathBuf, ndim: usize },

    #[error("{path}: volume has an empty axis")]
    EmptyAxis { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a `.nii` / `.nii.gz` file into a [`Volume`].
///
/// The file's `(x, y, z)` voxel order is turned into `(depth, height, width)`.
/// A 4-D file whose last axis has length 1 is accepted as 3-D.
pub fn read_volume(path: impl AsRef<Path>) -> Result<Volume, VolumeIoError> {
    let path = path.as_ref();
    let object = ReaderOptions::new().read_file(path)?;
    let header = object.header().clone();
    let mut array = object.into_volume().into_ndarray::<f32>()?;

    if array.ndim() == 4 && array.shape()[3] == 1 {
        array = array.index_axis_move(Axis(3), 0);
    }
    let ndim = array.ndim();
    let xyz = array
        .into_dimensionality::<Ix3>()
        .map_err(|_| VolumeIoError::Dimensionality {
            path: path.to_path_buf(),
            ndim,
        })?;
    if xyz.is_empty() {
        return Err(VolumeIoError::EmptyAxis {
            path: path.to_path_buf(),
        });
    }
    let data = xyz.reversed_axes().as_standard_layout().into_owned();

    let spacing = (
        header.pixdim[1].abs() as f64,
        header.pixdim[2].abs() as f64,
        header.pixdim[3].abs() as f64,
    );
    let (origin, direction) = geometry_from_header(&header, spacing);

    log::debug!(
        "read {} with shape {:?}, spacing {:?}, origin {:?}",
        path.display(),
        data.dim(),
        spacing,
        origin
    );

    Ok(Volume {
        data,
        spacing,
        origin,
        direction,
    })
}

/// Write a volume using its own spacing and origin.
pub fn write_volume(volume: &Volume, path: impl AsRef<Path>) -> Result<(), VolumeIoError> {
    write_volume_with(volume, path, volume.spacing, volume.origin)
}

/// Write a volume with explicit geometry. Compression follows the file
/// extension (`.nii.gz` is gzipped).
pub fn write_volume_with(
    volume: &Volume,
    path: impl AsRef<Path>,
    spacing: (f64, f64, f64),
    origin: (f64, f64, f64),
) -> Result<(), VolumeIoError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let header = header_for(spacing, origin, &volume.direction);

    // back to (x, y, z); the writer emits logical order
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&volume.data.t())?;

    log::debug!("wrote {} with shape {:?}", path.display(), volume.dim());
    Ok(())
}

fn geometry_from_header(
    header: &NiftiHeader,
    spacing: (f64, f64, f64),
) -> ((f64, f64, f64), [[f64; 3]; 3]) {
    if header.sform_code > 0 {
        let rows = [header.srow_x, header.srow_y, header.srow_z];
        let spacing = [spacing.0, spacing.1, spacing.2];
        let mut direction = [[0.0; 3]; 3];
        for (r, row) in rows.iter().enumerate() {
            for c in 0..3 {
                direction[r][c] = if spacing[c] > 0.0 {
                    row[c] as f64 / spacing[c]
                } else {
                    0.0
                };
            }
        }
        let origin = (rows[0][3] as f64, rows[1][3] as f64, rows[2][3] as f64);
        (origin, direction)
    } else {
        let origin = (
            header.quatern_x as f64,
            header.quatern_y as f64,
            header.quatern_z as f64,
        );
        (origin, IDENTITY_DIRECTION)
    }
}

fn header_for(
    spacing: (f64, f64, f64),
    origin: (f64, f64, f64),
    direction: &[[f64; 3]; 3],
) -> NiftiHeader {
    let mut header = NiftiHeader::default();
    let spacing = [spacing.0, spacing.1, spacing.2];
    let origin = [origin.0, origin.1, origin.2];

    header.pixdim[0] = 1.0;
    for axis in 0..3 {
        header.pixdim[axis + 1] = spacing[axis] as f32;
    }
    header.xyzt_units = UNITS_MM;

    let mut rows = [[0.0f32; 4]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for c in 0..3 {
            row[c] = (direction[r][c] * spacing[c]) as f32;
        }
        row[3] = origin[r] as f32;
    }
    header.sform_code = XFORM_SCANNER_ANAT;
    header.srow_x = rows[0];
    header.srow_y = rows[1];
    header.srow_z = rows[2];

    // the quaternion form only carries the identity case
    if *direction == IDENTITY_DIRECTION {
        header.qform_code = XFORM_SCANNER_ANAT;
        header.quatern_b = 0.0;
        header.quatern_c = 0.0;
        header.quatern_d = 0.0;
        header.quatern_x = origin[0] as f32;
        header.quatern_y = origin[1] as f32;
        header.quatern_z = origin[2] as f32;
    } else {
        header.qform_code = 0;
    }
    header
}
