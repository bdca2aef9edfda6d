//! Reading and writing volumes as directories of numbered PNG slices.
//!
//! A sequence directory holds `<index>.png` files whose zero-padded indices
//! all share one width, so file name order is depth order. On the way back
//! in, names are checked before anything is stacked: non-numeric names,
//! mixed widths, duplicates and gaps are all rejected.

use crate::config::SliceNaming;
use crate::quantizer::SliceSequence;
use crate::volume::Volume;

use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SliceCodecError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error on {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no .png slices found in {0}")]
    NoValidImages(PathBuf),

    #[error("slice {path} is {found:?}, expected {expected:?} (width, height)")]
    InconsistentDimensions {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("slice file name is not a plain index: {0}")]
    NonNumericName(PathBuf),

    #[error("slice {path} has a {found}-digit index, expected {expected} digits")]
    MixedWidth {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("slice index {index} appears more than once in {dir}")]
    DuplicateIndex { dir: PathBuf, index: usize },

    #[error("slice indices in {dir} must start at 0 or 1, found {first}")]
    InvalidStart { dir: PathBuf, first: usize },

    #[error("slice index {missing} is missing in {dir}")]
    IndexGap { dir: PathBuf, missing: usize },

    #[error("cannot write an empty slice sequence to {0}")]
    EmptySequence(PathBuf),
}

impl SliceCodecError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn image(path: &Path, source: image::ImageError) -> Self {
        Self::Image {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write `volume` to `dir` as one 8-bit image per depth index.
///
/// A volume that already holds whole numbers in `0..=255` is written as is,
/// so [`read_sequence`] gives it back unchanged. Anything else goes through
/// per-slice min-max quantization first.
pub fn write_sequence(
    volume: &Volume,
    dir: impl AsRef<Path>,
    naming: SliceNaming,
) -> Result<Vec<PathBuf>, SliceCodecError> {
    let sequence = if volume.is_u8_range() {
        SliceSequence::from_u8_array(&volume.data.mapv(|v| v as u8))
    } else {
        SliceSequence::quantize(volume)
    };
    write_slices(&sequence, dir, naming)
}

/// Write already-quantized slices to `dir`, one file per depth index.
///
/// Anything previously at `dir` is removed first; the directory ends up
/// holding exactly this sequence.
pub fn write_slices(
    sequence: &SliceSequence,
    dir: impl AsRef<Path>,
    naming: SliceNaming,
) -> Result<Vec<PathBuf>, SliceCodecError> {
    let dir = dir.as_ref();
    if sequence.is_empty() {
        return Err(SliceCodecError::EmptySequence(dir.to_path_buf()));
    }
    recreate_dir(dir)?;

    let width = naming.width_for(sequence.len());
    let mut written = Vec::with_capacity(sequence.len());
    for (index, image) in sequence.slices.iter().enumerate() {
        let path = dir.join(naming.file_name(index, width));
        image
            .save(&path)
            .map_err(|e| SliceCodecError::image(&path, e))?;
        written.push(path);
    }

    log::debug!("wrote {} slices to {}", written.len(), dir.display());
    Ok(written)
}

/// Read a sequence directory back into a volume with unit geometry.
pub fn read_sequence(dir: impl AsRef<Path>) -> Result<Volume, SliceCodecError> {
    Ok(read_slices(dir)?.to_volume())
}

/// Read a sequence directory into its slices, in depth order.
pub fn read_slices(dir: impl AsRef<Path>) -> Result<SliceSequence, SliceCodecError> {
    let dir = dir.as_ref();
    load_slices(dir, &sequence_paths(dir)?)
}

pub(crate) fn load_slices(dir: &Path, paths: &[PathBuf]) -> Result<SliceSequence, SliceCodecError> {
    let mut slices = Vec::with_capacity(paths.len());
    let mut expected = None;
    for path in paths {
        let image = image::open(path)
            .map_err(|e| SliceCodecError::image(path, e))?
            .into_luma8();
        let found = image.dimensions();
        match expected {
            None => expected = Some(found),
            Some(expected) if expected != found => {
                return Err(SliceCodecError::InconsistentDimensions {
                    path: path.clone(),
                    expected,
                    found,
                });
            }
            Some(_) => {}
        }
        slices.push(image);
    }

    log::debug!("read {} slices from {}", slices.len(), dir.display());
    Ok(SliceSequence::new(slices))
}

/// List the `.png` files of a sequence directory in depth order, validating
/// that their names form one contiguous, equal-width run of indices.
pub fn sequence_paths(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, SliceCodecError> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| SliceCodecError::io(dir, e))?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(err) => {
                log::warn!("skipping unreadable entry in {}: {}", dir.display(), err);
                None
            }
        })
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(SliceNaming::EXTENSION))
        })
        .collect();

    if paths.is_empty() {
        return Err(SliceCodecError::NoValidImages(dir.to_path_buf()));
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut indices = Vec::with_capacity(paths.len());
    let mut digits = None;
    for path in &paths {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| SliceCodecError::NonNumericName(path.clone()))?;
        match digits {
            None => digits = Some(stem.len()),
            Some(expected) if expected != stem.len() => {
                return Err(SliceCodecError::MixedWidth {
                    path: path.clone(),
                    expected,
                    found: stem.len(),
                });
            }
            Some(_) => {}
        }
        let index = stem
            .parse::<usize>()
            .map_err(|_| SliceCodecError::NonNumericName(path.clone()))?;
        indices.push(index);
    }

    validate_indices(dir, &indices)?;
    Ok(paths)
}

fn validate_indices(dir: &Path, indices: &[usize]) -> Result<(), SliceCodecError> {
    let first = indices[0];
    if first > 1 {
        return Err(SliceCodecError::InvalidStart {
            dir: dir.to_path_buf(),
            first,
        });
    }
    for (offset, pair) in indices.windows(2).enumerate() {
        let expected = first + offset + 1;
        if pair[1] == pair[0] {
            return Err(SliceCodecError::DuplicateIndex {
                dir: dir.to_path_buf(),
                index: pair[1],
            });
        }
        if pair[1] != expected {
            return Err(SliceCodecError::IndexGap {
                dir: dir.to_path_buf(),
                missing: expected,
            });
        }
    }
    Ok(())
}

/// Remove `dir` if it exists and create it empty.
pub(crate) fn recreate_dir(dir: &Path) -> Result<(), SliceCodecError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| SliceCodecError::io(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| SliceCodecError::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use ndarray::Array3;
    use tempfile::tempdir;

    fn u8_volume(depth: usize) -> Array3<u8> {
        Array3::from_shape_fn((depth, 3, 5), |(z, y, x)| ((z * 37 + y * 11 + x * 3) % 256) as u8)
    }

    #[test]
    fn u8_round_trip_across_width_boundaries() {
        for depth in [1, 2, 10, 11] {
            let dir = tempdir().unwrap();
            let data = u8_volume(depth).mapv(|v| v as f32);
            let written = write_sequence(&Volume::new(data.clone()), dir.path(), SliceNaming::zero_based()).unwrap();
            assert_eq!(written.len(), depth);

            let volume = read_sequence(dir.path()).unwrap();
            assert_eq!(volume.data, data, "depth {depth}");
        }
    }

    #[test]
    fn narrow_8bit_values_are_not_stretched() {
        let dir = tempdir().unwrap();
        let data = Array3::from_shape_fn((2, 2, 2), |(z, y, x)| (10 + z * 4 + y * 2 + x) as f32);
        write_sequence(&Volume::new(data.clone()), dir.path(), SliceNaming::one_based_padded()).unwrap();
        assert_eq!(read_sequence(dir.path()).unwrap().data, data);
    }

    #[test]
    fn non_8bit_volumes_are_quantized_per_slice() {
        let dir = tempdir().unwrap();
        let data = Array3::from_shape_fn((2, 1, 2), |(z, _, x)| if x == 0 { -500.0 } else { 300.0 * (z + 1) as f32 });
        write_sequence(&Volume::new(data), dir.path(), SliceNaming::zero_based()).unwrap();

        let back = read_sequence(dir.path()).unwrap();
        assert_eq!(back.data.as_slice().unwrap(), &[0.0, 255.0, 0.0, 255.0]);
    }

    #[test]
    fn file_names_share_one_width() {
        let dir = tempdir().unwrap();
        let sequence = SliceSequence::from_u8_array(&u8_volume(11));
        let written = write_slices(&sequence, dir.path(), SliceNaming::zero_based()).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.first().map(String::as_str), Some("00.png"));
        assert_eq!(names.last().map(String::as_str), Some("10.png"));

        let one_based = write_slices(&sequence, dir.path(), SliceNaming::one_based_padded()).unwrap();
        assert_eq!(one_based[0].file_name().unwrap(), "0001.png");
        assert_eq!(one_based[10].file_name().unwrap(), "0011.png");
    }

    #[test]
    fn write_sequence_keeps_full_range_slices() {
        let dir = tempdir().unwrap();
        let data = Array3::from_shape_fn((4, 2, 2), |(z, y, x)| match (y, x) {
            (0, 0) => 0.0,
            (1, 1) => 255.0,
            _ => (z * 51) as f32,
        });
        let volume = Volume::new(data.clone());
        assert!(volume.is_u8_range());

        write_sequence(&volume, dir.path(), SliceNaming::zero_based()).unwrap();
        assert_eq!(read_sequence(dir.path()).unwrap().data, data);
    }

    #[test]
    fn rewriting_replaces_old_contents() {
        let dir = tempdir().unwrap();
        write_slices(&SliceSequence::from_u8_array(&u8_volume(11)), dir.path(), SliceNaming::zero_based()).unwrap();
        fs::write(dir.path().join("notes.txt"), "stale").unwrap();

        write_slices(&SliceSequence::from_u8_array(&u8_volume(3)), dir.path(), SliceNaming::zero_based()).unwrap();
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 3);
        assert_eq!(read_sequence(dir.path()).unwrap().depth(), 3);
    }

    #[test]
    fn ignores_other_extensions() {
        let dir = tempdir().unwrap();
        write_slices(&SliceSequence::from_u8_array(&u8_volume(2)), dir.path(), SliceNaming::zero_based()).unwrap();
        fs::write(dir.path().join("readme.txt"), "x").unwrap();
        assert_eq!(read_sequence(dir.path()).unwrap().depth(), 2);
    }

    fn blank(dir: &Path, name: &str) {
        GrayImage::from_pixel(2, 2, Luma([9])).save(dir.join(name)).unwrap();
    }

    #[test]
    fn rejects_mixed_digit_widths() {
        let dir = tempdir().unwrap();
        for name in ["8.png", "9.png", "10.png"] {
            blank(dir.path(), name);
        }
        assert!(matches!(
            read_sequence(dir.path()),
            Err(SliceCodecError::MixedWidth { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn rejects_gaps_and_bad_names() {
        let dir = tempdir().unwrap();
        for name in ["0.png", "1.png", "3.png"] {
            blank(dir.path(), name);
        }
        assert!(matches!(
            read_sequence(dir.path()),
            Err(SliceCodecError::IndexGap { missing: 2, .. })
        ));

        let dir = tempdir().unwrap();
        blank(dir.path(), "0.png");
        blank(dir.path(), "slice.png");
        assert!(matches!(
            read_sequence(dir.path()),
            Err(SliceCodecError::NonNumericName(_))
        ));

        let dir = tempdir().unwrap();
        blank(dir.path(), "5.png");
        blank(dir.path(), "6.png");
        assert!(matches!(
            read_sequence(dir.path()),
            Err(SliceCodecError::InvalidStart { first: 5, .. })
        ));
    }

    #[test]
    fn rejects_inconsistent_slice_sizes() {
        let dir = tempdir().unwrap();
        blank(dir.path(), "1.png");
        GrayImage::new(3, 2).save(dir.path().join("2.png")).unwrap();
        assert!(matches!(
            read_sequence(dir.path()),
            Err(SliceCodecError::InconsistentDimensions { expected: (2, 2), found: (3, 2), .. })
        ));
    }

    #[test]
    fn empty_directory_has_no_images() {
        let dir = tempdir().unwrap();
        assert!(matches!(read_sequence(dir.path()), Err(SliceCodecError::NoValidImages(_))));
        assert!(matches!(
            write_slices(&SliceSequence::default(), dir.path(), SliceNaming::zero_based()),
            Err(SliceCodecError::EmptySequence(_))
        ));
    }
}
