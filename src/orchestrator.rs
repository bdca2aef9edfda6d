//! Drives pad -> resample -> quantize -> write over cases and single volumes.
//!
//! This is the only module that knows the on-disk layout:
//!
//! ```text
//! input_root/<case>/{ct,cbct,mask}.nii.gz
//! output_root/<case>/{ct,cbct,mask}/<index>.png
//! ```

use crate::config::PipelineConfig;
use crate::enums::Modality;
use crate::padder::{self, ShapeError};
use crate::quantizer::SliceSequence;
use crate::resampler::{self, GeometryError};
use crate::slice_codec::{self, SliceCodecError};
use crate::volume::Volume;
use crate::volume_io::{self, VolumeIoError};

use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Failure of one case. In batch mode it skips the case and the batch goes on.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("case {case}: cannot load {modality} from {path}: {source}")]
    Load {
        case: String,
        modality: Modality,
        path: PathBuf,
        #[source]
        source: VolumeIoError,
    },

    #[error("case {case}: {modality} has depth {found}, expected {expected}")]
    DepthMismatch {
        case: String,
        modality: Modality,
        expected: usize,
        found: usize,
    },

    #[error("case {case}: cannot pad {modality}: {source}")]
    Shape {
        case: String,
        modality: Modality,
        #[source]
        source: ShapeError,
    },

    #[error("case {case}: cannot resample {modality}: {source}")]
    Geometry {
        case: String,
        modality: Modality,
        #[source]
        source: GeometryError,
    },

    #[error("case {case}: cannot prepare output directory {path}: {source}")]
    OutputDir {
        case: String,
        path: PathBuf,
        #[source]
        source: SliceCodecError,
    },

    #[error("case {case}: cannot write {modality} slices: {source}")]
    Write {
        case: String,
        modality: Modality,
        #[source]
        source: SliceCodecError,
    },

    #[error("case {case}: no modalities configured")]
    NoModalities { case: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Volume(#[from] VolumeIoError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Codec(#[from] SliceCodecError),
}

impl PipelineError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Input location of one case: a directory holding `<modality>.nii.gz` files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CasePaths {
    pub id: String,
    pub dir: PathBuf,
}

impl CasePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        Self { id, dir }
    }

    pub fn modality_path(&self, modality: Modality) -> PathBuf {
        self.dir.join(modality.file_name())
    }
}

/// A case after loading: its modalities share one depth count.
#[derive(Clone, Debug)]
pub struct Case {
    pub id: String,
    pub volumes: Vec<(Modality, Volume)>,
}

impl Case {
    /// Load every configured modality. Any failure rejects the whole case.
    pub fn load(paths: &CasePaths, modalities: &[Modality]) -> Result<Self, CaseError> {
        if modalities.is_empty() {
            return Err(CaseError::NoModalities {
                case: paths.id.clone(),
            });
        }
        let mut volumes = Vec::with_capacity(modalities.len());
        for &modality in modalities {
            let path = paths.modality_path(modality);
            let volume = volume_io::read_volume(&path).map_err(|source| CaseError::Load {
                case: paths.id.clone(),
                modality,
                path: path.clone(),
                source,
            })?;
            volumes.push((modality, volume));
        }

        let expected = volumes[0].1.depth();
        if let Some((modality, volume)) = volumes.iter().find(|(_, v)| v.depth() != expected) {
            return Err(CaseError::DepthMismatch {
                case: paths.id.clone(),
                modality: *modality,
                expected,
                found: volume.depth(),
            });
        }

        Ok(Self {
            id: paths.id.clone(),
            volumes,
        })
    }

    pub fn depth(&self) -> usize {
        self.volumes.first().map_or(0, |(_, v)| v.depth())
    }

    /// Pad and resample every modality to the same target grid.
    pub fn canonicalize(&self, config: &PipelineConfig) -> Result<Self, CaseError> {
        let volumes = self
            .volumes
            .iter()
            .map(|(modality, volume)| {
                let modality = *modality;
                let padded = padder::pad(volume, config.target_size).map_err(|source| {
                    CaseError::Shape {
                        case: self.id.clone(),
                        modality,
                        source,
                    }
                })?;
                let resampled =
                    resampler::resample_with(&padded, config.target_size, config.interpolation)
                        .map_err(|source| CaseError::Geometry {
                            case: self.id.clone(),
                            modality,
                            source,
                        })?;
                Ok((modality, resampled))
            })
            .collect::<Result<Vec<_>, CaseError>>()?;
        Ok(Self {
            id: self.id.clone(),
            volumes,
        })
    }
}

/// Written output of one case.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseOutput {
    pub id: String,
    pub dir: PathBuf,
    pub depth: usize,
}

/// Outcome of a batch: cases written and cases skipped, in discovery order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<CaseOutput>,
    pub skipped: Vec<CaseError>,
}

/// List case directories under `input_root`, sorted by name.
pub fn discover_cases(input_root: impl AsRef<Path>) -> Result<Vec<CasePaths>, PipelineError> {
    let input_root = input_root.as_ref();
    let mut dirs: Vec<PathBuf> = fs::read_dir(input_root)
        .map_err(|e| PipelineError::io(input_root, e))?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(err) => {
                log::warn!("skipping unreadable entry in {}: {}", input_root.display(), err);
                None
            }
        })
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs.into_iter().map(CasePaths::new).collect())
}

/// Process one case into `output_root/<case id>/<modality>/`.
///
/// All modalities are loaded and transformed in memory before anything is
/// written. The case directory is replaced, never merged into. When the case
/// fails at any stage its directory is removed, so no stale or partial output
/// is left behind.
pub fn process_case(
    paths: &CasePaths,
    output_root: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<CaseOutput, CaseError> {
    let case_dir = output_root.as_ref().join(&paths.id);
    let result = Case::load(paths, &config.modalities)
        .and_then(|case| case.canonicalize(config))
        .and_then(|canonical| write_case(&canonical, &case_dir, config).map(|()| canonical));

    let canonical = match result {
        Ok(canonical) => canonical,
        Err(err) => {
            remove_case_dir(&paths.id, &case_dir);
            return Err(err);
        }
    };

    log::info!(
        "case {}: wrote {} slices x {} modalities to {}",
        paths.id,
        canonical.depth(),
        canonical.volumes.len(),
        case_dir.display()
    );
    Ok(CaseOutput {
        id: paths.id.clone(),
        dir: case_dir,
        depth: canonical.depth(),
    })
}

fn remove_case_dir(id: &str, case_dir: &Path) {
    if !case_dir.exists() {
        return;
    }
    if let Err(err) = fs::remove_dir_all(case_dir) {
        log::warn!(
            "case {}: could not remove output {}: {}",
            id,
            case_dir.display(),
            err
        );
    }
}

fn write_case(case: &Case, case_dir: &Path, config: &PipelineConfig) -> Result<(), CaseError> {
    slice_codec::recreate_dir(case_dir).map_err(|source| CaseError::OutputDir {
        case: case.id.clone(),
        path: case_dir.to_path_buf(),
        source,
    })?;

    for (modality, volume) in &case.volumes {
        let sequence = SliceSequence::quantize(volume);
        slice_codec::write_slices(&sequence, case_dir.join(modality.dir_name()), config.case_naming)
            .map_err(|source| CaseError::Write {
                case: case.id.clone(),
                modality: *modality,
                source,
            })?;
    }
    Ok(())
}

/// Process every case under `input_root` (up to `config.max_cases`).
///
/// `output_root` is cleared before the run. Cases are independent and run in
/// parallel; a failing case is logged and skipped.
pub fn process_batch(
    input_root: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<BatchReport, PipelineError> {
    let output_root = output_root.as_ref();
    let mut cases = discover_cases(input_root)?;
    if let Some(max_cases) = config.max_cases {
        cases.truncate(max_cases);
    }

    if output_root.exists() {
        fs::remove_dir_all(output_root).map_err(|e| PipelineError::io(output_root, e))?;
    }
    fs::create_dir_all(output_root).map_err(|e| PipelineError::io(output_root, e))?;

    log::info!(
        "processing {} cases into {} at {}x{}",
        cases.len(),
        output_root.display(),
        config.target_size.height,
        config.target_size.width
    );

    let results: Vec<Result<CaseOutput, CaseError>> = cases
        .par_iter()
        .map(|paths| process_case(paths, output_root, config))
        .collect();

    let mut report = BatchReport::default();
    for result in results {
        match result {
            Ok(output) => report.written.push(output),
            Err(err) => {
                log::error!("skipping {}", err);
                report.skipped.push(err);
            }
        }
    }

    log::info!(
        "batch done: {} written, {} skipped",
        report.written.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Pad, resample and slice a single volume file into `output_dir`.
///
/// `output_dir` is replaced. Slices use `config.single_naming`.
pub fn process_single_volume(
    path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>, PipelineError> {
    let path = path.as_ref();
    let output_dir = output_dir.as_ref();

    let volume = volume_io::read_volume(path)?;
    let padded = padder::pad(&volume, config.target_size)?;
    let resampled = resampler::resample_with(&padded, config.target_size, config.interpolation)?;
    let sequence = SliceSequence::quantize(&resampled);
    let written = slice_codec::write_slices(&sequence, output_dir, config.single_naming)?;

    log::info!(
        "{}: wrote {} slices to {}",
        path.display(),
        written.len(),
        output_dir.display()
    );
    Ok(written)
}

/// Stack a slice sequence back into a volume file with the given geometry.
pub fn reconstruct_volume(
    sequence_dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    spacing: (f64, f64, f64),
    origin: (f64, f64, f64),
) -> Result<Volume, PipelineError> {
    let volume = slice_codec::read_sequence(sequence_dir.as_ref())?;
    let volume = Volume::with_geometry(volume.data, spacing, origin);
    volume_io::write_volume(&volume, output_path.as_ref())?;

    log::info!(
        "{}: rebuilt {:?} volume from {}",
        output_path.as_ref().display(),
        volume.dim(),
        sequence_dir.as_ref().display()
    );
    Ok(volume)
}
