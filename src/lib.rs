//! # nii-slices
//!
//! Turns CT, CBCT and segmentation-mask NIfTI volumes into stacks of 8-bit
//! PNG slices for 2-D image translation models, and stacks such slices back
//! into volumes.
//!
//! Scans of one patient are acquired on different grids. Before slicing,
//! every volume goes through the same canonicalization so that slice `i` of
//! each modality shows the same anatomy:
//!
//!  1. **Pad** the in-plane axes up to the target size with a constant
//!     background (-1024 when the volume holds negative, Hounsfield-like
//!     values, 0 otherwise). Padding is appended after the existing rows and
//!     columns and the origin is shifted by half the padded extent.
//!  2. **Resample** the in-plane axes to exactly the target size with linear
//!     interpolation, scaling spacing so the physical extent is kept. Depth
//!     is never touched.
//!  3. **Quantize** each slice on its own with min-max scaling to `0..=255`.
//!     This is lossy: absolute intensities are not recoverable and are not
//!     comparable between slices.
//!  4. **Write** one PNG per depth index. File names are zero-padded to a
//!     common width so name order equals depth order; reading validates
//!     this and refuses gaps or mixed widths.
//!
//! Slice sequences carry no geometry. Callers that need spacing and origin
//! after the round trip keep them separately and pass them to
//! [`orchestrator::reconstruct_volume`].
//!
//! Processing is synchronous per case; slices within a volume are handled in
//! parallel with rayon, and independent cases of a batch run in parallel
//! too, each writing to its own directory.
//!
//! # Examples
//!
//! ## Processing a directory of cases
//!
//! ```no_run
//! # use nii_slices::{PipelineConfig, TargetSize, process_batch};
//! let config = PipelineConfig::default()
//!     .with_target_size(TargetSize::square(256))
//!     .with_max_cases(40);
//! let report = process_batch("SynthRAD/Task2/brain", "cbct_ct", &config)
//!     .expect("should have processed the batch");
//! for skipped in &report.skipped {
//!     eprintln!("{skipped}");
//! }
//! ```
//!
//! ## Single volume there and back
//!
//! ```no_run
//! # use nii_slices::{PipelineConfig, process_single_volume, reconstruct_volume};
//! let config = PipelineConfig::default();
//! process_single_volume("test_data/brain.nii.gz", "test_data/brain", &config)
//!     .expect("should have written slices");
//! // ... run the model over test_data/brain into test_data/brain_a2b ...
//! reconstruct_volume(
//!     "test_data/brain_a2b",
//!     "test_data/brain_predict.nii.gz",
//!     (1.0, 1.0, 1.0),
//!     (0.0, 0.0, 0.0),
//! )
//! .expect("should have rebuilt the volume");
//! ```

pub mod config;
pub mod enums;
mod interpolator;
pub mod orchestrator;
pub mod padder;
pub mod quantizer;
pub mod resampler;
pub mod slice_codec;
pub mod translate;
pub mod volume;
pub mod volume_io;

pub use config::{PipelineConfig, SliceNaming, TargetSize};
pub use enums::{Interpolation, Modality};
pub use orchestrator::{
    BatchReport, Case, CaseError, CaseOutput, CasePaths, PipelineError, discover_cases,
    process_batch, process_case, process_single_volume, reconstruct_volume,
};
pub use padder::{HOUNSFIELD_BACKGROUND, PaddingSpec, ShapeError, pad};
pub use quantizer::{SliceSequence, quantize};
pub use resampler::{GeometryError, ResampleSpec, resample, resample_with};
pub use slice_codec::{
    SliceCodecError, read_sequence, read_slices, write_sequence, write_slices,
};
pub use translate::{SliceTranslator, TranslateError, translate_sequence};
pub use volume::Volume;
pub use volume_io::{VolumeIoError, read_volume, write_volume, write_volume_with};
