//! Boundary to an external slice-to-slice image translation model.

use crate::quantizer::SliceSequence;
use crate::slice_codec::{self, SliceCodecError};

use image::GrayImage;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ModelError = Box<dyn StdError + Send + Sync>;

/// A model mapping one normalized 8-bit slice to a translated slice of the
/// same size.
pub trait SliceTranslator {
    fn translate(&self, slice: &GrayImage) -> Result<GrayImage, ModelError>;
}

impl<F> SliceTranslator for F
where
    F: Fn(&GrayImage) -> Result<GrayImage, ModelError>,
{
    fn translate(&self, slice: &GrayImage) -> Result<GrayImage, ModelError> {
        self(slice)
    }
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Codec(#[from] SliceCodecError),

    #[error("model failed on {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("model returned {found:?} for {path}, expected {expected:?}")]
    DimensionMismatch {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },
}

/// Run every slice of the sequence at `input` through `translator` and write
/// the results to `output` under the same file names.
///
/// `output` is cleared first. Nothing is written if any slice fails.
pub fn translate_sequence(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    translator: &impl SliceTranslator,
) -> Result<Vec<PathBuf>, TranslateError> {
    let input = input.as_ref();
    let output = output.as_ref();
    let paths = slice_codec::sequence_paths(input)?;
    let sequence = slice_codec::load_slices(input, &paths)?;

    let mut translated = Vec::with_capacity(sequence.len());
    for (path, slice) in paths.iter().zip(&sequence.slices) {
        let result = translator
            .translate(slice)
            .map_err(|source| TranslateError::Model {
                path: path.clone(),
                source,
            })?;
        if result.dimensions() != slice.dimensions() {
            return Err(TranslateError::DimensionMismatch {
                path: path.clone(),
                expected: slice.dimensions(),
                found: result.dimensions(),
            });
        }
        translated.push(result);
    }

    let targets = paths
        .iter()
        .map(|path| {
            path.file_name()
                .map(|name| output.join(name))
                .ok_or_else(|| SliceCodecError::NonNumericName(path.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    slice_codec::recreate_dir(output)?;
    for (target, image) in targets.iter().zip(&translated) {
        image.save(target).map_err(|source| SliceCodecError::Image {
            path: target.clone(),
            source,
        })?;
    }

    log::info!(
        "translated {} slices from {} into {}",
        targets.len(),
        input.display(),
        output.display()
    );
    Ok(targets)
}

/// Translate an in-memory sequence.
pub fn translate_slices(
    sequence: &SliceSequence,
    translator: &impl SliceTranslator,
) -> Result<SliceSequence, ModelError> {
    let slices = sequence
        .slices
        .iter()
        .map(|slice| translator.translate(slice))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SliceSequence::new(slices))
}
