use crate::enums::{Interpolation, Modality};

/// In-plane size every volume is brought to before slicing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetSize {
    pub height: usize,
    pub width: usize,
}

impl TargetSize {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }
}

impl Default for TargetSize {
    fn default() -> Self {
        Self::square(256)
    }
}

/// File naming of a slice sequence: `<index>.png` with the index zero-padded.
///
/// The width is `max(min_digits, digits(first_index + depth - 1))`, so every
/// file in one sequence shares the same width and name order equals depth
/// order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceNaming {
    pub first_index: usize,
    pub min_digits: usize,
}

impl SliceNaming {
    pub const EXTENSION: &'static str = "png";

    /// `0.png`, `1.png`, ... widened only as far as the depth requires.
    pub fn zero_based() -> Self {
        Self {
            first_index: 0,
            min_digits: 1,
        }
    }

    /// `0001.png`, `0002.png`, ...
    pub fn one_based_padded() -> Self {
        Self {
            first_index: 1,
            min_digits: 4,
        }
    }

    pub fn width_for(&self, depth: usize) -> usize {
        let last = self.first_index + depth.saturating_sub(1);
        last.to_string().len().max(self.min_digits)
    }

    pub fn file_name(&self, depth_index: usize, width: usize) -> String {
        format!(
            "{:0width$}.{}",
            self.first_index + depth_index,
            Self::EXTENSION,
            width = width
        )
    }
}

impl Default for SliceNaming {
    fn default() -> Self {
        Self::zero_based()
    }
}

/// Settings injected into every orchestrator entry point.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub target_size: TargetSize,
    /// Process only the first `n` discovered cases. `None` processes all.
    pub max_cases: Option<usize>,
    pub modalities: Vec<Modality>,
    pub interpolation: Interpolation,
    pub case_naming: SliceNaming,
    pub single_naming: SliceNaming,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_size: TargetSize::default(),
            max_cases: None,
            modalities: Modality::ALL.to_vec(),
            interpolation: Interpolation::default(),
            case_naming: SliceNaming::zero_based(),
            single_naming: SliceNaming::one_based_padded(),
        }
    }
}

impl PipelineConfig {
    pub fn with_target_size(mut self, target_size: TargetSize) -> Self {
        self.target_size = target_size;
        self
    }

    pub fn with_max_cases(mut self, max_cases: usize) -> Self {
        self.max_cases = Some(max_cases);
        self
    }

    pub fn with_modalities(mut self, modalities: &[Modality]) -> Self {
        self.modalities = modalities.to_vec();
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_case_naming(mut self, naming: SliceNaming) -> Self {
        self.case_naming = naming;
        self
    }

    pub fn with_single_naming(mut self, naming: SliceNaming) -> Self {
        self.single_naming = naming;
        self
    }
}
