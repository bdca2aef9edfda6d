use std::fmt;

/// One of the co-registered scans that make up a case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modality {
    Ct,
    Cbct,
    Mask,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Ct, Modality::Cbct, Modality::Mask];

    /// Directory name used for this modality's slice sequence inside a case.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Modality::Ct => "ct",
            Modality::Cbct => "cbct",
            Modality::Mask => "mask",
        }
    }

    /// Source volume file name inside a case directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Modality::Ct => "ct.nii.gz",
            Modality::Cbct => "cbct.nii.gz",
            Modality::Mask => "mask.nii.gz",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Linear,
    Nearest,
}
