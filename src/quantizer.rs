//! Per-slice min-max quantization to 8-bit grayscale.
//!
//! Every slice is stretched to the full `0..=255` range on its own. Two slices
//! with different intensity ranges are scaled differently, so absolute
//! intensities cannot be compared across slices (or recovered) afterwards.
//! Re-quantizing an 8-bit slice stretches it again unless it already spans
//! `0` to `255`.

use crate::volume::{self, Volume};

use image::{GrayImage, ImageBuffer};
use ndarray::{Array3, ArrayView2, Axis, s};
use rayon::prelude::*;

/// Quantize one `(height, width)` slice to an 8-bit image.
///
/// `(v - min) / (max - min) * 255`, truncated. A constant slice (`max == min`)
/// becomes all zeros.
pub fn quantize(slice: &ArrayView2<'_, f32>) -> GrayImage {
    let (height, width) = slice.dim();
    let pixels: Vec<u8> = match volume::min_max(slice.iter().copied()) {
        Some((min, max)) if max > min => {
            let range = max - min;
            slice
                .iter()
                .map(|&v| normalize_to_u8(v, min, range))
                .collect()
        }
        _ => vec![0; height * width],
    };
    // row-major iteration matches the image buffer layout
    ImageBuffer::from_raw(width as u32, height as u32, pixels)
        .unwrap_or_else(|| GrayImage::new(width as u32, height as u32))
}

#[inline]
fn normalize_to_u8(value: f32, min: f32, range: f32) -> u8 {
    ((value - min) / range * 255.0).clamp(0.0, 255.0) as u8
}

/// An ordered stack of 8-bit slices, one per depth index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SliceSequence {
    pub slices: Vec<GrayImage>,
}

impl SliceSequence {
    pub fn new(slices: Vec<GrayImage>) -> Self {
        Self { slices }
    }

    /// Quantize every depth slice of `volume` independently.
    pub fn quantize(volume: &Volume) -> Self {
        let slices = volume
            .data
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|slice| quantize(&slice))
            .collect();
        Self { slices }
    }

    /// Lossless conversion of an array already holding 8-bit values.
    pub fn from_u8_array(data: &Array3<u8>) -> Self {
        let (_, height, width) = data.dim();
        let slices = data
            .axis_iter(Axis(0))
            .map(|slice| {
                let pixels: Vec<u8> = slice.iter().copied().collect();
                ImageBuffer::from_raw(width as u32, height as u32, pixels)
                    .unwrap_or_else(|| GrayImage::new(width as u32, height as u32))
            })
            .collect();
        Self { slices }
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// `(height, width)` of the first slice.
    pub fn dim(&self) -> Option<(usize, usize)> {
        self.slices
            .first()
            .map(|image| (image.height() as usize, image.width() as usize))
    }

    /// Stack the slices along a new leading axis. Geometry is not carried by
    /// a slice sequence, so the volume gets unit spacing and a zero origin.
    pub fn to_volume(&self) -> Volume {
        let (height, width) = self.dim().unwrap_or((0, 0));
        let mut data = Array3::<f32>::zeros((self.len(), height, width));
        for (index, image) in self.slices.iter().enumerate() {
            let mut target = data.slice_mut(s![index, .., ..]);
            for (pixel, value) in image.pixels().zip(target.iter_mut()) {
                *value = pixel.0[0] as f32;
            }
        }
        Volume::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn stretches_to_full_range() {
        let slice = array![[-1000.0f32, 0.0], [500.0, 1000.0]];
        let image = quantize(&slice.view());
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
        assert_eq!(image.get_pixel(1, 0).0[0], 127);
        assert_eq!(image.get_pixel(0, 1).0[0], 191);
        assert_eq!(image.get_pixel(1, 1).0[0], 255);
    }

    #[test]
    fn constant_slice_is_all_zero() {
        let slice = Array2::<f32>::from_elem((3, 4), -1024.0);
        let image = quantize(&slice.view());
        assert_eq!(image.dimensions(), (4, 3));
        assert!(image.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn slices_are_scaled_independently() {
        let data = Array3::from_shape_fn((2, 1, 2), |(z, _, x)| (x as f32) * if z == 0 { 10.0 } else { 1000.0 });
        let sequence = SliceSequence::quantize(&Volume::new(data));
        // both slices end up as [0, 255] despite a 100x intensity difference
        assert_eq!(sequence.slices[0].as_raw(), &vec![0, 255]);
        assert_eq!(sequence.slices[1].as_raw(), &vec![0, 255]);
    }

    #[test]
    fn requantizing_8bit_data_is_not_identity() {
        let narrow = array![[100.0f32, 150.0], [175.0, 200.0]];
        let image = quantize(&narrow.view());
        assert_eq!(image.as_raw(), &vec![0, 127, 191, 255]);

        let full = array![[0.0f32, 51.0], [204.0, 255.0]];
        assert_eq!(quantize(&full.view()).as_raw(), &vec![0, 51, 204, 255]);
    }

    #[test]
    fn to_volume_stacks_in_order() {
        let data = Array3::from_shape_fn((3, 2, 4), |(z, y, x)| (z * 50 + y * 4 + x) as u8);
        let sequence = SliceSequence::from_u8_array(&data);
        let volume = sequence.to_volume();
        assert_eq!(volume.dim(), (3, 2, 4));
        assert_eq!(volume.data, data.mapv(|v| v as f32));
        assert_eq!(volume.spacing, (1.0, 1.0, 1.0));
    }
}
