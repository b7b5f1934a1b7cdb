// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! N-dimensional numeric frames as delivered by the acquisition pipeline.
//!
//! Dimension 0 varies fastest (X), dimension 1 is Y, dimension 2 is Z. The
//! flat index of element (x, y, z) is `x + y*nx + z*nx*ny`.

use image::{GrayImage, ImageBuffer, Luma};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoiError};

/// Highest frame rank handled by the ROI engine.
pub const MAX_DIMS: usize = 3;

/// Element representation of a frame. The integer codes match the external
/// ROI_DATA_TYPE parameter; -1 there means "same as the source frame".
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NumericKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl NumericKind {
    pub fn code(self) -> i32 {
        match self {
            NumericKind::Int8 => 0,
            NumericKind::UInt8 => 1,
            NumericKind::Int16 => 2,
            NumericKind::UInt16 => 3,
            NumericKind::Int32 => 4,
            NumericKind::UInt32 => 5,
            NumericKind::Float32 => 6,
            NumericKind::Float64 => 7,
        }
    }

    pub fn from_code(code: i32) -> Result<NumericKind> {
        Ok(match code {
            0 => NumericKind::Int8,
            1 => NumericKind::UInt8,
            2 => NumericKind::Int16,
            3 => NumericKind::UInt16,
            4 => NumericKind::Int32,
            5 => NumericKind::UInt32,
            6 => NumericKind::Float32,
            7 => NumericKind::Float64,
            _ => return Err(RoiError::UnsupportedNumericKind(code as i64)),
        })
    }
}

/// Flat element storage, one variant per [NumericKind].
#[derive(Clone, Debug, PartialEq)]
pub enum FrameData {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

// Binds the typed Vec inside a FrameData (by value, ref or mut ref, following
// match ergonomics) and evaluates `$body` for whichever variant is present.
macro_rules! with_buffer {
    ($data:expr, $buf:ident => $body:expr) => {
        match $data {
            $crate::frame::FrameData::Int8($buf) => $body,
            $crate::frame::FrameData::UInt8($buf) => $body,
            $crate::frame::FrameData::Int16($buf) => $body,
            $crate::frame::FrameData::UInt16($buf) => $body,
            $crate::frame::FrameData::Int32($buf) => $body,
            $crate::frame::FrameData::UInt32($buf) => $body,
            $crate::frame::FrameData::Float32($buf) => $body,
            $crate::frame::FrameData::Float64($buf) => $body,
        }
    };
}
pub(crate) use with_buffer;

impl FrameData {
    pub fn kind(&self) -> NumericKind {
        match self {
            FrameData::Int8(_) => NumericKind::Int8,
            FrameData::UInt8(_) => NumericKind::UInt8,
            FrameData::Int16(_) => NumericKind::Int16,
            FrameData::UInt16(_) => NumericKind::UInt16,
            FrameData::Int32(_) => NumericKind::Int32,
            FrameData::UInt32(_) => NumericKind::UInt32,
            FrameData::Float32(_) => NumericKind::Float32,
            FrameData::Float64(_) => NumericKind::Float64,
        }
    }

    pub fn len(&self) -> usize {
        with_buffer!(self, buf => buf.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty buffer of the given kind.
    pub fn empty(kind: NumericKind) -> FrameData {
        match kind {
            NumericKind::Int8 => FrameData::Int8(Vec::new()),
            NumericKind::UInt8 => FrameData::UInt8(Vec::new()),
            NumericKind::Int16 => FrameData::Int16(Vec::new()),
            NumericKind::UInt16 => FrameData::UInt16(Vec::new()),
            NumericKind::Int32 => FrameData::Int32(Vec::new()),
            NumericKind::UInt32 => FrameData::UInt32(Vec::new()),
            NumericKind::Float32 => FrameData::Float32(Vec::new()),
            NumericKind::Float64 => FrameData::Float64(Vec::new()),
        }
    }

    /// Element `index` widened to f64.
    pub fn value_at(&self, index: usize) -> f64 {
        with_buffer!(self, buf => AsPrimitive::<f64>::as_(buf[index]))
    }
}

/// Per-kind conversion between stored elements and the f64 accumulation
/// domain. Narrowing follows `as` semantics: truncation toward zero,
/// saturation at the kind's range, NaN becomes zero.
pub trait Element: Copy + Default + Send + Sync + AsPrimitive<f64> {
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(impl Element for $t {
            #[inline]
            fn from_f64(value: f64) -> Self {
                AsPrimitive::<$t>::as_(value)
            }
        })*
    };
}
impl_element!(i8, u8, i16, u16, i32, u32, f32, f64);

/// A multi-dimensional numeric array.
#[derive(Clone, Debug, PartialEq)]
pub struct NdFrame {
    dims: Vec<usize>,
    data: FrameData,
}

impl NdFrame {
    /// Validates that `data` holds exactly the product of `dims` elements.
    pub fn new(dims: Vec<usize>, data: FrameData) -> Result<NdFrame> {
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(RoiError::BufferSize{dims, expected, actual: data.len()});
        }
        Ok(NdFrame{dims, data})
    }

    /// An empty frame of the given kind, to be filled by the extractor.
    pub(crate) fn empty(kind: NumericKind) -> NdFrame {
        NdFrame{dims: Vec::new(), data: FrameData::empty(kind)}
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

    pub fn kind(&self) -> NumericKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &FrameData {
        &self.data
    }

    pub fn into_data(self) -> FrameData {
        self.data
    }

    /// Element values widened to f64, in storage order.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_buffer!(&self.data,
                     buf => buf.iter().map(|&v| AsPrimitive::<f64>::as_(v)).collect())
    }

    /// Like [NdFrame::to_f64_vec()], but writes into `out`, reusing its
    /// allocation.
    pub(crate) fn widen_into(&self, out: &mut Vec<f64>) -> Result<()> {
        crate::error::try_resize(out, self.len(), 0.0, "working")?;
        with_buffer!(&self.data, buf => {
            for (dst, &src) in out.iter_mut().zip(buf.iter()) {
                *dst = AsPrimitive::<f64>::as_(src);
            }
        });
        Ok(())
    }

    /// Overwrites this frame with `values` converted to the frame's kind,
    /// reusing the existing allocation when the size is unchanged.
    pub(crate) fn assign_from_f64(&mut self, dims: &[usize], values: &[f64])
                                  -> Result<()> {
        fill_converted(&mut self.data, values)?;
        self.dims.clear();
        self.dims.extend_from_slice(dims);
        Ok(())
    }

    /// Renders a 2-D frame as an 8-bit image, linearly scaling the range
    /// [min, max] of the frame onto [0, 255]. Returns None for other ranks.
    pub fn to_gray_image(&self) -> Option<GrayImage> {
        if self.ndims() != 2 {
            return None;
        }
        let values = self.to_f64_vec();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let scale = if max > min { 255.0 / (max - min) } else { 0.0 };
        let pixels: Vec<u8> = values.iter()
            .map(|v| ((v - min) * scale).round() as u8).collect();
        GrayImage::from_raw(self.dims[0] as u32, self.dims[1] as u32, pixels)
    }
}

fn fill_converted(data: &mut FrameData, values: &[f64]) -> Result<()> {
    with_buffer!(data, buf => fill_typed(buf, values))
}

fn fill_typed<T: Element>(buf: &mut Vec<T>, values: &[f64]) -> Result<()> {
    crate::error::try_resize(buf, values.len(), T::default(), "output frame")?;
    for (dst, &src) in buf.iter_mut().zip(values) {
        *dst = T::from_f64(src);
    }
    Ok(())
}

impl From<&GrayImage> for NdFrame {
    fn from(image: &GrayImage) -> NdFrame {
        let (width, height) = image.dimensions();
        NdFrame{dims: vec![width as usize, height as usize],
                data: FrameData::UInt8(image.as_raw().clone())}
    }
}

impl From<&ImageBuffer<Luma<u16>, Vec<u16>>> for NdFrame {
    fn from(image: &ImageBuffer<Luma<u16>, Vec<u16>>) -> NdFrame {
        let (width, height) = image.dimensions();
        NdFrame{dims: vec![width as usize, height as usize],
                data: FrameData::UInt16(image.as_raw().clone())}
    }
}

// mod tests.
