// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use num_traits::AsPrimitive;

use crate::error::{try_resize, Result};
use crate::frame::{with_buffer, Element, NdFrame, MAX_DIMS};
use crate::geometry::{Geometry, ResolvedDim};

/// Extracts the ROI described by `geometry` from `source` into `out`, which
/// is resized to the geometry's element count (reusing its allocation when
/// possible). Output layout follows the source: dimension 0 varies fastest.
///
/// Each output element is the average of its `bin` x `bin` x ... window of
/// source elements, accumulated in f64 regardless of the source kind.
/// Reversed dimensions are written in mirrored order.
///
/// `geometry` must have been resolved against `source`'s dimensions, so no
/// source index outside the frame is ever touched.
pub fn extract_roi(source: &NdFrame, geometry: &Geometry, out: &mut Vec<f64>)
                   -> Result<()> {
    debug_assert_eq!(geometry.dims().len(), source.ndims());
    try_resize(out, geometry.num_elements(), 0.0, "extraction")?;
    if out.is_empty() {
        return Ok(());
    }
    // Pad to three dimensions so a single loop nest handles 1-D to 3-D.
    let unit = ResolvedDim{start: 0, size: 1, bin: 1, reverse: false};
    let mut dims = [unit; MAX_DIMS];
    let mut source_sizes = [1_usize; MAX_DIMS];
    for (d, resolved) in geometry.dims().iter().enumerate() {
        dims[d] = *resolved;
        source_sizes[d] = source.dims()[d];
    }
    with_buffer!(source.data(),
                 buf => extract_typed(buf, &source_sizes, &dims, out));
    Ok(())
}

fn extract_typed<T: Element>(src: &[T], source_sizes: &[usize; MAX_DIMS],
                             dims: &[ResolvedDim; MAX_DIMS], out: &mut [f64]) {
    let [dx, dy, dz] = dims;
    let source_row_stride = source_sizes[0];
    let source_plane_stride = source_sizes[0] * source_sizes[1];
    let out_plane_stride = dx.size * dy.size;
    let window_count = (dx.bin * dy.bin * dz.bin) as f64;

    for oz in 0..dz.size {
        let rz = if dz.reverse { dz.size - 1 - oz } else { oz };
        for oy in 0..dy.size {
            let ry = if dy.reverse { dy.size - 1 - oy } else { oy };
            let out_start = rz * out_plane_stride + ry * dx.size;
            let out_row = &mut out[out_start..out_start + dx.size];
            out_row.fill(0.0);

            // Sum every source row that falls in this output row's window.
            for bz in 0..dz.bin {
                let sz = dz.start + oz * dz.bin + bz;
                for by in 0..dy.bin {
                    let sy = dy.start + oy * dy.bin + by;
                    let row_start = sz * source_plane_stride + sy * source_row_stride
                        + dx.start;
                    let row = &src[row_start..row_start + dx.size * dx.bin];
                    for (ox, window) in row.chunks_exact(dx.bin).enumerate() {
                        let rx = if dx.reverse { dx.size - 1 - ox } else { ox };
                        out_row[rx] += window.iter()
                            .map(|&v| AsPrimitive::<f64>::as_(v))
                            .sum::<f64>();
                    }
                }
            }
            for value in out_row.iter_mut() {
                *value /= window_count;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use imageproc::gray_image;
    use crate::frame::FrameData;
    use crate::geometry::{resolve_geometry, DimDefinition};
    use super::*;

    fn geometry_for(source: &NdFrame, requests: &[(i64, i64, i64, bool)]) -> Geometry {
        let mut defs = <[DimDefinition; MAX_DIMS]>::default();
        for (d, &(start, size, bin, reverse)) in requests.iter().enumerate() {
            defs[d] = DimDefinition{start, size, bin, reverse, max_size: 0};
        }
        resolve_geometry(&mut defs, source.dims()).unwrap()
    }

    fn image_4x4() -> NdFrame {
        NdFrame::from(&gray_image!(
             1,  2,  3,  4;
             5,  6,  7,  8;
             9, 10, 11, 12;
            13, 14, 15, 16))
    }

    #[test]
    fn test_identity_extraction() {
        let source = image_4x4();
        let geometry = geometry_for(&source, &[(1, 2, 1, false), (1, 3, 1, false)]);
        let mut out = Vec::<f64>::new();
        extract_roi(&source, &geometry, &mut out).unwrap();
        assert_eq!(out, vec![6.0, 7.0,
                             10.0, 11.0,
                             14.0, 15.0]);
    }

    #[test]
    fn test_bin_2x2() {
        let source = image_4x4();
        let geometry = geometry_for(&source, &[(0, 0, 2, false), (0, 0, 2, false)]);
        let mut out = Vec::<f64>::new();
        extract_roi(&source, &geometry, &mut out).unwrap();
        // Top-left 2x2: [1,2,5,6] -> 3.5; top-right [3,4,7,8] -> 5.5, etc.
        assert_eq!(out, vec![3.5, 5.5,
                             11.5, 13.5]);
    }

    #[test]
    fn test_reversal() {
        let source = image_4x4();
        let mut out = Vec::<f64>::new();
        let geometry = geometry_for(&source, &[(0, 3, 1, true), (0, 2, 1, false)]);
        extract_roi(&source, &geometry, &mut out).unwrap();
        assert_eq!(out, vec![3.0, 2.0, 1.0,
                             7.0, 6.0, 5.0]);

        let geometry = geometry_for(&source, &[(0, 2, 2, true), (0, 2, 2, true)]);
        extract_roi(&source, &geometry, &mut out).unwrap();
        assert_eq!(out, vec![13.5, 11.5,
                             5.5, 3.5]);
    }

    #[test]
    fn test_reversal_is_self_inverse() {
        let source = image_4x4();
        let geometry = geometry_for(&source, &[(1, 3, 1, true), (0, 4, 1, true)]);
        let mut reversed = Vec::<f64>::new();
        extract_roi(&source, &geometry, &mut reversed).unwrap();
        let reversed_frame = NdFrame::new(vec![3, 4],
                                          FrameData::Float64(reversed)).unwrap();
        let geometry = geometry_for(&reversed_frame,
                                    &[(0, 0, 1, true), (0, 0, 1, true)]);
        let mut restored = Vec::<f64>::new();
        extract_roi(&reversed_frame, &geometry, &mut restored).unwrap();

        let geometry = geometry_for(&source, &[(1, 3, 1, false), (0, 4, 1, false)]);
        let mut plain = Vec::<f64>::new();
        extract_roi(&source, &geometry, &mut plain).unwrap();
        assert_eq!(restored, plain);
    }

    #[test]
    fn test_one_and_three_dimensions() {
        let source = NdFrame::new(vec![6], FrameData::Int16(vec![-4, 2, 0, 8, 1, 1]))
            .unwrap();
        let geometry = geometry_for(&source, &[(0, 0, 2, false)]);
        let mut out = Vec::<f64>::new();
        extract_roi(&source, &geometry, &mut out).unwrap();
        assert_eq!(out, vec![-1.0, 4.0, 1.0]);

        // 2x2x2 cube holding 0..8; bin everything into a single element.
        let source = NdFrame::new(vec![2, 2, 2],
                                  FrameData::UInt32((0..8).collect())).unwrap();
        let geometry = geometry_for(&source, &[(0, 0, 2, false), (0, 0, 2, false),
                                               (0, 0, 2, false)]);
        extract_roi(&source, &geometry, &mut out).unwrap();
        assert_eq!(out, vec![3.5]);

        // Take the second plane only, reversed along Z (a no-op for one plane).
        let geometry = geometry_for(&source, &[(0, 0, 1, false), (0, 0, 1, false),
                                               (1, 1, 1, true)]);
        extract_roi(&source, &geometry, &mut out).unwrap();
        assert_eq!(out, vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_buffer_reuse() {
        let source = image_4x4();
        let mut out = Vec::<f64>::with_capacity(16);
        let geometry = geometry_for(&source, &[(0, 0, 1, false), (0, 0, 1, false)]);
        extract_roi(&source, &geometry, &mut out).unwrap();
        let ptr = out.as_ptr();
        let geometry = geometry_for(&source, &[(2, 2, 1, false), (2, 2, 1, false)]);
        extract_roi(&source, &geometry, &mut out).unwrap();
        assert_eq!(out, vec![11.0, 12.0, 15.0, 16.0]);
        assert_eq!(out.as_ptr(), ptr);
    }
}  // mod tests.
