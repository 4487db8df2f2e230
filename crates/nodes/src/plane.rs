//! Row-level plane copy primitives shared by the transform nodes.
//!
//! All entry points bound-check their geometry up front and report a length
//! mismatch as `MemoryOpt`; the row loops themselves then run over verified
//! slices. A negative half-height walks the source rows backward, which is
//! how an upstream producer requests a vertical flip.

use framepipe_core::prelude::*;
use rayon::prelude::*;

/// Copy between equal-length slices, failing instead of panicking on a
/// mismatch.
pub(crate) fn checked_copy(dst: &mut [u8], src: &[u8]) -> Result<(), ProcessError> {
    if dst.len() != src.len() {
        return Err(ProcessError::MemoryOpt(format!(
            "copy length mismatch: dst {} src {}",
            dst.len(),
            src.len()
        )));
    }
    dst.copy_from_slice(src);
    Ok(())
}

/// Copy the luma plane of `src` verbatim into `dst`.
///
/// One bulk copy when the visible width fills the stride, otherwise
/// row-by-row at the stride of the source buffer.
pub(crate) fn copy_y_plane(src: &ImageUnitInfo<'_>, dst: &mut [u8]) -> Result<(), ProcessError> {
    let stride = src.aligned_width as usize;
    let width = usize::try_from(src.width)
        .map_err(|_| ProcessError::MemoryOpt(format!("negative width {}", src.width)))?;
    let rows = src.height.unsigned_abs() as usize;
    if width == stride {
        let len = src.chroma_offset;
        let plane = src
            .data
            .get(..len)
            .ok_or_else(|| ProcessError::MemoryOpt("luma plane out of bounds".into()))?;
        return checked_copy(
            dst.get_mut(..len)
                .ok_or_else(|| ProcessError::MemoryOpt("luma destination too short".into()))?,
            plane,
        );
    }
    if rows == 0 {
        return Ok(());
    }
    let needed = (rows - 1) * stride + width;
    if src.data.len() < needed || dst.len() < needed {
        return Err(ProcessError::MemoryOpt(format!(
            "luma rows out of bounds: need {needed}, src {}, dst {}",
            src.data.len(),
            dst.len()
        )));
    }
    let src_data = src.data;
    dst.par_chunks_mut(stride)
        .take(rows)
        .enumerate()
        .for_each(|(r, row)| {
            row[..width].copy_from_slice(&src_data[r * stride..r * stride + width]);
        });
    Ok(())
}

/// De-interleave a UV (or VU) plane into two separate half-resolution planes.
///
/// Samples are moved in pairs with the trailing sample of an odd half-width
/// row copied individually. A negative `half_height` flips vertically.
pub(crate) fn separate_uv_plane(
    src_uv: &[u8],
    src_stride: usize,
    dst_first: &mut [u8],
    dst_second: &mut [u8],
    dst_stride: usize,
    half_width: usize,
    half_height: i32,
) -> Result<(), ProcessError> {
    let flip = half_height < 0;
    let rows = half_height.unsigned_abs() as usize;
    if rows == 0 || half_width == 0 {
        return Ok(());
    }
    let src_needed = (rows - 1) * src_stride + half_width * 2;
    let dst_needed = (rows - 1) * dst_stride + half_width;
    if src_uv.len() < src_needed {
        return Err(ProcessError::MemoryOpt(format!(
            "interleaved chroma too short: need {src_needed}, have {}",
            src_uv.len()
        )));
    }
    if dst_first.len() < dst_needed || dst_second.len() < dst_needed {
        return Err(ProcessError::MemoryOpt(format!(
            "separated chroma planes too short: need {dst_needed}, have {} and {}",
            dst_first.len(),
            dst_second.len()
        )));
    }
    dst_first
        .par_chunks_mut(dst_stride)
        .zip(dst_second.par_chunks_mut(dst_stride))
        .take(rows)
        .enumerate()
        .for_each(|(r, (first_row, second_row))| {
            let sr = if flip { rows - 1 - r } else { r };
            let src_row = &src_uv[sr * src_stride..sr * src_stride + half_width * 2];
            let pair_count = half_width / 2;
            for pair in 0..pair_count {
                let si = pair * 4;
                let di = pair * 2;
                first_row[di] = src_row[si];
                second_row[di] = src_row[si + 1];
                first_row[di + 1] = src_row[si + 2];
                second_row[di + 1] = src_row[si + 3];
            }
            if half_width % 2 == 1 {
                let last = half_width - 1;
                first_row[last] = src_row[last * 2];
                second_row[last] = src_row[last * 2 + 1];
            }
        });
    Ok(())
}

/// Interleave two separated half-resolution planes: `src_first` lands at the
/// even byte of each sample pair, `src_second` at the odd byte.
///
/// Feeding (V, U) produces an NV21 chroma plane from NV12-separated planes.
pub(crate) fn combine_uv_plane(
    src_first: &[u8],
    src_second: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    half_width: usize,
    half_height: i32,
) -> Result<(), ProcessError> {
    let flip = half_height < 0;
    let rows = half_height.unsigned_abs() as usize;
    if rows == 0 || half_width == 0 {
        return Ok(());
    }
    let src_needed = (rows - 1) * src_stride + half_width;
    let dst_needed = (rows - 1) * dst_stride + half_width * 2;
    if src_first.len() < src_needed || src_second.len() < src_needed {
        return Err(ProcessError::MemoryOpt(format!(
            "separated chroma planes too short: need {src_needed}, have {} and {}",
            src_first.len(),
            src_second.len()
        )));
    }
    if dst.len() < dst_needed {
        return Err(ProcessError::MemoryOpt(format!(
            "interleaved destination too short: need {dst_needed}, have {}",
            dst.len()
        )));
    }
    dst.par_chunks_mut(dst_stride)
        .take(rows)
        .enumerate()
        .for_each(|(r, dst_row)| {
            let sr = if flip { rows - 1 - r } else { r };
            let first_row = &src_first[sr * src_stride..sr * src_stride + half_width];
            let second_row = &src_second[sr * src_stride..sr * src_stride + half_width];
            let pair_count = half_width / 2;
            for pair in 0..pair_count {
                let si = pair * 2;
                let di = pair * 4;
                dst_row[di] = first_row[si];
                dst_row[di + 1] = second_row[si];
                dst_row[di + 2] = first_row[si + 1];
                dst_row[di + 3] = second_row[si + 1];
            }
            if half_width % 2 == 1 {
                let last = half_width - 1;
                dst_row[last * 2] = first_row[last];
                dst_row[last * 2 + 1] = second_row[last];
            }
        });
    Ok(())
}
