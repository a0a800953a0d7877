use rayon::prelude::*;

use crate::foundation::error::{BatchAugError, BatchAugResult};
use crate::paste::geometry::{NUM_INDICES, PasteGeometry};

/// Everything one paste launch reads, borrowed from device buffers.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PasteLaunch<'a> {
    pub(crate) geometry: &'a [u32],
    pub(crate) source_offsets: &'a [u64],
    pub(crate) destination_offsets: &'a [u64],
    pub(crate) channels: usize,
    pub(crate) fill_value: &'a [u8],
}

/// Write every canvas of the batch in a single pass.
///
/// Pixels inside `[paste_y, paste_y + in_h) x [paste_x, paste_x + in_w)` are copied from the
/// source across all channels; all other pixels receive `fill_value`. Samples and rows run in
/// parallel on the current rayon pool.
pub(crate) fn paste_batch(
    launch: &PasteLaunch<'_>,
    input: &[u8],
    output: &mut [u8],
) -> BatchAugResult<()> {
    let n = launch.source_offsets.len();
    if launch.destination_offsets.len() != n || launch.geometry.len() != n * NUM_INDICES {
        return Err(BatchAugError::device(
            "paste launch buffers disagree on batch size",
        ));
    }
    if launch.channels == 0 || launch.fill_value.len() != launch.channels {
        return Err(BatchAugError::device(format!(
            "paste launch has {} fill values for {} channels",
            launch.fill_value.len(),
            launch.channels
        )));
    }

    let mut jobs = Vec::with_capacity(n);
    for (i, slot) in launch.geometry.chunks_exact(NUM_INDICES).enumerate() {
        let slot: &[u32; NUM_INDICES] = slot
            .try_into()
            .map_err(|_| BatchAugError::device("malformed geometry slot"))?;
        let g = PasteGeometry::from_indices(slot);
        g.validate(i)
            .map_err(|e| BatchAugError::device(format!("invalid geometry reached kernel: {e}")))?;
        jobs.push((i, g));
    }

    let src_views = jobs
        .iter()
        .map(|&(i, g)| {
            let len = plane_len(g.input.height, g.input.width, launch.channels)?;
            let start = launch.source_offsets[i] as usize;
            input
                .get(start..start.saturating_add(len))
                .ok_or_else(|| BatchAugError::device(format!("source {i} is out of bounds")))
        })
        .collect::<BatchAugResult<Vec<_>>>()?;

    let dst_views = split_destinations(launch, &jobs, output)?;

    dst_views.into_par_iter().for_each(|(i, dst)| {
        let (_, g) = jobs[i];
        paste_one(g, src_views[i], dst, launch.channels, launch.fill_value);
    });
    Ok(())
}

fn paste_one(g: PasteGeometry, src: &[u8], dst: &mut [u8], channels: usize, fill: &[u8]) {
    let row_out = g.output.width as usize * channels;
    if row_out == 0 || dst.is_empty() {
        return;
    }
    let row_in = g.input.width as usize * channels;
    let left = g.paste.x as usize * channels;
    let top = g.paste.y as usize;
    let rows_in = g.input.height as usize;

    dst.par_chunks_mut(row_out).enumerate().for_each(|(y, row)| {
        if y >= top && y < top + rows_in {
            let sy = y - top;
            let (head, rest) = row.split_at_mut(left);
            let (body, tail) = rest.split_at_mut(row_in);
            fill_pixels(head, fill);
            body.copy_from_slice(&src[sy * row_in..(sy + 1) * row_in]);
            fill_pixels(tail, fill);
        } else {
            fill_pixels(row, fill);
        }
    });
}

fn fill_pixels(px: &mut [u8], fill: &[u8]) {
    for p in px.chunks_exact_mut(fill.len()) {
        p.copy_from_slice(fill);
    }
}

fn plane_len(h: u32, w: u32, channels: usize) -> BatchAugResult<usize> {
    (h as usize)
        .checked_mul(w as usize)
        .and_then(|v| v.checked_mul(channels))
        .ok_or_else(|| BatchAugError::device("paste plane size overflow"))
}

/// Carve `output` into one disjoint mutable canvas per sample.
fn split_destinations<'o>(
    launch: &PasteLaunch<'_>,
    jobs: &[(usize, PasteGeometry)],
    output: &'o mut [u8],
) -> BatchAugResult<Vec<(usize, &'o mut [u8])>> {
    let mut order: Vec<(usize, usize, usize)> = Vec::with_capacity(jobs.len());
    for &(i, g) in jobs {
        let len = plane_len(g.output.height, g.output.width, launch.channels)?;
        order.push((launch.destination_offsets[i] as usize, len, i));
    }
    order.sort_unstable();

    let mut views = Vec::with_capacity(order.len());
    let mut rest = output;
    let mut cursor = 0usize;
    for (start, len, i) in order {
        if start < cursor {
            return Err(BatchAugError::device(format!(
                "destination {i} overlaps a previous canvas"
            )));
        }
        let skip = start - cursor;
        if skip.saturating_add(len) > rest.len() {
            return Err(BatchAugError::device(format!(
                "destination {i} is out of bounds"
            )));
        }
        let (_, tail) = std::mem::take(&mut rest).split_at_mut(skip);
        let (dst, tail) = tail.split_at_mut(len);
        rest = tail;
        cursor = start + len;
        views.push((i, dst));
    }
    Ok(views)
}

#[cfg(test)]
#[path = "../../tests/unit/paste/kernel.rs"]
mod tests;
