/// One output column (or row) worth of bilinear sampling: the two source
/// indices to blend and the weight of the second one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Tap {
    pub lo: usize,
    pub hi: usize,
    pub frac: f32,
}

/// Sampling taps for scaling an axis of `src_len` samples to `dst_len`.
///
/// Pixel centres are aligned (`src = (dst + 0.5) / scale - 0.5`) and positions
/// outside the source are clamped to the edge sample, so nothing is ever
/// extrapolated past the first or last value.
pub(crate) fn taps(src_len: u32, dst_len: u32) -> Vec<Tap> {
    debug_assert!(src_len > 0 && dst_len > 0);

    let scale = f64::from(dst_len) / f64::from(src_len);
    let last = (src_len - 1) as usize;

    (0..dst_len)
        .map(|i| {
            let pos = ((f64::from(i) + 0.5) / scale - 0.5).clamp(0.0, last as f64);
            let lo = pos.floor() as usize;
            Tap {
                lo,
                hi: (lo + 1).min(last),
                frac: (pos - lo as f64) as f32,
            }
        })
        .collect()
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Bilinear resample of a row-major single-channel plane.
///
/// Callers guarantee every dimension is non-zero and that `values` holds
/// exactly `src_width * src_height` samples.
pub(crate) fn bilinear(
    values: &[f32],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Vec<f32> {
    let _span =
        tracing::debug_span!("resample_mask", src_width, src_height, dst_width, dst_height)
            .entered();

    let columns = taps(src_width, dst_width);
    let rows = taps(src_height, dst_height);
    let stride = src_width as usize;

    let mut out = Vec::with_capacity(dst_width as usize * dst_height as usize);
    for row in &rows {
        let upper = &values[row.lo * stride..(row.lo + 1) * stride];
        let lower = &values[row.hi * stride..(row.hi + 1) * stride];
        for col in &columns {
            let top = lerp(upper[col.lo], upper[col.hi], col.frac);
            let bottom = lerp(lower[col.lo], lower[col.hi], col.frac);
            out.push(lerp(top, bottom, row.frac));
        }
    }
    out
}
