use crate::foundation::core::PixelSample;

/// How overlapping radial copies of one transform parent resolve at a destination point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapRule {
    /// Copies are drawn in ascending index order, each over the previous ones.
    #[default]
    DrawOrder,
    /// The candidate with the highest alpha wins outright (ties keep the earlier copy).
    MaxAlpha,
}

/// Straight-alpha "source over destination".
pub fn over(dst: PixelSample, src: PixelSample) -> PixelSample {
    if src.alpha <= 0.0 {
        return dst;
    }
    if src.alpha >= 1.0 || dst.alpha <= 0.0 {
        return src;
    }
    let inv = 1.0 - src.alpha;
    let alpha = src.alpha + dst.alpha * inv;
    let color = (src.color * src.alpha + dst.color * dst.alpha * inv) / alpha;
    PixelSample::new(color, alpha)
}

/// Composite a transform-parent sample over a base sample.
///
/// The transform sample's color is inverted before compositing; where its alpha is zero the base
/// shows through unchanged.
pub fn composite_pixel(base: PixelSample, transform: PixelSample) -> PixelSample {
    over(base, transform.inverted())
}

/// Fold one radial-copy candidate into the running winner.
pub fn accumulate_copy(acc: PixelSample, candidate: PixelSample, rule: OverlapRule) -> PixelSample {
    match rule {
        OverlapRule::DrawOrder => over(acc, candidate),
        OverlapRule::MaxAlpha => {
            if candidate.alpha > acc.alpha {
                candidate
            } else {
                acc
            }
        }
    }
}

/// Average sub-samples with premultiplied weighting.
pub(crate) fn average(samples: impl IntoIterator<Item = PixelSample>) -> PixelSample {
    let mut n = 0u32;
    let mut sum_a = 0.0f64;
    let mut sum_ca = 0.0f64;
    for s in samples {
        n += 1;
        sum_a += f64::from(s.alpha);
        sum_ca += f64::from(s.color) * f64::from(s.alpha);
    }
    if n == 0 || sum_a <= 0.0 {
        return PixelSample::TRANSPARENT;
    }
    PixelSample::new((sum_ca / sum_a) as f32, (sum_a / f64::from(n)) as f32)
}

#[cfg(test)]
#[path = "../../tests/unit/eval/composite.rs"]
mod tests;
