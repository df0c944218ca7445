//! Final coloring pass: turns a [`CompositedFrame`] into RGBA using region identities.
//!
//! Distinct identities are sorted ascending and numbered sequentially; each pixel's color then
//! comes from the mode configured for its identity's parity (or for the first/last index).

use std::collections::BTreeMap;

use crate::{
    eval::layer::CompositedFrame,
    identity::allocator::{Parity, RegionId},
    palette::{color::Color, palette::ColorPalette},
    render::backend::FrameRGBA,
};

/// How one class of regions is colored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Defer to the next slot; at the parity slots this keeps the monochrome sample color.
    #[default]
    Inherit,
    /// Solid white.
    White,
    /// Solid black.
    Black,
    /// Palette color for the pixel's depth.
    PaletteByDepth,
    /// Desaturated palette color for the pixel's depth.
    DesaturatedPaletteByDepth,
    /// Alternate between palette and desaturated palette by sequential index.
    AlternateByIdentity,
}

/// Coloring slots: one per parity plus overrides for the first and last sequential index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ColorModes {
    /// Regions reached through an even number of inversions.
    pub even: ColorMode,
    /// Regions reached through an odd number of inversions.
    pub odd: ColorMode,
    /// Override for sequential index 0.
    pub first: ColorMode,
    /// Override for the last sequential index.
    pub last: ColorMode,
}

impl ColorModes {
    /// `true` when every slot inherits, i.e. the pass reproduces the monochrome samples.
    pub fn is_monochrome(&self) -> bool {
        *self == Self::default()
    }

    fn resolve(&self, index: usize, count: usize, parity: Parity) -> ColorMode {
        if index == 0 && self.first != ColorMode::Inherit {
            return self.first;
        }
        if index + 1 == count && self.last != ColorMode::Inherit {
            return self.last;
        }
        match parity {
            Parity::Even => self.even,
            Parity::Odd => self.odd,
        }
    }
}

/// Sequential index of every distinct identity in `frame`, ascending by id.
pub fn sequential_indices(frame: &CompositedFrame) -> BTreeMap<RegionId, usize> {
    let mut map: BTreeMap<RegionId, usize> = frame
        .identities
        .iter()
        .filter(|id| !id.is_sentinel())
        .map(|id| (*id, 0))
        .collect();
    for (i, slot) in map.values_mut().enumerate() {
        *slot = i;
    }
    map
}

/// Produce premultiplied RGBA8 for `frame`.
#[tracing::instrument(skip_all, fields(width = frame.viewport.width, height = frame.viewport.height))]
pub fn colorize(frame: &CompositedFrame, palette: &ColorPalette, modes: &ColorModes) -> FrameRGBA {
    let indices = sequential_indices(frame);
    let count = indices.len();
    let mut data = Vec::with_capacity(frame.samples.len() * 4);

    for ((sample, id), depth) in frame
        .samples
        .iter()
        .zip(&frame.identities)
        .zip(&frame.depths)
    {
        let gray = Color::gray(f64::from(sample.color));
        let color = match indices.get(id) {
            None => gray,
            Some(&index) => match modes.resolve(index, count, id.parity()) {
                ColorMode::Inherit => gray,
                ColorMode::White => Color::WHITE,
                ColorMode::Black => Color::BLACK,
                ColorMode::PaletteByDepth => palette.color_for_depth(*depth),
                ColorMode::DesaturatedPaletteByDepth => palette.desaturated_for_depth(*depth),
                ColorMode::AlternateByIdentity => {
                    if index % 2 == 0 {
                        palette.color_for_depth(*depth)
                    } else {
                        palette.desaturated_for_depth(*depth)
                    }
                }
            },
        };
        data.extend_from_slice(&color.to_rgba8_premul(sample.alpha).to_array());
    }

    tracing::debug!(regions = count, "colorized frame");
    FrameRGBA {
        width: frame.viewport.width,
        height: frame.viewport.height,
        data,
        premultiplied: true,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/eval/coloring.rs"]
mod tests;
