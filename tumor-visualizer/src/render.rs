use image::{Rgb, RgbImage};
use log::warn;
use tumor_common::{CellState, LatticeSnapshot};

// Color definitions for named colors (RGB format)
const COLOR_MAP: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [220, 20, 30]),
    ("green", [0, 200, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("gray", [128, 128, 128]),
];

/// Sites holding a code outside the known cell states.
const UNKNOWN_COLOR: [u8; 3] = [255, 0, 255];

/// Parse a color name to RGB values
pub fn parse_color(color_name: &str) -> [u8; 3] {
    for &(name, color) in COLOR_MAP {
        if name.eq_ignore_ascii_case(color_name) {
            return color;
        }
    }
    // Default to black if color not found
    warn!("Color '{}' not recognized, using black.", color_name);
    [0, 0, 0]
}

/// Colors used for each cell state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPalette {
    pub healthy: [u8; 3],
    pub tumor: [u8; 3],
    pub necrotic: [u8; 3],
}

impl Default for CellPalette {
    fn default() -> Self {
        Self {
            healthy: parse_color("white"),
            tumor: parse_color("red"),
            necrotic: parse_color("black"),
        }
    }
}

impl CellPalette {
    pub fn color_of(&self, state: Option<CellState>) -> [u8; 3] {
        match state {
            Some(CellState::Healthy) => self.healthy,
            Some(CellState::Tumor) => self.tumor,
            Some(CellState::Necrotic) => self.necrotic,
            None => UNKNOWN_COLOR,
        }
    }
}

/// Draws the lattice with every site as a `scale` x `scale` block of pixels.
pub fn render_lattice(snapshot: &LatticeSnapshot, scale: u32, palette: &CellPalette) -> RgbImage {
    let scale = scale.max(1);
    RgbImage::from_fn(snapshot.width * scale, snapshot.height * scale, |px, py| {
        Rgb(palette.color_of(snapshot.state_at(px / scale, py / scale)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumor_common::SimulationConfig;

    fn snapshot(cells: Vec<u8>) -> LatticeSnapshot {
        LatticeSnapshot {
            step: Some(3),
            width: 3,
            height: 2,
            cells,
            scale_factor: 1.0,
            params: SimulationConfig::default().get_sim_params(),
        }
    }

    #[test]
    fn color_names_are_case_insensitive() {
        assert_eq!(parse_color("Red"), [220, 20, 30]);
        assert_eq!(parse_color("WHITE"), [255, 255, 255]);
        assert_eq!(parse_color("no-such-color"), [0, 0, 0]);
    }

    #[test]
    fn image_is_scaled_and_colored_by_state() {
        let palette = CellPalette::default();
        let image = render_lattice(&snapshot(vec![0, 1, 2, 2, 1, 0]), 4, &palette);
        assert_eq!(image.dimensions(), (12, 8));
        assert_eq!(image.get_pixel(0, 0).0, palette.healthy);
        assert_eq!(image.get_pixel(5, 3).0, palette.tumor);
        assert_eq!(image.get_pixel(11, 0).0, palette.necrotic);
        assert_eq!(image.get_pixel(0, 7).0, palette.necrotic);
    }

    #[test]
    fn invalid_codes_stand_out() {
        let image = render_lattice(&snapshot(vec![0, 9, 0, 0, 0, 0]), 1, &CellPalette::default());
        assert_eq!(image.get_pixel(1, 0).0, UNKNOWN_COLOR);
    }
}
