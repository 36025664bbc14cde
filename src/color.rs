use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Srgb<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = 210.0 + (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.50);
            let rgb: Srgb = hsl.into_color();
            rgb.into_format()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Continuous colormaps
// ---------------------------------------------------------------------------

/// Piecewise-linear gradient over evenly spaced sRGB anchors, interpolated in
/// linear light.
#[derive(Debug, Clone)]
pub struct Colormap {
    pub name: &'static str,
    stops: Vec<LinSrgb>,
}

impl Colormap {
    pub fn from_hex(name: &'static str, anchors: &[u32]) -> Self {
        let stops = anchors
            .iter()
            .map(|&hex| {
                let rgb = Srgb::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8);
                rgb.into_format::<f32>().into_linear()
            })
            .collect();
        Self { name, stops }
    }

    /// Yellow → green → blue, light to dark.
    pub fn yl_gn_bu() -> Self {
        Self::from_hex(
            "YlGnBu",
            &[
                0xFFFFD9, 0xEDF8B1, 0xC7E9B4, 0x7FCDBB, 0x41B6C4, 0x1D91C0, 0x225EA8, 0x253494,
                0x081D58,
            ],
        )
    }

    /// Near-black → blue → mint.
    pub fn mako() -> Self {
        Self::from_hex(
            "mako",
            &[0x0B0405, 0x382A54, 0x395D9C, 0x3497A9, 0x60CEAC, 0xDEF5E5],
        )
    }

    /// Colour at `t`, clamped into [0, 1]. NaN maps to the low end.
    pub fn at(&self, t: f64) -> Srgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) as f32 };
        let segments = (self.stops.len() - 1) as f32;
        let pos = t * segments;
        let i = (pos.floor() as usize).min(self.stops.len() - 2);
        let lin = self.stops[i].mix(self.stops[i + 1], pos - i as f32);
        Srgb::<f32>::from_linear(lin).into_format()
    }

    /// Colour for `value` on the fixed scale `[vmin, vmax]`.
    pub fn scaled(&self, value: f64, vmin: f64, vmax: f64) -> Srgb<u8> {
        if vmax <= vmin {
            return self.at(0.0);
        }
        self.at((value - vmin) / (vmax - vmin))
    }
}

// ---------------------------------------------------------------------------
// Metric triples → inverted RGB
// ---------------------------------------------------------------------------

/// Maps (accuracy, NMI, ARI) to `(1-acc, 1-nmi, 1-ari)`: perfect scores are
/// black, poor scores bright. Components are not clamped.
pub fn inverted_rgb(metrics: [f64; 3]) -> [f64; 3] {
    metrics.map(|m| 1.0 - m)
}

/// Quantise an RGB triple in [0, 1] to 8-bit, clamping out-of-range values
/// (e.g. negative ARI).
pub fn to_rgb8(rgb: [f64; 3]) -> Srgb<u8> {
    let [r, g, b] = rgb.map(|c| {
        let c = if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) };
        (c * 255.0).round() as u8
    });
    Srgb::new(r, g, b)
}

/// Black or white, whichever reads better on `bg`.
pub fn contrasting_text(bg: Srgb<u8>) -> Srgb<u8> {
    let lin: LinSrgb = bg.into_format::<f32>().into_linear();
    let luminance = 0.2126 * lin.red + 0.7152 * lin.green + 0.0722 * lin.blue;
    if luminance > 0.408 {
        Srgb::new(0, 0, 0)
    } else {
        Srgb::new(255, 255, 255)
    }
}
