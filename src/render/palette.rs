use crate::aspects::AspectKind;
use crate::zodiac::{hebrew_house_letter, CelestialBody, ZodiacSign};
use std::collections::HashMap;

/// Glyph and colour tables handed to a renderer when it is built.
#[derive(Debug, Clone)]
pub struct ChartPalette {
    pub planet_glyphs: HashMap<CelestialBody, String>,
    pub sign_glyphs: HashMap<ZodiacSign, String>,
    pub house_letters: HashMap<u8, String>,
    pub planet_colors: HashMap<CelestialBody, String>,
    pub aspect_colors: HashMap<AspectKind, String>,
    pub default_planet_color: String,
    pub ascendant_axis: String,
    pub midheaven_axis: String,
    pub text: String,
    pub background: String,
    pub sign_fills: [String; 2],
    pub guide: String,
    pub tree_path: String,
    pub sefirah_fill: String,
}

impl Default for ChartPalette {
    fn default() -> Self {
        let planet_colors = [
            (CelestialBody::Moon, "#ff9e40"),
            (CelestialBody::Mercury, "#ffe066"),
            (CelestialBody::Venus, "#a5d6a7"),
            (CelestialBody::Sun, "#4dd0e1"),
            (CelestialBody::Mars, "#42a5f5"),
            (CelestialBody::Jupiter, "#7e57c2"),
            (CelestialBody::Saturn, "#ab47bc"),
            (CelestialBody::Uranus, "#ec407a"),
            (CelestialBody::Neptune, "#f48fb1"),
            (CelestialBody::Pluto, "#cfd8dc"),
        ];
        let aspect_colors = [
            (AspectKind::Conjunction, "#ffd54f"),
            (AspectKind::Sextile, "#64b5f6"),
            (AspectKind::Square, "#ff8a65"),
            (AspectKind::Trine, "#81c784"),
            (AspectKind::Opposition, "#ef5350"),
        ];

        Self {
            planet_glyphs: CelestialBody::iter()
                .map(|b| (b, b.glyph().to_string()))
                .collect(),
            sign_glyphs: ZodiacSign::ALL
                .iter()
                .map(|s| (*s, s.glyph().to_string()))
                .collect(),
            house_letters: (1..=12u8)
                .filter_map(|h| hebrew_house_letter(h).map(|l| (h, l.to_string())))
                .collect(),
            planet_colors: planet_colors
                .iter()
                .map(|(b, c)| (*b, c.to_string()))
                .collect(),
            aspect_colors: aspect_colors
                .iter()
                .map(|(k, c)| (*k, c.to_string()))
                .collect(),
            default_planet_color: "#90a4ae".to_string(),
            ascendant_axis: "#b388ff".to_string(),
            midheaven_axis: "#c62828".to_string(),
            text: "#222222".to_string(),
            background: "#ffffff".to_string(),
            sign_fills: ["rgba(0,0,0,0.02)".to_string(), "rgba(0,0,0,0.08)".to_string()],
            guide: "rgba(0,0,0,0.35)".to_string(),
            tree_path: "#aaaaaa".to_string(),
            sefirah_fill: "white".to_string(),
        }
    }
}

impl ChartPalette {
    pub fn planet_glyph(&self, body: CelestialBody) -> &str {
        self.planet_glyphs
            .get(&body)
            .map(String::as_str)
            .unwrap_or_else(|| body.glyph())
    }

    pub fn sign_glyph(&self, sign: ZodiacSign) -> &str {
        self.sign_glyphs
            .get(&sign)
            .map(String::as_str)
            .unwrap_or_else(|| sign.glyph())
    }

    pub fn house_letter(&self, house: u8) -> &str {
        self.house_letters
            .get(&house)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn planet_color(&self, body: CelestialBody) -> &str {
        self.planet_colors
            .get(&body)
            .map(String::as_str)
            .unwrap_or(self.default_planet_color.as_str())
    }

    pub fn aspect_color(&self, kind: AspectKind) -> &str {
        self.aspect_colors
            .get(&kind)
            .map(String::as_str)
            .unwrap_or(self.guide.as_str())
    }
}
