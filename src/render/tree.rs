//! Tree-of-Life layout: ten sefirot with the twelve houses drawn as the
//! paths between them.

use super::palette::ChartPalette;
use super::surface::{Paint, Point, RenderSurface, TextStyle};
use crate::angle::{decimals, degree_within_sign, normalize_degree};
use crate::chart::ResolvedChart;
use crate::error::Result;
use crate::houses::HouseCusp;
use crate::zodiac::{CelestialBody, ZodiacSign};
use std::fmt;

const CENTER_X: f64 = 400.0;
const WING: f64 = 250.0;
const SEFIRAH_RADIUS: f64 = 40.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Sefirah {
    Keter,
    Chokhmah,
    Binah,
    Chesed,
    Gevurah,
    Tiferet,
    Netzach,
    Hod,
    Yesod,
    Maljut,
}

impl Sefirah {
    pub const ALL: [Sefirah; 10] = [
        Sefirah::Keter,
        Sefirah::Chokhmah,
        Sefirah::Binah,
        Sefirah::Chesed,
        Sefirah::Gevurah,
        Sefirah::Tiferet,
        Sefirah::Netzach,
        Sefirah::Hod,
        Sefirah::Yesod,
        Sefirah::Maljut,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Sefirah::Keter => "Keter",
            Sefirah::Chokhmah => "Chokhmah",
            Sefirah::Binah => "Binah",
            Sefirah::Chesed => "Chesed",
            Sefirah::Gevurah => "Gevurah",
            Sefirah::Tiferet => "Tiferet",
            Sefirah::Netzach => "Netzach",
            Sefirah::Hod => "Hod",
            Sefirah::Yesod => "Yesod",
            Sefirah::Maljut => "Maljut",
        }
    }

    /// Planet shown inside the sefirah. Maljut carries none.
    pub fn planet(&self) -> Option<CelestialBody> {
        let body = match self {
            Sefirah::Keter => CelestialBody::Neptune,
            Sefirah::Chokhmah => CelestialBody::Uranus,
            Sefirah::Binah => CelestialBody::Saturn,
            Sefirah::Chesed => CelestialBody::Jupiter,
            Sefirah::Gevurah => CelestialBody::Mars,
            Sefirah::Tiferet => CelestialBody::Sun,
            Sefirah::Netzach => CelestialBody::Venus,
            Sefirah::Hod => CelestialBody::Mercury,
            Sefirah::Yesod => CelestialBody::Moon,
            Sefirah::Maljut => return None,
        };
        Some(body)
    }

    /// Anchor at unit scale: the middle pillar on x = 400, the side pillars
    /// 250 to either side.
    fn base_anchor(&self) -> (f64, f64) {
        match self {
            Sefirah::Keter => (CENTER_X, 225.0),
            Sefirah::Chokhmah => (CENTER_X + WING, 275.0),
            Sefirah::Binah => (CENTER_X - WING, 275.0),
            Sefirah::Chesed => (CENTER_X + WING, 412.0),
            Sefirah::Gevurah => (CENTER_X - WING, 412.0),
            Sefirah::Tiferet => (CENTER_X, 475.0),
            Sefirah::Netzach => (CENTER_X + WING, 545.0),
            Sefirah::Hod => (CENTER_X - WING, 545.0),
            Sefirah::Yesod => (CENTER_X, 645.0),
            Sefirah::Maljut => (CENTER_X, 785.0),
        }
    }

    pub fn anchor(&self, scale: f64) -> Point {
        let (x, y) = self.base_anchor();
        Point::new(x * scale, y * scale)
    }
}

impl fmt::Display for Sefirah {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The two sefirot a house path connects.
pub fn house_path(house: u8) -> Option<(Sefirah, Sefirah)> {
    use Sefirah::*;
    let path = match house {
        1 => (Keter, Chokhmah),
        2 => (Keter, Binah),
        3 => (Chokhmah, Gevurah),
        4 => (Chesed, Tiferet),
        5 => (Chokhmah, Tiferet),
        6 => (Tiferet, Netzach),
        7 => (Hod, Yesod),
        8 => (Netzach, Yesod),
        9 => (Tiferet, Hod),
        10 => (Binah, Tiferet),
        11 => (Gevurah, Tiferet),
        12 => (Binah, Chesed),
        _ => return None,
    };
    Some(path)
}

/// Where a house label sits along its path. The two long diagonals (3 and
/// 12) cross in the middle, so their labels move toward the upper end.
pub fn house_label_point(house: u8, scale: f64) -> Option<Point> {
    let (from, to) = house_path(house)?;
    let t = if house == 3 || house == 12 { 0.3 } else { 0.5 };
    Some(from.anchor(scale).lerp(&to.anchor(scale), t))
}

pub struct TreeRenderer {
    palette: ChartPalette,
    scale: f64,
}

impl TreeRenderer {
    pub fn new(palette: ChartPalette) -> Self {
        Self {
            palette,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn draw<S: RenderSurface>(&self, chart: &ResolvedChart, surface: &mut S) -> Result<()> {
        self.draw_paths(surface, chart)?;
        self.draw_sefirot(surface, chart)?;
        self.draw_axes(surface, chart)?;
        Ok(())
    }

    fn draw_paths<S: RenderSurface>(&self, surface: &mut S, chart: &ResolvedChart) -> Result<()> {
        let p = &self.palette;
        for house in 1..=12u8 {
            let Some((from, to)) = house_path(house) else { continue };
            surface.line(
                from.anchor(self.scale),
                to.anchor(self.scale),
                &Paint::stroke(&p.tree_path, 2.0),
            )?;
        }

        for cusp in &chart.chart.cusps {
            let Some(at) = house_label_point(cusp.house, self.scale) else {
                continue;
            };
            self.draw_house_label(surface, chart, cusp, at)?;
        }
        Ok(())
    }

    fn draw_house_label<S: RenderSurface>(
        &self,
        surface: &mut S,
        chart: &ResolvedChart,
        cusp: &HouseCusp,
        at: Point,
    ) -> Result<()> {
        let p = &self.palette;
        let small = TextStyle::new(&p.text, 12.0);

        surface.text(at.offset(-6.0, -10.0), &cusp.house.to_string(), &small.clone().bold())?;
        let letter = p.house_letter(cusp.house);
        if !letter.is_empty() {
            surface.text(at.offset(12.0, -10.0), letter, &small)?;
        }
        surface.text(
            at.offset(0.0, 10.0),
            &format!("{}{}°", p.sign_glyph(cusp.sign), decimals(cusp.position, 2)),
            &small,
        )?;

        let occupants: String = chart
            .assignment
            .bodies_in(cusp.house)
            .iter()
            .map(|b| p.planet_glyph(b.body))
            .collect();
        if !occupants.is_empty() {
            surface.text(at.offset(0.0, 28.0), &occupants, &small)?;
        }
        Ok(())
    }

    fn draw_sefirot<S: RenderSurface>(&self, surface: &mut S, chart: &ResolvedChart) -> Result<()> {
        let p = &self.palette;
        for sefirah in Sefirah::ALL {
            let at = sefirah.anchor(self.scale);
            surface.circle(
                at,
                SEFIRAH_RADIUS * self.scale,
                &Paint::stroke("black", 2.0).with_fill(&p.sefirah_fill),
            )?;
            surface.text(
                at.offset(0.0, -50.0),
                sefirah.name(),
                &TextStyle::new(&p.text, 12.0).bold(),
            )?;

            let Some(body) = sefirah.planet() else { continue };
            surface.text(
                at.offset(0.0, -10.0),
                p.planet_glyph(body),
                &TextStyle::new(p.planet_color(body), 18.0),
            )?;

            let Some(position) = chart.chart.body(body) else { continue };
            let Some(sign) = ZodiacSign::from_longitude(position.longitude) else {
                continue;
            };
            surface.text(
                at.offset(0.0, 12.0),
                &format!(
                    "{} {}°",
                    p.sign_glyph(sign),
                    decimals(degree_within_sign(position.longitude), 2)
                ),
                &TextStyle::new(&p.text, 11.0),
            )?;
        }
        Ok(())
    }

    fn draw_axes<S: RenderSurface>(&self, surface: &mut S, chart: &ResolvedChart) -> Result<()> {
        let p = &self.palette;
        let style = TextStyle::new(&p.text, 13.0).bold();

        if let Some(asc) = chart.chart.ascendant {
            let tiferet = Sefirah::Tiferet.anchor(self.scale);
            surface.text(
                tiferet.offset(0.0, -100.0),
                &format!("ASC: {} {}°", p.sign_glyph(asc.sign), decimals(asc.position, 2)),
                &style,
            )?;

            let desc = normalize_degree(asc.degree + 180.0);
            if let Some(sign) = ZodiacSign::from_longitude(desc) {
                surface.text(
                    tiferet.offset(0.0, 63.0),
                    &format!("DESC: {} {}°", p.sign_glyph(sign), decimals(degree_within_sign(desc), 2)),
                    &style,
                )?;
            }
        }

        if let Some(mc) = chart.chart.midheaven {
            surface.text(
                Sefirah::Maljut.anchor(self.scale),
                &format!("MC:{}{}°", p.sign_glyph(mc.sign), decimals(mc.position, 1)),
                &style,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::fixtures::sample_chart;
    use crate::houses::BodyPosition;
    use crate::render::render_frame;
    use crate::render::surface::recording::RecordingSurface;
    use approx::assert_relative_eq;

    #[test]
    fn every_house_has_a_path() {
        for house in 1..=12 {
            assert!(house_path(house).is_some());
        }
        assert!(house_path(0).is_none());
        assert!(house_path(13).is_none());
    }

    #[test]
    fn long_diagonals_label_nearer_the_top() {
        let p3 = house_label_point(3, 1.0).unwrap();
        assert_relative_eq!(p3.x, 650.0 - 0.3 * 500.0, epsilon = 1e-9);
        assert_relative_eq!(p3.y, 275.0 + 0.3 * 137.0, epsilon = 1e-9);

        let p1 = house_label_point(1, 1.0).unwrap();
        assert_relative_eq!(p1.x, 525.0, epsilon = 1e-9);
        assert_relative_eq!(p1.y, 250.0, epsilon = 1e-9);
    }

    #[test]
    fn anchors_scale_together() {
        let a = Sefirah::Yesod.anchor(0.5);
        assert_relative_eq!(a.x, 200.0);
        assert_relative_eq!(a.y, 322.5);
    }

    #[test]
    fn maljut_has_no_planet() {
        assert_eq!(Sefirah::Tiferet.planet(), Some(CelestialBody::Sun));
        assert_eq!(Sefirah::Keter.planet(), Some(CelestialBody::Neptune));
        assert_eq!(Sefirah::Maljut.planet(), None);
        let planets: Vec<_> = Sefirah::ALL.iter().filter_map(|s| s.planet()).collect();
        assert_eq!(planets.len(), 9);
        assert!(!planets.contains(&CelestialBody::Pluto));
    }

    #[test]
    fn draws_labels_and_axes() {
        let chart = ResolvedChart::resolve(sample_chart()).unwrap();
        let renderer = TreeRenderer::new(ChartPalette::default());
        let mut surface = RecordingSurface::new(800.0, 900.0);
        render_frame(&mut surface, "tree", |s| renderer.draw(&chart, s)).unwrap();

        let asc = surface.text_at("ASC:").unwrap();
        assert_eq!(asc, Point::new(400.0, 375.0));
        let desc = surface.text_at("DESC:").unwrap();
        assert_eq!(desc, Point::new(400.0, 538.0));
        assert!(surface.texts().iter().any(|(_, t)| t == "DESC: \u{2651} 5.5°"));
        let mc = surface.text_at("MC:").unwrap();
        assert_eq!(mc, Point::new(400.0, 785.0));
        assert!(surface.text_at("Maljut").is_some());

        // house 1 holds Venus, Mars and Uranus in input order
        let label = house_label_point(1, 1.0).unwrap();
        let occupants = surface
            .texts()
            .into_iter()
            .find(|(p, _)| *p == label.offset(0.0, 28.0))
            .map(|(_, t)| t)
            .unwrap();
        assert_eq!(occupants, "\u{2640}\u{2642}\u{2645}");
    }

    #[test]
    fn negative_longitude_labels_inside_its_sign() {
        let mut raw = sample_chart();
        raw.bodies[0] = BodyPosition::new(CelestialBody::Sun, -10.0);
        let chart = ResolvedChart::resolve(raw).unwrap();
        let palette = ChartPalette::default();
        let renderer = TreeRenderer::new(palette.clone());
        let mut surface = RecordingSurface::new(800.0, 900.0);
        render_frame(&mut surface, "tree", |s| renderer.draw(&chart, s)).unwrap();

        let at = Sefirah::Tiferet.anchor(1.0).offset(0.0, 12.0);
        let label = surface
            .texts()
            .into_iter()
            .find(|(p, _)| *p == at)
            .map(|(_, t)| t)
            .unwrap();
        assert_eq!(label, format!("{} 20°", palette.sign_glyph(ZodiacSign::Pisces)));
    }

    #[test]
    fn failed_frame_keeps_previous_tree() {
        let chart = ResolvedChart::resolve(sample_chart()).unwrap();
        let renderer = TreeRenderer::new(ChartPalette::default());
        let mut surface = RecordingSurface::new(800.0, 900.0);
        render_frame(&mut surface, "tree", |s| renderer.draw(&chart, s)).unwrap();
        let before = surface.committed.clone();

        surface.fail_on_text = Some("MC:".to_string());
        assert!(render_frame(&mut surface, "tree", |s| renderer.draw(&chart, s)).is_err());
        assert_eq!(surface.committed, before);
    }
}
