//! Radial zodiac wheel with the Ascendant fixed at nine o'clock.

use super::palette::ChartPalette;
use super::surface::{Paint, Point, RenderSurface, TextStyle};
use crate::angle::normalize_degree;
use crate::chart::ResolvedChart;
use crate::error::Result;
use crate::zodiac::{CelestialBody, ZodiacSign};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Screen angle for an ecliptic degree once the wheel is rotated by
/// `rotation` (the Ascendant). Degrees equal mod 360 give the same angle.
pub fn wheel_angle(degree: f64, rotation: f64) -> f64 {
    (180.0 - normalize_degree(degree - rotation)).to_radians()
}

pub fn polar(center: Point, radius: f64, angle: f64) -> Point {
    Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}

/// Ring radii derived from the surface size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WheelGeometry {
    pub center: Point,
    pub outer: f64,
    pub inner: f64,
}

impl WheelGeometry {
    pub fn for_size(width: f64, height: f64) -> Self {
        let size = width.min(height);
        let outer = size / 2.0 - 10.0;
        Self {
            center: Point::new(width / 2.0, height / 2.0),
            outer,
            inner: outer - 35.0,
        }
    }

    /// Planet markers alternate between two orbits so neighbours in the same
    /// house do not sit on top of each other.
    pub fn planet_radius(&self, index_in_house: usize) -> f64 {
        self.inner - 30.0 - 12.0 - (index_in_house % 2) as f64 * 12.0
    }
}

pub struct WheelRenderer {
    palette: ChartPalette,
}

impl WheelRenderer {
    pub fn new(palette: ChartPalette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &ChartPalette {
        &self.palette
    }

    /// Marker position of every body, keyed by body.
    pub fn planet_positions(
        &self,
        chart: &ResolvedChart,
        geometry: &WheelGeometry,
    ) -> HashMap<CelestialBody, Point> {
        let rotation = chart.rotation_offset();
        chart
            .chart
            .bodies
            .iter()
            .filter(|p| p.longitude.is_finite())
            .map(|p| {
                let index = chart.assignment.index_within_house(p.body).unwrap_or(0);
                let angle = wheel_angle(p.longitude, rotation);
                (p.body, polar(geometry.center, geometry.planet_radius(index), angle))
            })
            .collect()
    }

    pub fn draw<S: RenderSurface>(&self, chart: &ResolvedChart, surface: &mut S) -> Result<()> {
        let geometry = WheelGeometry::for_size(surface.width(), surface.height());
        let rotation = chart.rotation_offset();

        self.draw_sign_ring(surface, &geometry, rotation)?;
        self.draw_houses(surface, chart, &geometry, rotation)?;
        self.draw_degree_ticks(surface, &geometry, rotation)?;
        self.draw_axes(surface, chart, &geometry, rotation)?;
        let positions = self.draw_planets(surface, chart, &geometry, rotation)?;
        self.draw_aspects(surface, chart, &positions)?;
        Ok(())
    }

    fn draw_sign_ring<S: RenderSurface>(
        &self,
        surface: &mut S,
        g: &WheelGeometry,
        rotation: f64,
    ) -> Result<()> {
        let p = &self.palette;
        for (i, sign) in ZodiacSign::ALL.iter().enumerate() {
            let start = wheel_angle(i as f64 * 30.0, rotation);
            let end = start - 30f64.to_radians();
            let fill = Paint::fill(&p.sign_fills[i % 2]);
            surface.wedge(g.center, g.inner, g.outer, start, end, &fill)?;

            surface.line(
                g.center,
                polar(g.center, g.outer, start),
                &Paint::stroke(&p.guide, 1.0),
            )?;

            let label_angle = wheel_angle(i as f64 * 30.0 + 15.0, rotation);
            surface.text(
                polar(g.center, (g.outer + g.inner) / 2.0, label_angle),
                p.sign_glyph(*sign),
                &TextStyle::new(&p.text, 16.0),
            )?;
        }

        // sextants
        for step in 0..6 {
            let angle = wheel_angle(step as f64 * 60.0, rotation);
            surface.line(
                polar(g.center, g.inner - 10.0, angle),
                polar(g.center, g.outer, angle),
                &Paint::stroke("rgba(132,87,207,0.45)", 2.4),
            )?;
        }
        Ok(())
    }

    fn draw_houses<S: RenderSurface>(
        &self,
        surface: &mut S,
        chart: &ResolvedChart,
        g: &WheelGeometry,
        rotation: f64,
    ) -> Result<()> {
        let p = &self.palette;
        for cusp in &chart.chart.cusps {
            let angle = wheel_angle(cusp.degree, rotation);
            surface.line(
                polar(g.center, g.inner - 15.0, angle),
                polar(g.center, g.inner, angle),
                &Paint::stroke(&p.guide, 2.0),
            )?;

            let letter = p.house_letter(cusp.house);
            if !letter.is_empty() {
                let label_angle = wheel_angle(cusp.degree + 2.0, rotation);
                surface.text(
                    polar(g.center, g.inner - 24.0, label_angle),
                    letter,
                    &TextStyle::new(&p.text, 14.0),
                )?;
            }
        }
        Ok(())
    }

    fn draw_degree_ticks<S: RenderSurface>(
        &self,
        surface: &mut S,
        g: &WheelGeometry,
        rotation: f64,
    ) -> Result<()> {
        let radius = g.inner - 8.0;
        for deg in 0..360 {
            let angle = wheel_angle(deg as f64, rotation);
            let (len, width) = if deg % 30 == 0 {
                (14.0, 1.3)
            } else if deg % 5 == 0 {
                (10.0, 0.6)
            } else {
                (6.0, 0.6)
            };
            surface.line(
                polar(g.center, radius - len, angle),
                polar(g.center, radius, angle),
                &Paint::stroke(&self.palette.text, width),
            )?;
        }
        Ok(())
    }

    fn draw_axes<S: RenderSurface>(
        &self,
        surface: &mut S,
        chart: &ResolvedChart,
        g: &WheelGeometry,
        rotation: f64,
    ) -> Result<()> {
        let p = &self.palette;
        let radius = g.inner - 10.0;
        let axes = [
            (chart.chart.ascendant, "ASC", "DESC", &p.ascendant_axis),
            (chart.chart.midheaven, "MC", "IC", &p.midheaven_axis),
        ];
        for (point, label, opposite, color) in axes {
            let Some(point) = point else { continue };
            let angle = wheel_angle(point.degree, rotation);
            let paint = Paint::stroke(color, 2.5);
            for (a, text) in [(angle, label), (angle + PI, opposite)] {
                surface.line(g.center, polar(g.center, radius, a), &paint)?;
                surface.text(
                    polar(g.center, radius + 12.0, a),
                    text,
                    &TextStyle::new(&p.text, 12.0),
                )?;
            }
        }
        Ok(())
    }

    fn draw_planets<S: RenderSurface>(
        &self,
        surface: &mut S,
        chart: &ResolvedChart,
        g: &WheelGeometry,
        rotation: f64,
    ) -> Result<HashMap<CelestialBody, Point>> {
        let p = &self.palette;
        let positions = self.planet_positions(chart, g);
        let guide_outer = g.inner - 3.0;

        for position in &chart.chart.bodies {
            let Some(marker) = positions.get(&position.body) else {
                continue;
            };
            let angle = wheel_angle(position.longitude, rotation);
            let orbit = ((marker.x - g.center.x).powi(2) + (marker.y - g.center.y).powi(2)).sqrt();
            let color = p.planet_color(position.body);

            let guide_start = guide_outer.min(orbit + 12.0);
            surface.line(
                polar(g.center, guide_start, angle),
                polar(g.center, guide_outer + 6.0, angle),
                &Paint::stroke(color, 1.1).dashed(),
            )?;
            surface.circle(
                *marker,
                12.0,
                &Paint::stroke("rgba(0,0,0,0.4)", 1.0).with_fill(color),
            )?;
            surface.text(
                marker.offset(0.0, 0.5),
                p.planet_glyph(position.body),
                &TextStyle::new("#fff", 15.0),
            )?;
        }
        Ok(positions)
    }

    fn draw_aspects<S: RenderSurface>(
        &self,
        surface: &mut S,
        chart: &ResolvedChart,
        positions: &HashMap<CelestialBody, Point>,
    ) -> Result<()> {
        for aspect in &chart.aspects {
            let (Some(a), Some(b)) = (positions.get(&aspect.first), positions.get(&aspect.second))
            else {
                continue;
            };
            let color = self.palette.aspect_color(aspect.kind);
            surface.line(*a, *b, &Paint::stroke(color, 1.6))?;
            surface.text(a.lerp(b, 0.5), aspect.kind.symbol(), &TextStyle::new(color, 10.0))?;
        }
        Ok(())
    }
}
