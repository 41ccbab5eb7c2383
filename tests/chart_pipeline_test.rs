//! Chart pipeline from a service answer to SVG output, without the network.

use approx::assert_relative_eq;
use carta_astral::api::{AxisPoint, CalculationRequest, CalculationResponse, CalculationSource};
use carta_astral::chart::{fetch_chart, ResolvedChart};
use carta_astral::config::Location;
use carta_astral::error::Result;
use carta_astral::render::{
    polar, render_frame, wheel_angle, ChartPalette, Point, SvgSurface, TreeRenderer,
    WheelRenderer,
};
use carta_astral::zodiac::{CelestialBody, Element};
use chrono::NaiveDate;
use serde_json::json;

const CUSPS: [f64; 12] = [
    350.0, 20.0, 45.0, 75.0, 110.0, 145.0, 170.0, 200.0, 225.0, 255.0, 290.0, 325.0,
];

const SIGNS: [&str; 12] = [
    "Aries", "Taurus", "Gemini", "Cancer", "Leo", "Virgo", "Libra", "Scorpio", "Sagittarius",
    "Capricorn", "Aquarius", "Pisces",
];

fn sign_of(degree: f64) -> &'static str {
    SIGNS[(degree / 30.0).floor() as usize % 12]
}

/// Unequal houses with the first one wrapping through 0°.
fn response() -> CalculationResponse {
    let houses: Vec<_> = CUSPS
        .iter()
        .enumerate()
        .map(|(i, d)| {
            json!({"house": i + 1, "degree": d, "sign": sign_of(*d), "position": d % 30.0})
        })
        .collect();

    serde_json::from_value(json!({
        "julian_day": 2460761.0,
        "planets": {
            "Sun": {"longitude": 355.0},
            "Moon": {"longitude": 5.0},
            "Mercury": 19.99,
            "Venus": {"longitude": 20.0},
            "Mars": {"longitude": 100.0},
            "Jupiter": {"longitude": 170.0},
            "Saturn": {"longitude": 349.9},
            "Uranus": {"longitude": 0.0},
            "Neptune": {"longitude": 230.0},
            "Pluto": {"longitude": 300.0}
        },
        "houses_data": {
            "ascendant": {"degree": 350.0, "sign": "Pisces", "position": 20.0},
            "midheaven": {"degree": 255.0, "sign": "Sagittarius", "position": 15.0},
            "houses": houses
        },
        "enoch": {
            "enoch_year": 5996,
            "enoch_month": 1,
            "enoch_day": 1,
            "enoch_day_of_year": 1,
            "added_week": false
        }
    }))
    .unwrap()
}

struct FixedSource(CalculationResponse);

impl CalculationSource for FixedSource {
    async fn calculate(&self, _request: &CalculationRequest) -> Result<CalculationResponse> {
        Ok(self.0.clone())
    }
}

async fn resolved() -> ResolvedChart {
    let moment = NaiveDate::from_ymd_opt(2025, 3, 26)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let request = CalculationRequest::new(moment, &Location::default());
    fetch_chart(&FixedSource(response()), &request).await.unwrap()
}

#[tokio::test]
async fn houses_follow_cusps_across_zero() {
    let chart = resolved().await;
    let house = |body| chart.assignment.house_of(body);

    assert_eq!(house(CelestialBody::Sun), Some(1));
    assert_eq!(house(CelestialBody::Moon), Some(1));
    assert_eq!(house(CelestialBody::Mercury), Some(1));
    assert_eq!(house(CelestialBody::Uranus), Some(1));
    assert_eq!(house(CelestialBody::Venus), Some(2));
    assert_eq!(house(CelestialBody::Mars), Some(4));
    assert_eq!(house(CelestialBody::Jupiter), Some(7));
    assert_eq!(house(CelestialBody::Neptune), Some(9));
    assert_eq!(house(CelestialBody::Pluto), Some(11));
    assert_eq!(house(CelestialBody::Saturn), Some(12));
    assert_eq!(chart.assignment.assigned_count(), 10);
    assert_eq!(chart.assignment.index_within_house(CelestialBody::Uranus), Some(3));
}

#[tokio::test]
async fn derived_quantities() {
    let chart = resolved().await;
    assert_relative_eq!(chart.rotation_offset(), 350.0);
    assert_eq!(chart.house_elements.total(), 12);
    assert_eq!(chart.planet_elements.total(), 10);
    // Pisces Sun and Ascendant count double
    assert_eq!(chart.balance.dominant(), (Some(Element::Water), 7));
    // Sun at 355° sits in the last 5° band
    assert_eq!(chart.astronomical_shem().unwrap().index, 71);
    assert_eq!(chart.enoch_shem().unwrap().index, 0);
}

#[tokio::test]
async fn wheel_and_tree_render_to_svg() {
    let chart = resolved().await;
    let palette = ChartPalette::default();
    let dir = tempfile::tempdir().unwrap();

    let wheel = WheelRenderer::new(palette.clone());
    let mut surface = SvgSurface::new(600.0, 600.0).with_background(&palette.background);
    render_frame(&mut surface, "wheel", |s| wheel.draw(&chart, s)).unwrap();
    let doc = surface.document().unwrap();
    assert_eq!(doc.matches("<path").count(), 12);
    assert!(doc.contains(">ASC</text>"));
    let path = dir.path().join("wheel.svg");
    surface.save(&path).unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().starts_with("<svg"));

    let tree = TreeRenderer::new(palette).with_scale(0.5);
    let mut surface = SvgSurface::new(400.0, 440.0);
    render_frame(&mut surface, "tree", |s| tree.draw(&chart, s)).unwrap();
    let doc = surface.document().unwrap();
    assert!(doc.contains("Tiferet"));
    assert!(doc.contains("MC:"));
}

#[tokio::test]
async fn broken_frame_keeps_last_image() {
    let chart = resolved().await;
    let wheel = WheelRenderer::new(ChartPalette::default());
    let mut surface = SvgSurface::new(600.0, 600.0);
    render_frame(&mut surface, "wheel", |s| wheel.draw(&chart, s)).unwrap();
    let before = surface.document().unwrap().to_string();

    let mut broken = chart.clone();
    broken.chart.ascendant = Some(AxisPoint {
        degree: f64::NAN,
        ..broken.chart.ascendant.unwrap()
    });
    assert!(render_frame(&mut surface, "wheel", |s| wheel.draw(&broken, s)).is_err());
    assert_eq!(surface.document().unwrap(), before);
}

#[test]
fn ascendant_projects_to_the_left_edge() {
    let center = Point::new(300.0, 300.0);
    let p = polar(center, 100.0, wheel_angle(350.0, 350.0));
    assert_relative_eq!(p.x, 200.0, epsilon = 1e-9);
    assert_relative_eq!(p.y, 300.0, epsilon = 1e-9);

    // a quarter turn past the Ascendant lands straight below the centre
    let below = polar(center, 100.0, wheel_angle(350.0 + 90.0, 350.0));
    assert_relative_eq!(below.x, 300.0, epsilon = 1e-9);
    assert_relative_eq!(below.y, 400.0, epsilon = 1e-9);
}
