use crate::angle::{degree_within_sign, normalize_degree, FULL_CIRCLE};
use crate::error::{AstrologyError, Result};
use crate::zodiac::{CelestialBody, ZodiacSign};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const HOUSE_COUNT: usize = 12;

// ---------------------------
// ## Structures
// ---------------------------

/// One body's longitude for a single calculation request.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPosition {
    pub body: CelestialBody,
    pub longitude: f64,
}

impl BodyPosition {
    pub fn new(body: CelestialBody, longitude: f64) -> Self {
        Self { body, longitude }
    }

    pub fn sign(&self) -> Option<ZodiacSign> {
        ZodiacSign::from_longitude(self.longitude)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseCusp {
    pub house: u8,
    pub degree: f64,
    pub sign: ZodiacSign,
    pub position: f64,
}

impl HouseCusp {
    /// Builds a cusp whose sign and in-sign position are derived from `degree`.
    pub fn from_degree(house: u8, degree: f64) -> Result<Self> {
        let sign = ZodiacSign::from_longitude(degree).ok_or_else(|| {
            AstrologyError::InvalidInput(format!("house {} has a non-finite cusp", house))
        })?;
        Ok(Self {
            house,
            degree,
            sign,
            position: degree_within_sign(degree),
        })
    }
}

/// Angular interval of a house; `end` is pushed past 360 when the house
/// wraps through 0°, so `end - start` is always the house width.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct AngleSpan {
    pub start: f64,
    pub end: f64,
}

impl AngleSpan {
    pub fn between(start: f64, next: f64) -> Self {
        let end = if next < start { next + FULL_CIRCLE } else { next };
        Self { start, end }
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open containment: a longitude on the start cusp belongs here,
    /// one on the end cusp belongs to the next house.
    pub fn contains(&self, longitude: f64) -> bool {
        if !longitude.is_finite() {
            return false;
        }
        let adjusted = if longitude < self.start {
            longitude + FULL_CIRCLE
        } else {
            longitude
        };
        self.start <= adjusted && adjusted < self.end
    }
}

/// Bodies grouped by the house they fall in, ordered by house number.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HouseAssignment {
    houses: BTreeMap<u8, Vec<BodyPosition>>,
}

impl HouseAssignment {
    pub fn bodies_in(&self, house: u8) -> &[BodyPosition] {
        self.houses.get(&house).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn house_of(&self, body: CelestialBody) -> Option<u8> {
        self.houses
            .iter()
            .find(|(_, bodies)| bodies.iter().any(|p| p.body == body))
            .map(|(house, _)| *house)
    }

    /// Position of `body` among the bodies sharing its house.
    pub fn index_within_house(&self, body: CelestialBody) -> Option<usize> {
        self.houses
            .values()
            .find_map(|bodies| bodies.iter().position(|p| p.body == body))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[BodyPosition])> {
        self.houses.iter().map(|(house, bodies)| (*house, bodies.as_slice()))
    }

    pub fn assigned_count(&self) -> usize {
        self.houses.values().map(Vec::len).sum()
    }
}

// ---------------------------
// ## Resolution
// ---------------------------

fn ordered_cusps(cusps: &[HouseCusp]) -> Result<Vec<HouseCusp>> {
    if cusps.len() != HOUSE_COUNT {
        return Err(AstrologyError::InvalidInput(format!(
            "expected {} house cusps, got {}",
            HOUSE_COUNT,
            cusps.len()
        )));
    }
    let mut ordered = cusps.to_vec();
    ordered.sort_by_key(|c| c.house);
    for (i, cusp) in ordered.iter().enumerate() {
        if cusp.house as usize != i + 1 {
            return Err(AstrologyError::InvalidInput(format!(
                "house numbers must be 1..=12 exactly once, found {}",
                cusp.house
            )));
        }
        if !cusp.degree.is_finite() {
            return Err(AstrologyError::InvalidInput(format!(
                "house {} has a non-finite cusp",
                cusp.house
            )));
        }
    }
    Ok(ordered)
}

/// Span of every house in house-number order.
pub fn house_spans(cusps: &[HouseCusp]) -> Result<Vec<(u8, AngleSpan)>> {
    let ordered = ordered_cusps(cusps)?;
    Ok(ordered
        .iter()
        .enumerate()
        .map(|(i, cusp)| {
            let next = &ordered[(i + 1) % HOUSE_COUNT];
            (cusp.house, AngleSpan::between(cusp.degree, next.degree))
        })
        .collect())
}

/// Assigns each body to the first house (in house-number order) whose span
/// contains it. Bodies with a non-finite longitude are left out.
///
/// Cusps that do not partition the circle are not corrected; see
/// [`validate_cusps`] to detect that case.
pub fn resolve_houses(cusps: &[HouseCusp], bodies: &[BodyPosition]) -> Result<HouseAssignment> {
    let spans = house_spans(cusps)?;
    let mut assignment = HouseAssignment::default();

    for position in bodies {
        if !position.longitude.is_finite() {
            debug!("skipping {} with non-finite longitude", position.body);
            continue;
        }
        match spans.iter().find(|(_, span)| span.contains(position.longitude)) {
            Some((house, _)) => assignment.houses.entry(*house).or_default().push(*position),
            None => debug!("{} at {} matched no house", position.body, position.longitude),
        }
    }

    Ok(assignment)
}

/// Checks that the spans tile the circle: every width positive and the
/// widths summing to 360.
pub fn validate_cusps(cusps: &[HouseCusp]) -> Result<()> {
    let spans = house_spans(cusps)?;
    if let Some((house, _)) = spans.iter().find(|(_, span)| span.width() <= 0.0) {
        return Err(AstrologyError::InvalidInput(format!(
            "house {} has zero width",
            house
        )));
    }
    let total: f64 = spans.iter().map(|(_, span)| span.width()).sum();
    if (total - FULL_CIRCLE).abs() > 1e-9 {
        return Err(AstrologyError::InvalidInput(format!(
            "house spans cover {:.4} degrees instead of 360",
            total
        )));
    }
    Ok(())
}

/// Cusps spaced evenly from `first`, handy for equal-house charts and tests.
pub fn equal_cusps(first: f64) -> Vec<HouseCusp> {
    (0..HOUSE_COUNT)
        .filter_map(|i| HouseCusp::from_degree(i as u8 + 1, normalize_degree(first + 30.0 * i as f64)).ok())
        .collect()
}
