use crate::api::{AxisPoint, CalculationRequest, CalculationResponse, CalculationSource, EnochFields};
use crate::aspects::{classical_aspects, Aspect};
use crate::elements::{
    count_elements_for_houses, count_elements_for_planets, ElementBalance, ElementCount,
};
use crate::error::Result;
use crate::houses::{resolve_houses, validate_cusps, BodyPosition, HouseAssignment, HouseCusp};
use crate::shemot::{shem_astronomical_index, shem_enoch_index, shem_info, ShemInfo};
use crate::zodiac::CelestialBody;
use tracing::{info, warn};

/// Raw chart data as reported for one moment and place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chart {
    pub bodies: Vec<BodyPosition>,
    pub ascendant: Option<AxisPoint>,
    pub midheaven: Option<AxisPoint>,
    pub cusps: Vec<HouseCusp>,
    pub julian_day: Option<f64>,
    pub enoch: Option<EnochFields>,
}

impl Chart {
    pub fn from_response(response: &CalculationResponse) -> Result<Self> {
        let houses = response.houses()?;
        Ok(Self {
            bodies: response.body_positions(),
            ascendant: houses.ascendant,
            midheaven: houses.midheaven,
            cusps: houses.houses.clone(),
            julian_day: response.julian_day,
            enoch: response.enoch.clone(),
        })
    }

    pub fn body(&self, body: CelestialBody) -> Option<&BodyPosition> {
        self.bodies.iter().find(|p| p.body == body)
    }
}

/// A chart with every derived quantity computed once. Both layouts draw from
/// this, so they can never disagree on which house a body sits in.
#[derive(Debug, Clone)]
pub struct ResolvedChart {
    pub chart: Chart,
    pub assignment: HouseAssignment,
    pub aspects: Vec<Aspect>,
    pub planet_elements: ElementCount,
    pub house_elements: ElementCount,
    pub balance: ElementBalance,
}

impl ResolvedChart {
    pub fn resolve(chart: Chart) -> Result<Self> {
        if let Err(err) = validate_cusps(&chart.cusps) {
            warn!("house cusps look malformed, assigning first match: {}", err);
        }
        let assignment = resolve_houses(&chart.cusps, &chart.bodies)?;
        let ascendant_sign = chart.ascendant.map(|a| a.sign);

        Ok(Self {
            assignment,
            aspects: classical_aspects(&chart.bodies),
            planet_elements: count_elements_for_planets(&chart.bodies),
            house_elements: count_elements_for_houses(&chart.cusps),
            balance: ElementBalance::compute(&chart.bodies, ascendant_sign),
            chart,
        })
    }

    pub fn from_response(response: &CalculationResponse) -> Result<Self> {
        Self::resolve(Chart::from_response(response)?)
    }

    /// Wheel rotation: the Ascendant degree, or 0 without one.
    pub fn rotation_offset(&self) -> f64 {
        self.chart.ascendant.map(|a| a.degree).unwrap_or(0.0)
    }

    /// Name ruling the Sun's 5° band.
    pub fn astronomical_shem(&self) -> Option<ShemInfo> {
        let sun = self.chart.body(CelestialBody::Sun)?;
        shem_astronomical_index(sun.longitude).and_then(shem_info)
    }

    /// Name of the Enoch day this chart falls on.
    pub fn enoch_shem(&self) -> Option<ShemInfo> {
        let enoch = self.chart.enoch.as_ref()?;
        shem_enoch_index(enoch.enoch_month, enoch.enoch_day, enoch.added_week).and_then(shem_info)
    }
}

/// Fetches and resolves a chart in one step.
pub async fn fetch_chart<S: CalculationSource>(
    source: &S,
    request: &CalculationRequest,
) -> Result<ResolvedChart> {
    let response = source.calculate(request).await?;
    let resolved = ResolvedChart::from_response(&response)?;
    info!(
        "resolved chart for {}: {} bodies, {} aspects",
        request.datetime,
        resolved.chart.bodies.len(),
        resolved.aspects.len()
    );
    Ok(resolved)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::houses::equal_cusps;
    use crate::zodiac::ZodiacSign;

    /// Equal houses from 95.5° with a spread of bodies.
    pub fn sample_chart() -> Chart {
        let bodies = [
            (CelestialBody::Sun, 5.0),
            (CelestialBody::Moon, 185.0),
            (CelestialBody::Mercury, 12.0),
            (CelestialBody::Venus, 101.0),
            (CelestialBody::Mars, 125.0),
            (CelestialBody::Jupiter, 245.0),
            (CelestialBody::Saturn, 300.0),
            (CelestialBody::Uranus, 97.0),
            (CelestialBody::Neptune, 330.0),
            (CelestialBody::Pluto, 215.0),
        ]
        .iter()
        .map(|(b, l)| BodyPosition::new(*b, *l))
        .collect();

        Chart {
            bodies,
            ascendant: Some(AxisPoint {
                degree: 95.5,
                sign: ZodiacSign::Cancer,
                position: 5.5,
            }),
            midheaven: Some(AxisPoint {
                degree: 5.5,
                sign: ZodiacSign::Aries,
                position: 5.5,
            }),
            cusps: equal_cusps(95.5),
            julian_day: None,
            enoch: Some(EnochFields {
                enoch_year: 5996,
                enoch_month: 1,
                enoch_day: 6,
                enoch_day_of_year: 6,
                added_week: false,
                enoch_start: None,
                start_utc: None,
                end_utc: None,
            }),
        }
    }
}
