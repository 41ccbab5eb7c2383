//! Element, modality and polarity tallies for a chart.

use crate::houses::{BodyPosition, HouseCusp};
use crate::zodiac::{CelestialBody, Element, Modality, Polarity, ZodiacSign, ASCENDANT_GLYPH};
use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------
// ## Counts
// ---------------------------

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElementCount {
    pub fire: u32,
    pub earth: u32,
    pub air: u32,
    pub water: u32,
}

impl ElementCount {
    pub fn get(&self, element: Element) -> u32 {
        match element {
            Element::Fire => self.fire,
            Element::Earth => self.earth,
            Element::Air => self.air,
            Element::Water => self.water,
        }
    }

    pub fn add(&mut self, element: Element, weight: u32) {
        match element {
            Element::Fire => self.fire += weight,
            Element::Earth => self.earth += weight,
            Element::Air => self.air += weight,
            Element::Water => self.water += weight,
        }
    }

    pub fn total(&self) -> u32 {
        self.fire + self.earth + self.air + self.water
    }

    /// Field order doubles as iteration order: Fire, Earth, Air, Water.
    pub fn iter(&self) -> impl Iterator<Item = (Element, u32)> + '_ {
        Element::ALL.iter().map(move |e| (*e, self.get(*e)))
    }
}

impl std::ops::Add for ElementCount {
    type Output = ElementCount;

    fn add(self, other: ElementCount) -> ElementCount {
        ElementCount {
            fire: self.fire + other.fire,
            earth: self.earth + other.earth,
            air: self.air + other.air,
            water: self.water + other.water,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModalityCount {
    pub cardinal: u32,
    pub fixed: u32,
    pub mutable: u32,
}

impl ModalityCount {
    pub fn get(&self, modality: Modality) -> u32 {
        match modality {
            Modality::Cardinal => self.cardinal,
            Modality::Fixed => self.fixed,
            Modality::Mutable => self.mutable,
        }
    }

    pub fn add(&mut self, modality: Modality, weight: u32) {
        match modality {
            Modality::Cardinal => self.cardinal += weight,
            Modality::Fixed => self.fixed += weight,
            Modality::Mutable => self.mutable += weight,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolarityCount {
    pub masculine: u32,
    pub feminine: u32,
}

/// One planet-per-sign tally from the raw body list.
pub fn count_elements_for_planets(bodies: &[BodyPosition]) -> ElementCount {
    let mut counts = ElementCount::default();
    for sign in bodies.iter().filter_map(BodyPosition::sign) {
        counts.add(sign.element(), 1);
    }
    counts
}

/// One count per house, taken from each cusp's sign.
pub fn count_elements_for_houses(cusps: &[HouseCusp]) -> ElementCount {
    let mut counts = ElementCount::default();
    for cusp in cusps {
        counts.add(cusp.sign.element(), 1);
    }
    counts
}

/// Highest count, first element in Fire, Earth, Air, Water order on ties.
/// All-zero input yields `(None, 0)`.
pub fn dominant_element(counts: &ElementCount) -> (Option<Element>, u32) {
    let mut best: Option<(Element, u32)> = None;
    for (element, n) in counts.iter() {
        match best {
            Some((_, max)) if n <= max => {}
            _ => best = Some((element, n)),
        }
    }
    match best {
        Some((_, 0)) | None => (None, 0),
        Some((element, n)) => (Some(element), n),
    }
}

// ---------------------------
// ## Weighted Balance
// ---------------------------

/// A chart point counted in the weighted balance.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Contributor {
    Body(CelestialBody),
    Ascendant,
}

impl Contributor {
    fn weight(&self) -> u32 {
        match self {
            Contributor::Body(body) if body.is_luminary() => 2,
            Contributor::Body(_) => 1,
            Contributor::Ascendant => 2,
        }
    }

    fn glyph(&self) -> &'static str {
        match self {
            Contributor::Body(body) => body.glyph(),
            Contributor::Ascendant => ASCENDANT_GLYPH,
        }
    }
}

/// Pluto is left out; the Ascendant sign joins the bodies.
fn contributors(
    bodies: &[BodyPosition],
    ascendant: Option<ZodiacSign>,
) -> Vec<(Contributor, ZodiacSign)> {
    let mut out: Vec<(Contributor, ZodiacSign)> = bodies
        .iter()
        .filter(|p| p.body != CelestialBody::Pluto)
        .filter_map(|p| p.sign().map(|sign| (Contributor::Body(p.body), sign)))
        .collect();
    if let Some(sign) = ascendant {
        out.push((Contributor::Ascendant, sign));
    }
    out
}

/// Full element/modality/polarity breakdown used in the chart summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElementBalance {
    pub raw_elements: ElementCount,
    pub weighted_elements: ElementCount,
    pub raw_modalities: ModalityCount,
    pub weighted_modalities: ModalityCount,
    pub polarity: PolarityCount,
    pub element_tokens: BTreeMap<Element, Vec<String>>,
    pub modality_tokens: BTreeMap<Modality, Vec<String>>,
}

impl ElementBalance {
    pub fn compute(bodies: &[BodyPosition], ascendant: Option<ZodiacSign>) -> Self {
        let mut balance = ElementBalance::default();

        for (who, sign) in contributors(bodies, ascendant) {
            let weight = who.weight();
            let element = sign.element();
            let modality = sign.modality();

            balance.raw_elements.add(element, 1);
            balance.weighted_elements.add(element, weight);
            balance.raw_modalities.add(modality, 1);
            balance.weighted_modalities.add(modality, weight);
            match element.polarity() {
                Polarity::Masculine => balance.polarity.masculine += weight,
                Polarity::Feminine => balance.polarity.feminine += weight,
            }

            let token = format!(
                "{}{}{}",
                who.glyph(),
                sign.glyph(),
                if weight == 2 { "x2" } else { "" }
            );
            balance
                .element_tokens
                .entry(element)
                .or_default()
                .push(token.clone());
            balance.modality_tokens.entry(modality).or_default().push(token);
        }

        balance
    }

    pub fn dominant(&self) -> (Option<Element>, u32) {
        dominant_element(&self.weighted_elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::houses::equal_cusps;

    fn at(body: CelestialBody, longitude: f64) -> BodyPosition {
        BodyPosition::new(body, longitude)
    }

    #[test]
    fn counts_one_per_planet() {
        let bodies = [
            at(CelestialBody::Sun, 5.0),      // Aries
            at(CelestialBody::Moon, 125.0),   // Leo
            at(CelestialBody::Mercury, 35.0), // Taurus
            at(CelestialBody::Venus, f64::NAN),
        ];
        let counts = count_elements_for_planets(&bodies);
        assert_eq!(
            counts,
            ElementCount { fire: 2, earth: 1, air: 0, water: 0 }
        );
    }

    #[test]
    fn house_counts_use_cusp_signs() {
        let counts = count_elements_for_houses(&equal_cusps(0.0));
        assert_eq!(counts, ElementCount { fire: 3, earth: 3, air: 3, water: 3 });
    }

    #[test]
    fn dominant_of_all_zero_is_none() {
        assert_eq!(dominant_element(&ElementCount::default()), (None, 0));
    }

    #[test]
    fn dominant_tie_prefers_earlier_element() {
        let counts = ElementCount { fire: 0, earth: 3, air: 3, water: 1 };
        assert_eq!(dominant_element(&counts), (Some(Element::Earth), 3));

        let counts = ElementCount { fire: 2, earth: 2, air: 2, water: 2 };
        assert_eq!(dominant_element(&counts), (Some(Element::Fire), 2));
    }

    #[test]
    fn dominant_picks_strict_maximum() {
        let counts = ElementCount { fire: 1, earth: 0, air: 0, water: 4 };
        assert_eq!(dominant_element(&counts), (Some(Element::Water), 4));
    }

    #[test]
    fn weighted_balance_doubles_luminaries_and_skips_pluto() {
        let bodies = [
            at(CelestialBody::Sun, 5.0),     // Aries, x2
            at(CelestialBody::Moon, 95.0),   // Cancer, x2
            at(CelestialBody::Mars, 65.0),   // Gemini
            at(CelestialBody::Pluto, 215.0), // Scorpio, excluded
        ];
        let balance = ElementBalance::compute(&bodies, Some(ZodiacSign::Capricorn));

        assert_eq!(
            balance.raw_elements,
            ElementCount { fire: 1, earth: 1, air: 1, water: 1 }
        );
        assert_eq!(
            balance.weighted_elements,
            ElementCount { fire: 2, earth: 2, air: 1, water: 2 }
        );
        assert_eq!(balance.raw_modalities.cardinal, 3);
        assert_eq!(balance.weighted_modalities.cardinal, 6);
        assert_eq!(balance.weighted_modalities.mutable, 1);
        assert_eq!(balance.polarity, PolarityCount { masculine: 3, feminine: 4 });
        assert_eq!(balance.dominant(), (Some(Element::Fire), 2));
    }

    #[test]
    fn tokens_mark_doubled_contributors() {
        let bodies = [at(CelestialBody::Sun, 5.0), at(CelestialBody::Mars, 125.0)];
        let balance = ElementBalance::compute(&bodies, Some(ZodiacSign::Leo));
        let fire = &balance.element_tokens[&Element::Fire];
        assert_eq!(fire.len(), 3);
        assert_eq!(fire[0], "\u{2609}\u{2648}x2");
        assert_eq!(fire[1], "\u{2642}\u{264C}");
        assert_eq!(fire[2], "\u{2191}\u{264C}x2");
    }
}
