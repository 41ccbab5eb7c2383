use crate::angle::angular_distance;
use crate::houses::BodyPosition;
use crate::zodiac::CelestialBody;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectKind {
    Conjunction,
    Sextile,
    Square,
    Trine,
    Opposition,
}

impl AspectKind {
    pub const ALL: [AspectKind; 5] = [
        AspectKind::Conjunction,
        AspectKind::Sextile,
        AspectKind::Square,
        AspectKind::Trine,
        AspectKind::Opposition,
    ];

    pub fn exact_angle(&self) -> f64 {
        match self {
            AspectKind::Conjunction => 0.0,
            AspectKind::Sextile => 60.0,
            AspectKind::Square => 90.0,
            AspectKind::Trine => 120.0,
            AspectKind::Opposition => 180.0,
        }
    }

    pub fn max_orb(&self) -> f64 {
        match self {
            AspectKind::Conjunction | AspectKind::Opposition => 6.0,
            AspectKind::Square | AspectKind::Trine => 5.0,
            AspectKind::Sextile => 4.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AspectKind::Conjunction => "\u{260C}",
            AspectKind::Sextile => "*",
            AspectKind::Square => "\u{25A1}",
            AspectKind::Trine => "\u{25B3}",
            AspectKind::Opposition => "\u{260D}",
        }
    }
}

impl fmt::Display for AspectKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AspectKind::Conjunction => "conjunction",
            AspectKind::Sextile => "sextile",
            AspectKind::Square => "square",
            AspectKind::Trine => "trine",
            AspectKind::Opposition => "opposition",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Aspect {
    pub kind: AspectKind,
    pub first: CelestialBody,
    pub second: CelestialBody,
    /// Actual separation in degrees, [0, 180].
    pub separation: f64,
    /// Distance from exact.
    pub orb: f64,
}

/// Every aspect between each pair of bodies, tightest orb first.
pub fn classical_aspects(bodies: &[BodyPosition]) -> Vec<Aspect> {
    let finite: Vec<&BodyPosition> = bodies.iter().filter(|p| p.longitude.is_finite()).collect();
    let mut aspects = Vec::new();

    for (i, a) in finite.iter().enumerate() {
        for b in &finite[i + 1..] {
            let separation = angular_distance(a.longitude, b.longitude);
            for kind in AspectKind::ALL {
                let orb = (separation - kind.exact_angle()).abs();
                if orb <= kind.max_orb() {
                    aspects.push(Aspect {
                        kind,
                        first: a.body,
                        second: b.body,
                        separation,
                        orb,
                    });
                }
            }
        }
    }

    aspects.sort_by(|x, y| x.orb.total_cmp(&y.orb));
    aspects
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn finds_opposition_across_zero() {
        let bodies = [
            BodyPosition::new(CelestialBody::Sun, 358.0),
            BodyPosition::new(CelestialBody::Moon, 180.0),
        ];
        let aspects = classical_aspects(&bodies);
        assert_eq!(aspects.len(), 1);
        assert_eq!(aspects[0].kind, AspectKind::Opposition);
        assert_relative_eq!(aspects[0].orb, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn sorted_by_orb() {
        let bodies = [
            BodyPosition::new(CelestialBody::Sun, 0.0),
            BodyPosition::new(CelestialBody::Venus, 95.0),
            BodyPosition::new(CelestialBody::Mars, 120.5),
        ];
        let aspects = classical_aspects(&bodies);
        let kinds: Vec<_> = aspects.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AspectKind::Trine, AspectKind::Square]);
        assert!(aspects.windows(2).all(|w| w[0].orb <= w[1].orb));
    }

    #[test]
    fn outside_orb_is_ignored() {
        let bodies = [
            BodyPosition::new(CelestialBody::Mercury, 10.0),
            BodyPosition::new(CelestialBody::Jupiter, 75.0),
        ];
        assert!(classical_aspects(&bodies).is_empty());
    }
}
