use super::{CalendarDay, CalendarYear};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Length of the Omer count; Shavuot falls on the day after it.
pub const OMER_DAYS: u16 = 49;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FestivalKind {
    Pesach,
    Matzot,
    RoshHashanah,
    Teshuvah,
    YomKippur,
    Sukkot,
    SheminiAtzeret,
    Omer,
    Shavuot,
}

impl fmt::Display for FestivalKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            FestivalKind::Pesach => "Pesach",
            FestivalKind::Matzot => "Matzot",
            FestivalKind::RoshHashanah => "Rosh Hashanah",
            FestivalKind::Teshuvah => "Teshuvah",
            FestivalKind::YomKippur => "Yom Kippur",
            FestivalKind::Sukkot => "Sukkot",
            FestivalKind::SheminiAtzeret => "Shemini Atzeret",
            FestivalKind::Omer => "Omer",
            FestivalKind::Shavuot => "Shavuot",
        };
        write!(f, "{}", name)
    }
}

/// What a single day observes. A day can carry more than one kind; the
/// label of a holy convocation (`mikra`) wins over the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Festival {
    pub kinds: Vec<FestivalKind>,
    pub name: String,
    pub short: String,
    /// Holy convocation.
    pub mikra: bool,
    /// Intermediate day of a longer feast.
    pub intermediate: bool,
}

impl Festival {
    fn new(kind: FestivalKind, name: impl Into<String>, short: impl Into<String>) -> Self {
        Self {
            kinds: vec![kind],
            name: name.into(),
            short: short.into(),
            mikra: false,
            intermediate: false,
        }
    }

    fn mikra(mut self) -> Self {
        self.mikra = true;
        self
    }

    fn intermediate(mut self) -> Self {
        self.intermediate = true;
        self
    }

    fn merge(&mut self, other: Festival) {
        for kind in other.kinds {
            if !self.kinds.contains(&kind) {
                self.kinds.push(kind);
            }
        }
        if other.mikra {
            self.name = other.name;
        }
        self.short = other.short;
        self.mikra |= other.mikra;
        self.intermediate |= other.intermediate;
    }
}

pub type FestivalMap = BTreeMap<u16, Festival>;

struct Builder<'a> {
    by_date: HashMap<(u8, u8), &'a CalendarDay>,
    day_numbers: Vec<u16>,
    map: FestivalMap,
}

impl<'a> Builder<'a> {
    fn new(days: &'a [CalendarDay]) -> Self {
        Self {
            by_date: days
                .iter()
                .map(|d| ((d.enoch.month, d.enoch.day), d))
                .collect(),
            day_numbers: days.iter().map(|d| d.enoch.day_of_year).collect(),
            map: FestivalMap::new(),
        }
    }

    fn day_of(&self, month: u8, day: u8) -> Option<u16> {
        self.by_date.get(&(month, day)).map(|d| d.enoch.day_of_year)
    }

    fn has_day(&self, day_of_year: u16) -> bool {
        self.day_numbers.contains(&day_of_year)
    }

    fn mark(&mut self, day_of_year: u16, festival: Festival) {
        if day_of_year == 0 {
            return;
        }
        match self.map.get_mut(&day_of_year) {
            Some(existing) => existing.merge(festival),
            None => {
                self.map.insert(day_of_year, festival);
            }
        }
    }

    fn mark_date(&mut self, month: u8, day: u8, festival: Festival) {
        if let Some(doy) = self.day_of(month, day) {
            self.mark(doy, festival);
        }
    }

    /// Seven-day feast from `month/15`; first and last days are convocations.
    fn week_feast(&mut self, month: u8, kind: FestivalKind, name: &str, short: &str) {
        for day in 15..=21u8 {
            let festival = match day {
                15 => Festival::new(kind, format!("{} (day 1)", name), short).mikra(),
                21 => Festival::new(kind, format!("{} (day 7)", name), short).mikra(),
                _ => Festival::new(kind, name, short).intermediate(),
            };
            self.mark_date(month, day, festival);
        }
    }

    fn omer(&mut self) {
        let Some(first) = self.day_of(1, 25) else { return };
        for i in 0..OMER_DAYS {
            let doy = first + i;
            if !self.has_day(doy) {
                return;
            }
            let festival = Festival::new(
                FestivalKind::Omer,
                format!("Omer day {}", i + 1),
                format!("Omer {}", i + 1),
            )
            .intermediate();
            self.mark(doy, festival);
        }
        let shavuot = first + OMER_DAYS;
        if self.has_day(shavuot) {
            self.mark(
                shavuot,
                Festival::new(FestivalKind::Shavuot, "Shavuot", "Shavuot").mikra(),
            );
        }
    }
}

/// Festivals of `days`, keyed by day of the year. Only the Enoch month, day
/// and day of the year are consulted, so the result is the same for any two
/// years with the same rows.
pub fn festival_map_for_days(days: &[CalendarDay]) -> FestivalMap {
    let mut b = Builder::new(days);

    b.mark_date(
        1,
        14,
        Festival::new(FestivalKind::Pesach, "Pesach", "Pesach").mikra(),
    );
    b.week_feast(1, FestivalKind::Matzot, "Hag HaMatzot", "Matzot");

    b.mark_date(
        7,
        1,
        Festival::new(FestivalKind::RoshHashanah, "Rosh Hashanah", "Rosh Hash.").mikra(),
    );
    for day in 2..=9u8 {
        let festival = Festival::new(
            FestivalKind::Teshuvah,
            format!("Day of Teshuvah {}/10", day),
            format!("Teshuvah {}", day),
        )
        .intermediate();
        b.mark_date(7, day, festival);
    }
    b.mark_date(
        7,
        10,
        Festival::new(FestivalKind::YomKippur, "Yom Kippur", "Y. Kippur").mikra(),
    );

    b.week_feast(7, FestivalKind::Sukkot, "Sukkot", "Sukkot");
    b.mark_date(
        7,
        22,
        Festival::new(FestivalKind::SheminiAtzeret, "Shemini Atzeret", "Shemini"),
    );

    b.omer();
    b.map
}

pub fn festival_map(year: &CalendarYear) -> FestivalMap {
    festival_map_for_days(&year.days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::fixtures::sample_year;
    use rstest::rstest;

    #[test]
    fn full_year_has_every_feast() {
        let map = festival_map(&sample_year(5996, false));
        // 1 + 7 + 1 + 8 + 1 + 7 + 1 + 49 + 1
        assert_eq!(map.len(), 76);
        assert_eq!(map.values().filter(|f| f.mikra).count(), 8);
    }

    #[rstest]
    #[case(14, "Pesach", true)]
    #[case(15, "Hag HaMatzot (day 1)", true)]
    #[case(16, "Hag HaMatzot", false)]
    #[case(21, "Hag HaMatzot (day 7)", true)]
    #[case(25, "Omer day 1", false)]
    #[case(73, "Omer day 49", false)]
    #[case(74, "Shavuot", true)]
    #[case(183, "Rosh Hashanah", true)]
    #[case(184, "Day of Teshuvah 2/10", false)]
    #[case(192, "Yom Kippur", true)]
    #[case(197, "Sukkot (day 1)", true)]
    #[case(200, "Sukkot", false)]
    #[case(204, "Shemini Atzeret", false)]
    fn feast_days(#[case] day_of_year: u16, #[case] name: &str, #[case] mikra: bool) {
        let map = festival_map(&sample_year(5996, false));
        let festival = &map[&day_of_year];
        assert_eq!(festival.name, name);
        assert_eq!(festival.mikra, mikra);
    }

    #[test]
    fn ordinary_days_are_absent() {
        let map = festival_map(&sample_year(5996, true));
        assert!(!map.contains_key(&1));
        assert!(!map.contains_key(&205));
        assert!(!map.contains_key(&371));
    }

    #[test]
    fn omer_stops_where_the_rows_end() {
        let year = sample_year(5996, false);
        let map = festival_map_for_days(&year.days[..40]);
        let omer = map
            .values()
            .filter(|f| f.kinds.contains(&FestivalKind::Omer))
            .count();
        assert_eq!(omer, 16);
        assert!(!map.values().any(|f| f.kinds.contains(&FestivalKind::Shavuot)));
    }

    #[test]
    fn convocation_label_wins_a_shared_day() {
        let mut festival = Festival::new(FestivalKind::Omer, "Omer day 3", "Omer 3").intermediate();
        festival.merge(Festival::new(FestivalKind::Matzot, "Hag HaMatzot (day 7)", "Matzot").mikra());
        assert_eq!(festival.name, "Hag HaMatzot (day 7)");
        assert_eq!(festival.kinds, vec![FestivalKind::Omer, FestivalKind::Matzot]);
        assert!(festival.mikra && festival.intermediate);

        festival.merge(Festival::new(FestivalKind::Sukkot, "Sukkot", "Sukkot"));
        assert_eq!(festival.name, "Hag HaMatzot (day 7)");
    }
}
