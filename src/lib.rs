// src/lib.rs

//! Birth-chart geometry and the Enoch calendar, driven by a remote
//! calculation service.

pub mod angle;
pub mod api;
pub mod aspects;
pub mod calendar;
pub mod chart;
pub mod config;
pub mod elements;
pub mod error;
pub mod geo;
pub mod houses;
pub mod render;
pub mod shemot;
pub mod zodiac;

pub use angle::{angular_distance, decimals, degree_within_sign, normalize_degree, zodiac_sign_index};
pub use api::{
    AxisPoint, CalculationRequest, CalculationResponse, CalculationSource, EnochFields,
    HttpCalculationClient,
};
pub use aspects::{classical_aspects, Aspect, AspectKind};
pub use calendar::{CalendarDay, CalendarSession, CalendarYear, EnochDate, EnochMonthLayout, YearCache};
pub use chart::{fetch_chart, Chart, ResolvedChart};
pub use config::{Location, Settings};
pub use elements::{dominant_element, ElementBalance, ElementCount};
pub use error::{AstrologyError, Result};
pub use houses::{resolve_houses, BodyPosition, HouseAssignment, HouseCusp};
pub use shemot::{shem_astronomical, shem_enoch, shem_info, ShemInfo};
pub use zodiac::{CelestialBody, Element, Modality, Polarity, ZodiacSign};
