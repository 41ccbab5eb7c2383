//! The 72 three-letter names and the two ways a day or a chart picks one.

use crate::angle::normalize_degree;
use serde::Serialize;

pub const SHEM_COUNT: usize = 72;

/// Fixed order; index 0 is the first name of month 1.
pub const SHEMOT: [&str; SHEM_COUNT] = [
    "והו", "ילי", "סיט", "עלם", "מהש", "ללה", "אכא", "כהת", "הזי", "אלד", "לאו", "ההע",
    "יזל", "מבה", "ריה", "הקם", "לאו", "כלי", "לוו", "פהל", "נלך", "ייי", "מלה", "חהו",
    "נתה", "האא", "ירת", "שאה", "ריי", "אום", "לכב", "ושר", "יחו", "להח", "כוק", "מנד",
    "אני", "חעם", "רהע", "ייז", "ההה", "מיך", "וול", "ילה", "סאל", "ערי", "עשל", "מיה",
    "והו", "דני", "החש", "עמם", "ננא", "נית", "מבה", "פוי", "נמם", "ייל", "הרח", "מצר",
    "ומב", "יהה", "ענו", "מחי", "דמב", "מנק", "איע", "חבו", "ראה", "יבם", "היי", "מום",
];

/// Short meditation attached to each name, same order as [`SHEMOT`].
pub const KAVANOT: [&str; SHEM_COUNT] = [
    "Repentance, doing Teshuvah. Erases the past; return to the moment of Creation.",
    "Protection from death. Resolves psychic issues. Brings redemption closer.",
    "Work miracles.",
    "Remove negative thoughts. Positive thinking; success.",
    "Healing. Strengthens the soul's immune system.",
    "Expand the vessel; prophetic illumination.",
    "Brings order to life.",
    "Cancels harsh decrees; fights the world's negativity.",
    "Influence angels.",
    "Protection against the evil eye. Removes envy. Rebirth (mikveh).",
    "Remove the ego.",
    "Induce love. Transform hatred into love.",
    "Blessing for pregnancy and offspring.",
    "Fight the ego. Resolve conflicts without violence.",
    "See the causal world.",
    "Elevate astral fortune.",
    "Battle the ego.",
    "Build the vessel of blessing.",
    "Redemption. Connection with the Ana BeKoach.",
    "Empower spiritual strength to connect with the Creator.",
    "Strength to go the distance. Second wind; see shortcuts.",
    "Priestly blessing (Cohanim). Source of all blessing; cleanses the aura.",
    "Priestly energy that separates good from evil and clears negativity.",
    "Heals jealousy. Prevents spiritual disconnection.",
    "Connect with truth. Generates continuity.",
    "Bring order to life.",
    "Align with the Light. Exchange severity for harmony.",
    "Find the soulmate.",
    "Shed all hatred.",
    "Reconcile with those in conflict. Overcome the ego.",
    "Non-judgmental acceptance; wholeness.",
    "Draws redemption; connects with messianic consciousness.",
    "Remove our dark side.",
    "Learn to break the ego.",
    "Humility. Sublimate sexuality.",
    "Conquer fear. Healing blessing of the Kohen.",
    "Break the ego. Long-term vision.",
    "Acquire the quality of sharing.",
    "Destroy inner evil. Transform negative situations.",
    "Order and certainty in life.",
    "Blessing to heal all situations.",
    "Reveal secrets. Good before studying Torah.",
    "Help others connect with the Divine; liberate souls.",
    "Connect with mercy; soften judgments.",
    "Create the vessel for abundance at the right moment.",
    "Gain confidence and certainty; success.",
    "Remove blockages and negativity; clear the path.",
    "Attain consciousness of unity.",
    "Learn gratitude.",
    "Attain prophecy.",
    "Forgiveness for past guilt.",
    "Strength to connect.",
    "Strong spiritual defense; restores what was lost.",
    "Continuity; removes the death of projects or relationships.",
    "Strength to achieve goals.",
    "Nullify idolatry (power, money, religiosity…).",
    "Transcend limitations. Power of Sinai.",
    "Makes the Divine fight for me.",
    "Umbilical cord with the Divine.",
    "Free oneself from limitations (ego, bondage…).",
    "Healing force; health.",
    "Connect with the inner teacher.",
    "Humility; virtues of Moses.",
    "Help others; love of one's neighbor.",
    "Awareness to help and not judge.",
    "Resolve conflicts spiritually; remove vengeance.",
    "Power over time.",
    "Correct seminal emission; resolve sexual problems.",
    "Wisdom; blessing for marriage.",
    "Success in business for sharing; removes blockages.",
    "Bestowal of the gift of prophecy.",
    "Remove physical defects. Power of negotiation.",
];

/// Month length used when splitting a month into six name ranges.
///
/// Months 3, 6, 9 and 12 have 31 days; month 12 stretches to 38 when the
/// intercalary week is present.
pub fn enoch_month_length(month: u8, added_week: bool) -> u8 {
    match month {
        12 if added_week => 38,
        3 | 6 | 9 | 12 => 31,
        _ => 30,
    }
}

/// Index of the name for an Enoch month/day. Each month owns six consecutive
/// names and its days are split proportionally between them.
///
/// Returns `None` for a month outside 1..=12 or day 0.
pub fn shem_enoch_index(month: u8, day: u8, added_week: bool) -> Option<usize> {
    if !(1..=12).contains(&month) || day == 0 {
        return None;
    }
    let days = enoch_month_length(month, added_week) as f64;
    let proportion = (day as f64 - 1.0) / days;
    let within = ((proportion * 6.0).floor() as usize).min(5);
    let index = (month as usize - 1) * 6 + within;
    (index < SHEM_COUNT).then_some(index)
}

pub fn shem_enoch(month: u8, day: u8, added_week: bool) -> Option<&'static str> {
    shem_enoch_index(month, day, added_week).map(|i| SHEMOT[i])
}

/// Index of the name ruling the 5° band that holds the Sun.
pub fn shem_astronomical_index(sun_longitude: f64) -> Option<usize> {
    if !sun_longitude.is_finite() {
        return None;
    }
    let index = (normalize_degree(sun_longitude) / 5.0).floor() as usize;
    Some(index.min(SHEM_COUNT - 1))
}

pub fn shem_astronomical(sun_longitude: f64) -> Option<&'static str> {
    shem_astronomical_index(sun_longitude).map(|i| SHEMOT[i])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShemInfo {
    pub index: usize,
    pub name: &'static str,
    pub kavanah: &'static str,
}

pub fn shem_info(index: usize) -> Option<ShemInfo> {
    Some(ShemInfo {
        index,
        name: SHEMOT.get(index)?,
        kavanah: KAVANOT.get(index)?,
    })
}

/// Maps final letter forms to their regular forms so `מום` and `מומ` match.
fn fold_final_letters(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            'ך' => 'כ',
            'ם' => 'מ',
            'ן' => 'נ',
            'ף' => 'פ',
            'ץ' => 'צ',
            other => other,
        })
        .collect()
}

/// First entry whose spelling matches `name`, ignoring final-letter forms.
///
/// A few names repeat in the table; the earliest occurrence wins.
pub fn shem_info_by_name(name: &str) -> Option<ShemInfo> {
    let wanted = fold_final_letters(name);
    if wanted.is_empty() {
        return None;
    }
    SHEMOT
        .iter()
        .position(|candidate| fold_final_letters(candidate) == wanted)
        .and_then(shem_info)
}
