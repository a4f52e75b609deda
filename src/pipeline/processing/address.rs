use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::app::ports::AddressNormalizer;

/// Canonical abbreviation and the spellings that map to it. The abbreviation
/// itself is always listed so normalized text maps to itself.
const STREET_TYPES: &[(&str, &[&str])] = &[
    ("Aly.", &["ALLEY", "ALY", "ALLY"]),
    ("Ave.", &["AVENUE", "AVE", "AV", "AVEN", "AVNUE"]),
    ("Blvd.", &["BOULEVARD", "BLVD", "BOULV", "BOUL"]),
    ("Cir.", &["CIRCLE", "CIR", "CIRC", "CRCL"]),
    ("Ct.", &["COURT", "CT", "CRT"]),
    ("Cv.", &["COVE", "CV"]),
    ("Xing.", &["CROSSING", "XING", "CRSSNG"]),
    ("Dr.", &["DRIVE", "DR", "DRV"]),
    ("Expy.", &["EXPRESSWAY", "EXPY", "EXPWY"]),
    ("Fwy.", &["FREEWAY", "FWY"]),
    ("Hwy.", &["HIGHWAY", "HWY", "HIWAY"]),
    ("Ln.", &["LANE", "LN"]),
    ("Pkwy.", &["PARKWAY", "PKWY", "PKY", "PARKWY"]),
    ("Pl.", &["PLACE", "PL"]),
    ("Plz.", &["PLAZA", "PLZ", "PLZA"]),
    ("Pt.", &["POINT", "PT"]),
    ("Rd.", &["ROAD", "RD"]),
    ("Sq.", &["SQUARE", "SQ", "SQR"]),
    ("St.", &["STREET", "ST", "STR", "STRT"]),
    ("Ter.", &["TERRACE", "TER", "TERR"]),
    ("Trl.", &["TRAIL", "TRL"]),
    ("Tpke.", &["TURNPIKE", "TPKE", "TRNPK"]),
];

const UNIT_DESIGNATORS: &[(&str, &[&str])] = &[
    ("Apt.", &["APARTMENT", "APT"]),
    ("Bldg.", &["BUILDING", "BLDG"]),
    ("Rm.", &["ROOM", "RM"]),
    ("Ste.", &["SUITE", "STE"]),
];

static STREET_TYPE_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| index(STREET_TYPES));
static UNIT_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| index(UNIT_DESIGNATORS));

fn index(table: &[(&'static str, &'static [&'static str])]) -> HashMap<&'static str, &'static str> {
    table
        .iter()
        .flat_map(|(canonical, spellings)| spellings.iter().map(move |s| (*s, *canonical)))
        .collect()
}

/// Abbreviates street types (Road -> Rd.) and unit designators (Suite -> Ste.)
/// in a single address line.
///
/// Only the last street-type word following a house number is rewritten, so
/// "9 Court House Road" becomes "9 Court House Rd." and a city/state line such
/// as "Hartford, CT" is left alone. Output fed back in comes out unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreetSuffixNormalizer;

impl AddressNormalizer for StreetSuffixNormalizer {
    fn normalize_line(&self, line: &str) -> Option<String> {
        let mut words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if !words.iter().any(|w| w.chars().any(char::is_alphanumeric)) {
            return None;
        }

        let house_number = words
            .iter()
            .position(|w| w.starts_with(|c: char| c.is_ascii_digit()));
        let street_type = house_number.and_then(|n| {
            words
                .iter()
                .enumerate()
                .skip(n + 1)
                .filter(|(_, w)| STREET_TYPE_INDEX.contains_key(core(w).0.to_uppercase().as_str()))
                .map(|(i, _)| i)
                .last()
        });
        if let Some(i) = street_type {
            words[i] = rewrite(&words[i], &STREET_TYPE_INDEX);
        }
        for word in words.iter_mut() {
            if UNIT_INDEX.contains_key(core(word).0.to_uppercase().as_str()) {
                *word = rewrite(word, &UNIT_INDEX);
            }
        }
        Some(words.join(" "))
    }
}

/// Leaves every line untouched. Selected when address standardization is off.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughNormalizer;

impl AddressNormalizer for PassThroughNormalizer {
    fn normalize_line(&self, line: &str) -> Option<String> {
        Some(line.to_string())
    }
}

/// Pick the normalizer once for the whole run.
pub fn select_normalizer(standardize: bool) -> Box<dyn AddressNormalizer> {
    if standardize {
        Box::new(StreetSuffixNormalizer)
    } else {
        Box::new(PassThroughNormalizer)
    }
}

/// Split a word into its alphanumeric core and trailing punctuation.
fn core(word: &str) -> (&str, &str) {
    let end = word
        .char_indices()
        .find(|(_, c)| !c.is_alphanumeric())
        .map(|(i, _)| i)
        .unwrap_or(word.len());
    word.split_at(end)
}

fn rewrite(word: &str, table: &HashMap<&'static str, &'static str>) -> String {
    let (stem, trailing) = core(word);
    match table.get(stem.to_uppercase().as_str()) {
        Some(canonical) => format!("{}{}", canonical, trailing.strip_prefix('.').unwrap_or(trailing)),
        None => word.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(line: &str) -> Option<String> {
        StreetSuffixNormalizer.normalize_line(line)
    }

    #[test]
    fn abbreviates_the_street_type() {
        assert_eq!(norm("123 Main Street").as_deref(), Some("123 Main St."));
        assert_eq!(norm("9 Court House Road").as_deref(), Some("9 Court House Rd."));
        assert_eq!(norm("1 LEE HIGHWAY").as_deref(), Some("1 LEE Hwy."));
        assert_eq!(norm("40 Elm Ave, Suite 200").as_deref(), Some("40 Elm Ave., Ste. 200"));
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(norm("  12   Oak   Lane ").as_deref(), Some("12 Oak Ln."));
    }

    #[test]
    fn degenerate_lines_yield_none() {
        assert_eq!(norm("."), None);
        assert_eq!(norm("   "), None);
        assert_eq!(norm(""), None);
    }

    #[test]
    fn lines_without_street_types_are_kept() {
        assert_eq!(norm("PO Box 1234").as_deref(), Some("PO Box 1234"));
        assert_eq!(norm("Street").as_deref(), Some("Street"));
        assert_eq!(norm("Hartford, CT").as_deref(), Some("Hartford, CT"));
        assert_eq!(norm("Court House Road").as_deref(), Some("Court House Road"));
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        for line in [
            "123 Main Street",
            "40 Elm Ave, Suite 200",
            "7 Jefferson Davis Highway Apartment 3",
            "100 N. Boulevard.",
            "PO Box 1234",
        ] {
            let once = norm(line).unwrap();
            assert_eq!(norm(&once).unwrap(), once, "{}", line);
        }
    }

    #[test]
    fn pass_through_keeps_input() {
        assert_eq!(PassThroughNormalizer.normalize_line(" . ").as_deref(), Some(" . "));
        assert_eq!(
            select_normalizer(false).normalize_line("123 Main Street").as_deref(),
            Some("123 Main Street")
        );
        assert_eq!(
            select_normalizer(true).normalize_line("123 Main Street").as_deref(),
            Some("123 Main St.")
        );
    }
}
