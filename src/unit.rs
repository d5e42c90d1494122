//! # Measurement Units
//!
//! Normalized unit tokens recognized by the quantity parser, together with the
//! small fixed conversion table used when grocery contributions are merged.
//!
//! Only conversions inside one family are supported (teaspoon ↔ tablespoon ↔ cup,
//! gram ↔ kilogram, ...). Converting between weight and volume would need an
//! ingredient density and is deliberately not attempted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Measurement units with normalization support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    // Volume units
    Teaspoons,
    Tablespoons,
    FluidOunces,
    Cups,
    Pints,
    Quarts,
    Gallons,
    Milliliters,
    Liters,

    // Weight units
    Ounces,
    Pounds,
    Grams,
    Kilograms,

    // Count/piece units
    Pieces,
    Dozen,

    // Specialized units
    Pinches,
    Dashes,
    Cloves,
    Slices,
    Sticks,
    Packages,
    Cans,
    Bottles,
}

/// Groups of units that can be summed after conversion to a common base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitFamily {
    /// US kitchen volume, base unit is the teaspoon
    UsVolume,
    /// Metric volume, base unit is the milliliter
    MetricVolume,
    /// Metric weight, base unit is the gram
    MetricWeight,
    /// Imperial weight, base unit is the ounce
    ImperialWeight,
    /// Counted items, base unit is one piece
    Count,
}

/// Common unit spellings and their variations
static UNIT_ALIASES: LazyLock<HashMap<&'static str, Unit>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Volume units
    map.insert("tsp", Unit::Teaspoons);
    map.insert("teaspoon", Unit::Teaspoons);
    map.insert("tbsp", Unit::Tablespoons);
    map.insert("tbs", Unit::Tablespoons);
    map.insert("tablespoon", Unit::Tablespoons);
    map.insert("cup", Unit::Cups);
    map.insert("c", Unit::Cups);
    map.insert("fl oz", Unit::FluidOunces);
    map.insert("fluid ounce", Unit::FluidOunces);
    map.insert("pint", Unit::Pints);
    map.insert("pt", Unit::Pints);
    map.insert("quart", Unit::Quarts);
    map.insert("qt", Unit::Quarts);
    map.insert("gallon", Unit::Gallons);
    map.insert("gal", Unit::Gallons);
    map.insert("ml", Unit::Milliliters);
    map.insert("milliliter", Unit::Milliliters);
    map.insert("millilitre", Unit::Milliliters);
    map.insert("l", Unit::Liters);
    map.insert("liter", Unit::Liters);
    map.insert("litre", Unit::Liters);

    // Weight units
    map.insert("oz", Unit::Ounces);
    map.insert("ounce", Unit::Ounces);
    map.insert("lb", Unit::Pounds);
    map.insert("lbs", Unit::Pounds);
    map.insert("pound", Unit::Pounds);
    map.insert("g", Unit::Grams);
    map.insert("gr", Unit::Grams);
    map.insert("gram", Unit::Grams);
    map.insert("kg", Unit::Kilograms);
    map.insert("kilogram", Unit::Kilograms);

    // Count units
    map.insert("piece", Unit::Pieces);
    map.insert("item", Unit::Pieces);
    map.insert("dozen", Unit::Dozen);
    map.insert("doz", Unit::Dozen);

    // Specialized units
    map.insert("pinch", Unit::Pinches);
    map.insert("dash", Unit::Dashes);
    map.insert("clove", Unit::Cloves);
    map.insert("slice", Unit::Slices);
    map.insert("stick", Unit::Sticks);
    map.insert("package", Unit::Packages);
    map.insert("pkg", Unit::Packages);
    map.insert("packet", Unit::Packages);
    map.insert("can", Unit::Cans);
    map.insert("tin", Unit::Cans);
    map.insert("bottle", Unit::Bottles);

    // French units
    map.insert("cuillère à café", Unit::Teaspoons);
    map.insert("cac", Unit::Teaspoons);
    map.insert("cuillère à soupe", Unit::Tablespoons);
    map.insert("cas", Unit::Tablespoons);
    map.insert("tasse", Unit::Cups);
    map.insert("gramme", Unit::Grams);
    map.insert("kilogramme", Unit::Kilograms);
    map.insert("pièce", Unit::Pieces);
    map.insert("gousse", Unit::Cloves);
    map.insert("tranche", Unit::Slices);
    map.insert("boîte", Unit::Cans);
    map.insert("bouteille", Unit::Bottles);
    map.insert("pincée", Unit::Pinches);

    map
});

impl Unit {
    /// Look up a unit token, tolerating case, a trailing period and plurals
    ///
    /// Returns `None` for words that are not units ("large", "fresh", ...).
    pub fn from_token(token: &str) -> Option<Unit> {
        let token = token.trim().trim_end_matches('.').to_lowercase();
        if token.is_empty() {
            return None;
        }

        if let Some(unit) = UNIT_ALIASES.get(token.as_str()) {
            return Some(*unit);
        }

        // "pinches", "dashes", "cuillères à soupe"
        let singular_forms = [
            token.strip_suffix("es").map(str::to_string),
            token.strip_suffix('s').map(str::to_string),
            token
                .split_once(' ')
                .and_then(|(head, tail)| Some(format!("{} {}", head.strip_suffix('s')?, tail))),
        ];

        singular_forms
            .into_iter()
            .flatten()
            .filter(|form| form.len() > 1)
            .find_map(|form| UNIT_ALIASES.get(form.as_str()).copied())
    }

    /// Get a human-readable label, singular when the amount is exactly one
    pub fn label(&self, amount: f64) -> &'static str {
        let singular = amount == 1.0;
        match self {
            Unit::Teaspoons => "tsp",
            Unit::Tablespoons => "tbsp",
            Unit::FluidOunces => "fl oz",
            Unit::Cups if singular => "cup",
            Unit::Cups => "cups",
            Unit::Pints if singular => "pint",
            Unit::Pints => "pints",
            Unit::Quarts if singular => "quart",
            Unit::Quarts => "quarts",
            Unit::Gallons if singular => "gallon",
            Unit::Gallons => "gallons",
            Unit::Milliliters => "ml",
            Unit::Liters => "l",
            Unit::Ounces => "oz",
            Unit::Pounds => "lb",
            Unit::Grams => "g",
            Unit::Kilograms => "kg",
            Unit::Pieces if singular => "piece",
            Unit::Pieces => "pieces",
            Unit::Dozen => "dozen",
            Unit::Pinches if singular => "pinch",
            Unit::Pinches => "pinches",
            Unit::Dashes if singular => "dash",
            Unit::Dashes => "dashes",
            Unit::Cloves if singular => "clove",
            Unit::Cloves => "cloves",
            Unit::Slices if singular => "slice",
            Unit::Slices => "slices",
            Unit::Sticks if singular => "stick",
            Unit::Sticks => "sticks",
            Unit::Packages if singular => "package",
            Unit::Packages => "packages",
            Unit::Cans if singular => "can",
            Unit::Cans => "cans",
            Unit::Bottles if singular => "bottle",
            Unit::Bottles => "bottles",
        }
    }

    /// Family and size of this unit expressed in the family's base unit
    ///
    /// Units without an entry (cans, cloves, pinches, ...) only merge with
    /// themselves.
    pub fn conversion(&self) -> Option<(UnitFamily, f64)> {
        match self {
            Unit::Teaspoons => Some((UnitFamily::UsVolume, 1.0)),
            Unit::Tablespoons => Some((UnitFamily::UsVolume, 3.0)),
            Unit::FluidOunces => Some((UnitFamily::UsVolume, 6.0)),
            Unit::Cups => Some((UnitFamily::UsVolume, 48.0)),
            Unit::Pints => Some((UnitFamily::UsVolume, 96.0)),
            Unit::Quarts => Some((UnitFamily::UsVolume, 192.0)),
            Unit::Gallons => Some((UnitFamily::UsVolume, 768.0)),
            Unit::Milliliters => Some((UnitFamily::MetricVolume, 1.0)),
            Unit::Liters => Some((UnitFamily::MetricVolume, 1000.0)),
            Unit::Grams => Some((UnitFamily::MetricWeight, 1.0)),
            Unit::Kilograms => Some((UnitFamily::MetricWeight, 1000.0)),
            Unit::Ounces => Some((UnitFamily::ImperialWeight, 1.0)),
            Unit::Pounds => Some((UnitFamily::ImperialWeight, 16.0)),
            Unit::Pieces => Some((UnitFamily::Count, 1.0)),
            Unit::Dozen => Some((UnitFamily::Count, 12.0)),
            Unit::Pinches
            | Unit::Dashes
            | Unit::Cloves
            | Unit::Slices
            | Unit::Sticks
            | Unit::Packages
            | Unit::Cans
            | Unit::Bottles => None,
        }
    }

    /// Convert an amount of this unit into `target`, if both share a family
    pub fn convert(&self, amount: f64, target: Unit) -> Option<f64> {
        if *self == target {
            return Some(amount);
        }
        let (from_family, from_size) = self.conversion()?;
        let (to_family, to_size) = target.conversion()?;
        (from_family == to_family).then(|| amount * from_size / to_size)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(2.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_lookup() {
        assert_eq!(Unit::from_token("cups"), Some(Unit::Cups));
        assert_eq!(Unit::from_token("cup"), Some(Unit::Cups));
        assert_eq!(Unit::from_token("C"), Some(Unit::Cups));
        assert_eq!(Unit::from_token("tbsp."), Some(Unit::Tablespoons));
        assert_eq!(Unit::from_token("Tablespoons"), Some(Unit::Tablespoons));
        assert_eq!(Unit::from_token("pinches"), Some(Unit::Pinches));
        assert_eq!(Unit::from_token("cuillères à soupe"), Some(Unit::Tablespoons));
        assert_eq!(Unit::from_token("large"), None);
        assert_eq!(Unit::from_token(""), None);
    }

    #[test]
    fn test_conversion_within_family() {
        assert_eq!(Unit::Teaspoons.convert(3.0, Unit::Tablespoons), Some(1.0));
        assert_eq!(Unit::Cups.convert(1.0, Unit::Tablespoons), Some(16.0));
        assert_eq!(Unit::Kilograms.convert(0.5, Unit::Grams), Some(500.0));
        assert_eq!(Unit::Pounds.convert(1.0, Unit::Ounces), Some(16.0));
    }

    #[test]
    fn test_conversion_across_families_is_refused() {
        assert_eq!(Unit::Cups.convert(1.0, Unit::Grams), None);
        assert_eq!(Unit::Milliliters.convert(5.0, Unit::Teaspoons), None);
        assert_eq!(Unit::Cans.convert(1.0, Unit::Bottles), None);
        assert_eq!(Unit::Cans.convert(2.0, Unit::Cans), Some(2.0));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Unit::Cups.label(1.0), "cup");
        assert_eq!(Unit::Cups.label(3.0), "cups");
        assert_eq!(Unit::Tablespoons.label(1.0), "tbsp");
        assert_eq!(Unit::Grams.to_string(), "g");
    }
}
