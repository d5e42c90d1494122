//! Grocery items and the per-source contributions that make up their quantity.
//!
//! An item's display quantity is never edited directly. It is recomputed from
//! the full contribution list after every change, so removing a recipe is
//! always exact and never relies on subtraction.

use crate::grocery::StoreCategory;
use crate::quantity::{format_amount, parse_quantity};
use crate::recipe::IngredientLine;
use crate::unit::{Unit, UnitFamily};
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who asked for a contribution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionSource {
    /// A recipe in the plan, identified by its display name
    Recipe(String),
    /// Added by hand; never touched by recipe removal
    Manual,
}

impl ContributionSource {
    pub fn recipe(name: &str) -> Self {
        ContributionSource::Recipe(name.to_string())
    }
}

impl fmt::Display for ContributionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributionSource::Recipe(name) => f.write_str(name),
            ContributionSource::Manual => f.write_str("manual"),
        }
    }
}

/// One source's share of a grocery item
///
/// Amount, unit and note are always derived from the display text, including
/// when a stored contribution is read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ContributionRecord")]
pub struct Contribution {
    pub source: ContributionSource,
    pub amount: Option<f64>,
    pub unit: Option<Unit>,
    /// Text left over once amount and unit are read
    pub note: String,
    /// Quantity text as written by the source
    pub display: String,
}

#[derive(Deserialize)]
struct ContributionRecord {
    source: ContributionSource,
    display: String,
}

impl From<ContributionRecord> for Contribution {
    fn from(record: ContributionRecord) -> Self {
        Contribution::new(record.source, &record.display)
    }
}

impl Contribution {
    /// Parse a raw quantity into a contribution
    pub fn new(source: ContributionSource, quantity: &str) -> Self {
        let parsed = parse_quantity(quantity);
        Self {
            source,
            amount: parsed.amount,
            unit: parsed.unit,
            note: parsed.note,
            display: quantity.trim().to_string(),
        }
    }

    /// Contribution of one recipe ingredient line
    pub fn from_line(source: ContributionSource, line: &IngredientLine) -> Self {
        Self::new(source, &line.quantity)
    }

    /// Whether the amount can be summed without losing any of the text; a
    /// bare number followed by unrecognised words cannot
    fn is_summable(&self) -> bool {
        self.amount.is_some() && (self.unit.is_some() || self.note.is_empty())
    }
}

/// Consolidated entry of a grocery list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GroceryItemRecord")]
pub struct GroceryItem {
    pub name: String,
    pub category: StoreCategory,
    contributions: Vec<Contribution>,
    display_quantity: String,
}

/// Stored form of an item; the display quantity is recomputed on load
#[derive(Deserialize)]
struct GroceryItemRecord {
    name: String,
    category: StoreCategory,
    #[serde(default)]
    contributions: Vec<Contribution>,
}

impl From<GroceryItemRecord> for GroceryItem {
    fn from(record: GroceryItemRecord) -> Self {
        let mut item = GroceryItem::new(&record.name, record.category);
        item.contributions = record.contributions;
        item.recompute();
        item
    }
}

/// Contributions that can be summed together
#[derive(Debug, Clone, Copy, PartialEq)]
enum MergeKey {
    /// Convertible units of one family
    Family(UnitFamily),
    /// A unit without conversions, or a bare count
    Exact(Option<Unit>),
}

struct MergeGroup {
    key: MergeKey,
    /// Display unit, fixed by the first contribution of the group
    unit: Option<Unit>,
    total: f64,
}

impl MergeGroup {
    fn render(&self) -> String {
        match self.unit {
            Some(unit) => format!("{} {}", format_amount(self.total), unit.label(self.total)),
            None => format_amount(self.total),
        }
    }
}

fn merge_key(unit: Option<Unit>) -> MergeKey {
    match unit.and_then(|u| u.conversion()) {
        Some((family, _)) => MergeKey::Family(family),
        None => MergeKey::Exact(unit),
    }
}

impl GroceryItem {
    pub fn new(name: &str, category: StoreCategory) -> Self {
        Self {
            name: name.trim().to_string(),
            category,
            contributions: Vec::new(),
            display_quantity: String::new(),
        }
    }

    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    pub fn display_quantity(&self) -> &str {
        &self.display_quantity
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    pub fn has_source(&self, source: &ContributionSource) -> bool {
        self.contributions.iter().any(|c| &c.source == source)
    }

    /// Append a contribution and recompute the display quantity
    pub fn add_contribution(&mut self, contribution: Contribution) {
        self.contributions.push(contribution);
        self.recompute();
    }

    /// Drop every contribution from `source` and recompute; returns how many
    /// were removed
    pub fn remove_contribution(&mut self, source: &ContributionSource) -> usize {
        let before = self.contributions.len();
        self.contributions.retain(|c| &c.source != source);
        let removed = before - self.contributions.len();
        if removed > 0 {
            self.recompute();
        }
        removed
    }

    /// Drop every recipe contribution, keeping manual ones
    pub fn remove_recipe_contributions(&mut self) -> usize {
        let before = self.contributions.len();
        self.contributions
            .retain(|c| c.source == ContributionSource::Manual);
        let removed = before - self.contributions.len();
        if removed > 0 {
            self.recompute();
        }
        removed
    }

    fn recompute(&mut self) {
        self.display_quantity = consolidate_display(&self.contributions);
        trace!(
            "Recomputed '{}' from {} contribution(s): '{}'",
            self.name,
            self.contributions.len(),
            self.display_quantity
        );
    }
}

/// Sum compatible contributions; incompatible groups, amounts that cannot be
/// summed and text-only quantities follow the first group as parenthetical
/// segments
fn consolidate_display(contributions: &[Contribution]) -> String {
    let mut groups: Vec<MergeGroup> = Vec::new();
    let mut unsummed: Vec<&str> = Vec::new();
    let mut texts: Vec<&str> = Vec::new();

    for contribution in contributions {
        let Some(amount) = contribution.amount else {
            let text = contribution.display.trim();
            if !text.is_empty() && !texts.contains(&text) {
                texts.push(text);
            }
            continue;
        };
        if !contribution.is_summable() {
            unsummed.push(contribution.display.trim());
            continue;
        }

        let key = merge_key(contribution.unit);
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => {
                let converted = match (contribution.unit, group.unit) {
                    (Some(from), Some(to)) => from.convert(amount, to).unwrap_or(amount),
                    _ => amount,
                };
                group.total += converted;
            }
            None => groups.push(MergeGroup {
                key,
                unit: contribution.unit,
                total: amount,
            }),
        }
    }

    let mut segments = groups
        .iter()
        .map(MergeGroup::render)
        .chain(unsummed.iter().map(|t| t.to_string()))
        .chain(texts.iter().map(|t| t.to_string()));

    let Some(first) = segments.next() else {
        return String::new();
    };
    segments.fold(first, |display, segment| format!("{} ({})", display, segment))
}

impl fmt::Display for GroceryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_quantity.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.display_quantity)
        }
    }
}
