//! # Recipe Data Model
//!
//! Recipes as planned for a meal slot, and the effective recipe derived from a
//! base recipe by applying patch operations.
//!
//! ## Usage
//!
//! ```rust
//! use meal_patch::recipe::Recipe;
//!
//! let pasta = Recipe::new("pasta-01", "Pasta", 2.0)
//!     .with_ingredient("pasta", "200g")
//!     .with_ingredient("marinara", "2 cups")
//!     .with_step("Boil the pasta");
//!
//! assert_eq!(pasta.ingredients[0].to_string(), "200g pasta");
//! assert!(pasta.find_ingredient("MARINARA").is_some());
//! ```

use crate::grocery::StoreCategory;
use crate::quantity::{parse_quantity, Measure};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Where an ingredient line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOrigin {
    /// Present in the base recipe (possibly renamed or rescaled since)
    #[default]
    Base,
    /// Appended by an `AddIngredient` operation, no lineage to the base recipe
    Patch,
}

/// One ingredient line of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "IngredientLineRecord")]
pub struct IngredientLine {
    /// Canonical ingredient name (e.g., "olive oil")
    pub name: String,

    /// Raw quantity text as written (e.g., "2 tbsp", "200g", "to taste")
    pub quantity: String,

    /// Parsed amount and unit, when the quantity has a numeric token
    pub measure: Option<Measure>,

    #[serde(default)]
    pub origin: LineOrigin,

    /// Store category override supplied by an `AddIngredient` operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<StoreCategory>,
}

/// Stored form of an ingredient line; the measure is always re-derived from
/// the quantity text so hand-written recipe files need not carry it
#[derive(Deserialize)]
struct IngredientLineRecord {
    name: String,
    quantity: String,
    #[serde(default)]
    origin: LineOrigin,
    #[serde(default)]
    category: Option<StoreCategory>,
}

impl From<IngredientLineRecord> for IngredientLine {
    fn from(record: IngredientLineRecord) -> Self {
        let mut line = IngredientLine::new(&record.name, &record.quantity);
        line.origin = record.origin;
        line.category = record.category;
        line
    }
}

/// A recipe as stored in the recipe catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Stable recipe identity
    pub id: String,
    /// Human display name, also the provenance tag on grocery contributions
    pub name: String,
    pub ingredients: Vec<IngredientLine>,
    #[serde(default)]
    pub steps: Vec<String>,
    /// Number of servings the quantities are written for
    pub servings: f64,
}

impl IngredientLine {
    /// Create a base ingredient line, parsing its quantity
    pub fn new(name: &str, quantity: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            quantity: quantity.trim().to_string(),
            measure: parse_quantity(quantity).measure(),
            origin: LineOrigin::Base,
            category: None,
        }
    }

    /// Mark this line as appended by a patch
    pub fn added_by_patch(mut self) -> Self {
        self.origin = LineOrigin::Patch;
        self
    }

    /// Attach a store category override
    pub fn with_category(mut self, category: StoreCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Replace the quantity text and re-parse it
    pub fn set_quantity(&mut self, quantity: &str) {
        self.quantity = quantity.trim().to_string();
        self.measure = parse_quantity(quantity).measure();
    }

    /// Case-insensitive exact comparison against the line's current name
    pub fn is_named(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

impl Recipe {
    /// Create a recipe with no ingredients or steps
    pub fn new(id: &str, name: &str, servings: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ingredients: Vec::new(),
            steps: Vec::new(),
            servings,
        }
    }

    /// Append an ingredient line
    pub fn with_ingredient(mut self, name: &str, quantity: &str) -> Self {
        self.ingredients.push(IngredientLine::new(name, quantity));
        self
    }

    /// Append a preparation step
    pub fn with_step(mut self, step: &str) -> Self {
        self.steps.push(step.to_string());
        self
    }

    /// Index of the ingredient whose name matches case-insensitively
    pub fn find_ingredient(&self, name: &str) -> Option<usize> {
        self.ingredients.iter().position(|line| line.is_named(name))
    }

    /// Current ingredient names, in recipe order
    pub fn ingredient_names(&self) -> Vec<String> {
        self.ingredients.iter().map(|line| line.name.clone()).collect()
    }

    /// Content fingerprint identifying this exact snapshot
    ///
    /// Two recipes share a fingerprint only if identity, servings, every
    /// ingredient line and every step are identical.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.id.hash(&mut hasher);
        self.name.hash(&mut hasher);
        self.servings.to_bits().hash(&mut hasher);
        for line in &self.ingredients {
            line.name.hash(&mut hasher);
            line.quantity.hash(&mut hasher);
            line.origin.hash(&mut hasher);
        }
        self.steps.hash(&mut hasher);
        hasher.finish()
    }
}

/// Compare two ingredient names ignoring case and surrounding whitespace
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// A recipe after zero or more patch operations
///
/// Never edited in place: it is either the untouched base recipe or the output
/// of the patch applicator. Read access goes through `Deref<Target = Recipe>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectiveRecipe(Recipe);

impl EffectiveRecipe {
    /// The effective view of a recipe that has no stored modification
    pub fn unpatched(base: Recipe) -> Self {
        Self(base)
    }

    pub(crate) fn compiled(recipe: Recipe) -> Self {
        Self(recipe)
    }

    pub fn as_recipe(&self) -> &Recipe {
        &self.0
    }

    pub fn into_recipe(self) -> Recipe {
        self.0
    }
}

impl Deref for EffectiveRecipe {
    type Target = Recipe;

    fn deref(&self) -> &Recipe {
        &self.0
    }
}

impl fmt::Display for IngredientLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quantity.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.quantity, self.name)
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({} servings)",
            self.name,
            crate::quantity::format_amount(self.servings)
        )?;
        for line in &self.ingredients {
            writeln!(f, "  • {}", line)?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, step)?;
        }
        Ok(())
    }
}
