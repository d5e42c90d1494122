//! The consolidated grocery list of one plan scope.

use crate::grocery::category::categorize;
use crate::grocery::item::{Contribution, ContributionSource, GroceryItem};
use crate::grocery::StoreCategory;
use crate::recipe::{names_match, EffectiveRecipe};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Grocery list for one plan scope
///
/// Items keep the order in which they were first needed. An item with no
/// contributions is removed from the list right away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryList {
    pub scope: String,
    items: Vec<GroceryItem>,
}

impl GroceryList {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[GroceryItem] {
        &self.items
    }

    /// Look up an item by name, ignoring case
    pub fn item(&self, name: &str) -> Option<&GroceryItem> {
        self.items.iter().find(|item| names_match(&item.name, name))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn item_mut_or_insert(&mut self, name: &str, category: StoreCategory) -> &mut GroceryItem {
        let position = match self.items.iter().position(|item| names_match(&item.name, name)) {
            Some(position) => position,
            None => {
                self.items.push(GroceryItem::new(name, category));
                self.items.len() - 1
            }
        };
        &mut self.items[position]
    }

    /// Add one contribution per ingredient line, tagged with the recipe name
    pub fn add_recipe_ingredients(&mut self, recipe: &EffectiveRecipe) {
        let source = ContributionSource::recipe(&recipe.name);
        for line in &recipe.ingredients {
            let category = line.category.unwrap_or_else(|| categorize(&line.name));
            let item = self.item_mut_or_insert(&line.name, category);
            item.add_contribution(Contribution::from_line(source.clone(), line));
        }
        debug!(
            "Added {} ingredient(s) of '{}' to grocery list '{}'",
            recipe.ingredients.len(),
            recipe.name,
            self.scope
        );
    }

    /// Remove every contribution of the named recipe; returns how many were
    /// removed
    pub fn remove_recipe_ingredients(&mut self, recipe_name: &str) -> usize {
        let source = ContributionSource::recipe(recipe_name);
        let removed = self.remove_source(&source, |_| true);
        debug!(
            "Removed {} contribution(s) of '{}' from grocery list '{}'",
            removed, recipe_name, self.scope
        );
        removed
    }

    /// Remove the contributions of every recipe, leaving only manual items
    pub fn clear_recipe_ingredients(&mut self) -> usize {
        let removed: usize = self
            .items
            .iter_mut()
            .map(GroceryItem::remove_recipe_contributions)
            .sum();
        self.items.retain(|item| !item.is_empty());
        debug!(
            "Cleared {} recipe contribution(s) from grocery list '{}'",
            removed, self.scope
        );
        removed
    }

    /// Replace one recipe's contributions with another's
    pub fn swap_recipe_ingredients(&mut self, old_recipe_name: &str, new_recipe: &EffectiveRecipe) {
        self.remove_recipe_ingredients(old_recipe_name);
        self.add_recipe_ingredients(new_recipe);
    }

    /// Add a hand-entered item; recipe removal never touches it
    pub fn add_manual_item(&mut self, name: &str, quantity: &str, category: Option<StoreCategory>) {
        let category = category.unwrap_or_else(|| categorize(name));
        let item = self.item_mut_or_insert(name, category);
        item.add_contribution(Contribution::new(ContributionSource::Manual, quantity));
        info!("Added manual item '{}' ({}) to '{}'", name, quantity, self.scope);
    }

    /// Remove the manual contributions of one item; returns whether any existed
    pub fn remove_manual_item(&mut self, name: &str) -> bool {
        let removed = self.remove_source(&ContributionSource::Manual, |item| {
            names_match(&item.name, name)
        });
        removed > 0
    }

    fn remove_source(
        &mut self,
        source: &ContributionSource,
        applies_to: impl Fn(&GroceryItem) -> bool,
    ) -> usize {
        let removed: usize = self
            .items
            .iter_mut()
            .filter(|item| applies_to(item))
            .map(|item| item.remove_contribution(source))
            .sum();
        self.items.retain(|item| !item.is_empty());
        removed
    }

    /// Items grouped by store category, in aisle order
    pub fn by_category(&self) -> BTreeMap<StoreCategory, Vec<&GroceryItem>> {
        let mut grouped: BTreeMap<StoreCategory, Vec<&GroceryItem>> = BTreeMap::new();
        for item in &self.items {
            grouped.entry(item.category).or_default().push(item);
        }
        grouped
    }
}

impl fmt::Display for GroceryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grocery list for {}", self.scope)?;
        if self.items.is_empty() {
            return writeln!(f, "  (empty)");
        }
        for (category, items) in self.by_category() {
            writeln!(f)?;
            writeln!(f, "{}:", category)?;
            for item in items {
                writeln!(f, "  • {}", item)?;
            }
        }
        Ok(())
    }
}
