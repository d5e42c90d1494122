//! Store categories and the keyword table used to place ingredients in them.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store section an ingredient is bought in, declared in aisle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreCategory {
    Produce,
    Bakery,
    MeatSeafood,
    Dairy,
    Frozen,
    Pantry,
    Spices,
    Beverages,
    #[default]
    Other,
}

impl StoreCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            StoreCategory::Produce => "Produce",
            StoreCategory::Bakery => "Bakery",
            StoreCategory::MeatSeafood => "Meat & Seafood",
            StoreCategory::Dairy => "Dairy & Eggs",
            StoreCategory::Frozen => "Frozen",
            StoreCategory::Pantry => "Pantry",
            StoreCategory::Spices => "Spices & Seasonings",
            StoreCategory::Beverages => "Beverages",
            StoreCategory::Other => "Other",
        }
    }
}

impl fmt::Display for StoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

lazy_static! {
    /// Keyword phrases per category. The longest phrase found in a name wins,
    /// so "peanut butter" lands in the pantry and "butter" in dairy.
    static ref CATEGORY_KEYWORDS: Vec<(&'static str, StoreCategory)> = {
        use StoreCategory::*;
        let mut table = Vec::new();
        let mut add = |category: StoreCategory, words: &[&'static str]| {
            table.extend(words.iter().map(|word| (*word, category)));
        };

        add(Produce, &[
            "tomato", "onion", "shallot", "garlic", "spinach", "lettuce", "kale", "arugula",
            "carrot", "potato", "celery", "cucumber", "zucchini", "broccoli", "cauliflower",
            "mushroom", "bell pepper", "red pepper", "green pepper", "jalapeno", "avocado",
            "lemon", "lime", "orange", "apple", "banana", "berry", "berries", "grape",
            "basil", "parsley", "cilantro", "mint", "dill", "ginger", "scallion", "leek",
            "cabbage", "corn", "squash", "eggplant",
        ]);
        add(Bakery, &[
            "bread", "baguette", "bun", "roll", "tortilla", "pita", "croissant", "bagel",
            "naan", "breadcrumbs",
        ]);
        add(MeatSeafood, &[
            "chicken", "beef", "pork", "bacon", "ham", "sausage", "turkey", "lamb", "veal",
            "ground beef", "steak", "salmon", "tuna", "cod", "shrimp", "prawn", "fish",
            "anchovy", "anchovies", "mussel", "clam", "scallop",
        ]);
        add(Dairy, &[
            "milk", "butter", "cheese", "cream", "yogurt", "yoghurt", "egg", "parmesan",
            "mozzarella", "cheddar", "feta", "ricotta", "sour cream", "cream cheese",
            "heavy cream", "creme fraiche",
        ]);
        add(Frozen, &[
            "frozen", "ice cream", "frozen peas", "frozen spinach", "puff pastry",
        ]);
        add(Pantry, &[
            "pasta", "spaghetti", "penne", "noodle", "rice", "quinoa", "couscous", "flour",
            "sugar", "brown sugar", "oil", "olive oil", "vegetable oil", "vinegar", "bean",
            "chickpea", "lentil", "oat", "honey", "maple syrup", "marinara", "pesto",
            "tomato paste", "tomato sauce", "canned tomatoes", "soy sauce", "broth", "stock",
            "chicken broth", "chicken stock", "vegetable broth", "peanut butter",
            "coconut milk", "mustard", "ketchup", "mayonnaise", "baking powder",
            "baking soda", "yeast", "chocolate", "nut", "almond", "walnut", "tahini",
        ]);
        add(Spices, &[
            "salt", "pepper", "black pepper", "cumin", "paprika", "cinnamon", "oregano",
            "thyme", "rosemary", "chili powder", "chili flakes", "red pepper flakes",
            "nutmeg", "turmeric", "curry powder", "garlic powder", "onion powder",
            "bay leaf", "bay leaves", "vanilla", "clove", "cardamom", "coriander",
        ]);
        add(Beverages, &[
            "water", "sparkling water", "juice", "orange juice", "coffee", "tea", "wine",
            "beer", "soda",
        ]);

        table
    };
}

/// Normalize a name to space-separated lowercase words with padding, so that
/// keyword checks only match whole words
fn padded_words(name: &str) -> String {
    let words: Vec<String> = name
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect();
    format!(" {} ", words.join(" "))
}

fn contains_phrase(padded: &str, phrase: &str) -> bool {
    padded.contains(&format!(" {} ", phrase))
        || padded.contains(&format!(" {}s ", phrase))
        || padded.contains(&format!(" {}es ", phrase))
}

/// Pick the store category for an ingredient name, `Other` when nothing matches
pub fn categorize(name: &str) -> StoreCategory {
    let padded = padded_words(name);
    CATEGORY_KEYWORDS
        .iter()
        .filter(|(phrase, _)| contains_phrase(&padded, phrase))
        .max_by_key(|(phrase, _)| phrase.len())
        .map(|(_, category)| *category)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_categories() {
        assert_eq!(categorize("spinach"), StoreCategory::Produce);
        assert_eq!(categorize("Chicken Thighs"), StoreCategory::MeatSeafood);
        assert_eq!(categorize("whole milk"), StoreCategory::Dairy);
        assert_eq!(categorize("pasta"), StoreCategory::Pantry);
        assert_eq!(categorize("sea salt"), StoreCategory::Spices);
        assert_eq!(categorize("sourdough bread"), StoreCategory::Bakery);
    }

    #[test]
    fn test_longest_phrase_wins() {
        assert_eq!(categorize("butter"), StoreCategory::Dairy);
        assert_eq!(categorize("peanut butter"), StoreCategory::Pantry);
        assert_eq!(categorize("garlic"), StoreCategory::Produce);
        assert_eq!(categorize("garlic powder"), StoreCategory::Spices);
        assert_eq!(categorize("red bell pepper"), StoreCategory::Produce);
        assert_eq!(categorize("olive oil"), StoreCategory::Pantry);
    }

    #[test]
    fn test_plural_and_whole_word_matching() {
        assert_eq!(categorize("tomatoes"), StoreCategory::Produce);
        assert_eq!(categorize("eggs"), StoreCategory::Dairy);
        // "eggplant" must not be read as "egg"
        assert_eq!(categorize("eggplant"), StoreCategory::Produce);
    }

    #[test]
    fn test_unknown_is_other() {
        assert_eq!(categorize("xanthan gum"), StoreCategory::Other);
        assert_eq!(categorize(""), StoreCategory::Other);
    }

    #[test]
    fn test_aisle_order() {
        let mut shuffled = vec![StoreCategory::Other, StoreCategory::Dairy, StoreCategory::Produce];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![StoreCategory::Produce, StoreCategory::Dairy, StoreCategory::Other]
        );
    }
}
