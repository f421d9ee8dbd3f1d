//! Category reference data: labels with ordered keyword lists.
//!
//! Categories are plain data. Matching lives in `rufous-finance`'s
//! categorizer; this module only defines the set and its fixed order.

use serde::{Deserialize, Serialize};

/// Label given to transactions no keyword matches.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Substrings matched against the normalized merchant, in order.
    pub keywords: Vec<String>,
}

impl Category {
    pub fn new(label: &str, subcategory: Option<&str>, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            subcategory: subcategory.map(str::to_string),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Ordered category set. Earlier categories take priority.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet {
    categories: Vec<Category>,
}

impl CategorySet {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Distinct labels in priority order, followed by `Uncategorized`.
    pub fn labels(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for c in &self.categories {
            if !out.contains(&c.label.as_str()) {
                out.push(&c.label);
            }
        }
        if !out.contains(&UNCATEGORIZED) {
            out.push(UNCATEGORIZED);
        }
        out
    }

    /// Canonical spelling of a label, matched case-insensitively.
    pub fn canonical_label(&self, label: &str) -> Option<&str> {
        let wanted = label.trim();
        self.labels()
            .into_iter()
            .find(|l| l.eq_ignore_ascii_case(wanted))
    }

    /// Built-in rules, highest priority first.
    pub fn builtin() -> Self {
        Self::new(vec![
            // Card payments and account moves outrank any merchant keyword
            Category::new(
                "Transfers",
                Some("Payment"),
                &["PAYMENT", "PYMT", "AUTOPAY", "TRANSFER", "TRSF"],
            ),
            Category::new(
                "Food & Dining",
                Some("Fast Food"),
                &[
                    "MCDONALDS",
                    "SUBWAY",
                    "BURGER KING",
                    "KFC",
                    "TACO BELL",
                    "WENDYS",
                    "DAIRY QUEEN",
                    "POPEYES",
                    "MUCHO BURRITO",
                ],
            ),
            Category::new("Transportation", Some("Rideshare"), &["UBER", "LYFT"]),
            Category::new(
                "Transportation",
                Some("Public Transit"),
                &["TRANSIT", "PRESTO", "COMPASS", "MTA", "CLIPPER"],
            ),
            Category::new(
                "Transportation",
                Some("Airlines"),
                &["AIR CANADA", "WESTJET", "UNITED", "DELTA", "AMERICAN AIR", "AIRLINE", "AIRWAYS"],
            ),
            Category::new("Shopping", Some("Online"), &["AMAZON", "AMZN", "PAYPAL", "EBAY"]),
            Category::new(
                "Shopping",
                Some("Clothing"),
                &["LULULEMON", "H M", "ZARA", "OLD NAVY", "UNIQLO", "WINNERS", "MARSHALLS", "NORDSTROM"],
            ),
            Category::new(
                "Entertainment",
                Some("Streaming"),
                &["NETFLIX", "SPOTIFY", "APPLE MUSIC", "DISNEY", "PRIME VIDEO"],
            ),
            Category::new(
                "Health & Fitness",
                Some("Pharmacy"),
                &["SHOPPERS DRUG", "PHARMACY", "CVS", "WALGREENS"],
            ),
            Category::new("Health & Fitness", Some("Gym"), &["GYM", "FITNESS", "YOGA", "GOODLIFE"]),
            Category::new(
                "Bills & Utilities",
                Some("Phone"),
                &["ROGERS", "BELL", "TELUS", "FIDO", "KOODO"],
            ),
            Category::new(
                "Food & Dining",
                Some("Restaurants"),
                &[
                    "RESTAURANT",
                    "BISTRO",
                    "CAFE",
                    "DINER",
                    "EATERY",
                    "GRILL",
                    "PUB",
                    "PIZZA",
                    "SUSHI",
                    "COFFEE",
                    "STARBUCKS",
                    "TIM HORTONS",
                ],
            ),
            Category::new(
                "Food & Dining",
                Some("Groceries"),
                &[
                    "SUPERMARKET",
                    "GROCERY",
                    "SAFEWAY",
                    "LOBLAWS",
                    "FOOD BASICS",
                    "COSTCO",
                    "SAVE ON FOODS",
                ],
            ),
            Category::new(
                "Transportation",
                Some("Gas"),
                &["PETRO", "SHELL", "ESSO", "CHEVRON", "EXXON", "FUEL"],
            ),
            Category::new(
                "Shopping",
                Some("Retail"),
                &["WALMART", "TARGET", "CANADIAN TIRE", "HOME DEPOT", "BEST BUY", "DOLLARAMA"],
            ),
            Category::new(
                "Entertainment",
                Some("Events"),
                &["TICKETMASTER", "STUBHUB", "CONCERT", "THEATRE"],
            ),
        ])
    }
}
