//! Deterministic keyword categorization.
//!
//! Categories are scanned in priority order and each category's keywords in
//! list order; the first keyword found in the merchant name wins. Keywords
//! are normalized once, with the same function used for merchant names, so
//! `McDonald's` in a config file still matches `MCDONALDS #4411`.

use rufous_core::{CategorySet, UNCATEGORIZED, merchant_name, normalize_description};
use serde::Serialize;

#[derive(Debug, Clone)]
struct Rule {
    label: String,
    subcategory: Option<String>,
    /// (normalized, as configured)
    keywords: Vec<(String, String)>,
}

/// Why a merchant landed in its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub merchant: String,
    pub category: String,
    pub subcategory: Option<String>,
    /// `None` when nothing matched and the merchant is uncategorized.
    pub keyword: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<Rule>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(&CategorySet::builtin())
    }
}

impl Categorizer {
    pub fn new(set: &CategorySet) -> Self {
        let rules = set
            .iter()
            .map(|c| Rule {
                label: c.label.clone(),
                subcategory: c.subcategory.clone(),
                keywords: c
                    .keywords
                    .iter()
                    .map(|k| (normalize_description(k), k.clone()))
                    .filter(|(normalized, _)| !normalized.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Category label for a raw description.
    pub fn categorize(&self, description: &str) -> &str {
        self.categorize_merchant(&merchant_name(description))
    }

    /// Category label for an already-derived merchant name.
    pub fn categorize_merchant(&self, merchant: &str) -> &str {
        self.find(merchant).map_or(UNCATEGORIZED, |(rule, _)| rule.label.as_str())
    }

    pub fn explain(&self, description: &str) -> Explanation {
        let merchant = merchant_name(description);
        match self.find(&merchant) {
            Some((rule, keyword)) => Explanation {
                category: rule.label.clone(),
                subcategory: rule.subcategory.clone(),
                keyword: Some(keyword.to_string()),
                merchant,
            },
            None => Explanation {
                category: UNCATEGORIZED.to_string(),
                subcategory: None,
                keyword: None,
                merchant,
            },
        }
    }

    fn find(&self, merchant: &str) -> Option<(&Rule, &str)> {
        let merchant = normalize_description(merchant);
        self.rules.iter().find_map(|rule| {
            rule.keywords
                .iter()
                .find(|(normalized, _)| merchant.contains(normalized.as_str()))
                .map(|(_, original)| (rule, original.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rufous_core::Category;

    #[rstest]
    #[case::coffee("STARBUCKS #1234", "Food & Dining")]
    #[case::processor_prefix("SQ *STARBUCKS 0042 POS", "Food & Dining")]
    #[case::apostrophe("MCDONALD'S #4411", "Food & Dining")]
    #[case::rideshare("UBER *TRIP HELP.UBER.COM", "Transportation")]
    #[case::card_payment("PAYMENT RECEIVED - THANK YOU", "Transfers")]
    #[case::pharmacy("SHOPPERS DRUG MART #812", "Health & Fitness")]
    #[case::unknown("ZZ UNKNOWN VENDOR 77", UNCATEGORIZED)]
    fn test_builtin_categories(#[case] description: &str, #[case] expected: &str) {
        assert_eq!(Categorizer::default().categorize(description), expected);
    }

    #[test]
    fn test_first_category_in_order_wins() {
        let set = CategorySet::new(vec![
            Category::new("Coffee", None, &["STARBUCKS"]),
            Category::new("Food", None, &["STARBUCKS", "BURRITO"]),
        ]);
        let c = Categorizer::new(&set);
        for _ in 0..10 {
            assert_eq!(c.categorize("Starbucks #1234"), "Coffee");
        }
    }

    #[test]
    fn test_configured_keywords_are_normalized() {
        let set = CategorySet::new(vec![Category::new("Fast Food", None, &["McDonald's", "  "])]);
        let c = Categorizer::new(&set);
        assert_eq!(c.categorize("MCDONALDS #4411 TORONTO"), "Fast Food");
    }

    #[test]
    fn test_explain_names_keyword() {
        let c = Categorizer::default();
        let why = c.explain("TIM HORTONS #1234 TORONTO ON");
        assert_eq!(why.category, "Food & Dining");
        assert_eq!(why.subcategory.as_deref(), Some("Restaurants"));
        assert_eq!(why.keyword.as_deref(), Some("TIM HORTONS"));

        let none = c.explain("ZZ UNKNOWN VENDOR");
        assert_eq!(none.category, UNCATEGORIZED);
        assert!(none.keyword.is_none());
    }
}
