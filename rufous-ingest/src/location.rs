//! Place of purchase printed at the end of card descriptions.
//!
//!   TIM HORTONS #1234 TORONTO ON          → Toronto, Ontario, Canada
//!   CITIBIK*SUBSCRIPTION SAN FRANCISCOCA  → San Francisco, California, USA
//!   NETFLIX.COM AMSTERDAM NLD             → Netherlands
//!
//! Province codes are tried before state codes, so a bare `CA` is California
//! only because no province uses it. A region code glued onto the city
//! (`VANCOUVBC`) is accepted only for cities in [`GLUED_CITIES`].

const PROVINCES: [(&str, &str); 13] = [
    ("AB", "Alberta"),
    ("BC", "British Columbia"),
    ("MB", "Manitoba"),
    ("NB", "New Brunswick"),
    ("NL", "Newfoundland and Labrador"),
    ("NS", "Nova Scotia"),
    ("NT", "Northwest Territories"),
    ("NU", "Nunavut"),
    ("ON", "Ontario"),
    ("PE", "Prince Edward Island"),
    ("QC", "Quebec"),
    ("SK", "Saskatchewan"),
    ("YT", "Yukon"),
];

const STATES: [(&str, &str); 19] = [
    ("AZ", "Arizona"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("IL", "Illinois"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("NC", "North Carolina"),
    ("NJ", "New Jersey"),
    ("NV", "Nevada"),
    ("NY", "New York"),
    ("OH", "Ohio"),
    ("PA", "Pennsylvania"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
];

const COUNTRIES: [(&str, &str); 11] = [
    ("CAN", "Canada"),
    ("USA", "United States"),
    ("US", "United States"),
    ("UK", "United Kingdom"),
    ("GB", "United Kingdom"),
    ("FRA", "France"),
    ("DEU", "Germany"),
    ("NLD", "Netherlands"),
    ("ESP", "Spain"),
    ("ITA", "Italy"),
    ("AUS", "Australia"),
];

/// Truncated stem → city, for region codes printed without a space.
const GLUED_CITIES: [(&str, &str); 12] = [
    ("VANCOUV", "VANCOUVER"),
    ("TORONT", "TORONTO"),
    ("CALGAR", "CALGARY"),
    ("OTTAW", "OTTAWA"),
    ("MONTREA", "MONTREAL"),
    ("WINDSO", "WINDSOR"),
    ("EDMONT", "EDMONTON"),
    ("WINNIP", "WINNIPEG"),
    ("FRANCISC", "FRANCISCO"),
    ("ANGELE", "ANGELES"),
    ("SEATTL", "SEATTLE"),
    ("CHICAG", "CHICAGO"),
];

/// First words of two-word city names.
const CITY_PREFIXES: [&str; 16] = [
    "SAN", "SANTA", "LOS", "LAS", "NEW", "ST", "STE", "SAINT", "FORT", "PORT", "NORTH", "SOUTH",
    "EAST", "WEST", "MOUNT", "GRAND",
];

const NOT_CITIES: [&str; 5] = ["HTTP", "WWW", "COM", "NET", "ONLINE"];

enum Country {
    Canada,
    Usa,
}

impl Country {
    fn suffix(&self) -> &'static str {
        match self {
            Country::Canada => "Canada",
            Country::Usa => "USA",
        }
    }
}

fn lookup(table: &[(&str, &'static str)], code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

fn region(code: &str) -> Option<(&'static str, Country)> {
    lookup(&PROVINCES, code)
        .map(|r| (r, Country::Canada))
        .or_else(|| lookup(&STATES, code).map(|r| (r, Country::Usa)))
}

fn is_word(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphabetic())
}

fn unglue(stem: &str) -> Option<&'static str> {
    GLUED_CITIES
        .iter()
        .find(|(partial, full)| stem.starts_with(partial) && full.starts_with(stem))
        .map(|(_, full)| *full)
}

fn title_case(words: &[String]) -> String {
    words
        .iter()
        .map(|w| {
            let lower = w.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a trailing location off `description`.
///
/// Returns the location and the description without it, or `None` when no
/// location is recognized. At least one word of the description is always
/// left behind.
pub fn split_location(description: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = description.split_whitespace().collect();
    let (&last, before) = tokens.split_last()?;
    if before.is_empty() || !is_word(last) {
        return None;
    }
    let code = last.to_ascii_uppercase();

    // CITY XX, or CITYXX with a known city stem.
    let (mut city, mut rest) = match region(&code) {
        Some(_) => {
            let (&city, rest) = before.split_last()?;
            (city.to_ascii_uppercase(), rest)
        }
        None if code.len() > 4 => {
            let (stem, glued) = code.split_at(code.len() - 2);
            match (region(glued), unglue(stem)) {
                (Some(_), Some(full)) => (full.to_string(), before),
                _ => return country_only(&code, before),
            }
        }
        None => return country_only(&code, before),
    };
    let region_code = &code[code.len() - 2..];
    let (region_name, country) = region(region_code)?;

    if !is_word(&city) || city.len() < 3 || NOT_CITIES.contains(&city.as_str()) {
        return None;
    }
    let mut words = vec![city.clone()];
    if let Some((&prev, head)) = rest.split_last() {
        let prev = prev.to_ascii_uppercase();
        if CITY_PREFIXES.contains(&prev.as_str()) {
            words.insert(0, prev);
            rest = head;
        }
    }
    if rest.is_empty() {
        return None;
    }
    city = title_case(&words);

    Some((format!("{city}, {region_name}, {}", country.suffix()), rest.join(" ")))
}

fn country_only(code: &str, before: &[&str]) -> Option<(String, String)> {
    let name = lookup(&COUNTRIES, code)?;
    Some((name.to_string(), before.join(" ")))
}
