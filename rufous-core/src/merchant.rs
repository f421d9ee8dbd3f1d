//! Description normalization: the comparable form used for fingerprints,
//! the merchant name used for categorization, and transfer detection.

/// Tokens dropped from the front of a merchant name (payment processors).
const PROCESSOR_PREFIXES: &[&str] = &["SQ", "TST", "POS"];

/// Tokens dropped from the end of a merchant name.
const PROCESSOR_SUFFIXES: &[&str] = &[
    "POS",
    "PURCHASE",
    "INTERAC",
    "CONTACTLESS",
    "TAP",
    "DEBIT",
    "VISA",
    "ACH",
    "RECURRING",
];

/// Phrases (whole words) marking card payments and account transfers.
const TRANSFER_MARKERS: &[&str] = &[
    "PAYMENT",
    "PYMT",
    "AUTOPAY",
    "AUTOMATIC PAYMENT",
    "TRANSFER",
    "TRSF",
    "DIRECT DEBIT",
    "PREAUTH",
    "PRE AUTH",
    "E TRANSFER",
    "ETRANSFER",
    "FROM DE ACCT",
    "TO A ACCT",
];

/// Case-fold, replace punctuation with spaces and collapse whitespace.
///
/// Apostrophes are removed outright so `MCDONALD'S` and `MCDONALDS` agree.
pub fn normalize_description(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else if c == '\'' || c == '\u{2019}' {
            continue;
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-folded alphanumerics with everything else dropped.
///
/// `H-E-B #455`, `HEB 455` and `heb#455` all give `HEB455`. This is the
/// description's contribution to a fingerprint.
pub fn compact_description(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Merchant name derived from a raw description.
///
/// `STARBUCKS #1234` and `SQ *STARBUCKS 0042 POS` both become `STARBUCKS`.
pub fn merchant_name(description: &str) -> String {
    let normalized = normalize_description(description);
    let mut tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();

    while tokens.len() > 1 && PROCESSOR_PREFIXES.contains(&tokens[0]) {
        tokens.remove(0);
    }

    while tokens.len() > 1 {
        let Some(last) = tokens.last() else { break };
        if PROCESSOR_SUFFIXES.contains(last) || is_reference_number(last) {
            tokens.pop();
        } else {
            break;
        }
    }

    if tokens.is_empty() {
        normalized
    } else {
        tokens.join(" ")
    }
}

/// True when the description reads like a card payment or account transfer.
pub fn is_transfer(description: &str) -> bool {
    let padded = format!(" {} ", normalize_description(description));
    TRANSFER_MARKERS
        .iter()
        .any(|marker| padded.contains(&format!(" {marker} ")))
}

// Store numbers and reference ids: all digits, or digits with at most one
// leading letter (`X1234`).
fn is_reference_number(token: &str) -> bool {
    let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
    digits > 0 && token.len() - digits <= 1 && token.chars().last().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_case_and_punctuation() {
        assert_eq!(normalize_description("Starbucks  #1234"), "STARBUCKS 1234");
        assert_eq!(normalize_description("STARBUCKS #1234"), normalize_description("starbucks, #1234."));
        assert_eq!(normalize_description("McDonald's"), "MCDONALDS");
    }

    #[test]
    fn test_compact_drops_separators() {
        assert_eq!(compact_description("H-E-B #455"), "HEB455");
        assert_eq!(compact_description("heb 455"), "HEB455");
        assert_eq!(compact_description("***"), "");
    }

    #[test]
    fn test_merchant_drops_store_numbers_and_processors() {
        assert_eq!(merchant_name("STARBUCKS #1234"), "STARBUCKS");
        assert_eq!(merchant_name("SQ *BLUE BOTTLE COFFEE 0042"), "BLUE BOTTLE COFFEE");
        assert_eq!(merchant_name("UBER EATS POS PURCHASE"), "UBER EATS");
        assert_eq!(merchant_name("H-E-B #455"), "H E B");
    }

    #[test]
    fn test_merchant_never_empties() {
        assert_eq!(merchant_name("12345"), "12345");
        assert_eq!(merchant_name("POS"), "POS");
    }

    #[test]
    fn test_transfer_detection_uses_whole_words() {
        assert!(is_transfer("AUTOMATIC PYMT RECEIVED"));
        assert!(is_transfer("Interac e-Transfer to J SMITH"));
        assert!(is_transfer("ONLINE PAYMENT - THANK YOU"));
        assert!(!is_transfer("PAYMENTUS UTILITY"));
        assert!(!is_transfer("STARBUCKS #1234"));
    }
}
