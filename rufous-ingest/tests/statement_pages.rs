use chrono::NaiveDate;
use rufous_core::AccountType;
use rufous_ingest::{StatementParser, layout_by_name, partition, split_pages};
use rust_decimal::Decimal;
use std::convert::Infallible;

const STATEMENT: &str = "\
Your statement\nAccount 0000 1234\n\x0c\
Date        Description                        Amount\n\
2024-03-05  STARBUCKS #1234                    -5.75\n\
2024-03-06  AMAZON MKTPLACE PMTS\n\
            AMZN.COM/BILL WA                  -23.10\n\
Page 2 of 3\n\x0c\
2024-03-06  AMAZON MKTPLACE PMTS\n\
            AMZN.COM/BILL WA                  -23.10\n\
2024-03-07  PAYROLL ACME INC                1,250.00\n\
2024-03-08  CORRECTION                          0.00\n\x0c";

#[test]
fn test_multi_page_statement_with_overlap() {
    let layout = layout_by_name("generic").unwrap();
    let parser = StatementParser::new(layout).unwrap();
    let pages = split_pages(STATEMENT);
    assert_eq!(pages.len(), 3);

    let parsed = parser.parse(&pages, AccountType::Debit, None);
    assert_eq!(parsed.warnings.len(), 1, "cover page has no rows");
    assert!(parsed.failures.is_empty(), "{:?}", parsed.failures);
    assert_eq!(parsed.zero_amount, 1);
    assert_eq!(parsed.transactions.len(), 4);

    let split = partition(parsed.transactions, AccountType::Debit, |_| Ok::<_, Infallible>(false)).unwrap();
    assert_eq!(split.fresh.len(), 3);
    assert_eq!(split.duplicates.len(), 1);
    assert_eq!(split.duplicates[0].draft.description, "AMAZON MKTPLACE PMTS AMZN.COM/BILL WA");

    let total: Decimal = split.fresh.iter().map(|d| d.draft.amount).sum();
    assert_eq!(total, Decimal::new(122115, 2));
    assert_eq!(split.fresh[2].draft.date, NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
}
