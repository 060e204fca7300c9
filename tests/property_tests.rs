//! Property tests for the money arithmetic the ledgers are built on.

use atelier_api::money::{Currency, Money};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn usd() -> Currency {
    Currency::new("USD").expect("valid code")
}

proptest! {
    /// The subtotal is the exact sum of line totals no matter the order the
    /// items were added in.
    #[test]
    fn subtotal_is_addition_order_independent(
        lines in prop::collection::vec((1i64..100, 0i64..100_000), 0..20)
    ) {
        let currency = usd();
        let line_totals: Vec<Money> = lines
            .iter()
            .map(|(quantity, cents)| Money::new(Decimal::new(*cents, 2), currency).times(*quantity))
            .collect();

        let forward = line_totals
            .iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(*m))
            .unwrap();
        let backward = line_totals
            .iter()
            .rev()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(*m))
            .unwrap();

        prop_assert_eq!(forward.amount(), backward.amount());
    }

    /// balance = computed_total - paid_total holds for any ledger content,
    /// including negative (reversal) entries.
    #[test]
    fn balance_identity_holds_for_signed_ledgers(
        computed_cents in -1_000_000i64..1_000_000,
        payments in prop::collection::vec(-10_000i64..10_000, 0..20)
    ) {
        let currency = usd();
        let computed = Money::new(Decimal::new(computed_cents, 2), currency);

        let paid = payments
            .iter()
            .try_fold(Money::zero(currency), |acc, units| {
                acc.checked_add(Money::new(Decimal::from(*units), currency))
            })
            .unwrap();

        let balance = computed.checked_sub(paid).unwrap();
        prop_assert_eq!(balance.amount(), computed.amount() - paid.amount());
    }

    /// No sequence of operations can mix currencies into one sum.
    #[test]
    fn cross_currency_sums_never_succeed(cents in 0i64..100_000) {
        let a = Money::new(Decimal::new(cents, 2), usd());
        let b = Money::new(Decimal::new(cents, 2), Currency::new("EUR").unwrap());
        prop_assert!(a.checked_add(b).is_err());
        prop_assert!(a.checked_sub(b).is_err());
    }
}
