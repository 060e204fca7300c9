use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{order, order_item, payment},
    errors::ServiceError,
    money::{Currency, Money},
    services::orders::{fetch_items, load_owned_order},
    services::payments::fetch_payments,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Derived billing snapshot for one order.
///
/// Never stored: recomputed from the ledgers on every read, so a payment
/// recorded concurrently with a read is guaranteed to appear in the next
/// read rather than lingering in a stale cached value.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Totals {
    pub currency: String,
    /// Sum of line totals, exact.
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    /// subtotal + tax + shipping - discount. May be negative; callers decide
    /// how to present that.
    pub computed_total: Decimal,
    /// Sum of ledger entries as signed contributions.
    pub paid_total: Decimal,
    /// computed_total - paid_total. Negative means overpayment.
    pub balance: Decimal,
}

impl Totals {
    /// The computed total as shown to people: rounded to 2 digits half-to-even
    /// and floored at zero. The floor exists only here; the arithmetic fields
    /// always carry the true value.
    pub fn display_total(&self) -> Decimal {
        self.computed_total
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
            .max(Decimal::ZERO)
    }
}

/// Computes the totals snapshot from already-loaded parts.
///
/// Intermediate sums are exact; nothing rounds until presentation.
pub(crate) fn totals_from_parts(
    order: &order::Model,
    items: &[order_item::Model],
    payments: &[payment::Model],
) -> Result<Totals, ServiceError> {
    let currency = Currency::new(&order.currency).map_err(|_| {
        ServiceError::InternalError(format!("Order {} has a malformed currency", order.id))
    })?;

    let mut subtotal = Money::zero(currency);
    for item in items {
        subtotal = subtotal.checked_add(Money::new(item.line_total(), currency))?;
    }

    let tax = Money::new(order.tax_total, currency);
    let discount = Money::new(order.discount_total, currency);
    let shipping = Money::new(order.shipping_total, currency);

    let computed_total = subtotal
        .checked_add(tax)?
        .checked_add(shipping)?
        .checked_sub(discount)?;

    let mut paid_total = Money::zero(currency);
    for entry in payments {
        paid_total = paid_total.checked_add(Money::new(Decimal::from(entry.amount), currency))?;
    }

    let balance = computed_total.checked_sub(paid_total)?;

    Ok(Totals {
        currency: currency.as_str().to_string(),
        subtotal: subtotal.amount(),
        tax_total: tax.amount(),
        discount_total: discount.amount(),
        shipping_total: shipping.amount(),
        computed_total: computed_total.amount(),
        paid_total: paid_total.amount(),
        balance: balance.amount(),
    })
}

/// Read-side aggregator combining the item ledger, the payment ledger and the
/// order's billing adjustments into one consistent snapshot.
#[derive(Clone)]
pub struct TotalsService {
    db: Arc<DbPool>,
}

impl TotalsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Computes the current totals for one of the caller's orders.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn compute_totals(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
    ) -> Result<Totals, ServiceError> {
        let order = load_owned_order(&self.db, caller, order_id).await?;
        compute_for_order(&self.db, &order).await
    }
}

/// Aggregation entry point shared with the public tracking view.
pub(crate) async fn compute_for_order(
    db: &DbPool,
    order: &order::Model,
) -> Result<Totals, ServiceError> {
    let items = fetch_items(db, order.id).await?;
    let payments = fetch_payments(db, order.id).await?;
    totals_from_parts(order, &items, &payments)
}
