//! Basket domain model.
//!
//! The basket is pure state plus invariant-preserving mutations; persistence
//! and payment-provider synchronization live in the storefront's
//! reconciliation service. Invariants held here:
//!
//! - line items never carry a quantity of zero or less,
//! - the payment intent id and client secret are set together or not at all
//!   (they live in one `Option<PaymentIntentRef>`),
//! - once set, the intent reference is never overwritten.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{BasketToken, Money, ProductId};

/// A discount attached to a basket, resolved from a promo code.
///
/// Immutable once resolved. A basket holds at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Provider-side coupon id.
    pub id: String,
    /// The promo code the shopper typed.
    pub code: String,
    /// Human-readable coupon name.
    pub name: String,
    /// Flat discount in minor units.
    pub amount_off: Option<Money>,
    /// Percentage discount (0–100).
    pub percent_off: Option<Decimal>,
}

impl Coupon {
    /// Discount this coupon grants on `subtotal`.
    ///
    /// Policy: when a coupon carries both terms, the flat amount wins and the
    /// percentage is ignored. A flat discount larger than the subtotal is
    /// clamped by the caller via [`Money::saturating_sub`].
    #[must_use]
    pub fn discount(&self, subtotal: Money) -> Money {
        if let Some(amount) = self.amount_off {
            amount
        } else if let Some(percent) = self.percent_off {
            subtotal.percent_of(percent)
        } else {
            Money::ZERO
        }
    }
}

/// The basket's cached reference to an external payment intent.
///
/// The id and client secret are issued together by the payment provider and
/// are meaningless apart, so they travel as one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentRef {
    pub id: String,
    pub client_secret: String,
}

/// One line in a basket: a product snapshot and a positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketItem {
    product: Product,
    quantity: u32,
}

impl BasketItem {
    /// Build a line item. `quantity` must be positive; the store only
    /// rehydrates rows that satisfy its own positive-quantity constraint.
    #[must_use]
    pub const fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }

    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Line total: unit price times quantity.
    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}

/// A shopper's basket.
///
/// Identified solely by an opaque token; no account link is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    token: BasketToken,
    items: Vec<BasketItem>,
    coupon: Option<Coupon>,
    intent: Option<PaymentIntentRef>,
}

impl Basket {
    /// Create an empty basket for a freshly minted token.
    #[must_use]
    pub const fn new(token: BasketToken) -> Self {
        Self {
            token,
            items: Vec::new(),
            coupon: None,
            intent: None,
        }
    }

    /// Rehydrate a basket from stored state.
    #[must_use]
    pub const fn from_parts(
        token: BasketToken,
        items: Vec<BasketItem>,
        coupon: Option<Coupon>,
        intent: Option<PaymentIntentRef>,
    ) -> Self {
        Self {
            token,
            items,
            coupon,
            intent,
        }
    }

    #[must_use]
    pub const fn token(&self) -> &BasketToken {
        &self.token
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[BasketItem] {
        &self.items
    }

    #[must_use]
    pub const fn coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    #[must_use]
    pub const fn intent(&self) -> Option<&PaymentIntentRef> {
        self.intent.as_ref()
    }

    #[must_use]
    pub fn payment_intent_id(&self) -> Option<&str> {
        self.intent.as_ref().map(|i| i.id.as_str())
    }

    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.intent.as_ref().map(|i| i.client_secret.as_str())
    }

    /// Whether checkout has been initiated (a live client secret exists).
    /// Coupons may only be applied after this point.
    #[must_use]
    pub const fn checkout_started(&self) -> bool {
        self.intent.is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `quantity` of `product`, merging with an existing line for the
    /// same product id. `quantity` must be positive (validated upstream).
    pub fn add_item(&mut self, product: Product, quantity: u32) {
        if let Some(item) = self.item_mut(product.id) {
            item.quantity += quantity;
        } else {
            self.items.push(BasketItem::new(product, quantity));
        }
    }

    /// Remove `quantity` of a product. Idempotent: an absent product is a
    /// no-op, and removing more than present just drops the line.
    pub fn remove_item(&mut self, product_id: ProductId, quantity: u32) {
        if let Some(item) = self.item_mut(product_id) {
            item.quantity = item.quantity.saturating_sub(quantity);
        }
        self.items.retain(|item| item.quantity > 0);
    }

    /// Attach a coupon, replacing any existing one. Pure assignment; the
    /// reconciliation service enforces the checkout precondition.
    pub fn attach_coupon(&mut self, coupon: Coupon) {
        self.coupon = Some(coupon);
    }

    /// Detach the coupon, returning it if one was attached.
    pub fn detach_coupon(&mut self) -> Option<Coupon> {
        self.coupon.take()
    }

    /// Sum of line totals, before any discount.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(BasketItem::line_total).sum()
    }

    /// Chargeable total: subtotal less the coupon discount, floored at zero.
    #[must_use]
    pub fn total(&self) -> Money {
        let subtotal = self.subtotal();
        match &self.coupon {
            Some(coupon) => subtotal.saturating_sub(coupon.discount(subtotal)),
            None => subtotal,
        }
    }

    /// Cache the intent reference, but only if none is set yet.
    ///
    /// Returns `true` when the reference was assigned. Once a basket has a
    /// live intent the same intent is reused for its whole lifecycle; callers
    /// that receive `false` must keep the existing id and secret.
    pub fn set_intent_if_absent(&mut self, intent: PaymentIntentRef) -> bool {
        if self.intent.is_some() {
            return false;
        }
        self.intent = Some(intent);
        true
    }

    fn item_mut(&mut self, product_id: ProductId) -> Option<&mut BasketItem> {
        self.items.iter_mut().find(|i| i.product.id == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_product;

    fn basket() -> Basket {
        Basket::new(BasketToken::generate())
    }

    fn intent_ref(id: &str) -> PaymentIntentRef {
        PaymentIntentRef {
            id: id.to_owned(),
            client_secret: format!("{id}_secret"),
        }
    }

    #[test]
    fn add_item_merges_quantities_by_product() {
        let mut basket = basket();
        basket.add_item(test_product(7, 1000), 2);
        basket.add_item(test_product(7, 1000), 3);

        assert_eq!(basket.items().len(), 1);
        assert_eq!(basket.items()[0].quantity(), 5);
    }

    #[test]
    fn items_keep_insertion_order() {
        let mut basket = basket();
        basket.add_item(test_product(3, 100), 1);
        basket.add_item(test_product(1, 100), 1);
        basket.add_item(test_product(2, 100), 1);

        let ids: Vec<i32> = basket
            .items()
            .iter()
            .map(|i| i.product().id.as_i32())
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn remove_item_decrements_and_drops_empty_lines() {
        let mut basket = basket();
        basket.add_item(test_product(7, 1000), 3);

        basket.remove_item(ProductId::new(7), 2);
        assert_eq!(basket.items()[0].quantity(), 1);

        basket.remove_item(ProductId::new(7), 1);
        assert!(basket.is_empty());
    }

    #[test]
    fn remove_item_is_idempotent() {
        let mut basket = basket();
        // Absent product: no-op.
        basket.remove_item(ProductId::new(9), 5);
        assert!(basket.is_empty());

        // Removing more than present clamps to removal.
        basket.add_item(test_product(7, 1000), 2);
        basket.remove_item(ProductId::new(7), 10);
        assert!(basket.is_empty());
    }

    #[test]
    fn quantities_never_drop_to_zero_or_below() {
        let mut basket = basket();
        basket.add_item(test_product(1, 100), 1);
        basket.add_item(test_product(2, 100), 4);
        basket.remove_item(ProductId::new(1), 1);
        basket.remove_item(ProductId::new(2), 2);
        basket.remove_item(ProductId::new(2), 99);
        basket.add_item(test_product(3, 100), 2);
        basket.remove_item(ProductId::new(3), 1);

        assert!(basket.items().iter().all(|item| item.quantity() > 0));
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let mut basket = basket();
        basket.add_item(test_product(7, 1000), 2);
        basket.add_item(test_product(8, 250), 1);

        assert_eq!(basket.subtotal(), Money::from_cents(2250));
        assert_eq!(basket.total(), basket.subtotal());
    }

    #[test]
    fn amount_off_coupon_reduces_total() {
        let mut basket = basket();
        basket.add_item(test_product(7, 1000), 2);
        basket.attach_coupon(Coupon {
            id: "co_1".to_owned(),
            code: "SAVE5".to_owned(),
            name: "$5 off".to_owned(),
            amount_off: Some(Money::from_cents(500)),
            percent_off: None,
        });

        assert_eq!(basket.total(), Money::from_cents(1500));
    }

    #[test]
    fn percent_off_coupon_reduces_total() {
        let mut basket = basket();
        basket.add_item(test_product(7, 1000), 2);
        basket.attach_coupon(Coupon {
            id: "co_2".to_owned(),
            code: "TENOFF".to_owned(),
            name: "10% off".to_owned(),
            amount_off: None,
            percent_off: Some(Decimal::from(10)),
        });

        assert_eq!(basket.total(), Money::from_cents(1800));
    }

    #[test]
    fn amount_off_takes_precedence_over_percent_off() {
        let mut basket = basket();
        basket.add_item(test_product(7, 1000), 2);
        basket.attach_coupon(Coupon {
            id: "co_3".to_owned(),
            code: "BOTH".to_owned(),
            name: "both terms".to_owned(),
            amount_off: Some(Money::from_cents(500)),
            percent_off: Some(Decimal::from(50)),
        });

        assert_eq!(basket.total(), Money::from_cents(1500));
    }

    #[test]
    fn total_floors_at_zero_when_discount_exceeds_subtotal() {
        let mut basket = basket();
        basket.add_item(test_product(7, 300), 1);
        basket.attach_coupon(Coupon {
            id: "co_4".to_owned(),
            code: "BIG".to_owned(),
            name: "$5 off".to_owned(),
            amount_off: Some(Money::from_cents(500)),
            percent_off: None,
        });

        assert_eq!(basket.total(), Money::ZERO);
    }

    #[test]
    fn detach_coupon_returns_previous_coupon() {
        let mut basket = basket();
        assert!(basket.detach_coupon().is_none());

        basket.attach_coupon(Coupon {
            id: "co_5".to_owned(),
            code: "SAVE5".to_owned(),
            name: "$5 off".to_owned(),
            amount_off: Some(Money::from_cents(500)),
            percent_off: None,
        });
        let detached = basket.detach_coupon();
        assert_eq!(detached.map(|c| c.code), Some("SAVE5".to_owned()));
        assert!(basket.coupon().is_none());
    }

    #[test]
    fn intent_ref_is_assigned_at_most_once() {
        let mut basket = basket();
        assert!(!basket.checkout_started());

        assert!(basket.set_intent_if_absent(intent_ref("pi_1")));
        assert!(basket.checkout_started());

        // A second assignment must not overwrite the live intent.
        assert!(!basket.set_intent_if_absent(intent_ref("pi_2")));
        assert_eq!(basket.payment_intent_id(), Some("pi_1"));
        assert_eq!(basket.client_secret(), Some("pi_1_secret"));
    }
}
