//! Basket reconciliation service.
//!
//! Orchestrates the pure basket domain model with its three external
//! collaborators: the basket store, the product catalog, and the payment
//! provider. Every operation is one load-mutate-save unit of work; the
//! provider call, where one is needed, is awaited before anything persists,
//! so a failed call never leaves a partially-updated basket behind.
//!
//! Price-affecting mutations (coupon attach/detach) re-synchronize the cached
//! payment intent before saving: a stale intent amount would charge the
//! shopper the wrong total. The intent id and client secret are assigned
//! exactly once per basket; after that, the same intent is only ever
//! re-priced.

use std::sync::Arc;

use tidepool_core::{Basket, BasketToken, PaymentIntentRef, ProductId};

use crate::db::{BasketStore, ProductCatalog};
use crate::error::{AppError, Result};
use crate::services::discounts::CouponResolver;
use crate::services::payments::PaymentGateway;

const COUPON_NEEDS_CHECKOUT: &str =
    "Unable to apply coupon: checkout has not started for this basket.";
const NO_COUPON_TO_REMOVE: &str = "Unable to remove coupon: none is attached to this basket.";

/// Result of the basket-ensuring load step.
///
/// `Created` means a fresh token was minted this request and the caller must
/// transmit it back to the client; the service itself never touches transport
/// concerns like cookies.
#[derive(Debug)]
pub enum LoadedBasket {
    Existing(Basket),
    Created(Basket),
}

/// A mutated basket plus the token to hand back when one was just minted.
#[derive(Debug)]
pub struct BasketUpdate {
    pub basket: Basket,
    pub minted: Option<BasketToken>,
}

/// The basket reconciliation service.
///
/// Cheap to clone; collaborators are shared behind `Arc`.
#[derive(Clone)]
pub struct BasketService {
    store: Arc<dyn BasketStore>,
    catalog: Arc<dyn ProductCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    coupons: Arc<dyn CouponResolver>,
}

impl BasketService {
    #[must_use]
    pub fn new(
        store: Arc<dyn BasketStore>,
        catalog: Arc<dyn ProductCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        coupons: Arc<dyn CouponResolver>,
    ) -> Self {
        Self {
            store,
            catalog,
            gateway,
            coupons,
        }
    }

    /// Read-only basket lookup. Never creates.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store read fails.
    pub async fn get_basket(&self, token: Option<&BasketToken>) -> Result<Option<Basket>> {
        match token {
            Some(token) => Ok(self.store.load(token).await?),
            None => Ok(None),
        }
    }

    /// Load the basket for the token, or mint a new one with a fresh token.
    ///
    /// The created basket is not persisted here; it is saved together with
    /// the mutation that prompted its creation, so a failed mutation leaves
    /// no orphan record.
    async fn ensure_basket(&self, token: Option<&BasketToken>) -> Result<LoadedBasket> {
        if let Some(token) = token
            && let Some(basket) = self.store.load(token).await?
        {
            return Ok(LoadedBasket::Existing(basket));
        }

        let token = BasketToken::generate();
        tracing::info!(basket = %token, "Minted new basket token");
        Ok(LoadedBasket::Created(Basket::new(token)))
    }

    async fn load_required(&self, token: Option<&BasketToken>) -> Result<Basket> {
        let token = token.ok_or(AppError::BasketNotFound)?;
        self.store
            .load(token)
            .await?
            .ok_or(AppError::BasketNotFound)
    }

    /// Add a product to the basket, creating the basket if needed.
    ///
    /// # Errors
    ///
    /// `ProductNotFound` for an unknown product id; `Persistence` when the
    /// store commit affects no records.
    pub async fn add_item(
        &self,
        token: Option<&BasketToken>,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<BasketUpdate> {
        let (mut basket, minted) = match self.ensure_basket(token).await? {
            LoadedBasket::Existing(basket) => (basket, None),
            LoadedBasket::Created(basket) => {
                let token = basket.token().clone();
                (basket, Some(token))
            }
        };

        let product = self
            .catalog
            .get(product_id)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))?;

        basket.add_item(product, quantity);
        self.persist(&basket).await?;

        Ok(BasketUpdate { basket, minted })
    }

    /// Remove a quantity of a product from an existing basket.
    ///
    /// Removal never creates a basket: removing from nothing is meaningless,
    /// so an unresolvable token is `BasketNotFound`.
    ///
    /// # Errors
    ///
    /// `BasketNotFound`, `Persistence`, or `Database`.
    pub async fn remove_item(
        &self,
        token: Option<&BasketToken>,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Basket> {
        let mut basket = self.load_required(token).await?;
        basket.remove_item(product_id, quantity);
        self.persist(&basket).await?;
        Ok(basket)
    }

    /// Apply a promo code to a basket mid-checkout.
    ///
    /// All-or-nothing: the coupon attach, the provider re-price, and the save
    /// either all take effect or none do. Nothing persists if the provider
    /// call fails.
    ///
    /// # Errors
    ///
    /// `InvalidState` when the basket is missing or checkout has not started,
    /// `InvalidCoupon` for an unresolvable code, `PaymentGateway` when the
    /// provider call fails.
    pub async fn apply_coupon(&self, token: Option<&BasketToken>, code: &str) -> Result<Basket> {
        let mut basket = self
            .get_basket(token)
            .await?
            .filter(Basket::checkout_started)
            .ok_or(AppError::InvalidState(COUPON_NEEDS_CHECKOUT))?;

        let coupon = self
            .coupons
            .resolve(code)
            .await?
            .ok_or_else(|| AppError::InvalidCoupon(code.to_owned()))?;

        basket.attach_coupon(coupon);

        // Re-price the live intent at the discounted total before saving.
        self.sync_with_gateway(&mut basket, false).await?;
        self.persist(&basket).await?;

        tracing::info!(basket = %basket.token(), code, "Applied coupon");
        Ok(basket)
    }

    /// Remove the attached coupon from a basket mid-checkout.
    ///
    /// The provider is re-priced at the undiscounted total first; the coupon
    /// reference is only cleared and saved once that call succeeds.
    ///
    /// # Errors
    ///
    /// `InvalidState` when no basket, coupon, or live client secret exists;
    /// `PaymentGateway` when the provider call fails.
    pub async fn remove_coupon(&self, token: Option<&BasketToken>) -> Result<Basket> {
        let mut basket = self
            .get_basket(token)
            .await?
            .filter(|b| b.checkout_started() && b.coupon().is_some())
            .ok_or(AppError::InvalidState(NO_COUPON_TO_REMOVE))?;

        // Price as if the coupon were already gone.
        self.sync_with_gateway(&mut basket, true).await?;

        basket.detach_coupon();
        self.persist(&basket).await?;

        tracing::info!(basket = %basket.token(), "Removed coupon");
        Ok(basket)
    }

    /// Checkout entry point: create or re-price the payment intent.
    ///
    /// The intent id and client secret are cached on the basket only if they
    /// were previously unset; once cached they are immutable, so a repeat
    /// call re-prices the same intent and can skip the save entirely.
    ///
    /// # Errors
    ///
    /// `BasketNotFound` or `PaymentGateway`.
    pub async fn synchronize_intent(&self, token: Option<&BasketToken>) -> Result<Basket> {
        let mut basket = self.load_required(token).await?;

        let assigned = self.sync_with_gateway(&mut basket, false).await?;
        if assigned {
            self.persist(&basket).await?;
        }

        Ok(basket)
    }

    /// The payment-intent synchronization protocol.
    ///
    /// Computes the chargeable total (optionally ignoring the coupon, for
    /// removal), creates the intent when the basket has none, otherwise
    /// re-prices the existing one. The provider is the sole authority on
    /// id/secret/amount. Returns whether a fresh intent reference was cached.
    async fn sync_with_gateway(&self, basket: &mut Basket, exclude_coupon: bool) -> Result<bool> {
        let amount = if exclude_coupon {
            basket.subtotal()
        } else {
            basket.total()
        };

        let intent = match basket.payment_intent_id() {
            Some(id) => self.gateway.update_intent(id, amount).await?,
            None => self.gateway.create_intent(amount).await?,
        };

        let assigned = basket.set_intent_if_absent(PaymentIntentRef {
            id: intent.id,
            client_secret: intent.client_secret,
        });
        if assigned {
            tracing::info!(
                basket = %basket.token(),
                intent = ?basket.payment_intent_id(),
                "Cached new payment intent"
            );
        }

        Ok(assigned)
    }

    async fn persist(&self, basket: &Basket) -> Result<()> {
        self.store.save(basket).await.map_err(AppError::Persistence)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::result::Result;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tidepool_core::{Coupon, Money, Product};

    use super::*;
    use crate::db::{ProductFilter, RepositoryError};
    use crate::services::payments::{GatewayError, PaymentIntent};

    // =========================================================================
    // In-memory fakes
    // =========================================================================

    #[derive(Default)]
    struct MemoryStore {
        baskets: Mutex<HashMap<String, Basket>>,
        fail_saves: AtomicBool,
    }

    impl MemoryStore {
        fn stored(&self, token: &BasketToken) -> Option<Basket> {
            self.baskets
                .lock()
                .expect("store lock")
                .get(token.as_str())
                .cloned()
        }
    }

    #[async_trait]
    impl BasketStore for MemoryStore {
        async fn load(&self, token: &BasketToken) -> Result<Option<Basket>, RepositoryError> {
            Ok(self.stored(token))
        }

        async fn save(&self, basket: &Basket) -> Result<(), RepositoryError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(RepositoryError::NothingPersisted);
            }
            self.baskets
                .lock()
                .expect("store lock")
                .insert(basket.token().as_str().to_owned(), basket.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        products: HashMap<i32, Product>,
    }

    impl FakeCatalog {
        fn with(products: Vec<Product>) -> Self {
            Self {
                products: products.into_iter().map(|p| (p.id.as_i32(), p)).collect(),
            }
        }
    }

    #[async_trait]
    impl ProductCatalog for FakeCatalog {
        async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
            Ok(self.products.get(&id.as_i32()).cloned())
        }

        async fn list(&self, _filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
            Ok(self.products.values().cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeGateway {
        creates: AtomicUsize,
        updates: AtomicUsize,
        fail: AtomicBool,
        last_amount: Mutex<Option<Money>>,
    }

    impl FakeGateway {
        fn last_amount(&self) -> Option<Money> {
            *self.last_amount.lock().expect("gateway lock")
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_intent(&self, amount: Money) -> Result<PaymentIntent, GatewayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Api {
                    status: 500,
                    message: "provider down".to_owned(),
                });
            }
            self.creates.fetch_add(1, Ordering::SeqCst);
            *self.last_amount.lock().expect("gateway lock") = Some(amount);
            Ok(PaymentIntent {
                id: "pi_test".to_owned(),
                client_secret: "secret_abc".to_owned(),
                amount,
            })
        }

        async fn update_intent(
            &self,
            intent_id: &str,
            amount: Money,
        ) -> Result<PaymentIntent, GatewayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Api {
                    status: 500,
                    message: "provider down".to_owned(),
                });
            }
            self.updates.fetch_add(1, Ordering::SeqCst);
            *self.last_amount.lock().expect("gateway lock") = Some(amount);
            Ok(PaymentIntent {
                id: intent_id.to_owned(),
                client_secret: "secret_abc".to_owned(),
                amount,
            })
        }
    }

    #[derive(Default)]
    struct FakeResolver {
        coupons: HashMap<String, Coupon>,
    }

    impl FakeResolver {
        fn with(coupons: Vec<Coupon>) -> Self {
            Self {
                coupons: coupons
                    .into_iter()
                    .map(|c| (c.code.clone(), c))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl CouponResolver for FakeResolver {
        async fn resolve(&self, code: &str) -> Result<Option<Coupon>, GatewayError> {
            Ok(self.coupons.get(code).cloned())
        }
    }

    // =========================================================================
    // Harness
    // =========================================================================

    struct Harness {
        service: BasketService,
        store: Arc<MemoryStore>,
        gateway: Arc<FakeGateway>,
    }

    fn product(id: i32, price_cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: "test".to_owned(),
            price: Money::from_cents(price_cents),
            picture_url: String::new(),
            brand: "Tidepool".to_owned(),
            product_type: "Boards".to_owned(),
            quantity_in_stock: 100,
        }
    }

    fn save5() -> Coupon {
        Coupon {
            id: "co_save5".to_owned(),
            code: "SAVE5".to_owned(),
            name: "$5 off".to_owned(),
            amount_off: Some(Money::from_cents(500)),
            percent_off: None,
        }
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::default());
        let gateway = Arc::new(FakeGateway::default());
        let catalog = Arc::new(FakeCatalog::with(vec![product(7, 1000), product(8, 250)]));
        let resolver = Arc::new(FakeResolver::with(vec![save5()]));

        let service = BasketService::new(
            store.clone(),
            catalog,
            gateway.clone(),
            resolver,
        );

        Harness {
            service,
            store,
            gateway,
        }
    }

    /// Add product 7 (qty 2, $20.00 total) as a new anonymous client and
    /// return the minted token.
    async fn seeded_basket(h: &Harness) -> BasketToken {
        let update = h
            .service
            .add_item(None, ProductId::new(7), 2)
            .await
            .expect("add item");
        update.minted.expect("token minted for new basket")
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn get_basket_without_token_is_none() {
        let h = harness();
        let basket = h.service.get_basket(None).await.expect("get");
        assert!(basket.is_none());
    }

    #[tokio::test]
    async fn add_item_mints_token_and_prices_basket() {
        let h = harness();
        let update = h
            .service
            .add_item(None, ProductId::new(7), 2)
            .await
            .expect("add item");

        let token = update.minted.expect("new basket must mint a token");
        assert_eq!(update.basket.items().len(), 1);
        assert_eq!(update.basket.items()[0].quantity(), 2);
        assert_eq!(update.basket.total(), Money::from_cents(2000));

        // The created basket was persisted together with the mutation.
        let stored = h.store.stored(&token).expect("persisted basket");
        assert_eq!(stored.total(), Money::from_cents(2000));
    }

    #[tokio::test]
    async fn add_item_to_existing_basket_does_not_mint() {
        let h = harness();
        let token = seeded_basket(&h).await;

        let update = h
            .service
            .add_item(Some(&token), ProductId::new(8), 1)
            .await
            .expect("second add");

        assert!(update.minted.is_none());
        assert_eq!(update.basket.items().len(), 2);
        assert_eq!(update.basket.total(), Money::from_cents(2250));
    }

    #[tokio::test]
    async fn add_item_rejects_unknown_product() {
        let h = harness();
        let result = h.service.add_item(None, ProductId::new(999), 1).await;
        assert!(matches!(result, Err(AppError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn add_item_surfaces_persistence_failure() {
        let h = harness();
        h.store.fail_saves.store(true, Ordering::SeqCst);

        let result = h.service.add_item(None, ProductId::new(7), 1).await;
        assert!(matches!(result, Err(AppError::Persistence(_))));
    }

    #[tokio::test]
    async fn remove_item_requires_existing_basket() {
        let h = harness();
        let result = h.service.remove_item(None, ProductId::new(7), 1).await;
        assert!(matches!(result, Err(AppError::BasketNotFound)));

        let unknown = BasketToken::from_string("no-such-basket");
        let result = h
            .service
            .remove_item(Some(&unknown), ProductId::new(7), 1)
            .await;
        assert!(matches!(result, Err(AppError::BasketNotFound)));
    }

    #[tokio::test]
    async fn remove_item_persists_clamped_result() {
        let h = harness();
        let token = seeded_basket(&h).await;

        let basket = h
            .service
            .remove_item(Some(&token), ProductId::new(7), 99)
            .await
            .expect("remove");

        assert!(basket.is_empty());
        assert!(h.store.stored(&token).expect("persisted").is_empty());
    }

    #[tokio::test]
    async fn apply_coupon_before_checkout_is_invalid_state() {
        let h = harness();
        let token = seeded_basket(&h).await;

        let result = h.service.apply_coupon(Some(&token), "SAVE5").await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));

        // The basket's coupon field stays unset.
        let stored = h.store.stored(&token).expect("persisted");
        assert!(stored.coupon().is_none());
    }

    #[tokio::test]
    async fn synchronize_intent_creates_once_then_updates() {
        let h = harness();
        let token = seeded_basket(&h).await;

        let basket = h
            .service
            .synchronize_intent(Some(&token))
            .await
            .expect("first sync");
        assert_eq!(basket.payment_intent_id(), Some("pi_test"));
        assert_eq!(basket.client_secret(), Some("secret_abc"));

        let basket = h
            .service
            .synchronize_intent(Some(&token))
            .await
            .expect("second sync");

        // The second call re-prices; it must not create a second intent or
        // overwrite the cached reference.
        assert_eq!(h.gateway.creates.load(Ordering::SeqCst), 1);
        assert_eq!(h.gateway.updates.load(Ordering::SeqCst), 1);
        assert_eq!(basket.payment_intent_id(), Some("pi_test"));
    }

    #[tokio::test]
    async fn synchronize_intent_requires_existing_basket() {
        let h = harness();
        let result = h.service.synchronize_intent(None).await;
        assert!(matches!(result, Err(AppError::BasketNotFound)));
    }

    #[tokio::test]
    async fn apply_coupon_reprices_intent_at_discounted_total() {
        let h = harness();
        let token = seeded_basket(&h).await;
        h.service
            .synchronize_intent(Some(&token))
            .await
            .expect("sync");

        let basket = h
            .service
            .apply_coupon(Some(&token), "SAVE5")
            .await
            .expect("apply coupon");

        // $20.00 basket with $5.00 off: the provider was re-priced at $15.00.
        assert_eq!(h.gateway.last_amount(), Some(Money::from_cents(1500)));
        assert_eq!(basket.total(), Money::from_cents(1500));
        assert_eq!(basket.payment_intent_id(), Some("pi_test"));

        let stored = h.store.stored(&token).expect("persisted");
        assert_eq!(stored.coupon().map(|c| c.code.as_str()), Some("SAVE5"));
        assert_eq!(stored.payment_intent_id(), Some("pi_test"));
    }

    #[tokio::test]
    async fn apply_coupon_rejects_unknown_code() {
        let h = harness();
        let token = seeded_basket(&h).await;
        h.service
            .synchronize_intent(Some(&token))
            .await
            .expect("sync");

        let result = h.service.apply_coupon(Some(&token), "BOGUS").await;
        assert!(matches!(result, Err(AppError::InvalidCoupon(_))));
    }

    #[tokio::test]
    async fn apply_coupon_gateway_failure_persists_nothing() {
        let h = harness();
        let token = seeded_basket(&h).await;
        h.service
            .synchronize_intent(Some(&token))
            .await
            .expect("sync");

        h.gateway.fail.store(true, Ordering::SeqCst);
        let result = h.service.apply_coupon(Some(&token), "SAVE5").await;
        assert!(matches!(result, Err(AppError::PaymentGateway(_))));

        // The attach was rolled back with the request; the stored basket
        // still has no coupon.
        let stored = h.store.stored(&token).expect("persisted");
        assert!(stored.coupon().is_none());
    }

    #[tokio::test]
    async fn remove_coupon_reprices_at_undiscounted_total() {
        let h = harness();
        let token = seeded_basket(&h).await;
        h.service
            .synchronize_intent(Some(&token))
            .await
            .expect("sync");
        h.service
            .apply_coupon(Some(&token), "SAVE5")
            .await
            .expect("apply");

        let basket = h
            .service
            .remove_coupon(Some(&token))
            .await
            .expect("remove coupon");

        assert_eq!(h.gateway.last_amount(), Some(Money::from_cents(2000)));
        assert!(basket.coupon().is_none());
        assert!(h.store.stored(&token).expect("persisted").coupon().is_none());
    }

    #[tokio::test]
    async fn remove_coupon_without_coupon_is_invalid_state() {
        let h = harness();
        let token = seeded_basket(&h).await;
        h.service
            .synchronize_intent(Some(&token))
            .await
            .expect("sync");

        let result = h.service.remove_coupon(Some(&token)).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn remove_coupon_gateway_failure_keeps_coupon() {
        let h = harness();
        let token = seeded_basket(&h).await;
        h.service
            .synchronize_intent(Some(&token))
            .await
            .expect("sync");
        h.service
            .apply_coupon(Some(&token), "SAVE5")
            .await
            .expect("apply");

        h.gateway.fail.store(true, Ordering::SeqCst);
        let result = h.service.remove_coupon(Some(&token)).await;
        assert!(matches!(result, Err(AppError::PaymentGateway(_))));

        let stored = h.store.stored(&token).expect("persisted");
        assert_eq!(stored.coupon().map(|c| c.code.as_str()), Some("SAVE5"));
    }
}
