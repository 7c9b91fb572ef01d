//! `PostgreSQL`-backed basket store.
//!
//! One basket row per token plus insertion-ordered line items. Line items
//! join to the product table on load so the domain model always carries a
//! current product snapshot. All writes for one basket commit in a single
//! transaction.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use tidepool_core::{
    Basket, BasketItem, BasketToken, Coupon, Money, PaymentIntentRef, Product, ProductId,
};

use super::{BasketStore, RepositoryError};

/// `PostgreSQL` implementation of [`BasketStore`].
#[derive(Clone)]
pub struct PgBasketStore {
    pool: PgPool,
}

impl PgBasketStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BasketRow {
    payment_intent_id: Option<String>,
    client_secret: Option<String>,
    coupon_id: Option<String>,
    coupon_code: Option<String>,
    coupon_name: Option<String>,
    coupon_amount_off: Option<i64>,
    coupon_percent_off: Option<Decimal>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    product_id: ProductId,
    quantity: i32,
    name: String,
    description: String,
    price: i64,
    picture_url: String,
    brand: String,
    product_type: String,
    quantity_in_stock: i32,
}

impl BasketRow {
    fn intent(&self) -> Result<Option<PaymentIntentRef>, RepositoryError> {
        match (&self.payment_intent_id, &self.client_secret) {
            (Some(id), Some(client_secret)) => Ok(Some(PaymentIntentRef {
                id: id.clone(),
                client_secret: client_secret.clone(),
            })),
            (None, None) => Ok(None),
            _ => Err(RepositoryError::DataCorruption(
                "basket has a payment intent id without a client secret, or vice versa".to_owned(),
            )),
        }
    }

    fn coupon(&self) -> Result<Option<Coupon>, RepositoryError> {
        let Some(id) = &self.coupon_id else {
            return Ok(None);
        };
        let code = self.coupon_code.clone().ok_or_else(|| {
            RepositoryError::DataCorruption("basket coupon is missing its promo code".to_owned())
        })?;

        Ok(Some(Coupon {
            id: id.clone(),
            code,
            name: self.coupon_name.clone().unwrap_or_default(),
            amount_off: self.coupon_amount_off.map(Money::from_cents),
            percent_off: self.coupon_percent_off,
        }))
    }
}

impl TryFrom<ItemRow> for BasketItem {
    type Error = RepositoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "basket item for product {} has non-positive quantity {}",
                    row.product_id, row.quantity
                ))
            })?;

        Ok(Self::new(
            Product {
                id: row.product_id,
                name: row.name,
                description: row.description,
                price: Money::from_cents(row.price),
                picture_url: row.picture_url,
                brand: row.brand,
                product_type: row.product_type,
                quantity_in_stock: row.quantity_in_stock,
            },
            quantity,
        ))
    }
}

#[async_trait]
impl BasketStore for PgBasketStore {
    async fn load(&self, token: &BasketToken) -> Result<Option<Basket>, RepositoryError> {
        let row = sqlx::query_as::<_, BasketRow>(
            r"
            SELECT payment_intent_id, client_secret,
                   coupon_id, coupon_code, coupon_name,
                   coupon_amount_off, coupon_percent_off
            FROM basket
            WHERE token = $1
            ",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT i.product_id, i.quantity,
                   p.name, p.description, p.price, p.picture_url,
                   p.brand, p.product_type, p.quantity_in_stock
            FROM basket_item i
            JOIN product p ON p.id = i.product_id
            WHERE i.basket_token = $1
            ORDER BY i.position
            ",
        )
        .bind(token.as_str())
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(BasketItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Basket::from_parts(
            token.clone(),
            items,
            row.coupon()?,
            row.intent()?,
        )))
    }

    async fn save(&self, basket: &Basket) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let coupon = basket.coupon();
        let result = sqlx::query(
            r"
            INSERT INTO basket (
                token, payment_intent_id, client_secret,
                coupon_id, coupon_code, coupon_name,
                coupon_amount_off, coupon_percent_off, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (token) DO UPDATE SET
                payment_intent_id = EXCLUDED.payment_intent_id,
                client_secret = EXCLUDED.client_secret,
                coupon_id = EXCLUDED.coupon_id,
                coupon_code = EXCLUDED.coupon_code,
                coupon_name = EXCLUDED.coupon_name,
                coupon_amount_off = EXCLUDED.coupon_amount_off,
                coupon_percent_off = EXCLUDED.coupon_percent_off,
                updated_at = now()
            ",
        )
        .bind(basket.token().as_str())
        .bind(basket.payment_intent_id())
        .bind(basket.client_secret())
        .bind(coupon.map(|c| c.id.as_str()))
        .bind(coupon.map(|c| c.code.as_str()))
        .bind(coupon.map(|c| c.name.as_str()))
        .bind(coupon.and_then(|c| c.amount_off).map(|m| m.cents()))
        .bind(coupon.and_then(|c| c.percent_off))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NothingPersisted);
        }

        // Replace line items wholesale; baskets are small.
        sqlx::query("DELETE FROM basket_item WHERE basket_token = $1")
            .bind(basket.token().as_str())
            .execute(&mut *tx)
            .await?;

        for (position, item) in basket.items().iter().enumerate() {
            let position = i32::try_from(position).map_err(|_| {
                RepositoryError::DataCorruption("basket has too many line items".to_owned())
            })?;
            let quantity = i32::try_from(item.quantity()).map_err(|_| {
                RepositoryError::DataCorruption("basket item quantity overflows i32".to_owned())
            })?;

            sqlx::query(
                r"
                INSERT INTO basket_item (basket_token, product_id, quantity, position)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(basket.token().as_str())
            .bind(item.product().id)
            .bind(quantity)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
