//! Seed the product catalog with demo data.
//!
//! Upserts a fixed set of products keyed by id, so the command is safe to
//! re-run against a database that already holds catalog rows. Basket data is
//! never touched.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::info;

use super::CommandError;

/// One row of the demo catalog. Prices are in minor units (cents).
struct SeedProduct {
    id: i32,
    name: &'static str,
    description: &'static str,
    price: i64,
    picture_url: &'static str,
    brand: &'static str,
    product_type: &'static str,
    quantity_in_stock: i32,
}

const CATALOG: &[SeedProduct] = &[
    SeedProduct {
        id: 1,
        name: "Driftline Longboard",
        description: "A 9'2\" single-fin log with a full nose for classic trim.",
        price: 65_000,
        picture_url: "/images/products/driftline-longboard.png",
        brand: "Driftline",
        product_type: "Boards",
        quantity_in_stock: 100,
    },
    SeedProduct {
        id: 2,
        name: "Saltbreak Twin Fin",
        description: "Fast, loose twin fin for small to medium days.",
        price: 58_000,
        picture_url: "/images/products/saltbreak-twin.png",
        brand: "Saltbreak",
        product_type: "Boards",
        quantity_in_stock: 100,
    },
    SeedProduct {
        id: 3,
        name: "Tidepool Step-Up",
        description: "Pulled-in pintail for when the forecast overdelivers.",
        price: 72_000,
        picture_url: "/images/products/tidepool-stepup.png",
        brand: "Tidepool",
        product_type: "Boards",
        quantity_in_stock: 100,
    },
    SeedProduct {
        id: 4,
        name: "Driftline 4/3 Wetsuit",
        description: "Chest-zip 4/3 with thermal lining for cold-water sessions.",
        price: 32_000,
        picture_url: "/images/products/driftline-wetsuit.png",
        brand: "Driftline",
        product_type: "Wetsuits",
        quantity_in_stock: 100,
    },
    SeedProduct {
        id: 5,
        name: "Saltbreak Spring Suit",
        description: "2mm short-arm spring suit for shoulder-season surf.",
        price: 18_000,
        picture_url: "/images/products/saltbreak-spring.png",
        brand: "Saltbreak",
        product_type: "Wetsuits",
        quantity_in_stock: 100,
    },
    SeedProduct {
        id: 6,
        name: "Tidepool Comp Leash",
        description: "6' competition leash with double swivel and rail saver.",
        price: 3_500,
        picture_url: "/images/products/tidepool-leash.png",
        brand: "Tidepool",
        product_type: "Leashes",
        quantity_in_stock: 100,
    },
    SeedProduct {
        id: 7,
        name: "Driftline Longboard Leash",
        description: "9' calf leash sized for logs and mid-lengths.",
        price: 4_200,
        picture_url: "/images/products/driftline-leash.png",
        brand: "Driftline",
        product_type: "Leashes",
        quantity_in_stock: 100,
    },
    SeedProduct {
        id: 8,
        name: "Saltbreak Surf Hat",
        description: "Wide-brim surf hat with chin strap. Stays on in the lineup.",
        price: 2_900,
        picture_url: "/images/products/saltbreak-hat.png",
        brand: "Saltbreak",
        product_type: "Hats",
        quantity_in_stock: 100,
    },
];

/// Upsert the demo catalog.
pub async fn run() -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("TIDEPOOL_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("TIDEPOOL_DATABASE_URL"))?;

    info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    info!(products = CATALOG.len(), "Seeding product catalog");
    for product in CATALOG {
        upsert(&pool, product).await?;
    }

    // Keep the id sequence ahead of the explicitly-assigned seed ids.
    sqlx::query(
        "SELECT setval(pg_get_serial_sequence('product', 'id'), \
         (SELECT GREATEST(MAX(id), 1) FROM product))",
    )
    .fetch_one(&pool)
    .await?;

    info!("Seeding complete!");
    Ok(())
}

async fn upsert(pool: &PgPool, product: &SeedProduct) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO product
            (id, name, description, price, picture_url, brand, product_type, quantity_in_stock)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            price = EXCLUDED.price,
            picture_url = EXCLUDED.picture_url,
            brand = EXCLUDED.brand,
            product_type = EXCLUDED.product_type,
            quantity_in_stock = EXCLUDED.quantity_in_stock,
            updated_at = now()
        ",
    )
    .bind(product.id)
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(product.picture_url)
    .bind(product.brand)
    .bind(product.product_type)
    .bind(product.quantity_in_stock)
    .execute(pool)
    .await?;

    Ok(())
}
