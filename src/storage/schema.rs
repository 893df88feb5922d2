//! Fixed DDL and sample data for the `products` demo table.

use log::info;

use crate::error_handling::types::DatabaseError;
use crate::storage::database::SqlServerClient;
use crate::storage::types::SchemaSummary;

pub const CREATE_PRODUCTS_TABLE: &str = "
IF NOT EXISTS (SELECT * FROM sysobjects WHERE name='products' AND xtype='U')
CREATE TABLE products (
    id INT IDENTITY(1,1) PRIMARY KEY,
    name NVARCHAR(255) NOT NULL,
    description NVARCHAR(MAX),
    price DECIMAL(10,2) NOT NULL,
    category NVARCHAR(100),
    stock_quantity INT DEFAULT 0,
    created_at DATETIME2 DEFAULT GETDATE(),
    updated_at DATETIME2 DEFAULT GETDATE()
)";

pub const CREATE_CATEGORY_INDEX: &str = "
IF NOT EXISTS (SELECT * FROM sys.indexes WHERE name = 'IX_products_category')
CREATE INDEX IX_products_category ON products(category)";

pub const INSERT_SAMPLE_PRODUCTS: &str = "
IF NOT EXISTS (SELECT * FROM products WHERE name = 'Sample Product 1')
INSERT INTO products (name, description, price, category, stock_quantity) VALUES
('Sample Product 1', 'This is a sample product for testing', 29.99, 'Electronics', 100),
('Sample Product 2', 'Another sample product', 49.99, 'Electronics', 50),
('Sample Product 3', 'A third sample product', 19.99, 'Books', 200),
('Sample Product 4', 'Yet another sample', 99.99, 'Home & Garden', 25),
('Sample Product 5', 'The last sample product', 15.99, 'Books', 150)";

// DECIMAL aggregates are cast so they decode as plain floats and integers.
pub const VERIFY_PRODUCTS: &str = "
SELECT
    COUNT(*) AS total_products,
    CAST(AVG(price) AS FLOAT) AS avg_price,
    CAST(SUM(stock_quantity) AS BIGINT) AS total_stock
FROM products";

pub const INSERT_PRODUCT: &str = "
INSERT INTO products (name, description, price, category, stock_quantity, created_at, updated_at)
VALUES (@P1, @P2, @P3, @P4, @P5, @P6, @P7)";

pub async fn ensure_products_table(client: &mut SqlServerClient) -> Result<(), DatabaseError> {
    client.batch(CREATE_PRODUCTS_TABLE).await?;
    info!("Products table created (if it didn't exist)");
    Ok(())
}

/// Creates the table and its category index; both steps are idempotent.
pub async fn create_products_table(client: &mut SqlServerClient) -> Result<(), DatabaseError> {
    info!("Creating products table...");
    ensure_products_table(client).await?;
    info!("Creating index on category column...");
    client.batch(CREATE_CATEGORY_INDEX).await
}

pub async fn insert_sample_data(client: &mut SqlServerClient) -> Result<(), DatabaseError> {
    info!("Inserting sample data...");
    client.batch(INSERT_SAMPLE_PRODUCTS).await
}

pub async fn verify_schema(client: &mut SqlServerClient) -> Result<SchemaSummary, DatabaseError> {
    info!("Verifying schema...");
    let rows = client.query(VERIFY_PRODUCTS, &[]).await?;
    let row = rows
        .first()
        .ok_or_else(|| DatabaseError::EmptyResult("products summary".to_string()))?;

    Ok(SchemaSummary {
        total_products: row.try_get::<i32, _>(0)?.unwrap_or(0),
        avg_price: row.try_get::<f64, _>(1)?,
        total_stock: row.try_get::<i64, _>(2)?,
    })
}
