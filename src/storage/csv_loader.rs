use chrono::{Local, NaiveDateTime};
use log::{error, info, warn};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::configuration::Config;
use crate::error_handling::types::{DatabaseError, LoadError};
use crate::storage::database::SqlServerClient;
use crate::storage::schema::{ensure_products_table, INSERT_PRODUCT};
use crate::storage::types::{LoadSummary, ProductRow};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const SAMPLE_FILE_NAME: &str = "sample_products.csv";

// Accepted header names per target column, in order of preference.
const NAME_ALIASES: &[&str] = &["name", "product_name", "title", "product"];
const DESCRIPTION_ALIASES: &[&str] = &["description", "desc", "product_description"];
const PRICE_ALIASES: &[&str] = &["price", "cost", "amount", "value"];
const CATEGORY_ALIASES: &[&str] = &["category", "cat", "type", "product_category"];
const STOCK_ALIASES: &[&str] = &["stock_quantity", "stock", "quantity", "qty", "inventory"];

/// Column positions of a CSV header mapped onto the `products` table.
#[derive(Debug, Clone, PartialEq)]
struct ColumnMap {
    name: usize,
    description: Option<usize>,
    price: Option<usize>,
    category: Option<usize>,
    stock_quantity: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Option<Self> {
        let find = |aliases: &[&str]| {
            aliases.iter().find_map(|alias| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(alias))
            })
        };

        Some(Self {
            name: find(NAME_ALIASES)?,
            description: find(DESCRIPTION_ALIASES),
            price: find(PRICE_ALIASES),
            category: find(CATEGORY_ALIASES),
            stock_quantity: find(STOCK_ALIASES),
        })
    }
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
}

/// Unparseable or non-finite numbers count as zero.
fn parse_price(raw: &str) -> f64 {
    raw.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Like [`parse_price`], then truncated towards zero.
///
/// `Err` carries a value the `INT` column cannot hold.
fn parse_stock(raw: &str) -> Result<i32, f64> {
    let Some(value) = raw.parse::<f64>().ok().filter(|v| v.is_finite()) else {
        return Ok(0);
    };
    let value = value.trunc();
    if (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&value) {
        Ok(value as i32)
    } else {
        Err(value)
    }
}

/// Maps CSV records onto product rows.
///
/// Fails when no name column exists or a stock quantity overflows `INT`.
/// Rows with an empty name are dropped.
pub fn prepare_products<R: Read>(
    reader: R,
    source: &str,
    now: NaiveDateTime,
) -> Result<Vec<ProductRow>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    info!("Columns in {}: {:?}", source, headers.iter().collect::<Vec<_>>());
    let columns = ColumnMap::from_headers(&headers).ok_or_else(|| {
        error!("No valid product name column found in {}", source);
        LoadError::NoNameColumn(source.to_string())
    })?;

    let mut rows = Vec::new();
    let mut total = 0usize;
    for record in csv_reader.records() {
        let record = record?;
        total += 1;
        let name = cell(&record, Some(columns.name));
        if name.is_empty() {
            continue;
        }
        let stock_quantity = parse_stock(cell(&record, columns.stock_quantity)).map_err(|value| {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            error!("Stock quantity {} out of range in {} (line {})", value, source, line);
            LoadError::StockOutOfRange {
                source: source.to_string(),
                line,
                value,
            }
        })?;
        rows.push(ProductRow {
            name: name.to_string(),
            description: cell(&record, columns.description).to_string(),
            price: parse_price(cell(&record, columns.price)),
            category: cell(&record, columns.category).to_string(),
            stock_quantity,
            created_at: now,
            updated_at: now,
        });
    }

    info!(
        "Prepared {} valid rows out of {} in {}",
        rows.len(),
        total,
        source
    );
    Ok(rows)
}

pub fn read_products(path: &Path, now: NaiveDateTime) -> Result<Vec<ProductRow>, LoadError> {
    let display = path.display().to_string();
    info!("Reading CSV file: {}", display);
    let file = std::fs::File::open(path).map_err(|e| LoadError::IoError(display.clone(), e))?;
    prepare_products(file, &display, now)
}

/// Lists `*.csv` files in `dir`, sorted by name. A missing directory is created.
pub fn find_csv_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let display = dir.display().to_string();
    if !dir.exists() {
        warn!("Data directory {} does not exist. Creating it...", display);
        std::fs::create_dir_all(dir).map_err(|e| LoadError::IoError(display, e))?;
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| LoadError::IoError(display.clone(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| LoadError::IoError(display.clone(), e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    info!("Found {} CSV files in {}", files.len(), display);
    Ok(files)
}

/// Writes a five-product CSV into `dir` and returns its path.
pub fn write_sample_csv(dir: &Path) -> Result<PathBuf, LoadError> {
    std::fs::create_dir_all(dir).map_err(|e| LoadError::IoError(dir.display().to_string(), e))?;
    let path = dir.join(SAMPLE_FILE_NAME);

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["name", "description", "price", "category", "stock_quantity"])?;
    let samples = [
        ("Laptop Computer", "High-performance laptop for work and gaming", "1299.99", "15"),
        ("Wireless Mouse", "Ergonomic wireless mouse with precision tracking", "29.99", "100"),
        ("USB Cable", "High-speed USB 3.0 cable for data transfer", "12.99", "200"),
        ("External Hard Drive", "1TB external hard drive for backup storage", "89.99", "50"),
        ("Bluetooth Headphones", "Noise-cancelling wireless headphones", "199.99", "75"),
    ];
    for (name, description, price, stock) in samples {
        writer.write_record([name, description, price, "Electronics", stock])?;
    }
    writer
        .flush()
        .map_err(|e| LoadError::IoError(path.display().to_string(), e))?;

    info!("Created sample CSV file: {}", path.display());
    Ok(path)
}

// Leaves the shared connection without an open transaction.
async fn rollback(client: &mut SqlServerClient) {
    if let Err(e) = client.batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await {
        warn!("Rollback failed: {}", e);
    }
}

/// Inserts `rows` one statement at a time inside a single transaction.
pub async fn insert_products(
    client: &mut SqlServerClient,
    rows: &[ProductRow],
) -> Result<usize, DatabaseError> {
    client.batch("BEGIN TRANSACTION").await?;

    for row in rows {
        let result = client
            .execute(
                INSERT_PRODUCT,
                &[
                    &row.name,
                    &row.description,
                    &row.price,
                    &row.category,
                    &row.stock_quantity,
                    &row.created_at,
                    &row.updated_at,
                ],
            )
            .await;
        if let Err(e) = result {
            rollback(client).await;
            return Err(e);
        }
    }

    if let Err(e) = client.batch("COMMIT TRANSACTION").await {
        rollback(client).await;
        return Err(e);
    }
    Ok(rows.len())
}

/// Loads one CSV file into `products`, creating the table first if needed.
pub async fn load_file(client: &mut SqlServerClient, path: &Path) -> Result<usize, LoadError> {
    let rows = read_products(path, Local::now().naive_local())?;
    if rows.is_empty() {
        warn!("No valid data to insert after cleaning {}", path.display());
        return Err(LoadError::NoValidRows(path.display().to_string()));
    }

    ensure_products_table(client).await?;
    info!("Inserting {} rows into products table...", rows.len());
    let inserted = insert_products(client, &rows).await?;
    info!("Loaded {} rows from {}", inserted, path.display());
    Ok(inserted)
}

/// Loads every CSV file in `dir`, writing a sample file first when there is none.
///
/// A file that fails is logged and counted; the others are still loaded. Only
/// a failure to reach the database aborts the whole run.
pub async fn load_directory(config: &Config, dir: &Path) -> Result<LoadSummary, LoadError> {
    let mut files = find_csv_files(dir)?;
    if files.is_empty() {
        info!("No CSV files found in {}, creating a sample file", dir.display());
        write_sample_csv(dir)?;
        files = find_csv_files(dir)?;
    }

    let mut client = SqlServerClient::connect(config).await?;
    let mut summary = LoadSummary {
        total_files: files.len(),
        ..LoadSummary::default()
    };

    for path in &files {
        info!("Processing {}...", path.display());
        match load_file(&mut client, path).await {
            Ok(inserted) => {
                summary.loaded_files += 1;
                summary.inserted_rows += inserted;
            }
            Err(e) => error!("Failed to load {}: {}", path.display(), e),
        }
    }
    client.close().await;

    info!(
        "Successfully loaded: {}/{} files",
        summary.loaded_files, summary.total_files
    );
    Ok(summary)
}
