//! Out-of-band brand and product management, driven from the command line.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{OptionExt, Result, msg};
use crate::models::{Brand, BrandCreated, CreateBrand, CreateProduct, Product};

use super::{run_in_transaction, run_read};

pub fn create_brand(conn: &mut Connection, input: &CreateBrand) -> Result<BrandCreated> {
    input.validate()?;
    let (brand, api_key) = run_in_transaction(conn, |tx| queries::create_brand(tx, input))?;
    tracing::info!(brand = %brand.name, prefix = %brand.api_key_prefix, "Created brand");
    Ok(BrandCreated { brand, api_key })
}

pub fn create_product(
    conn: &mut Connection,
    brand_name: &str,
    input: &CreateProduct,
) -> Result<Product> {
    input.validate()?;
    let product = run_in_transaction(conn, |tx| {
        let brand = load_brand(tx, brand_name)?;
        queries::create_product(tx, &brand.id, input)
    })?;
    tracing::info!(brand = brand_name, product = %product.code, "Created product");
    Ok(product)
}

/// Delete a brand and its license keys. Fails with `Conflict` while it still has products.
pub fn delete_brand(conn: &mut Connection, brand_name: &str) -> Result<()> {
    run_in_transaction(conn, |tx| {
        let brand = load_brand(tx, brand_name)?;
        queries::delete_brand(tx, &brand.id)
    })?;
    tracing::info!(brand = brand_name, "Deleted brand");
    Ok(())
}

/// Fails with `Conflict` while any license references the product.
pub fn delete_product(conn: &mut Connection, brand_name: &str, code: &str) -> Result<()> {
    run_in_transaction(conn, |tx| {
        let brand = load_brand(tx, brand_name)?;
        let product = queries::get_product_by_code(tx, &brand.id, code.trim())?
            .or_not_found(msg::PRODUCT_NOT_FOUND)?;
        queries::delete_product(tx, &product.id)
    })?;
    tracing::info!(brand = brand_name, product = code, "Deleted product");
    Ok(())
}

pub fn list_brands(conn: &mut Connection) -> Result<Vec<Brand>> {
    run_read(conn, queries::list_brands)
}

/// A brand's products, ordered by code.
pub fn list_products(conn: &mut Connection, brand_name: &str) -> Result<Vec<Product>> {
    run_read(conn, |tx| {
        let brand = load_brand(tx, brand_name)?;
        queries::list_products_for_brand(tx, &brand.id)
    })
}

fn load_brand(conn: &Connection, name: &str) -> Result<Brand> {
    queries::get_brand_by_name(conn, name.trim())?.or_not_found(msg::BRAND_NOT_FOUND)
}
