use rusqlite::Connection;

/// Initialize the database schema.
///
/// Uniqueness constraints here are the final arbiter for concurrent
/// find-or-create calls; application code re-reads on violation.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Brands (tenants). API keys are stored as SHA-256 digests only.
        CREATE TABLE IF NOT EXISTS brands (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            api_key_prefix TEXT NOT NULL,
            api_key_hash TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        );

        -- Products (code is unique per brand, not globally)
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            brand_id TEXT NOT NULL REFERENCES brands(id) ON DELETE RESTRICT,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(brand_id, code)
        );
        CREATE INDEX IF NOT EXISTS idx_products_brand ON products(brand_id);

        -- License keys (one per brand + customer email)
        CREATE TABLE IF NOT EXISTS license_keys (
            id TEXT PRIMARY KEY,
            brand_id TEXT NOT NULL REFERENCES brands(id) ON DELETE CASCADE,
            customer_email TEXT NOT NULL,
            key TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL,
            UNIQUE(brand_id, customer_email)
        );
        CREATE INDEX IF NOT EXISTS idx_license_keys_email ON license_keys(customer_email);

        -- Licenses (one per license key + product)
        CREATE TABLE IF NOT EXISTS licenses (
            id TEXT PRIMARY KEY,
            license_key_id TEXT NOT NULL REFERENCES license_keys(id) ON DELETE CASCADE,
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE RESTRICT,
            status TEXT NOT NULL DEFAULT 'valid' CHECK (status IN ('valid', 'suspended', 'cancelled')),
            expires_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(license_key_id, product_id)
        );
        CREATE INDEX IF NOT EXISTS idx_licenses_status ON licenses(status);
        CREATE INDEX IF NOT EXISTS idx_licenses_expires_at ON licenses(expires_at);
        CREATE INDEX IF NOT EXISTS idx_licenses_product ON licenses(product_id);

        -- Activations (one row per license + instance; revoked_at NULL = live)
        CREATE TABLE IF NOT EXISTS activations (
            id TEXT PRIMARY KEY,
            license_id TEXT NOT NULL REFERENCES licenses(id) ON DELETE CASCADE,
            instance_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            revoked_at INTEGER,
            UNIQUE(license_id, instance_id)
        );
        CREATE INDEX IF NOT EXISTS idx_activations_instance ON activations(instance_id);
        CREATE INDEX IF NOT EXISTS idx_activations_live ON activations(license_id) WHERE revoked_at IS NULL;
        "#,
    )
}
