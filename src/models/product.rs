use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A sellable unit within a brand. `code` is unique per brand only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub brand_id: String,
    pub code: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub code: String,
    pub name: String,
}

impl CreateProduct {
    pub fn validate(&self) -> Result<()> {
        let code = self.code.trim();
        if code.is_empty() {
            return Err(AppError::bad_request("Product code cannot be empty"));
        }
        if code.len() > 64 {
            return Err(AppError::bad_request("Product code must be at most 64 characters"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::bad_request("Product name cannot be empty"));
        }
        Ok(())
    }
}
