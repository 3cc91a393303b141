use std::collections::HashMap;

use bigdecimal::BigDecimal;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::PriceAuthority;
use crate::schema::products;

use super::models::ProductPriceRow;
use super::order_repo::read_error;

/// Reads current prices from the `products` table.
pub struct DieselPriceAuthority {
    pool: DbPool,
}

impl DieselPriceAuthority {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PriceAuthority for DieselPriceAuthority {
    fn unit_prices(
        &self,
        product_ids: &[String],
    ) -> Result<HashMap<String, BigDecimal>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = products::table
            .filter(products::id.eq_any(product_ids))
            .select(ProductPriceRow::as_select())
            .load(&mut conn)
            .map_err(read_error)?;

        Ok(rows.into_iter().map(|r| (r.id, r.price)).collect())
    }
}
