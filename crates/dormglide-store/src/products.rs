//! CRUD operations for [`Product`] listings.

use chrono::Utc;
use dormglide_shared::constants::KEY_PRODUCTS;
use dormglide_shared::{NewProduct, Product, ProductPatch};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::ids::generate_local_id;
use crate::seed;

impl Database {
    /// All listings in insertion order.
    pub fn list_products(&self) -> Result<Vec<Product>> {
        self.read_json_or_default(KEY_PRODUCTS)
    }

    /// Store a new listing under a freshly generated local id.
    pub fn create_product(&self, draft: NewProduct) -> Result<Product> {
        let product = draft.into_product(generate_local_id(), Utc::now());
        self.insert_product(product.clone())?;
        Ok(product)
    }

    /// Insert a fully formed listing, replacing one with the same id.
    pub fn insert_product(&self, product: Product) -> Result<()> {
        let mut products = self.list_products()?;
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
        self.write_json(KEY_PRODUCTS, &products)
    }

    /// Merge `patch` onto the listing. Last write wins.
    pub fn update_product(&self, id: &str, patch: &ProductPatch) -> Result<Product> {
        let mut products = self.list_products()?;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        product.apply_patch(patch);
        let updated = product.clone();
        self.write_json(KEY_PRODUCTS, &products)?;
        Ok(updated)
    }

    /// Delete a listing. Returns `true` if it existed.
    pub fn delete_product(&self, id: &str) -> Result<bool> {
        let mut products = self.list_products()?;
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Ok(false);
        }
        self.write_json(KEY_PRODUCTS, &products)?;
        Ok(true)
    }

    /// Populate an empty listing store with the demo catalogue. Returns the
    /// number of listings inserted (zero when listings already exist).
    pub fn seed_demo_products_if_empty(&self) -> Result<usize> {
        if !self.list_products()?.is_empty() {
            return Ok(0);
        }
        let demo = seed::demo_products();
        let count = demo.len();
        self.write_json(KEY_PRODUCTS, &demo)?;
        tracing::info!(count, "seeded local store with demo listings");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn create_assigns_local_id_and_defaults() {
        let db = db();
        let product = db.create_product(NewProduct::new("Desk", 40.0, "u1")).unwrap();
        assert!(product.id.starts_with("local_"));
        assert_eq!(product.views, 0);

        let all = db.list_products().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], product);
    }

    #[test]
    fn update_merges_patch() {
        let db = db();
        let product = db.create_product(NewProduct::new("Desk", 40.0, "u1")).unwrap();
        let patch = ProductPatch {
            price: Some(30.0),
            ..Default::default()
        };
        let updated = db.update_product(&product.id, &patch).unwrap();
        assert_eq!(updated.price, 30.0);
        assert_eq!(updated.title, "Desk");
        let stored = db.list_products().unwrap();
        assert_eq!(stored.iter().find(|p| p.id == product.id).unwrap().price, 30.0);
    }

    #[test]
    fn update_missing_is_not_found() {
        let err = db()
            .update_product("nope", &ProductPatch::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn delete_reports_existence() {
        let db = db();
        let product = db.create_product(NewProduct::new("Lamp", 5.0, "u1")).unwrap();
        assert!(db.delete_product(&product.id).unwrap());
        assert!(!db.delete_product(&product.id).unwrap());
        assert!(db.list_products().unwrap().is_empty());
    }

    #[test]
    fn seed_only_fills_empty_store() {
        let db = db();
        let seeded = db.seed_demo_products_if_empty().unwrap();
        assert!(seeded > 0);
        assert!(db.list_products().unwrap().iter().all(|p| p.is_demo));
        assert_eq!(db.seed_demo_products_if_empty().unwrap(), 0);
    }
}
