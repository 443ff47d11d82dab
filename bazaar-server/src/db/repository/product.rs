//! Product Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Product, ProductCreate, ProductUpdate, UserId};
use chrono::Utc;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn parse_id(id: &str) -> RepoResult<RecordId> {
        id.parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))
    }

    /// Find all listed products
    pub async fn find_all(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product WHERE is_blacklisted = false ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(products)
    }

    /// Find all products, blacklisted ones included
    pub async fn find_all_with_blacklisted(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(products)
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        let thing = Self::parse_id(id)?;
        let product: Option<Product> = self.base.db().select(thing).await?;
        Ok(product)
    }

    pub async fn create(&self, data: ProductCreate, created_by: &UserId) -> RepoResult<Product> {
        let now = Utc::now().timestamp();

        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE product SET
                    name = $name,
                    description = $description,
                    price = $price,
                    quantity = $quantity,
                    category = $category,
                    images = $images,
                    created_by = $created_by,
                    is_blacklisted = false,
                    created_at = $now,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("name", data.name))
            .bind(("description", data.description))
            .bind(("price", data.price))
            .bind(("quantity", data.quantity))
            .bind(("category", data.category))
            .bind(("images", data.images))
            .bind(("created_by", created_by.to_string()))
            .bind(("now", now))
            .await?;

        let created: Option<Product> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }

    /// Update a product. Blacklisted products are frozen.
    pub async fn update(&self, id: &str, data: ProductUpdate) -> RepoResult<Product> {
        let thing = Self::parse_id(id)?;
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))?;

        if existing.is_blacklisted {
            return Err(RepoError::Validation(
                "Blacklisted product cannot be updated".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $thing SET
                    name = $name OR name,
                    description = IF $has_description THEN $description ELSE description END,
                    price = IF $has_price THEN $price ELSE price END,
                    quantity = IF $has_quantity THEN $quantity ELSE quantity END,
                    category = IF $has_category THEN $category ELSE category END,
                    images = IF $has_images THEN $images ELSE images END,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("thing", thing))
            .bind(("name", data.name))
            .bind(("has_description", data.description.is_some()))
            .bind(("description", data.description))
            .bind(("has_price", data.price.is_some()))
            .bind(("price", data.price))
            .bind(("has_quantity", data.quantity.is_some()))
            .bind(("quantity", data.quantity))
            .bind(("has_category", data.category.is_some()))
            .bind(("category", data.category))
            .bind(("has_images", data.images.is_some()))
            .bind(("images", data.images))
            .bind(("now", now))
            .await?;

        result
            .take::<Option<Product>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))
    }

    pub async fn set_blacklisted(&self, id: &str, blacklisted: bool) -> RepoResult<Product> {
        let thing = Self::parse_id(id)?;
        let now = Utc::now().timestamp();

        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $thing SET is_blacklisted = $blacklisted, updated_at = $now RETURN AFTER",
            )
            .bind(("thing", thing))
            .bind(("blacklisted", blacklisted))
            .bind(("now", now))
            .await?;

        result
            .take::<Option<Product>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))
    }

    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let thing = Self::parse_id(id)?;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))?;

        self.base
            .db()
            .query("DELETE $thing")
            .bind(("thing", thing))
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn test_repo() -> ProductRepository {
        let db = DbService::open_in_memory()
            .await
            .expect("in-memory db should open");
        ProductRepository::new(db)
    }

    fn sample_create(name: &str) -> ProductCreate {
        ProductCreate {
            name: name.into(),
            description: Some("A product".into()),
            price: 19.99,
            quantity: 5,
            category: Some("misc".into()),
            images: vec![],
        }
    }

    fn seller() -> UserId {
        "user:seller".parse().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let repo = test_repo().await;
        let product = repo.create(sample_create("Lamp"), &seller()).await.unwrap();
        assert!(product.id.is_some());
        assert!(!product.is_blacklisted);

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Lamp");
    }

    #[tokio::test]
    async fn test_blacklist_hides_and_freezes() {
        let repo = test_repo().await;
        let product = repo.create(sample_create("Lamp"), &seller()).await.unwrap();
        let id = product.id.unwrap().to_string();

        let product = repo.set_blacklisted(&id, true).await.unwrap();
        assert!(product.is_blacklisted);

        // Hidden from the public listing, still visible to moderation
        assert!(repo.find_all().await.unwrap().is_empty());
        assert_eq!(repo.find_all_with_blacklisted().await.unwrap().len(), 1);

        let err = repo
            .update(
                &id,
                ProductUpdate {
                    name: Some("New name".into()),
                    description: None,
                    price: None,
                    quantity: None,
                    category: None,
                    images: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));

        // Relisting unfreezes
        repo.set_blacklisted(&id, false).await.unwrap();
        let product = repo
            .update(
                &id,
                ProductUpdate {
                    name: None,
                    description: None,
                    price: Some(25.0),
                    quantity: None,
                    category: None,
                    images: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(product.price, 25.0);
        assert_eq!(product.name, "Lamp");
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = test_repo().await;
        let product = repo.create(sample_create("Lamp"), &seller()).await.unwrap();
        let id = product.id.unwrap().to_string();

        assert!(repo.delete(&id).await.unwrap());
        assert!(repo.find_by_id(&id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&id).await.unwrap_err(),
            RepoError::NotFound(_)
        ));
    }
}
