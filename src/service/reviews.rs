//! Review aggregator
//!
//! Loads the owning product, mutates its embedded review collection through
//! the aggregate methods (which recompute `ratings`/`num_reviews`), and
//! persists the product document in one store write.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Product, Review};
use crate::store::ProductStore;
use crate::{Actor, Error, Result};

pub struct ReviewAggregator {
    products: Arc<dyn ProductStore>,
}

impl ReviewAggregator {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }

    async fn load(&self, product_id: Uuid) -> Result<Product> {
        self.products
            .get(product_id)
            .await?
            .ok_or(Error::ProductNotFound)
    }

    /// First review by this actor on the product; at most one per author.
    #[tracing::instrument(skip(self, comment))]
    pub async fn create(
        &self,
        product_id: Uuid,
        actor: &Actor,
        ratings: i32,
        comment: String,
    ) -> Result<Review> {
        let mut product = self.load(product_id).await?;
        let review = product.add_review(actor.id, actor.name.clone(), ratings, comment)?;
        self.products.update(&product).await?;
        Ok(review)
    }

    /// Author-only edit; bumps the review's activity timestamp.
    #[tracing::instrument(skip(self, comment))]
    pub async fn update(
        &self,
        product_id: Uuid,
        review_id: Uuid,
        actor: &Actor,
        ratings: i32,
        comment: String,
    ) -> Result<Review> {
        let mut product = self.load(product_id).await?;
        let review = product.update_review(review_id, actor.id, ratings, comment)?;
        self.products.update(&product).await?;
        Ok(review)
    }

    /// Removal by the author, or by an administrator.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, product_id: Uuid, review_id: Uuid, actor: &Actor) -> Result<()> {
        let mut product = self.load(product_id).await?;
        product.remove_review(review_id, actor.id, actor.is_admin)?;
        self.products.update(&product).await?;
        Ok(())
    }
}
