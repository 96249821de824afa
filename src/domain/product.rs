//! Product aggregate
//!
//! A product exclusively owns its reviews as an embedded collection. The
//! collection is the source of truth; `ratings` and `num_reviews` are derived
//! and recomputed after every mutation, never written independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Unique slug derived from the name.
    pub link: String,
    pub images: Vec<String>,
    pub brand: Option<String>,
    pub category: String,
    pub description: String,
    /// Unit price in minor currency units.
    pub price: i64,
    pub stock: i32,
    /// Arithmetic mean of review ratings, 0 when there are none.
    pub ratings: f64,
    pub num_reviews: i32,
    /// Ordered newest-first by last activity.
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub author_id: Uuid,
    /// Snapshot of the author's name at review time.
    pub author_name: String,
    pub ratings: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: i64, stock: i32) -> Self {
        let name = name.into();
        let link = slugify(&name);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            link,
            images: vec![],
            brand: None,
            category: category.into(),
            description: String::new(),
            price,
            stock,
            ratings: 0.0,
            num_reviews: 0,
            reviews: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a review for `author_id`. At most one review per author.
    pub fn add_review(
        &mut self,
        author_id: Uuid,
        author_name: impl Into<String>,
        ratings: i32,
        comment: impl Into<String>,
    ) -> Result<Review> {
        validate_rating(ratings)?;
        if self.reviews.iter().any(|r| r.author_id == author_id) {
            return Err(Error::DuplicateReview);
        }
        let now = Utc::now();
        let review = Review {
            id: Uuid::new_v4(),
            author_id,
            author_name: author_name.into(),
            ratings,
            comment: comment.into(),
            created_at: now,
            updated_at: now,
        };
        self.reviews.push(review.clone());
        self.recompute_ratings();
        Ok(review)
    }

    /// Mutates a review in place. Only the author may edit.
    pub fn update_review(
        &mut self,
        review_id: Uuid,
        author_id: Uuid,
        ratings: i32,
        comment: impl Into<String>,
    ) -> Result<Review> {
        validate_rating(ratings)?;
        let review = self
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id)
            .ok_or(Error::ReviewNotFound)?;
        if review.author_id != author_id {
            return Err(Error::NotAuthorized);
        }
        review.ratings = ratings;
        review.comment = comment.into();
        review.updated_at = Utc::now();
        let updated = review.clone();
        self.recompute_ratings();
        Ok(updated)
    }

    /// Removes a review. The author may remove their own; admins may remove any.
    pub fn remove_review(&mut self, review_id: Uuid, author_id: Uuid, is_admin: bool) -> Result<()> {
        let review = self
            .reviews
            .iter()
            .find(|r| r.id == review_id)
            .ok_or(Error::ReviewNotFound)?;
        if review.author_id != author_id && !is_admin {
            return Err(Error::NotAuthorized);
        }
        self.reviews.retain(|r| r.id != review_id);
        self.recompute_ratings();
        Ok(())
    }

    pub fn review_by_author(&self, author_id: Uuid) -> Option<&Review> {
        self.reviews.iter().find(|r| r.author_id == author_id)
    }

    /// Re-derives `num_reviews` and `ratings` from the collection and
    /// re-sorts newest-activity-first. Called after every review mutation.
    fn recompute_ratings(&mut self) {
        self.reviews.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        self.num_reviews = self.reviews.len() as i32;
        self.ratings = if self.reviews.is_empty() {
            0.0
        } else {
            self.reviews.iter().map(|r| r.ratings as f64).sum::<f64>() / self.reviews.len() as f64
        };
        self.updated_at = Utc::now();
    }
}

pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

fn validate_rating(ratings: i32) -> Result<()> {
    if !(1..=5).contains(&ratings) {
        return Err(Error::InvalidRating);
    }
    Ok(())
}
