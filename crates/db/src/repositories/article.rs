//! Article repository for stock-bearing retail articles.
//!
//! Stock mutation is a single conditional update: the decrement carries a
//! `stock >= quantity` filter, so a concurrent sale of the last units loses
//! the race inside the database instead of driving stock negative.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use crate::entities::articles;

/// Error types for article operations.
#[derive(Debug, thiserror::Error)]
pub enum ArticleError {
    /// Article not found.
    #[error("Article not found: {0}")]
    NotFound(Uuid),

    /// Not enough stock to cover the requested quantity.
    #[error("Insufficient stock for article {article_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Article being sold.
        article_id: Uuid,
        /// Units requested.
        requested: i32,
        /// Units currently in stock.
        available: i32,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Article repository.
#[derive(Debug, Clone)]
pub struct ArticleRepository {
    db: DatabaseConnection,
}

impl ArticleRepository {
    /// Creates a new article repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an article within a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the article does not exist in the tenant or the
    /// database query fails.
    pub async fn find(
        &self,
        tenant_id: Uuid,
        article_id: Uuid,
    ) -> Result<articles::Model, ArticleError> {
        let article = articles::Entity::find_by_id(article_id)
            .filter(articles::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(ArticleError::NotFound(article_id))?;

        Ok(article)
    }
}

/// Atomically decrements stock, failing if fewer than `quantity` units are
/// available. Runs inside the caller's sale transaction.
///
/// # Errors
///
/// Returns an error if the article does not exist, has insufficient stock,
/// or the database operation fails.
pub async fn decrement_stock(
    txn: &DatabaseTransaction,
    tenant_id: Uuid,
    article_id: Uuid,
    quantity: i32,
) -> Result<(), ArticleError> {
    let result = articles::Entity::update_many()
        .col_expr(
            articles::Column::Stock,
            Expr::col(articles::Column::Stock).sub(quantity),
        )
        .filter(articles::Column::Id.eq(article_id))
        .filter(articles::Column::TenantId.eq(tenant_id))
        .filter(articles::Column::Stock.gte(quantity))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        // Distinguish a missing article from a short one
        let article = articles::Entity::find_by_id(article_id)
            .filter(articles::Column::TenantId.eq(tenant_id))
            .one(txn)
            .await?
            .ok_or(ArticleError::NotFound(article_id))?;

        return Err(ArticleError::InsufficientStock {
            article_id,
            requested: quantity,
            available: article.stock,
        });
    }

    Ok(())
}

/// Restores stock for a refunded product line. Runs inside the caller's
/// refund transaction.
///
/// # Errors
///
/// Returns an error if the article does not exist or the database
/// operation fails.
pub async fn restore_stock(
    txn: &DatabaseTransaction,
    tenant_id: Uuid,
    article_id: Uuid,
    quantity: i32,
) -> Result<(), ArticleError> {
    let result = articles::Entity::update_many()
        .col_expr(
            articles::Column::Stock,
            Expr::col(articles::Column::Stock).add(quantity),
        )
        .filter(articles::Column::Id.eq(article_id))
        .filter(articles::Column::TenantId.eq(tenant_id))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ArticleError::NotFound(article_id));
    }

    Ok(())
}
