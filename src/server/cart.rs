//! The cart embedded in the user document.
//!
//! This cart is never reconciled with a shopper's client-side cart; the two
//! live independently.

use thiserror::Error;
use tracing::{debug, warn};

use super::repository::{RepositoryError, UserRepository};
use super::user::ServerCartItem;
use crate::core::cart::{CartLine, LineKey, merge_line};

/// Attempts made before a contended merge-add gives up.
const MAX_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum ServerCartError {
    #[error("{0}")]
    Validation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("cart update kept conflicting with concurrent writes")]
    Contended,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToCart {
    pub product_id: String,
    pub quantity: u32,
    pub size: Option<String>,
}

impl AddToCart {
    fn validate(&self) -> Result<(), ServerCartError> {
        if self.product_id.trim().is_empty() {
            return Err(ServerCartError::Validation(
                "Please provide a product id".to_string(),
            ));
        }
        if self.quantity == 0 {
            return Err(ServerCartError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Merges an item into the user's stored cart under the (product, size) key.
/// Returns the updated cart.
pub async fn add_to_server_cart(
    repo: &dyn UserRepository,
    user_id: &str,
    item: AddToCart,
) -> Result<Vec<ServerCartItem>, ServerCartError> {
    item.validate()?;

    for attempt in 1..=MAX_ATTEMPTS {
        let mut user = repo
            .find(user_id)
            .await?
            .ok_or(ServerCartError::UserNotFound)?;

        let key = LineKey::new(&item.product_id, item.size.as_deref());
        let existing = user
            .cart
            .iter()
            .find(|line| line.key() == key)
            .map_or(0, |line| line.quantity);
        if existing.checked_add(item.quantity).is_none() {
            return Err(ServerCartError::Validation(format!(
                "Quantity cannot exceed {}",
                u32::MAX
            )));
        }

        merge_line(
            &mut user.cart,
            ServerCartItem {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                size: item.size.clone(),
            },
        );

        match repo.save(user).await {
            Ok(saved) => {
                debug!(user = %user_id, product = %item.product_id, "Server cart updated");
                return Ok(saved.cart);
            }
            Err(RepositoryError::Conflict { .. }) => {
                warn!(user = %user_id, attempt, "Server cart write conflicted, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ServerCartError::Contended)
}

pub async fn server_cart(
    repo: &dyn UserRepository,
    user_id: &str,
) -> Result<Vec<ServerCartItem>, ServerCartError> {
    let user = repo
        .find(user_id)
        .await?
        .ok_or(ServerCartError::UserNotFound)?;
    Ok(user.cart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::repository::MemoryUserRepository;
    use crate::server::user::UserRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn add(product_id: &str, quantity: u32, size: Option<&str>) -> AddToCart {
        AddToCart {
            product_id: product_id.to_string(),
            quantity,
            size: size.map(str::to_string),
        }
    }

    async fn repo_with_user() -> MemoryUserRepository {
        let repo = MemoryUserRepository::new();
        repo.insert(UserRecord::new("u1", "alice", "alice@example.com"))
            .await
            .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_add_merges_by_product_and_size() {
        let repo = repo_with_user().await;

        add_to_server_cart(&repo, "u1", add("p", 2, Some("M"))).await.unwrap();
        add_to_server_cart(&repo, "u1", add("p", 1, Some("L"))).await.unwrap();
        let cart = add_to_server_cart(&repo, "u1", add("p", 3, Some("M")))
            .await
            .unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(cart[0].quantity, 5);
        assert_eq!(cart[0].size.as_deref(), Some("M"));
        assert_eq!(cart[1].quantity, 1);
        assert_eq!(server_cart(&repo, "u1").await.unwrap(), cart);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let repo = repo_with_user().await;

        let err = add_to_server_cart(&repo, "u1", add(" ", 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerCartError::Validation(_)));

        let err = add_to_server_cart(&repo, "u1", add("p", 0, None))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Quantity must be at least 1");
        assert!(server_cart(&repo, "u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quantity_overflow_is_rejected() {
        let repo = repo_with_user().await;
        add_to_server_cart(&repo, "u1", add("p", u32::MAX - 1, Some("M")))
            .await
            .unwrap();

        let err = add_to_server_cart(&repo, "u1", add("p", 2, Some("M")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerCartError::Validation(_)));
        assert_eq!(err.to_string(), format!("Quantity cannot exceed {}", u32::MAX));

        // Stored line is untouched; the exact remaining headroom still fits
        assert_eq!(server_cart(&repo, "u1").await.unwrap()[0].quantity, u32::MAX - 1);
        let cart = add_to_server_cart(&repo, "u1", add("p", 1, Some("M")))
            .await
            .unwrap();
        assert_eq!(cart[0].quantity, u32::MAX);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let repo = MemoryUserRepository::new();
        let err = add_to_server_cart(&repo, "ghost", add("p", 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerCartError::UserNotFound));
        assert!(matches!(
            server_cart(&repo, "ghost").await.unwrap_err(),
            ServerCartError::UserNotFound
        ));
    }

    /// Sneaks in a competing write before the first `save`.
    struct RacingRepository {
        inner: MemoryUserRepository,
        races_left: AtomicUsize,
    }

    #[async_trait]
    impl UserRepository for RacingRepository {
        async fn find(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError> {
            self.inner.find(id).await
        }

        async fn insert(&self, user: UserRecord) -> Result<(), RepositoryError> {
            self.inner.insert(user).await
        }

        async fn save(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
            if self.races_left.load(Ordering::SeqCst) > 0 {
                self.races_left.fetch_sub(1, Ordering::SeqCst);
                let mut other = self.inner.find(&user.id).await?.unwrap();
                merge_line(
                    &mut other.cart,
                    ServerCartItem {
                        product_id: "other".to_string(),
                        quantity: 1,
                        size: None,
                    },
                );
                self.inner.save(other).await?;
            }
            self.inner.save(user).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_write_is_not_lost() {
        let repo = RacingRepository {
            inner: repo_with_user().await,
            races_left: AtomicUsize::new(1),
        };

        let cart = add_to_server_cart(&repo, "u1", add("p", 2, None)).await.unwrap();
        assert_eq!(cart.len(), 2);
        assert!(cart.iter().any(|i| i.product_id == "other"));
        assert!(cart.iter().any(|i| i.product_id == "p" && i.quantity == 2));
    }

    #[tokio::test]
    async fn test_gives_up_when_always_contended() {
        let repo = RacingRepository {
            inner: repo_with_user().await,
            races_left: AtomicUsize::new(usize::MAX),
        };

        let err = add_to_server_cart(&repo, "u1", add("p", 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerCartError::Contended));
    }
}
