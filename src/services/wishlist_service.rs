use std::collections::HashMap;

use chrono::Utc;
use validator::Validate;

use crate::{
    dto::wishlists::{CreateWishlistRequest, WishlistDetails},
    error::{AppError, AppResult},
    models::{Property, PropertySummary, Wishlist},
    response::Page,
    routes::params::Pagination,
    services::base::BaseService,
    store::DataStore,
};

#[derive(Clone)]
pub struct WishlistService {
    base: BaseService<Wishlist>,
    properties: BaseService<Property>,
}

impl WishlistService {
    pub fn new(store: &DataStore) -> Self {
        Self {
            base: BaseService::new(store, "wishlist"),
            properties: BaseService::new(store, "property"),
        }
    }

    pub async fn create(&self, user_id: i64, req: CreateWishlistRequest) -> AppResult<Wishlist> {
        req.validate()?;
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Wishlist name cannot be blank"));
        }
        let wishlist = self
            .base
            .create_with(move |_| {
                Ok(Wishlist {
                    id: 0,
                    user_id,
                    name,
                    properties: Vec::new(),
                    is_public: req.is_public,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
            .await?;
        tracing::info!(wishlist_id = wishlist.id, user_id, "wishlist created");
        Ok(wishlist)
    }

    /// Newest first. Without `owner`, only public wishlists are listed; other
    /// users' private lists are never visible to `viewer`.
    pub async fn list(
        &self,
        viewer: i64,
        owner: Option<i64>,
        pagination: Pagination,
    ) -> AppResult<Page<Wishlist>> {
        let mut wishlists = self
            .base
            .find_by(|w| {
                owner.is_none_or(|o| w.user_id == o) && (w.is_public || w.user_id == viewer)
            })
            .await?;
        wishlists.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let (skip, limit) = pagination.window();
        Ok(Page::slice(wishlists, skip, limit))
    }

    pub async fn get(
        &self,
        viewer: i64,
        id: i64,
        include_properties: bool,
    ) -> AppResult<WishlistDetails> {
        let wishlist = self.base.get_by_id(id).await?;
        if !wishlist.is_public && wishlist.user_id != viewer {
            return Err(AppError::Forbidden);
        }

        let property_details = if include_properties {
            let properties: HashMap<i64, Property> = self
                .properties
                .find_by(|p| wishlist.properties.contains(&p.id))
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();
            Some(
                wishlist
                    .properties
                    .iter()
                    .filter_map(|id| properties.get(id).map(PropertySummary::from))
                    .collect(),
            )
        } else {
            None
        };

        Ok(WishlistDetails {
            wishlist,
            property_details,
        })
    }

    async fn owned(&self, user_id: i64, id: i64) -> AppResult<Wishlist> {
        let wishlist = self.base.get_by_id(id).await?;
        if wishlist.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(wishlist)
    }

    /// Adding a property that is already listed is a no-op.
    pub async fn add_property(&self, user_id: i64, id: i64, property_id: i64) -> AppResult<Wishlist> {
        self.owned(user_id, id).await?;
        self.properties.get_by_id(property_id).await?;
        self.base
            .update(id, move |w| {
                if !w.properties.contains(&property_id) {
                    w.properties.push(property_id);
                }
                Ok(())
            })
            .await
    }

    pub async fn remove_property(
        &self,
        user_id: i64,
        id: i64,
        property_id: i64,
    ) -> AppResult<Wishlist> {
        self.owned(user_id, id).await?;
        self.base
            .update(id, move |w| {
                w.properties.retain(|p| *p != property_id);
                Ok(())
            })
            .await
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> AppResult<()> {
        self.owned(user_id, id).await?;
        self.base.delete(id).await?;
        tracing::info!(wishlist_id = id, user_id, "wishlist deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::tests::property;

    fn named(name: &str, is_public: bool) -> CreateWishlistRequest {
        CreateWishlistRequest {
            name: name.into(),
            is_public,
        }
    }

    #[tokio::test]
    async fn owner_curates_wishlist() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("stayhub_wishlists_{}", uuid::Uuid::new_v4()));
        let store = DataStore::open(&dir).await?;
        let listed = store.collection::<Property>().create(property(90.0)).await?;
        let service = WishlistService::new(&store);

        assert!(matches!(service.create(1, named("", false)).await, Err(AppError::Validation(_))));
        let summer = service.create(1, named("Summer", false)).await?;
        service.create(2, named("Shared", true)).await?;

        service.add_property(1, summer.id, listed.id).await?;
        let twice = service.add_property(1, summer.id, listed.id).await?;
        assert_eq!(twice.properties, vec![listed.id]);
        assert!(matches!(
            service.add_property(1, summer.id, 404).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.add_property(2, summer.id, listed.id).await,
            Err(AppError::Forbidden)
        ));

        let details = service.get(1, summer.id, true).await?;
        assert_eq!(details.property_details.map(|p| p.len()), Some(1));
        assert!(service.get(1, summer.id, false).await?.property_details.is_none());
        assert!(matches!(service.get(2, summer.id, false).await, Err(AppError::Forbidden)));

        assert_eq!(service.list(1, None, Pagination::default()).await?.total, 2);
        assert_eq!(service.list(2, None, Pagination::default()).await?.total, 1);
        assert_eq!(service.list(2, Some(1), Pagination::default()).await?.total, 0);

        let emptied = service.remove_property(1, summer.id, listed.id).await?;
        assert!(emptied.properties.is_empty());

        assert!(matches!(service.delete(2, summer.id).await, Err(AppError::Forbidden)));
        service.delete(1, summer.id).await?;
        assert!(matches!(service.get(1, summer.id, false).await, Err(AppError::NotFound(_))));

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }
}
