// Where the tree gets its assets from.

use std::future::Future;

use mmp_api::{ApiClient, Asset, AssetPage};

use crate::error::CoreError;

/// Paged access to the asset hierarchy.
pub trait AssetSource: Send + Sync + 'static {
    /// One page of children. `parent = None` lists the top level.
    fn children_page(
        &self,
        parent: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<AssetPage, CoreError>> + Send;

    fn asset(&self, id: &str) -> impl Future<Output = Result<Asset, CoreError>> + Send;
}

impl AssetSource for ApiClient {
    async fn children_page(
        &self,
        parent: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<AssetPage, CoreError> {
        let listing = match parent {
            None => self.list_assets(page, per_page).await?,
            Some(id) => self.list_nested(id, page, per_page).await?,
        };
        Ok(listing)
    }

    async fn asset(&self, id: &str) -> Result<Asset, CoreError> {
        Ok(self.get_asset(id).await?)
    }
}
