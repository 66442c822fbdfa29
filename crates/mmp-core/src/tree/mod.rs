// ── Lazy asset tree ──
//
// Children are loaded on first request and cached per node. Concurrent
// requests for the same uncached node share one fetch. A fetch drains the
// listing page by page: page 0 first (it carries `total_pages`), then the
// rest in order.

mod node;
mod source;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use indexmap::IndexSet;
use tracing::debug;

use mmp_api::NodeKind;

use crate::config::TreeConfig;
use crate::error::CoreError;
use crate::lock;

pub use node::{NodeIcon, ROOT_ID, ROOT_NAME, TreeNode, asset_label};
pub use source::AssetSource;

/// Default page size for child listings.
pub const PER_PAGE: u32 = 200;

/// Upper bound on parent hops when revealing a node.
pub const MAX_REVEAL_DEPTH: usize = 64;

type ChildIds = Arc<Vec<String>>;
type SharedFetch = Shared<BoxFuture<'static, Result<ChildIds, CoreError>>>;

/// Lazily-populated view of the asset hierarchy.
///
/// Cheaply cloneable; clones share caches.
pub struct AssetTree<S> {
    inner: Arc<TreeInner<S>>,
}

impl<S> Clone for AssetTree<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct TreeInner<S> {
    source: S,
    per_page: u32,
    items: DashMap<String, TreeNode>,
    state: Mutex<TreeState>,
}

struct TreeState {
    children: HashMap<String, ChildIds>,
    in_flight: HashMap<String, SharedFetch>,
    expanded: IndexSet<String>,
}

impl<S: AssetSource> AssetTree<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, TreeConfig::default())
    }

    pub fn with_config(source: S, config: TreeConfig) -> Self {
        let items = DashMap::new();
        items.insert(ROOT_ID.to_owned(), TreeNode::root());
        let mut expanded = IndexSet::new();
        expanded.insert(ROOT_ID.to_owned());

        Self {
            inner: Arc::new(TreeInner {
                source,
                per_page: config.per_page.max(1),
                items,
                state: Mutex::new(TreeState {
                    children: HashMap::new(),
                    in_flight: HashMap::new(),
                    expanded,
                }),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    // ── Children ─────────────────────────────────────────────────

    /// Child ids of `id`, fetching them if not cached.
    ///
    /// Joins an in-flight fetch for the same node. A failed fetch is not
    /// cached; every joined caller sees the same error.
    pub async fn get_children(&self, id: &str) -> Result<ChildIds, CoreError> {
        let fetch = {
            let mut state = lock(&self.inner.state);
            if let Some(cached) = state.children.get(id) {
                return Ok(Arc::clone(cached));
            }
            if let Some(pending) = state.in_flight.get(id) {
                debug!(node = %id, "joining in-flight children fetch");
                pending.clone()
            } else {
                let fetch = Self::spawn_fetch(Arc::clone(&self.inner), id.to_owned());
                state.in_flight.insert(id.to_owned(), fetch.clone());
                fetch
            }
        };
        fetch.await
    }

    /// Children if already loaded.
    pub fn cached_children(&self, id: &str) -> Option<ChildIds> {
        lock(&self.inner.state).children.get(id).cloned()
    }

    /// Forget the cached children of `id` so the next request refetches.
    pub fn invalidate(&self, id: &str) -> bool {
        lock(&self.inner.state).children.remove(id).is_some()
    }

    fn spawn_fetch(inner: Arc<TreeInner<S>>, id: String) -> SharedFetch {
        async move {
            let result = inner.fetch_children(&id).await;
            let mut state = lock(&inner.state);
            state.in_flight.remove(&id);
            if let Ok(ids) = &result {
                state.children.insert(id, Arc::clone(ids));
            }
            result
        }
        .boxed()
        .shared()
    }

    // ── Items ────────────────────────────────────────────────────

    /// Metadata for `id`, or a folder placeholder named by the id.
    ///
    /// The placeholder is stored, so later lookups return the same node
    /// until real metadata arrives.
    pub fn get_item(&self, id: &str) -> TreeNode {
        self.inner
            .items
            .entry(id.to_owned())
            .or_insert_with(|| TreeNode::placeholder(id))
            .clone()
    }

    // ── Expansion ────────────────────────────────────────────────

    /// Expanded node ids, in expansion order. Starts with the root.
    pub fn expanded(&self) -> Vec<String> {
        lock(&self.inner.state).expanded.iter().cloned().collect()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        lock(&self.inner.state).expanded.contains(id)
    }

    pub fn expand(&self, id: &str) -> bool {
        lock(&self.inner.state).expanded.insert(id.to_owned())
    }

    pub fn collapse(&self, id: &str) -> bool {
        lock(&self.inner.state).expanded.shift_remove(id)
    }

    /// Expand every folder ancestor of `target`.
    ///
    /// Walks `parent_id` links for at most [`MAX_REVEAL_DEPTH`] hops,
    /// stopping at a repeated id or at a `root` node. Returns the ids that
    /// were newly expanded.
    pub async fn reveal(&self, target: &str) -> Result<Vec<String>, CoreError> {
        let mut to_expand = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(target.to_owned());

        for _ in 0..MAX_REVEAL_DEPTH {
            let Some(id) = current.take() else {
                break;
            };
            if !seen.insert(id.clone()) {
                break;
            }

            let asset = self.inner.source.asset(&id).await?;
            if asset.node_kind == NodeKind::Root {
                break;
            }
            self.inner
                .items
                .entry(id.clone())
                .or_insert_with(|| TreeNode::from_asset(&asset));
            if asset.node_kind != NodeKind::File && id != target {
                to_expand.push(id);
            }
            current = asset.parent_id.filter(|p| !p.is_empty());
        }

        let mut state = lock(&self.inner.state);
        let added: Vec<String> = to_expand
            .into_iter()
            .filter(|id| state.expanded.insert(id.clone()))
            .collect();
        if !added.is_empty() {
            debug!(target_id = %target, expanded = added.len(), "revealed node");
        }
        Ok(added)
    }
}

impl<S: AssetSource> TreeInner<S> {
    async fn fetch_children(&self, id: &str) -> Result<ChildIds, CoreError> {
        let parent = (id != ROOT_ID).then_some(id);

        let first = self.source.children_page(parent, 0, self.per_page).await?;
        let total_pages = first.total_pages.unwrap_or(1);
        let mut assets = first.assets;
        for page in 1..total_pages {
            let next = self.source.children_page(parent, page, self.per_page).await?;
            assets.extend(next.assets);
        }
        debug!(node = %id, pages = total_pages, children = assets.len(), "loaded children");

        let ids: Vec<String> = assets.iter().map(|a| a.id.clone()).collect();
        for asset in &assets {
            self.items.insert(asset.id.clone(), TreeNode::from_asset(asset));
        }
        Ok(Arc::new(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmp_api::{Asset, AssetPage};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source that records every page request.
    #[derive(Default)]
    struct MemorySource {
        pages: HashMap<Option<String>, Vec<AssetPage>>,
        assets: HashMap<String, Asset>,
        calls: Mutex<Vec<(Option<String>, u32)>>,
        asset_calls: AtomicUsize,
        failures: AtomicUsize,
    }

    fn asset(id: &str, node_kind: &str, parent: Option<&str>) -> Asset {
        serde_json::from_value(json!({
            "id": id,
            "label": id,
            "node_kind": node_kind,
            "parent_id": parent,
        }))
        .unwrap()
    }

    fn page(ids: &[&str], total_pages: Option<u32>) -> AssetPage {
        AssetPage {
            assets: ids.iter().map(|id| asset(id, "file", None)).collect(),
            total_pages,
            ..AssetPage::default()
        }
    }

    impl MemorySource {
        fn with_pages(mut self, parent: Option<&str>, pages: Vec<AssetPage>) -> Self {
            self.pages.insert(parent.map(str::to_owned), pages);
            self
        }

        fn with_asset(mut self, asset: Asset) -> Self {
            self.assets.insert(asset.id.clone(), asset);
            self
        }

        fn calls(&self) -> Vec<(Option<String>, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AssetSource for MemorySource {
        async fn children_page(
            &self,
            parent: Option<&str>,
            page: u32,
            _per_page: u32,
        ) -> Result<AssetPage, CoreError> {
            self.calls.lock().unwrap().push((parent.map(str::to_owned), page));
            tokio::task::yield_now().await;
            if page > 0
                && self
                    .failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(CoreError::Api {
                    status: 500,
                    message: Some("boom".into()),
                });
            }
            self.pages
                .get(&parent.map(str::to_owned))
                .and_then(|pages| pages.get(page as usize))
                .cloned()
                .ok_or_else(|| CoreError::NotFound {
                    identifier: format!("{parent:?} page {page}"),
                })
        }

        async fn asset(&self, id: &str) -> Result<Asset, CoreError> {
            self.asset_calls.fetch_add(1, Ordering::SeqCst);
            self.assets.get(id).cloned().ok_or_else(|| CoreError::NotFound {
                identifier: id.to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn three_pages_fetched_in_order() {
        let source = MemorySource::default().with_pages(
            None,
            vec![page(&["a"], Some(3)), page(&["b", "c"], None), page(&["d"], None)],
        );
        let tree = AssetTree::new(source);

        let children = tree.get_children(ROOT_ID).await.unwrap();
        assert_eq!(*children, vec!["a", "b", "c", "d"]);
        assert_eq!(
            tree.source().calls(),
            vec![(None, 0), (None, 1), (None, 2)]
        );

        // Cached: no further requests.
        tree.get_children(ROOT_ID).await.unwrap();
        assert_eq!(tree.source().calls().len(), 3);
        assert_eq!(tree.get_item("c").name, "c");
    }

    #[tokio::test]
    async fn missing_total_pages_means_one_page() {
        let source = MemorySource::default().with_pages(Some("d1"), vec![page(&["x"], None)]);
        let tree = AssetTree::new(source);

        assert_eq!(*tree.get_children("d1").await.unwrap(), vec!["x"]);
        assert_eq!(tree.source().calls(), vec![(Some("d1".into()), 0)]);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let source = MemorySource::default().with_pages(
            None,
            vec![page(&["a"], Some(2)), page(&["b"], None)],
        );
        let tree = AssetTree::new(source);

        let (left, right) = tokio::join!(tree.get_children(ROOT_ID), tree.get_children(ROOT_ID));
        assert_eq!(left.unwrap(), right.unwrap());
        assert_eq!(tree.source().calls(), vec![(None, 0), (None, 1)]);
    }

    #[tokio::test]
    async fn failure_rejects_all_callers_and_is_not_cached() {
        let source = MemorySource::default().with_pages(
            None,
            vec![page(&["a"], Some(2)), page(&["b"], None)],
        );
        source.failures.store(1, Ordering::SeqCst);
        let tree = AssetTree::new(source);

        let (left, right) = tokio::join!(tree.get_children(ROOT_ID), tree.get_children(ROOT_ID));
        let err = left.unwrap_err();
        assert_eq!(right.unwrap_err(), err);
        assert_eq!(err.status(), Some(500));
        assert!(tree.cached_children(ROOT_ID).is_none());

        // The in-flight entry is gone, so a retry starts a new sequence.
        let children = tree.get_children(ROOT_ID).await.unwrap();
        assert_eq!(*children, vec!["a", "b"]);
        assert_eq!(tree.source().calls().len(), 4);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let source = MemorySource::default().with_pages(None, vec![page(&["a"], None)]);
        let tree = AssetTree::new(source);
        tree.get_children(ROOT_ID).await.unwrap();
        assert!(tree.invalidate(ROOT_ID));
        tree.get_children(ROOT_ID).await.unwrap();
        assert_eq!(tree.source().calls().len(), 2);
    }

    #[tokio::test]
    async fn get_item_stores_placeholder() {
        let tree = AssetTree::new(MemorySource::default());
        assert_eq!(tree.get_item(ROOT_ID), TreeNode::root());

        let first = tree.get_item("unknown");
        assert_eq!(first, TreeNode::placeholder("unknown"));
        assert!(tree.inner.items.contains_key("unknown"));
    }

    #[tokio::test]
    async fn reveal_expands_folder_ancestors() {
        let source = MemorySource::default()
            .with_asset(asset("file", "file", Some("bundle")))
            .with_asset(asset("bundle", "bundle", Some("dir")))
            .with_asset(asset("dir", "dir", Some("lib")))
            .with_asset(asset("lib", "root", None));
        let tree = AssetTree::new(source);

        let added = tree.reveal("file").await.unwrap();
        assert_eq!(added, vec!["bundle", "dir"]);
        assert_eq!(tree.expanded(), vec![ROOT_ID, "bundle", "dir"]);
        assert_eq!(tree.source().asset_calls.load(Ordering::SeqCst), 4);

        // Already expanded: nothing new.
        assert!(tree.reveal("file").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reveal_skips_target_folder_itself() {
        let source = MemorySource::default()
            .with_asset(asset("inner", "dir", Some("outer")))
            .with_asset(asset("outer", "dir", None));
        let tree = AssetTree::new(source);

        assert_eq!(tree.reveal("inner").await.unwrap(), vec!["outer"]);
        assert!(!tree.is_expanded("inner"));
    }

    #[tokio::test]
    async fn reveal_stops_after_max_depth() {
        let mut source = MemorySource::default();
        for i in 0..100 {
            let parent = format!("d{}", i + 1);
            source = source.with_asset(asset(&format!("d{i}"), "dir", Some(&parent)));
        }
        let tree = AssetTree::new(source);

        let added = tree.reveal("d0").await.unwrap();
        assert_eq!(tree.source().asset_calls.load(Ordering::SeqCst), MAX_REVEAL_DEPTH);
        assert_eq!(added.len(), MAX_REVEAL_DEPTH - 1);
    }

    #[tokio::test]
    async fn reveal_stops_on_cycle() {
        let source = MemorySource::default()
            .with_asset(asset("a", "dir", Some("b")))
            .with_asset(asset("b", "dir", Some("a")));
        let tree = AssetTree::new(source);

        assert_eq!(tree.reveal("a").await.unwrap(), vec!["b"]);
        assert_eq!(tree.source().asset_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expand_and_collapse() {
        let tree = AssetTree::new(MemorySource::default());
        assert!(tree.expand("x"));
        assert!(!tree.expand("x"));
        assert!(tree.collapse("x"));
        assert!(!tree.collapse("x"));
        assert_eq!(tree.expanded(), vec![ROOT_ID]);
    }
}
