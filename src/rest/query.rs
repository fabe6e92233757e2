//! Lazy, immutable collection queries.
//!
//! A [`Query`] is a value: [`filter`](Query::filter), [`sort`](Query::sort)
//! and [`limit`](Query::limit) return new queries and leave the receiver
//! untouched, so a base query can be shared and refined freely.
//!
//! Nothing is requested until the query is consumed. Iteration fetches one
//! page at a time and only asks for the next page once the current one is
//! exhausted and the server returned a cursor.
//!
//! # Example
//!
//! ```rust,ignore
//! use restmap::rest::field;
//!
//! let recent = client
//!     .query("playlist")?
//!     .filter(field("tags").contains("nuti"))?
//!     .sort(field("created_at").desc())?;
//!
//! // GET /v1/playlists?tags.contains=nuti&sort=-created_at
//! let mut iter = recent.iter();
//! while let Some(playlist) = iter.try_next().await? {
//!     println!("{:?}", playlist.get("name"));
//! }
//!
//! let newest = recent.first().await?;
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::stream::{self, Stream};
use serde_json::Value;

use crate::clients::{HttpResponse, RestClient};
use crate::rest::errors::ResourceError;
use crate::rest::filter::{encode_sorts, FilterExpr, Predicate, SortKey};
use crate::rest::path::{ParentRef, ResourceOperation};
use crate::rest::resource::Resource;
use crate::rest::response::Page;
use crate::rest::schema::{CountStrategy, ResourceType};
use crate::rest::value::FieldValue;

/// An immutable query over one collection.
#[derive(Debug, Clone)]
pub struct Query {
    client: RestClient,
    resource_type: Arc<ResourceType>,
    parent: Option<ParentRef>,
    collection_uri: String,
    predicates: Vec<Predicate>,
    sorts: Vec<SortKey>,
    limit: Option<u32>,
    fallback: bool,
}

impl Query {
    /// Creates a query over the collection of `resource_type`, nested under
    /// `parent` if the type requires one.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnresolvableUri`] if the collection path
    /// cannot be resolved.
    pub fn new(
        client: RestClient,
        resource_type: Arc<ResourceType>,
        parent: Option<ParentRef>,
    ) -> Result<Self, ResourceError> {
        let collection_uri = resource_type.uri_spec().resolve(
            resource_type.name(),
            ResourceOperation::All,
            None,
            parent.as_ref(),
        )?;
        Ok(Self {
            client,
            resource_type,
            parent,
            collection_uri,
            predicates: Vec::new(),
            sorts: Vec::new(),
            limit: None,
            fallback: true,
        })
    }

    /// Returns the queried type.
    #[must_use]
    pub const fn resource_type(&self) -> &Arc<ResourceType> {
        &self.resource_type
    }

    /// Returns the parent the collection is nested under.
    #[must_use]
    pub const fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    /// Returns the collection path.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.collection_uri
    }

    /// Returns a new query with `expr` AND-ed onto the existing filters.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidFilter`] if the expression names an
    /// undeclared field path or cannot be encoded.
    pub fn filter(&self, expr: FilterExpr) -> Result<Self, ResourceError> {
        let predicates = expr.flatten().map_err(|e| self.invalid_filter(e.field, e.reason))?;
        for predicate in &predicates {
            self.resource_type
                .validate_path(&predicate.field)
                .map_err(|reason| self.invalid_filter(predicate.field.clone(), reason))?;
        }

        let mut next = self.clone();
        next.predicates.extend(predicates);
        Ok(next)
    }

    /// Returns a new query with `key` appended as the lowest-priority sort.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidFilter`] if the key names an
    /// undeclared field path.
    pub fn sort(&self, key: SortKey) -> Result<Self, ResourceError> {
        self.resource_type
            .validate_path(&key.field)
            .map_err(|reason| self.invalid_filter(key.field.clone(), reason))?;

        let mut next = self.clone();
        next.sorts.push(key);
        Ok(next)
    }

    /// Returns a new query requesting pages of at most `n` items.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidFilter`] if `n` is zero.
    pub fn limit(&self, n: u32) -> Result<Self, ResourceError> {
        if n == 0 {
            return Err(self.invalid_filter(
                "limit".to_string(),
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(self.with_page_size(n))
    }

    fn with_page_size(&self, n: u32) -> Self {
        let mut next = self.clone();
        next.limit = Some(n);
        next
    }

    /// Returns a new query that fails on payloads with an unknown type
    /// discriminator (`false`) or decodes them as the queried type (`true`,
    /// the default).
    #[must_use]
    pub fn allow_fallback(&self, fallback: bool) -> Self {
        let mut next = self.clone();
        next.fallback = fallback;
        next
    }

    /// Returns the query parameters of the first page, in wire order:
    /// filters, then `sort`, then the page size.
    #[must_use]
    pub fn params(&self) -> Vec<(String, String)> {
        self.page_params(None)
    }

    fn filter_params(&self) -> Vec<(String, String)> {
        self.predicates
            .iter()
            .map(|p| (p.key(), p.value()))
            .collect()
    }

    fn page_params(&self, cursor: Option<&str>) -> Vec<(String, String)> {
        let format = self.client.page_format();
        let mut params = self.filter_params();
        if let Some(sort) = encode_sorts(&self.sorts) {
            params.push(("sort".to_string(), sort));
        }
        if let Some(limit) = self.limit.or_else(|| self.resource_type.page_size()) {
            params.push((format.limit_param.clone(), limit.to_string()));
        }
        if let Some(cursor) = cursor {
            params.push((format.cursor_param.clone(), cursor.to_string()));
        }
        params
    }

    /// Starts a lazy iteration. Each call starts over from the first page.
    #[must_use]
    pub fn iter(&self) -> QueryIter {
        QueryIter {
            query: self.clone(),
            buffer: VecDeque::new(),
            cursor: None,
            seen: HashSet::new(),
            done: false,
        }
    }

    /// Returns the results as a stream, fetching pages on demand.
    pub fn stream(&self) -> impl Stream<Item = Result<Resource, ResourceError>> + Send + 'static {
        stream::try_unfold(self.iter(), |mut iter| async move {
            let next = iter.try_next().await?;
            Ok::<_, ResourceError>(next.map(|resource| (resource, iter)))
        })
    }

    /// Collects every result.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a page request or decode.
    pub async fn all(&self) -> Result<Vec<Resource>, ResourceError> {
        let mut iter = self.iter();
        let mut results = Vec::new();
        while let Some(resource) = iter.try_next().await? {
            results.push(resource);
        }
        Ok(results)
    }

    /// Returns the first result, if any, requesting a page of one.
    ///
    /// # Errors
    ///
    /// Returns the error raised by the page request or decode.
    pub async fn first(&self) -> Result<Option<Resource>, ResourceError> {
        self.with_page_size(1).iter().try_next().await
    }

    /// Returns the only result.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NoResult`] if nothing matches and
    /// [`ResourceError::MultipleResults`] if more than one resource does.
    pub async fn one(&self) -> Result<Resource, ResourceError> {
        let mut iter = self.with_page_size(2).iter();
        let Some(resource) = iter.try_next().await? else {
            return Err(ResourceError::NoResult {
                resource: self.resource_type.name().to_string(),
            });
        };
        if iter.try_next().await?.is_some() {
            return Err(ResourceError::MultipleResults {
                resource: self.resource_type.name().to_string(),
            });
        }
        Ok(resource)
    }

    /// Asks the server how many resources match the filters.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Unsupported`] if the type declares no count
    /// strategy, and [`ResourceError::InvalidPayload`] if the response
    /// carries no count.
    pub async fn count(&self) -> Result<u64, ResourceError> {
        match self.resource_type.count_strategy() {
            CountStrategy::Unsupported => Err(ResourceError::Unsupported {
                resource: self.resource_type.name().to_string(),
                operation: ResourceOperation::Count.as_str(),
            }),
            CountStrategy::Endpoint { suffix, field } => {
                let uri = format!("{}/{suffix}", self.collection_uri);
                let response = self.get_checked(&uri, self.filter_params()).await?;
                self.read_count(&response.body, field)
            }
            CountStrategy::PageTotal { field } => {
                let params = self.with_page_size(1).page_params(None);
                let response = self.get_checked(&self.collection_uri, params).await?;
                self.read_count(&response.body, field)
            }
        }
    }

    /// Creates a resource in this collection.
    ///
    /// # Errors
    ///
    /// Returns the error raised by [`Resource::save`].
    pub async fn create<K, V>(
        &self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Resource, ResourceError>
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut resource =
            Resource::new(Arc::clone(&self.resource_type)).with_parent_ref(self.parent.clone());
        for (name, value) in fields {
            resource.set(name, value);
        }
        resource.save(&self.client).await?;
        Ok(resource)
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page, ResourceError> {
        let response = self
            .get_checked(&self.collection_uri, self.page_params(cursor))
            .await?;
        Page::from_http_response(&response, self.client.page_format(), self.resource_type.name())
    }

    async fn get_checked(
        &self,
        uri: &str,
        params: Vec<(String, String)>,
    ) -> Result<HttpResponse, ResourceError> {
        let response = self.client.get(uri, params).await?;
        ResourceError::ensure_success(&response, self.resource_type.name(), uri)?;
        Ok(response)
    }

    fn decode_item(&self, item: Value) -> Result<Resource, ResourceError> {
        let discriminator = item
            .get(&self.client.page_format().type_field)
            .and_then(Value::as_str);

        let resource_type = match discriminator {
            None => Arc::clone(&self.resource_type),
            Some(name) if name == self.resource_type.name() => Arc::clone(&self.resource_type),
            Some(name) => match self.client.registry().lookup(name) {
                Ok(resource_type) => resource_type,
                Err(_) if self.fallback => {
                    tracing::warn!(
                        resource = self.resource_type.name(),
                        type_name = name,
                        "unknown type discriminator, decoding as the queried type"
                    );
                    Arc::clone(&self.resource_type)
                }
                Err(e) => return Err(e.into()),
            },
        };

        let parent = self
            .parent
            .clone()
            .filter(|p| resource_type.parent_type() == Some(p.type_name.as_str()));
        Resource::decode(&self.client.decoder(), resource_type, parent, item)
    }

    fn read_count(&self, body: &Value, field: &str) -> Result<u64, ResourceError> {
        body.get(field)
            .and_then(Value::as_u64)
            .or_else(|| body.as_u64())
            .ok_or_else(|| ResourceError::InvalidPayload {
                resource: self.resource_type.name().to_string(),
                reason: format!("count response has no numeric '{field}'"),
            })
    }

    fn invalid_filter(&self, field: String, reason: String) -> ResourceError {
        ResourceError::InvalidFilter {
            resource: self.resource_type.name().to_string(),
            field,
            reason,
        }
    }
}

/// A pull cursor over a query's results.
///
/// Pages are requested strictly in order, one at a time, when the buffered
/// page runs out. A failed request leaves the cursor where it was, so
/// calling [`try_next`](Self::try_next) again retries the same page.
/// Iteration ends when the server returns a cursor already visited.
#[derive(Debug)]
pub struct QueryIter {
    query: Query,
    buffer: VecDeque<Resource>,
    cursor: Option<String>,
    seen: HashSet<String>,
    done: bool,
}

impl QueryIter {
    /// Returns the next result, fetching the next page if needed.
    ///
    /// # Errors
    ///
    /// Returns the error raised by the page request or decode.
    pub async fn try_next(&mut self) -> Result<Option<Resource>, ResourceError> {
        loop {
            if let Some(resource) = self.buffer.pop_front() {
                return Ok(Some(resource));
            }
            if self.done {
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }
    }

    async fn fetch_next_page(&mut self) -> Result<(), ResourceError> {
        let page = self.query.fetch_page(self.cursor.as_deref()).await?;
        let resources = page
            .items
            .into_iter()
            .map(|item| self.query.decode_item(item))
            .collect::<Result<Vec<_>, _>>()?;

        let mut next = page.next_cursor;
        if let Some(cursor) = &next {
            if !self.seen.insert(cursor.clone()) {
                tracing::warn!(
                    resource = self.query.resource_type.name(),
                    uri = %self.query.collection_uri,
                    cursor = %cursor,
                    "server returned an already visited page cursor, stopping"
                );
                next = None;
            }
        }

        tracing::debug!(
            resource = self.query.resource_type.name(),
            items = resources.len(),
            has_next = next.is_some(),
            "fetched page"
        );
        self.done = next.is_none();
        self.cursor = next;
        self.buffer.extend(resources);
        Ok(())
    }
}

// Verify Query types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Query>();
    assert_send_sync::<QueryIter>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{HttpMethod, MockTransport};
    use crate::rest::filter::field;
    use crate::rest::registry::{RegistryError, ResourceRegistry};
    use crate::rest::response::PageFormat;
    use crate::rest::schema::FieldKind;
    use futures::TryStreamExt;
    use serde_json::json;

    fn registry() -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();
        registry
            .register(
                ResourceType::builder("playlist", "/v1/playlists/{id}")
                    .field("name", FieldKind::String)
                    .field("tags", FieldKind::List)
                    .field("created_at", FieldKind::DateTime)
                    .field("owner", FieldKind::Object)
                    .count(CountStrategy::endpoint())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                ResourceType::builder("song", "/v1/songs/{id}")
                    .nested_under("playlist")
                    .field("name", FieldKind::String)
                    .field("length", FieldKind::Integer)
                    .count(CountStrategy::page_total())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                ResourceType::builder("artist", "/v1/artists/{id}")
                    .field("name", FieldKind::String)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    fn client() -> (Arc<MockTransport>, RestClient) {
        let transport = Arc::new(MockTransport::new());
        let client =
            RestClient::with_transport(transport.clone(), registry(), PageFormat::default())
                .unwrap();
        (transport, client)
    }

    fn playlist(id: &str) -> Value {
        json!({"_type": "playlist", "uri": format!("/v1/playlists/{id}"), "id": id})
    }

    #[test]
    fn test_filter_returns_new_query() {
        let (_, client) = client();
        let base = client.query("playlist").unwrap();
        let filtered = base.filter(field("name").eq("x")).unwrap();

        assert!(base.params().is_empty());
        assert_eq!(filtered.params(), vec![("name.eq".to_string(), "x".to_string())]);
    }

    #[test]
    fn test_chained_filters_match_conjunction() {
        let (_, client) = client();
        let base = client.query("playlist").unwrap();

        let chained = base
            .filter(field("name").eq("x"))
            .unwrap()
            .filter(field("tags").contains("y"))
            .unwrap();
        let compound = base
            .filter(field("name").eq("x") & field("tags").contains("y"))
            .unwrap();

        assert_eq!(chained.params(), compound.params());
    }

    #[test]
    fn test_sorts_append_in_order() {
        let (_, client) = client();
        let query = client
            .query("playlist")
            .unwrap()
            .sort(field("name").asc())
            .unwrap()
            .sort(field("created_at").desc())
            .unwrap();

        assert_eq!(
            query.params(),
            vec![("sort".to_string(), "name,-created_at".to_string())]
        );
    }

    #[test]
    fn test_filter_validates_paths() {
        let (_, client) = client();
        let query = client.query("playlist").unwrap();

        assert!(matches!(
            query.filter(field("colour").eq("red")),
            Err(ResourceError::InvalidFilter { field, .. }) if field == "colour"
        ));
        assert!(matches!(
            query.filter(field("name.first").eq("x")),
            Err(ResourceError::InvalidFilter { .. })
        ));
        assert!(query.filter(field("owner.name").eq("x")).is_ok());
        assert!(matches!(
            query.sort(field("colour").desc()),
            Err(ResourceError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_negated_conjunction_is_rejected() {
        let (_, client) = client();
        let query = client.query("playlist").unwrap();
        let result = query.filter(!(field("name").eq("a") & field("tags").contains("b")));
        assert!(matches!(result, Err(ResourceError::InvalidFilter { .. })));
    }

    #[test]
    fn test_nested_query_requires_parent() {
        let (_, client) = client();
        assert!(matches!(
            client.query("song"),
            Err(ResourceError::UnresolvableUri { .. })
        ));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let (transport, client) = client();
        let query = client.query("playlist").unwrap();

        assert!(matches!(
            query.limit(0),
            Err(ResourceError::InvalidFilter { field, .. }) if field == "limit"
        ));
        assert_eq!(
            query.limit(5).unwrap().params(),
            vec![("limit".to_string(), "5".to_string())]
        );
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_iteration_is_lazy_and_paged() {
        let (transport, client) = client();
        let query = client.query("playlist").unwrap().limit(2).unwrap();

        transport.push_json(200, json!({"items": [playlist("p1"), playlist("p2")], "next_cursor": "c2"}));
        transport.push_json(200, json!({"items": [playlist("p3")], "next_cursor": null}));

        let mut iter = query.iter();
        assert_eq!(transport.request_count(), 0);

        assert_eq!(iter.try_next().await.unwrap().unwrap().id().as_deref(), Some("p1"));
        assert_eq!(transport.request_count(), 1);
        assert_eq!(iter.try_next().await.unwrap().unwrap().id().as_deref(), Some("p2"));
        assert_eq!(transport.request_count(), 1);
        assert_eq!(iter.try_next().await.unwrap().unwrap().id().as_deref(), Some("p3"));
        assert_eq!(transport.request_count(), 2);
        assert!(iter.try_next().await.unwrap().is_none());
        assert_eq!(transport.request_count(), 2);

        let requests = transport.requests();
        assert_eq!(requests[0].query_value("cursor"), None);
        assert_eq!(requests[0].query_value("limit"), Some("2"));
        assert_eq!(requests[1].query_value("cursor"), Some("c2"));
    }

    #[tokio::test]
    async fn test_empty_page_with_cursor_is_skipped() {
        let (transport, client) = client();
        transport.push_json(200, json!({"items": [], "next_cursor": "c2"}));
        transport.push_json(200, json!({"items": [playlist("p1")]}));

        let all = client.query("playlist").unwrap().all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_repeated_cursor_stops_iteration() {
        let (transport, client) = client();
        transport.push_json(200, json!({"items": [playlist("p1")], "next_cursor": "c1"}));
        transport.push_json(200, json!({"items": [playlist("p2")], "next_cursor": "c1"}));

        let all = client.query("playlist").unwrap().all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_alternating_cursors_stop_iteration() {
        let (transport, client) = client();
        transport.push_json(200, json!({"items": [playlist("p1")], "next_cursor": "a"}));
        transport.push_json(200, json!({"items": [playlist("p2")], "next_cursor": "b"}));
        transport.push_json(200, json!({"items": [playlist("p3")], "next_cursor": "a"}));
        transport.push_json(200, json!({"items": [playlist("p4")], "next_cursor": "b"}));

        let all = client.query("playlist").unwrap().all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(transport.request_count(), 3);
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test]
    async fn test_iteration_is_restartable() {
        let (transport, client) = client();
        let query = client.query("playlist").unwrap();
        transport.push_json(200, json!([playlist("p1")]));
        transport.push_json(200, json!([playlist("p1")]));

        assert_eq!(query.all().await.unwrap().len(), 1);
        assert_eq!(query.all().await.unwrap().len(), 1);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_can_be_retried() {
        let (transport, client) = client();
        transport.push_json(503, json!({"error": "busy"}));
        transport.push_json(200, json!([playlist("p1")]));

        let mut iter = client.query("playlist").unwrap().iter();
        assert!(matches!(
            iter.try_next().await,
            Err(ResourceError::Transport(_))
        ));
        assert!(iter.try_next().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stream_yields_all_pages() {
        let (transport, client) = client();
        transport.push_json(200, json!({"items": [playlist("p1")], "next_cursor": "c2"}));
        transport.push_json(200, json!({"items": [playlist("p2")]}));

        let ids: Vec<Option<String>> = client
            .query("playlist")
            .unwrap()
            .stream()
            .map_ok(|resource| resource.id())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ids, vec![Some("p1".to_string()), Some("p2".to_string())]);
    }

    #[tokio::test]
    async fn test_unknown_discriminator_fallback() {
        let (transport, client) = client();
        let item = json!({"_type": "podcast", "uri": "/v1/playlists/x", "id": "x"});
        transport.push_json(200, json!([item.clone()]));
        transport.push_json(200, json!([item]));

        let query = client.query("playlist").unwrap();
        let decoded = query.first().await.unwrap().unwrap();
        assert_eq!(decoded.type_name(), "playlist");

        let strict = query.allow_fallback(false);
        assert!(matches!(
            strict.first().await,
            Err(ResourceError::Registry(RegistryError::UnknownResourceType { .. }))
        ));
    }

    #[tokio::test]
    async fn test_registered_discriminator_wins() {
        let (transport, client) = client();
        transport.push_json(200, json!([{"_type": "artist", "uri": "/v1/artists/a1", "id": "a1"}]));

        let decoded = client.query("playlist").unwrap().first().await.unwrap().unwrap();
        assert_eq!(decoded.type_name(), "artist");
    }

    #[tokio::test]
    async fn test_one() {
        let (transport, client) = client();
        let query = client.query("playlist").unwrap();

        transport.push_json(200, json!([]));
        assert!(matches!(query.one().await, Err(ResourceError::NoResult { .. })));

        transport.push_json(200, json!([playlist("p1")]));
        assert_eq!(query.one().await.unwrap().id().as_deref(), Some("p1"));

        transport.push_json(200, json!([playlist("p1"), playlist("p2")]));
        assert!(matches!(
            query.one().await,
            Err(ResourceError::MultipleResults { .. })
        ));

        assert_eq!(transport.requests()[0].query_value("limit"), Some("2"));
    }

    #[tokio::test]
    async fn test_one_checks_next_page() {
        let (transport, client) = client();
        transport.push_json(200, json!({"items": [playlist("p1")], "next_cursor": "c2"}));
        transport.push_json(200, json!({"items": [playlist("p2")]}));

        assert!(matches!(
            client.query("playlist").unwrap().one().await,
            Err(ResourceError::MultipleResults { .. })
        ));
    }

    #[tokio::test]
    async fn test_first() {
        let (transport, client) = client();
        let query = client.query("playlist").unwrap();

        transport.push_json(200, json!({"items": [playlist("p1")], "next_cursor": "c2"}));
        assert_eq!(query.first().await.unwrap().unwrap().id().as_deref(), Some("p1"));

        transport.push_json(200, json!({"items": []}));
        assert!(query.first().await.unwrap().is_none());

        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.requests()[0].query_value("limit"), Some("1"));
    }

    #[tokio::test]
    async fn test_count_endpoint() {
        let (transport, client) = client();
        transport.push_json(200, json!({"count": 42}));

        let count = client
            .query("playlist")
            .unwrap()
            .filter(field("name").eq("x"))
            .unwrap()
            .sort(field("name").asc())
            .unwrap()
            .count()
            .await
            .unwrap();

        assert_eq!(count, 42);
        let request = &transport.requests()[0];
        assert_eq!(request.path, "/v1/playlists/count");
        assert_eq!(request.query_value("name.eq"), Some("x"));
        assert_eq!(request.query_value("sort"), None);
    }

    #[tokio::test]
    async fn test_count_page_total() {
        let (transport, client) = client();
        let parent = ParentRef::new("playlist", "/v1/playlists/p1");
        let query = Query::new(client.clone(), client.resource_type("song").unwrap(), Some(parent))
            .unwrap();

        transport.push_json(200, json!({"items": [], "total": 7}));
        assert_eq!(query.count().await.unwrap(), 7);
        assert_eq!(transport.requests()[0].path, "/v1/playlists/p1/songs");
        assert_eq!(transport.requests()[0].query_value("limit"), Some("1"));
    }

    #[tokio::test]
    async fn test_count_unsupported_sends_nothing() {
        let (transport, client) = client();
        assert!(matches!(
            client.query("artist").unwrap().count().await,
            Err(ResourceError::Unsupported { operation: "count", .. })
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_create_posts_to_collection() {
        let (transport, client) = client();
        let parent = ParentRef::new("playlist", "/v1/playlists/p1");
        let songs = Query::new(client.clone(), client.resource_type("song").unwrap(), Some(parent))
            .unwrap();

        transport.push_json(201, json!({"id": "s9", "name": "Flutes"}));
        let song = songs.create([("name", "Flutes")]).await.unwrap();

        assert_eq!(song.uri(), Some("/v1/playlists/p1/songs/s9"));
        let request = &transport.requests()[0];
        assert_eq!(request.http_method, HttpMethod::Post);
        assert_eq!(request.path, "/v1/playlists/p1/songs");
    }
}
