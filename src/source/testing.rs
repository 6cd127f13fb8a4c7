//! Scripted source implementation for engine tests

use super::Source;
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::pagination::{PageRequest, PaginationMode, RawPage};
use crate::schema::{FieldDescriptor, FieldType};
use crate::types::JsonValue;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A source whose pages are scripted per tenant.
///
/// Each `fetch_page` call pops the next scripted result for the request's
/// tenant scope; an exhausted script yields empty pages, which terminates
/// either pagination protocol. Requests are recorded for assertions.
pub(crate) struct StubSource {
    tables: Vec<String>,
    fields: Vec<FieldDescriptor>,
    mode: PaginationMode,
    pages: Mutex<HashMap<String, VecDeque<Result<RawPage>>>>,
    delete_pages: Mutex<HashMap<String, VecDeque<Result<RawPage>>>>,
    details: HashMap<String, JsonValue>,
    detail_tables: Vec<String>,
    delete_tables: Vec<String>,
    pub requests: Mutex<Vec<PageRequest>>,
    pub detail_calls: AtomicUsize,
}

impl StubSource {
    pub fn new(table: &str) -> Self {
        Self {
            tables: vec![table.to_string()],
            fields: vec![
                FieldDescriptor::new("id", FieldType::String).required(),
                FieldDescriptor::new("updated_at", FieldType::String),
                FieldDescriptor::new("name", FieldType::String),
            ],
            mode: PaginationMode::Token,
            pages: Mutex::new(HashMap::new()),
            delete_pages: Mutex::new(HashMap::new()),
            details: HashMap::new(),
            detail_tables: Vec::new(),
            delete_tables: Vec::new(),
            requests: Mutex::new(Vec::new()),
            detail_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_mode(mut self, mode: PaginationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_detail(mut self, table: &str, details: Vec<(&str, JsonValue)>) -> Self {
        self.detail_tables.push(table.to_string());
        self.details = details
            .into_iter()
            .map(|(id, v)| (id.to_string(), v))
            .collect();
        self
    }

    pub fn with_delete_support(mut self, table: &str) -> Self {
        self.delete_tables.push(table.to_string());
        self
    }

    /// Script the next list page for a tenant scope (None for unscoped)
    pub fn push_page(&self, tenant: Option<&str>, page: Result<RawPage>) {
        let mut pages = self.pages.lock().unwrap();
        pages
            .entry(tenant.unwrap_or_default().to_string())
            .or_default()
            .push_back(page);
    }

    /// Script the next delete-history page for a tenant scope
    pub fn push_delete_page(&self, tenant: Option<&str>, page: Result<RawPage>) {
        let mut pages = self.delete_pages.lock().unwrap();
        pages
            .entry(tenant.unwrap_or_default().to_string())
            .or_default()
            .push_back(page);
    }

    pub fn recorded_requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn pop(
        queues: &Mutex<HashMap<String, VecDeque<Result<RawPage>>>>,
        tenant: &Option<String>,
    ) -> Result<RawPage> {
        let mut queues = queues.lock().unwrap();
        queues
            .get_mut(tenant.as_deref().unwrap_or_default())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(RawPage::default()))
    }
}

#[async_trait]
impl Source for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn list_tables(&self, _client: &ApiClient) -> Result<Vec<String>> {
        Ok(self.tables.clone())
    }

    async fn table_schema(
        &self,
        _client: &ApiClient,
        _table: &str,
    ) -> Result<Vec<FieldDescriptor>> {
        Ok(self.fields.clone())
    }

    fn pagination(&self, _table: &str) -> PaginationMode {
        self.mode
    }

    async fn fetch_page(
        &self,
        _client: &ApiClient,
        _table: &str,
        request: &PageRequest,
    ) -> Result<RawPage> {
        self.requests.lock().unwrap().push(request.clone());
        Self::pop(&self.pages, &request.tenant)
    }

    fn supports_detail(&self, table: &str) -> bool {
        self.detail_tables.iter().any(|t| t == table)
    }

    async fn fetch_detail(
        &self,
        _client: &ApiClient,
        _table: &str,
        id: &str,
    ) -> Result<JsonValue> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| Error::permanent(404, format!("detail {id}"), String::new()))
    }

    fn supports_deletes(&self, table: &str) -> bool {
        self.delete_tables.iter().any(|t| t == table)
    }

    async fn fetch_deletes_page(
        &self,
        _client: &ApiClient,
        table: &str,
        request: &PageRequest,
    ) -> Result<RawPage> {
        if !self.supports_deletes(table) {
            return Err(Error::unsupported("delete tracking", table));
        }
        Self::pop(&self.delete_pages, &request.tenant)
    }
}

/// An ApiClient pointed at nowhere, for sources that never touch HTTP
pub(crate) fn offline_client() -> ApiClient {
    use crate::config::{Connection, Credentials};
    ApiClient::new(&Connection::new("http://127.0.0.1:0", Credentials::None))
}
