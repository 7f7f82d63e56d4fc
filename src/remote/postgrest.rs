//! PostgREST client for a Supabase-style backend.
//!
//! Inserts are `POST /rest/v1/<table>`, updates are
//! `PATCH /rest/v1/<table>?<column>=eq.<value>`. Both authenticate with the
//! project API key in the `apikey` and `Authorization` headers.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{Map, Value};

use super::{Filter, RemoteError, RemoteStore, Result};

/// Remote store backed by a PostgREST endpoint.
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn send(&self, request: RequestBuilder) -> Result<()> {
        let response = request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl RemoteStore for PostgrestStore {
    fn insert(&self, table: &str, row: &Map<String, Value>) -> Result<()> {
        self.send(self.client.post(self.table_url(table)).json(row))
    }

    fn update(&self, table: &str, filter: &Filter, patch: &Map<String, Value>) -> Result<()> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[(filter.column.as_str(), format!("eq.{}", filter.equals))])
            .json(patch);
        self.send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_url_ignores_trailing_slash() {
        let store =
            PostgrestStore::new("https://example.supabase.co/", "key", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            store.table_url("stroje"),
            "https://example.supabase.co/rest/v1/stroje"
        );
    }
}
