use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::time::Duration;

use crate::api::middleware::AppError;
use crate::config::ItemStoreConfig;

/// Paging forwarded to the item store when a dataset is fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Remote store holding dataset items as JSON records
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch every item of a dataset as the raw bytes of a JSON array
    async fn fetch_all_items(
        &self,
        dataset_id: &str,
        options: &FetchOptions,
    ) -> Result<Vec<u8>, AppError>;
}

/// Item store client for the Apify dataset API
pub struct ApifyItemStore {
    base_url: String,
    token: Option<String>,
    http_client: HttpClient,
}

impl ApifyItemStore {
    pub fn new(config: &ItemStoreConfig) -> Result<Self, AppError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            http_client,
        })
    }

    /// Build the items URL for a dataset
    fn items_url(&self, dataset_id: &str, options: &FetchOptions) -> Result<url::Url, AppError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| AppError::Configuration(format!("Invalid item store URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| AppError::Configuration("Item store URL cannot be a base".to_string()))?
            .extend(["v2", "datasets", dataset_id, "items"]);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("format", "json");
            query.append_pair("clean", "true");
            if let Some(limit) = options.limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = options.offset {
                query.append_pair("offset", &offset.to_string());
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl ItemStore for ApifyItemStore {
    async fn fetch_all_items(
        &self,
        dataset_id: &str,
        options: &FetchOptions,
    ) -> Result<Vec<u8>, AppError> {
        let url = self.items_url(dataset_id, options)?;
        tracing::debug!("Fetching dataset items from {}", url);

        let mut request = self.http_client.get(url);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(format!("Fetching dataset {} timed out", dataset_id))
            } else {
                AppError::DatasetLoad(format!("Failed to fetch dataset {}: {}", dataset_id, e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::DatasetLoad(format!(
                "Item store returned error {} for dataset {}: {}",
                status, dataset_id, error_text
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AppError::DatasetLoad(format!("Failed to read items of dataset {}: {}", dataset_id, e))
        })?;

        Ok(bytes.to_vec())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn store(base_url: &str) -> ApifyItemStore {
        ApifyItemStore::new(&ItemStoreConfig {
            base_url: base_url.to_string(),
            token: Some("apify_api_test".to_string()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_items_url_without_paging() {
        let url = store("https://api.apify.com/")
            .items_url("nLlhc8Fz9S5dCTQab", &FetchOptions::default())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.apify.com/v2/datasets/nLlhc8Fz9S5dCTQab/items?format=json&clean=true"
        );
    }

    #[test]
    fn test_items_url_with_paging() {
        let options = FetchOptions {
            limit: Some(100),
            offset: Some(20),
        };
        let url = store("http://localhost:8080").items_url("abc", &options).unwrap();
        assert_eq!(url.path(), "/v2/datasets/abc/items");
        assert_eq!(url.query(), Some("format=json&clean=true&limit=100&offset=20"));
    }

    #[test]
    fn test_dataset_id_is_escaped() {
        let url = store("http://localhost")
            .items_url("user~my/dataset", &FetchOptions::default())
            .unwrap();
        assert!(url.path().starts_with("/v2/datasets/user~my%2Fdataset/"));
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let result = store("not a url").items_url("abc", &FetchOptions::default());
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
