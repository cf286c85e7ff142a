//! URL service: create, batch-create, and resolve short URLs.

use std::sync::Arc;

use shortlink_core::{CreateUrlResponse, Error, Result, ShortCodeGenerator};
use shortlink_metrics::{labels, Labels, Recorder};
use shortlink_postgres::{NewUrl, UrlStore};

use crate::cache::UrlCache;

/// Application service over the URL store, cache, and short-code generator.
pub struct UrlService {
    store: Arc<dyn UrlStore>,
    shortener: ShortCodeGenerator,
    cache: Arc<UrlCache>,
    base_url: String,
    recorder: Arc<Recorder>,
}

impl UrlService {
    pub fn new(
        store: Arc<dyn UrlStore>,
        shortener: ShortCodeGenerator,
        cache: Arc<UrlCache>,
        base_url: impl Into<String>,
        recorder: Arc<Recorder>,
    ) -> Self {
        Self {
            store,
            shortener,
            cache,
            base_url: base_url.into(),
            recorder,
        }
    }

    pub async fn create_short_url(&self, original_url: &str) -> Result<CreateUrlResponse> {
        let id = self
            .store
            .next_ids(1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::internal("id sequence returned no values"))?;

        let short_code = self.shortener.generate(id as u64)?;

        self.store
            .create(&NewUrl {
                id,
                short_code: short_code.clone(),
                original_url: original_url.to_string(),
            })
            .await?;

        self.cache.insert(&short_code, original_url);
        self.recorder
            .record_business("urls_created", 1.0, labels(&[("method", "single")]));

        Ok(CreateUrlResponse {
            short_url: format!("{}/{}", self.base_url, short_code),
            short_code,
            original_url: original_url.to_string(),
        })
    }

    pub async fn get_original_url(&self, short_code: &str) -> Result<String> {
        if let Some(url) = self.cache.get(short_code) {
            self.recorder.record_business("cache_hit", 1.0, Labels::new());
            self.recorder.record_business("redirects", 1.0, Labels::new());
            return Ok(url);
        }

        self.recorder
            .record_business("cache_miss", 1.0, Labels::new());

        let url = self
            .store
            .find_by_short_code(short_code)
            .await?
            .ok_or(Error::NotFound)?;

        self.cache.insert(short_code, &url);
        self.recorder.record_business("redirects", 1.0, Labels::new());

        Ok(url)
    }

    pub async fn create_short_url_batch(
        &self,
        original_urls: &[String],
    ) -> Result<Vec<CreateUrlResponse>> {
        let count = original_urls.len();
        if count == 0 {
            return Ok(Vec::new());
        }

        let ids = self.store.next_ids(count).await?;
        if ids.len() != count {
            return Err(Error::internal("id sequence returned wrong count"));
        }

        let mut rows = Vec::with_capacity(count);
        let mut responses = Vec::with_capacity(count);

        for (original_url, id) in original_urls.iter().zip(ids) {
            let short_code = self.shortener.generate(id as u64)?;

            rows.push(NewUrl {
                id,
                short_code: short_code.clone(),
                original_url: original_url.clone(),
            });
            responses.push(CreateUrlResponse {
                short_url: format!("{}/{}", self.base_url, short_code),
                short_code: short_code.clone(),
                original_url: original_url.clone(),
            });

            self.cache.insert(&short_code, original_url);
        }

        self.store.create_batch(&rows).await?;

        self.recorder.record_business(
            "urls_created",
            count as f64,
            labels(&[("method", "batch")]),
        );
        self.recorder
            .record_business("batch_size", count as f64, Labels::new());

        Ok(responses)
    }
}
