use std::time::Duration;

use log::{info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use bookgen_core::config::ImageConfig;
use bookgen_core::generation::{ImageProvider, ImageRequest, Orientation};

use crate::error::AdapterError;
use crate::search_query::to_search_query;

const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";
const FALLBACK_SEED_SPACE: u64 = 1000;

/// Picks the provider for the configured credentials: the photo-search
/// adapter when an access key exists, placeholder-only mode otherwise.
pub fn create_image_provider(config: &ImageConfig) -> Result<Box<dyn ImageProvider>, AdapterError> {
    if config.has_credentials() {
        Ok(Box::new(UnsplashImageAdapter::new(config)?))
    } else {
        warn!("no image service access key configured, using fallback image URLs");
        Ok(Box::new(FallbackImages))
    }
}

/// Placeholder-only provider: every lookup resolves to a deterministic
/// seeded URL without touching the network.
pub struct FallbackImages;

impl ImageProvider for FallbackImages {
    fn image_url(&self, request: &ImageRequest) -> String {
        fallback_image_url(&request.prompt)
    }
}

/// Photo-search adapter. Lookups that fail in any way degrade to the
/// fallback URL; this provider never surfaces an error.
pub struct UnsplashImageAdapter {
    client: Client,
    base_url: String,
    access_key: String,
}

impl UnsplashImageAdapter {
    pub fn new(config: &ImageConfig) -> Result<Self, AdapterError> {
        if !config.has_credentials() {
            return Err(AdapterError::InvalidConfig(
                "image service access_key must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout.max(1)))
            .build()?;

        let base_url = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url.trim().trim_end_matches('/').to_string()
        };

        Ok(Self {
            client,
            base_url,
            access_key: config.access_key.trim().to_string(),
        })
    }

    fn search_once(
        &self,
        query: &str,
        orientation: Orientation,
    ) -> Result<Option<String>, AdapterError> {
        let url = format!("{}/search/photos", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .query(&[
                ("query", query),
                ("per_page", "1"),
                ("orientation", orientation.as_str()),
            ])
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AdapterError::HttpStatus { status, body });
        }

        let parsed: SearchResponse = response.json()?;
        Ok(parsed
            .results
            .into_iter()
            .next()
            .map(|result| result.urls.regular))
    }
}

impl ImageProvider for UnsplashImageAdapter {
    fn image_url(&self, request: &ImageRequest) -> String {
        let query = to_search_query(&request.prompt);
        match self.search_once(&query, request.orientation) {
            Ok(Some(url)) => {
                info!("found stock photo for query `{query}`");
                url
            }
            Ok(None) => {
                warn!("no stock photos found for query `{query}`");
                fallback_image_url(&request.prompt)
            }
            Err(err) => {
                warn!("image search failed for query `{query}`: {err}");
                fallback_image_url(&request.prompt)
            }
        }
    }
}

/// Deterministic placeholder URL: the prompt is hashed into a bounded seed,
/// so the same prompt always maps to the same image. Seed collisions
/// between different prompts are acceptable.
pub fn fallback_image_url(prompt: &str) -> String {
    format!(
        "https://picsum.photos/800/600?random={}",
        fallback_seed(prompt)
    )
}

fn fallback_seed(prompt: &str) -> u64 {
    let digest = Sha256::digest(prompt.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes) % FALLBACK_SEED_SPACE
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_url_is_deterministic() {
        let prompt = "Create a professional illustration about market cycles.";
        assert_eq!(fallback_image_url(prompt), fallback_image_url(prompt));
    }

    #[test]
    fn fallback_seed_stays_in_bounds() {
        for prompt in ["", "a", "some longer illustration prompt", "Ümläute too"] {
            assert!(fallback_seed(prompt) < FALLBACK_SEED_SPACE);
        }
    }

    #[test]
    fn fallback_url_matches_the_template() {
        let url = fallback_image_url("anything");
        let seed = url
            .strip_prefix("https://picsum.photos/800/600?random=")
            .expect("template prefix");
        let seed: u64 = seed.parse().expect("numeric seed");
        assert!(seed < FALLBACK_SEED_SPACE);
    }

    #[test]
    fn fallback_provider_uses_the_template() {
        let request = ImageRequest::for_prompt("Create a professional illustration about rivers");
        let url = FallbackImages.image_url(&request);
        assert!(url.starts_with("https://picsum.photos/800/600?random="));
    }

    #[test]
    fn adapter_requires_credentials() {
        let config = ImageConfig::default();
        assert!(matches!(
            UnsplashImageAdapter::new(&config),
            Err(AdapterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unreachable_service_degrades_to_fallback() {
        let config = ImageConfig {
            access_key: "test-key".to_string(),
            // nothing listens on the discard port, so the lookup fails fast
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: 1,
        };
        let adapter = UnsplashImageAdapter::new(&config).expect("adapter");
        let request = ImageRequest::for_prompt("Create a professional illustration about rivers");

        let url = adapter.image_url(&request);
        assert_eq!(url, fallback_image_url(&request.prompt));
    }

    #[test]
    fn search_response_parses_first_result() {
        let json = r#"{"results": [{"urls": {"regular": "https://images.example/1.jpg", "small": "https://images.example/1s.jpg"}}], "total": 1}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.results.into_iter().next().unwrap().urls.regular,
            "https://images.example/1.jpg"
        );
    }

    #[test]
    fn empty_search_response_parses_to_no_results() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(parsed.results.is_empty());
    }
}
