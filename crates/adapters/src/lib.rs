mod error;
mod image;
mod llm;
mod retry;
mod search_query;

pub use error::AdapterError;
pub use image::{create_image_provider, fallback_image_url, FallbackImages, UnsplashImageAdapter};
pub use llm::{create_text_adapter, OpenAiTextAdapter};
pub use retry::{call_with_retry, call_with_retry_using, RetryConfig};
pub use search_query::to_search_query;

pub use bookgen_core::config::{Config, ConfigStore, ImageConfig, LlmConfig};
pub use bookgen_core::generation::{
    GenerationError, GenerationRequest, ImageProvider, ImageRequest, Orientation, TextGenerator,
};
