use std::error::Error as StdError;
use std::fmt;

/// Opaque failure raised by a text-generation backend. Adapters wrap their
/// own error types so the assembler stays independent of the transport.
#[derive(Debug)]
pub struct GenerationError {
    inner: Box<dyn StdError + Send + Sync>,
}

impl GenerationError {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(error),
        }
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync> {
        self.inner
    }

    pub fn as_inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl StdError for GenerationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.as_ref())
    }
}

pub trait TextGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Contract: image lookup never fails. Providers must resolve every
/// degraded path (missing credential, transport error, empty result set)
/// to a placeholder URL instead of surfacing an error.
pub trait ImageProvider: Send + Sync {
    fn image_url(&self, request: &ImageRequest) -> String;
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature: temperature.clamp(0.0, 2.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub orientation: Orientation,
}

impl ImageRequest {
    /// Cover art is wanted in landscape, everything else in portrait.
    pub fn for_prompt(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        let orientation = if prompt.to_lowercase().contains("cover") {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        Self {
            prompt,
            orientation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_is_clamped_into_valid_range() {
        assert_eq!(GenerationRequest::new("p", 10, 5.0).temperature, 2.0);
        assert_eq!(GenerationRequest::new("p", 10, -1.0).temperature, 0.0);
        assert_eq!(GenerationRequest::new("p", 10, 0.8).temperature, 0.8);
    }

    #[test]
    fn cover_prompts_request_landscape_images() {
        let cover = ImageRequest::for_prompt("Create a professional book cover for 'X'");
        assert_eq!(cover.orientation, Orientation::Landscape);

        let chapter = ImageRequest::for_prompt("Create a professional illustration about Y");
        assert_eq!(chapter.orientation, Orientation::Portrait);
    }
}
