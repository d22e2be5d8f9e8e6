//! Configuration for embedding providers.

use std::time::Duration;

/// Default Gemini embedding model
pub const DEFAULT_MODEL: &str = "text-embedding-004";

/// Embedding dimension of [`DEFAULT_MODEL`]
pub const DEFAULT_DIMENSION: usize = 768;

/// Texts embedded concurrently per group
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Pause between groups to stay under provider rate limits
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Configuration for an embedding provider.
///
/// `gemini()` gives production defaults; the `with_*` methods adjust
/// individual fields, which the tests use to point at a local server and
/// shrink the model dimension.
#[derive(Clone)]
pub struct EmbedConfig {
    /// Provider endpoint, without a trailing slash
    pub base_url: String,
    /// Model identifier, e.g. "text-embedding-004"
    pub model: String,
    /// Dimension of the vectors the model produces
    pub dimension: usize,
    /// How many texts to embed concurrently per group
    pub batch_size: usize,
    /// Delay inserted between consecutive groups
    pub batch_delay: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    api_key: String,
}

impl EmbedConfig {
    /// Configuration for the Gemini embedding API with production defaults.
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            request_timeout: Duration::from_secs(30),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        self
    }

    /// Select a different model. The dimension is updated to match when the
    /// model is one we know about; otherwise set it with [`with_dimension`].
    ///
    /// [`with_dimension`]: EmbedConfig::with_dimension
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        if let Some(dimension) = known_model_dimension(&self.model) {
            self.dimension = dimension;
        }
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for EmbedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("batch_size", &self.batch_size)
            .field("batch_delay", &self.batch_delay)
            .field("request_timeout", &self.request_timeout)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn known_model_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-004" => Some(768),
        "gemini-embedding-001" => Some(3072),
        _ => None,
    }
}
