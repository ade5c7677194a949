//! Default values for configuration

/// Default embedding model (all-MiniLM-L6-v2)
pub fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

/// Default embedding dimension for all-MiniLM-L6-v2
pub fn default_embedding_dimension() -> usize {
    384
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default embedding backend ("local" or "http")
pub fn default_embedding_backend() -> String {
    "local".to_string()
}

/// Default maximum characters per chunk
pub fn default_chunk_size() -> usize {
    800
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    100
}

/// Default maximum search results per query
pub fn default_max_results() -> usize {
    5
}

/// Default number of conversation exchanges kept per session
pub fn default_max_history() -> usize {
    2
}

/// Default chat completions base URL
pub fn default_generation_base_url() -> String {
    std::env::var("LECTERN_CHAT_URL")
        .unwrap_or_else(|_| "https://api.anthropic.com/v1".to_string())
}

/// Default chat model
pub fn default_generation_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

/// Default environment variable name for the chat API key
pub fn default_generation_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

/// Default sampling temperature
pub fn default_generation_temperature() -> f32 {
    0.0
}

/// Default maximum answer tokens
pub fn default_generation_max_tokens() -> u32 {
    800
}
