use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use clap::Parser;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Server settings. Every flag can also be set through its environment variable.
#[derive(Clone, Debug, Parser)]
#[command(name = "leo-server", version, about = "Leo learning assistant API")]
pub struct Settings {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,

    #[arg(long, env = "OPENROUTER_BASE_URL", default_value = OPENROUTER_BASE_URL)]
    pub openrouter_base_url: String,

    #[arg(long, env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    pub perplexity_api_key: Option<String>,

    #[arg(long, env = "PERPLEXITY_BASE_URL", default_value = leo_llm::PERPLEXITY_BASE_URL)]
    pub perplexity_base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = leo_llm::ANTHROPIC_BASE_URL)]
    pub anthropic_base_url: String,

    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Serverless region the index is created in.
    #[arg(long, env = "PINECONE_ENVIRONMENT", default_value = "us-east-1")]
    pub pinecone_environment: String,

    #[arg(long, env = "PINECONE_CONTROL_URL", default_value = leo_pinecone::DEFAULT_CONTROL_URL)]
    pub pinecone_control_url: String,

    #[arg(long, env = "PINECONE_INDEX", default_value = "docs-wiki-index")]
    pub pinecone_index: String,

    #[arg(long, env = "PINECONE_NAMESPACE", default_value = "default_docs")]
    pub pinecone_namespace: String,

    /// Comma separated list of allowed origins.
    #[arg(
        long,
        env = "CORS_ORIGINS",
        default_value = "http://localhost:3000",
        value_delimiter = ','
    )]
    pub cors_origins: Vec<String>,

    /// Sent to OpenRouter as `HTTP-Referer`.
    #[arg(long, env = "APP_URL", default_value = "https://docs-wiki.vercel.app")]
    pub app_url: String,

    /// Sent to OpenRouter as `X-Title`.
    #[arg(long, env = "APP_TITLE", default_value = "Docs Wiki - Leo AI Assistant")]
    pub app_title: String,

    #[arg(long, env = "CACHE_CLEANUP_SECS", default_value_t = 300)]
    pub cache_cleanup_secs: u64,
}

impl Settings {
    /// Bind address. `HOST` may be an IPv4 or IPv6 literal or a resolvable name.
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| anyhow::anyhow!("{} resolves to no address", self.host))
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_secs.max(1))
    }

    /// Logs a warning for every provider key that is missing.
    pub fn warn_missing_keys(&self) {
        let keys = [
            ("OPENROUTER_API_KEY", &self.openrouter_api_key),
            ("PERPLEXITY_API_KEY", &self.perplexity_api_key),
            ("OPENAI_API_KEY", &self.openai_api_key),
            ("ANTHROPIC_API_KEY", &self.anthropic_api_key),
            ("PINECONE_API_KEY", &self.pinecone_api_key),
        ];
        for (name, value) in keys {
            if value.as_deref().map_or(true, str::is_empty) {
                tracing::warn!("{name} not found in environment variables");
            }
        }
    }
}

/// Treats empty strings as unset.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_over_defaults() {
        let settings = Settings::parse_from([
            "leo-server",
            "--port",
            "9000",
            "--cors-origins",
            "http://a.test,http://b.test",
        ]);
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(settings.pinecone_index, "docs-wiki-index");
        assert_eq!(settings.pinecone_namespace, "default_docs");
        assert_eq!(settings.addr().unwrap().port(), 9000);
    }

    #[test]
    fn ipv6_host_is_a_valid_bind_address() {
        let settings = Settings::parse_from(["leo-server", "--host", "::", "--port", "8080"]);
        let addr = settings.addr().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn empty_keys_count_as_missing() {
        assert_eq!(non_empty(&Some("  ".to_string())), None);
        assert_eq!(non_empty(&Some("k".to_string())), Some("k"));
        assert_eq!(non_empty(&None), None);
    }
}
