//! Provider auto-detection
//!
//! Pattern matching on an endpoint URL or a credential's shape. Used only
//! when a tenant has no explicit configuration.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;

use crate::providers::ProviderKind;

lazy_static! {
    static ref DEEPSEEK_KEY: Regex = Regex::new(r"^sk-[a-f0-9]{32}$").expect("valid regex");
    static ref MISTRAL_KEY: Regex = Regex::new(r"^[A-Za-z0-9]{32}$").expect("valid regex");
}

/// Ollama's default port
const OLLAMA_PORT: u16 = 11434;

fn parse_endpoint(url: &str) -> Option<Url> {
    let url = url.trim();
    Url::parse(url)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| Url::parse(&format!("https://{url}")).ok())
}

/// Guess the vendor behind an endpoint URL
pub fn detect_from_endpoint(url: &str) -> Option<ProviderKind> {
    let parsed = parse_endpoint(url)?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let is = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

    if is("openai.com") {
        Some(ProviderKind::OpenAi)
    } else if is("anthropic.com") {
        Some(ProviderKind::Anthropic)
    } else if is("generativelanguage.googleapis.com") {
        Some(ProviderKind::Gemini)
    } else if is("mistral.ai") {
        Some(ProviderKind::Mistral)
    } else if is("deepseek.com") {
        Some(ProviderKind::DeepSeek)
    } else if host.contains("dashscope") || is("aliyuncs.com") {
        Some(ProviderKind::Qwen)
    } else if is("openrouter.ai") {
        Some(ProviderKind::OpenRouter)
    } else if parsed.port() == Some(OLLAMA_PORT)
        || host.contains("ollama")
        || host == "localhost"
        || host == "127.0.0.1"
    {
        Some(ProviderKind::Ollama)
    } else {
        None
    }
}

/// Guess the vendor that issued a credential from its prefix and shape
pub fn detect_from_credential_shape(key: &str) -> Option<ProviderKind> {
    let key = key.trim();
    if key.starts_with("sk-ant-") {
        Some(ProviderKind::Anthropic)
    } else if key.starts_with("sk-or-") {
        Some(ProviderKind::OpenRouter)
    } else if key.starts_with("AIza") {
        Some(ProviderKind::Gemini)
    } else if DEEPSEEK_KEY.is_match(key) {
        Some(ProviderKind::DeepSeek)
    } else if key.starts_with("sk-") {
        Some(ProviderKind::OpenAi)
    } else if MISTRAL_KEY.is_match(key) {
        Some(ProviderKind::Mistral)
    } else {
        None
    }
}
