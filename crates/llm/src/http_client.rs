//! HTTP Client Factory
//!
//! Provides a factory function for building the `reqwest::Client` every
//! provider adapter shares. Generalized from the teacher's proxy-aware
//! client factory down to what this crate's single OpenAI-compatible
//! adapter actually needs — outbound provider calls go direct, never
//! through a proxy.

/// Build the `reqwest::Client` used by provider adapters.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder().build().expect("failed to build reqwest client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let _client = build_http_client();
    }
}
