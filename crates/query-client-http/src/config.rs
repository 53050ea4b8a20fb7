use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpLinkConfig {
    /// GraphQL endpoint operations are posted to.
    pub url: Url,
    /// Time allowed for a whole request, response body included. Defaults to 30s.
    #[serde(deserialize_with = "duration_str::deserialize_duration")]
    pub timeout: Duration,
}

impl HttpLinkConfig {
    pub fn new(url: Url) -> Self {
        HttpLinkConfig {
            url,
            ..Default::default()
        }
    }

    fn default_url() -> Url {
        Url::parse("http://127.0.0.1:4000/graphql").expect("must be correct")
    }
}

impl Default for HttpLinkConfig {
    fn default() -> Self {
        HttpLinkConfig {
            url: Self::default_url(),
            timeout: Duration::from_secs(30),
        }
    }
}
