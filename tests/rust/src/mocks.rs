//! Mock collaborators

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Notify;
use toolgate_gateway::UrlPresenter;
use url::Url;
use wiremock::{Request, Respond, ResponseTemplate};

/// Records every authorization URL instead of opening a browser
#[derive(Default)]
pub struct CapturePresenter {
    urls: Mutex<Vec<String>>,
    presented: Notify,
}

impl UrlPresenter for CapturePresenter {
    fn present(&self, url: &str) {
        self.urls.lock().push(url.to_string());
        self.presented.notify_waiters();
    }
}

impl CapturePresenter {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    /// Wait until at least `count` URLs were presented
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.presented.notified();
                let urls = self.urls();
                if urls.len() >= count {
                    return urls;
                }
                notified.await;
            }
        })
        .await
        .expect("authorization URL was never presented")
    }

    /// `state` parameter of the n-th presented URL
    pub fn state_of(&self, index: usize) -> String {
        query_param(&self.urls()[index], "state").expect("URL without state")
    }
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Form fields of a token request
pub fn form_fields(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

/// Token endpoint answering `token-<code>` for authorization-code grants
/// and `service-token` for client-credential grants
pub struct EchoCodeResponder {
    pub expires_in: i64,
}

impl Respond for EchoCodeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let form = form_fields(request);
        let token = match form.get("grant_type").map(String::as_str) {
            Some("authorization_code") => {
                format!("token-{}", form.get("code").cloned().unwrap_or_default())
            }
            Some("client_credentials") => "service-token".to_string(),
            _ => return ResponseTemplate::new(400).set_body_string("unsupported_grant_type"),
        };
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "expires_in": self.expires_in,
            "access_token": token,
        }))
    }
}
