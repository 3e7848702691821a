//! Showing the authorization URL to the operator

use tracing::{info, warn};

/// Shows a delegated-login URL to whoever can complete it
pub trait UrlPresenter: Send + Sync {
    fn present(&self, url: &str);
}

/// Opens the system browser and always logs the URL
///
/// The log line lets an operator finish the login by hand on headless
/// hosts where no browser can be opened.
#[derive(Debug, Default, Clone)]
pub struct BrowserPresenter;

impl UrlPresenter for BrowserPresenter {
    fn present(&self, url: &str) {
        info!("[OAuth] Sign in to continue: {}", url);
        if let Err(e) = open::that_detached(url) {
            warn!("[OAuth] Could not open a browser ({}), open the URL above manually", e);
        }
    }
}

/// Only logs the URL
#[derive(Debug, Default, Clone)]
pub struct LogPresenter;

impl UrlPresenter for LogPresenter {
    fn present(&self, url: &str) {
        info!("[OAuth] Sign in to continue: {}", url);
    }
}
