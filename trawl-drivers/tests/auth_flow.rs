use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use trawl_drivers::trawl_browser::{
    auth::{AuthState, Authenticator, Credentials, LoginCheck, LoginTimings},
    session::BrowserSession,
};

/// Scripted stand-in for a browser: records what was typed and where the
/// submit click lands.
#[derive(Default)]
struct LoginPage {
    visited: Vec<String>,
    typed: HashMap<String, String>,
    form_present: bool,
    landing_url: String,
    url: String,
    fail_click: bool,
}

#[async_trait]
impl BrowserSession for LoginPage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.visited.push(url.to_string());
        self.url = url.to_string();
        Ok(())
    }

    async fn wait_for_element(&mut self, _selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(self.form_present)
    }

    async fn execute(&mut self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(String::new())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn send_keys(&mut self, selector: &str, text: &str) -> Result<()> {
        self.typed
            .entry(selector.to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn click(&mut self, _selector: &str) -> Result<()> {
        if self.fail_click {
            return Err(anyhow!("element not interactable"));
        }
        self.url = self.landing_url.clone();
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn authenticator() -> Authenticator {
    Authenticator::new(
        "https://www.linkedin.com/login",
        LoginCheck::new("checkpoint"),
    )
    .unwrap()
    .with_timings(LoginTimings::immediate(Duration::from_millis(10)))
}

fn creds() -> Option<Credentials> {
    Credentials::new("ada@example.com", "s3cret")
}

#[tokio::test]
async fn missing_credentials_skip_without_touching_the_browser() {
    let mut page = LoginPage::default();
    let mut auth = authenticator();

    let state = auth
        .authenticate(&mut page, Credentials::new("", ""))
        .await;

    assert_eq!(state, AuthState::NotAttempted);
    assert!(!state.is_failure());
    assert!(page.visited.is_empty());
}

#[tokio::test]
async fn redirect_to_feed_is_success() {
    let mut page = LoginPage {
        form_present: true,
        landing_url: "https://www.linkedin.com/feed/".into(),
        ..Default::default()
    };
    let mut auth = authenticator();

    let state = auth.authenticate(&mut page, creds()).await;

    assert_eq!(state, AuthState::Succeeded);
    assert_eq!(auth.state(), &AuthState::Succeeded);
    assert_eq!(page.visited, vec!["https://www.linkedin.com/login".to_string()]);
    assert_eq!(page.typed["#username"], "ada@example.com");
    assert_eq!(page.typed["#password"], "s3cret");
}

#[tokio::test]
async fn checkpoint_redirect_is_failure() {
    let mut page = LoginPage {
        form_present: true,
        landing_url: "https://www.linkedin.com/checkpoint/challenge/abc".into(),
        ..Default::default()
    };
    let state = authenticator().authenticate(&mut page, creds()).await;
    assert!(state.is_failure());
}

#[tokio::test]
async fn missing_form_is_failure() {
    let mut page = LoginPage::default();
    let state = authenticator().authenticate(&mut page, creds()).await;
    assert!(matches!(state, AuthState::Failed(msg) if msg.contains("login form")));
}

#[tokio::test]
async fn browser_error_is_contained() {
    let mut page = LoginPage {
        form_present: true,
        fail_click: true,
        ..Default::default()
    };
    let state = authenticator().authenticate(&mut page, creds()).await;
    assert!(state.is_failure());
}
