//! Optional, best-effort sign-in that runs before a crawl.
//!
//! The flow is a small state machine:
//! `NotAttempted -> InProgress -> {Succeeded, Failed}`. Missing credentials
//! leave it at `NotAttempted`, which callers treat as a skip. Failure is never
//! fatal; the crawl just continues signed out.
use super::{behavioral::BehavioralEngine, behavioral::KEYSTROKE_DELAY, session::BrowserSession};
use anyhow::{anyhow, Result};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};
use trawl_common::{DelayRange, TrawlError};
use url::Url;

pub const EMAIL_ENV: &str = "LINKEDIN_EMAIL";
pub const PASSWORD_ENV: &str = "LINKEDIN_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    NotAttempted,
    InProgress,
    Succeeded,
    Failed(String),
}

impl AuthState {
    /// Only `Failed` counts as a failure; a skipped sign-in is fine.
    pub fn is_failure(&self) -> bool {
        matches!(self, AuthState::Failed(_))
    }
}

/// Email/password pair. Both halves are non-blank by construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let email = email.into();
        let password = password.into();
        if email.trim().is_empty() || password.trim().is_empty() {
            return None;
        }
        Some(Self { email, password })
    }

    pub fn from_env() -> Option<Self> {
        let email = std::env::var(EMAIL_ENV).ok()?;
        let password = std::env::var(PASSWORD_ENV).ok()?;
        Self::new(email, password)
    }

    /// Explicit values win when both are present; otherwise the environment.
    pub fn resolve(email: Option<String>, password: Option<String>) -> Option<Self> {
        match (email, password) {
            (Some(e), Some(p)) => Self::new(e, p).or_else(Self::from_env),
            _ => Self::from_env(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Heuristic success predicate: after the redirect the URL must not carry
/// the verification checkpoint marker. Markup and routing changes can break
/// it, so it lives here rather than inside the flow.
#[derive(Debug, Clone)]
pub struct LoginCheck {
    checkpoint_marker: String,
}

impl LoginCheck {
    pub fn new(checkpoint_marker: impl Into<String>) -> Self {
        Self {
            checkpoint_marker: checkpoint_marker.into(),
        }
    }

    pub fn is_success(&self, url: &str) -> bool {
        !url.contains(&self.checkpoint_marker)
    }
}

/// CSS selectors for the sign-in form.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub submit: String,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username: "#username".into(),
            password: "#password".into(),
            submit: "button[type='submit']".into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoginTimings {
    pub after_navigation: DelayRange,
    pub between_fields: DelayRange,
    pub after_submit: DelayRange,
    pub keystroke: DelayRange,
    pub element_timeout: Duration,
}

impl Default for LoginTimings {
    fn default() -> Self {
        Self {
            after_navigation: DelayRange::from_secs(2, 4),
            between_fields: DelayRange::new(500, 1000),
            after_submit: DelayRange::from_secs(3, 5),
            keystroke: KEYSTROKE_DELAY,
            element_timeout: Duration::from_secs(10),
        }
    }
}

impl LoginTimings {
    /// No waiting at all, except the element timeout.
    pub fn immediate(element_timeout: Duration) -> Self {
        Self {
            after_navigation: DelayRange::zero(),
            between_fields: DelayRange::zero(),
            after_submit: DelayRange::zero(),
            keystroke: DelayRange::zero(),
            element_timeout,
        }
    }
}

pub struct Authenticator {
    login_url: Url,
    check: LoginCheck,
    form: LoginForm,
    timings: LoginTimings,
    behavioral_engine: BehavioralEngine,
    state: AuthState,
}

impl Authenticator {
    pub fn new(login_url: &str, check: LoginCheck) -> Result<Self, TrawlError> {
        let login_url = Url::parse(login_url)
            .map_err(|e| TrawlError::Config(format!("invalid login url {login_url}: {e}")))?;
        Ok(Self {
            login_url,
            check,
            form: LoginForm::default(),
            timings: LoginTimings::default(),
            behavioral_engine: BehavioralEngine::new(),
            state: AuthState::NotAttempted,
        })
    }

    pub fn with_timings(mut self, timings: LoginTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_form(mut self, form: LoginForm) -> Self {
        self.form = form;
        self
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Attempt to sign in once. Never returns an error: the outcome is the
    /// resulting state.
    pub async fn authenticate(
        &mut self,
        session: &mut dyn BrowserSession,
        credentials: Option<Credentials>,
    ) -> AuthState {
        let Some(credentials) = credentials else {
            warn!(target: "trawl.auth", "credentials not provided; skipping login");
            self.state = AuthState::NotAttempted;
            return self.state.clone();
        };

        info!(target: "trawl.auth", email = credentials.email(), "attempting login");
        self.state = AuthState::InProgress;

        self.state = match self.sign_in(session, &credentials).await {
            Ok(url) if self.check.is_success(&url) => {
                info!(target: "trawl.auth", %url, "login succeeded");
                AuthState::Succeeded
            }
            Ok(url) => {
                let err = TrawlError::Authentication(format!(
                    "verification required or login rejected (landed on {url})"
                ));
                warn!(target: "trawl.auth", error = %err, "login may have failed");
                AuthState::Failed(err.to_string())
            }
            Err(e) => {
                let err = TrawlError::Authentication(e.to_string());
                warn!(target: "trawl.auth", error = %err, "login failed");
                AuthState::Failed(err.to_string())
            }
        };
        self.state.clone()
    }

    async fn sign_in(
        &self,
        session: &mut dyn BrowserSession,
        credentials: &Credentials,
    ) -> Result<String> {
        let engine = &self.behavioral_engine;
        let t = &self.timings;

        session.goto(self.login_url.as_str()).await?;
        engine.pause(t.after_navigation).await;

        if !session
            .wait_for_element(&self.form.username, t.element_timeout)
            .await?
        {
            return Err(anyhow!(
                "login form did not appear within {:?}",
                t.element_timeout
            ));
        }

        engine
            .type_text_human_like(session, &self.form.username, &credentials.email, t.keystroke)
            .await?;
        engine.pause(t.between_fields).await;
        engine
            .type_text_human_like(
                session,
                &self.form.password,
                &credentials.password,
                t.keystroke,
            )
            .await?;
        engine.pause(t.between_fields).await;

        session.click(&self.form.submit).await?;
        engine.pause(t.after_submit).await;

        session.current_url().await
    }
}
