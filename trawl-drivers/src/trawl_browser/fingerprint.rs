use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Snapshot of user agent, viewport, and locale characteristics.
pub struct UserAgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub platform: String,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone)]
/// Small pool of plausible desktop profiles; one is picked per session.
pub struct UserAgentManager {
    session_profile: UserAgentProfile,
}

impl Default for UserAgentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentManager {
    /// Pick a session profile at random from the built-in pool.
    pub fn new() -> Self {
        let pool = desktop_profiles();
        let mut rng = rand::thread_rng();
        let session_profile = pool
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| pool[0].clone());
        Self { session_profile }
    }

    /// The profile rotated in for this session.
    pub fn session_profile(&self) -> &UserAgentProfile {
        &self.session_profile
    }
}

fn desktop_profiles() -> Vec<UserAgentProfile> {
    let en = || vec!["en-US".to_string(), "en".to_string()];
    vec![
        UserAgentProfile {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            viewport: (1920, 1080),
            platform: "Win32".to_string(),
            languages: en(),
        },
        UserAgentProfile {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            viewport: (1440, 900),
            platform: "MacIntel".to_string(),
            languages: en(),
        },
        UserAgentProfile {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36".to_string(),
            viewport: (1366, 768),
            platform: "Linux x86_64".to_string(),
            languages: en(),
        },
        UserAgentProfile {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15".to_string(),
            viewport: (1680, 1050),
            platform: "MacIntel".to_string(),
            languages: en(),
        },
    ]
}
