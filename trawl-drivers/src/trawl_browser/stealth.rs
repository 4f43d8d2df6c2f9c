use super::fingerprint::UserAgentProfile;
use trawl_common::StealthLevel;

/// Chrome command-line arguments for a given stealth level and fingerprint.
pub fn build_stealth_arguments(
    level: StealthLevel,
    user_profile: &UserAgentProfile,
    headless: bool,
) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        format!("--user-agent={}", user_profile.user_agent),
        format!(
            "--window-size={},{}",
            user_profile.viewport.0, user_profile.viewport.1
        ),
        format!("--lang={}", user_profile.languages.join(",")),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }
    if headless || level == StealthLevel::Maximum {
        args.push("--disable-gpu".to_string());
    }
    args
}

/// JavaScript evasions applied after launch and after each navigation.
pub struct StealthScripts;

impl StealthScripts {
    /// Hides the automation marker from page scripts.
    pub fn webdriver_mask() -> &'static str {
        "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });"
    }

    pub fn get_core_evasions() -> &'static str {
        r#"
            Object.defineProperty(navigator, 'plugins', { get: () => [1,2,3] });
            Object.defineProperty(navigator, 'languages', {
                get: () => ['en-US', 'en']
            });
            if (!window.chrome) window.chrome = { runtime: {} };
        "#
    }

    pub fn get_webgl_evasions() -> &'static str {
        r#"
            const getParameter = WebGLRenderingContext.prototype.getParameter;
            WebGLRenderingContext.prototype.getParameter = function(parameter) {
                if (parameter === 37445) return 'Intel Inc.';
                if (parameter === 37446) return 'Intel Iris OpenGL Engine';
                return getParameter.call(this, parameter);
            };
        "#
    }

    pub fn get_canvas_evasions() -> &'static str {
        r#"
            const getContext = HTMLCanvasElement.prototype.getContext;
            HTMLCanvasElement.prototype.getContext = function(type,...args){
                const ctx = getContext.call(this,type,...args);
                if(type==='2d' && ctx) {
                    const origToDataURL=this.toDataURL;
                    this.toDataURL=function(...a){
                        const imgdata=ctx.getImageData(0,0,this.width,this.height);
                        for(let i=0;i<imgdata.data.length;i+=4){
                            if(Math.random()<0.001)imgdata.data[i]+=Math.random()<0.5?-1:1;
                        }
                        ctx.putImageData(imgdata,0,0);
                        return origToDataURL.call(this,...a);
                    };
                }
                return ctx;
            };
        "#
    }

    /// Ordered scripts for `level`. The webdriver mask is always first.
    pub fn for_level(level: StealthLevel, profile: &UserAgentProfile) -> Vec<String> {
        let mut scripts = vec![Self::webdriver_mask().to_string()];
        match level {
            StealthLevel::Lightweight => {}
            StealthLevel::Balanced => {
                scripts.push(Self::get_core_evasions().to_string());
                scripts.push(Self::get_canvas_evasions().to_string());
            }
            StealthLevel::Maximum => {
                scripts.push(Self::get_core_evasions().to_string());
                scripts.push(Self::get_canvas_evasions().to_string());
                scripts.push(Self::get_webgl_evasions().to_string());
                scripts.push(format!(
                    "Object.defineProperty(navigator, 'platform', {{ get: () => '{}' }});",
                    profile.platform
                ));
            }
        }
        scripts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trawl_browser::fingerprint::UserAgentManager;

    #[test]
    fn arguments_carry_user_agent_and_suppression_flags() {
        let profile = UserAgentManager::new().session_profile().clone();
        let args = build_stealth_arguments(StealthLevel::Balanced, &profile, true);
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(args.contains(&format!("--user-agent={}", profile.user_agent)));
        assert!(args.iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn visible_session_has_no_headless_flag() {
        let profile = UserAgentManager::new().session_profile().clone();
        let args = build_stealth_arguments(StealthLevel::Lightweight, &profile, false);
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn every_level_starts_with_webdriver_mask() {
        let profile = UserAgentManager::new().session_profile().clone();
        for level in [
            StealthLevel::Lightweight,
            StealthLevel::Balanced,
            StealthLevel::Maximum,
        ] {
            let scripts = StealthScripts::for_level(level, &profile);
            assert_eq!(scripts[0], StealthScripts::webdriver_mask());
        }
        assert_eq!(
            StealthScripts::for_level(StealthLevel::Lightweight, &profile).len(),
            1
        );
        assert_eq!(
            StealthScripts::for_level(StealthLevel::Maximum, &profile).len(),
            5
        );
    }
}
