pub mod auth;
pub mod behavioral;
pub mod download;
pub mod driver;
pub mod fingerprint;
pub mod resolver;
pub mod session;
pub mod stealth;
