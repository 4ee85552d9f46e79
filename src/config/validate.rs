//! Config validation logic.
//! Checks URL schemes and that no timeout is zero.

use anyhow::{Result, bail};
use std::time::Duration;
use tracing::debug;

use super::types::Config;

fn ensure_scheme(value: &str, name: &str, schemes: &[&str]) -> Result<()> {
    let Some((scheme, rest)) = value.split_once("://") else {
        bail!("{name} '{value}' is not a URL (expected {})", schemes.join(" or "));
    };
    if !schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        bail!("{name} '{value}' must use {}", schemes.join(" or "));
    }
    if rest.trim_matches('/').is_empty() {
        bail!("{name} '{value}' has no host");
    }
    Ok(())
}

fn ensure_nonzero(value: Duration, name: &str) -> Result<()> {
    if value.is_zero() {
        bail!("{name} must be greater than zero");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure_scheme(&self.http_base, "http_base", &["http", "https"])?;
        if let Some(ws) = &self.ws_url {
            ensure_scheme(ws, "ws_url", &["ws", "wss"])?;
        }
        ensure_nonzero(self.availability_ttl, "availability_ttl_ms")?;
        ensure_nonzero(self.timeouts.default, "default_timeout_ms")?;
        ensure_nonzero(self.timeouts.move_op, "move_timeout_ms")?;
        ensure_nonzero(self.timeouts.copy_file, "copy_file_timeout_ms")?;
        ensure_nonzero(self.timeouts.copy_directory, "copy_directory_timeout_ms")?;
        ensure_nonzero(self.timeouts.load, "load_timeout_ms")?;
        ensure_nonzero(self.fallback_timeout, "fallback_timeout_ms")?;

        debug!(
            http_base = %self.http_base,
            ws_url = ?self.ws_url,
            use_websocket = self.use_websocket,
            "Config validated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn wrong_schemes_are_rejected() {
        assert!(Config::new("ftp://h").validate().is_err());
        assert!(Config::new("127.0.0.1:8188").validate().is_err());
        assert!(Config::new("http://").validate().is_err());
        let mut cfg = Config::new("https://h");
        cfg.ws_url = Some("http://h/ws".into());
        assert!(cfg.validate().is_err());
        cfg.ws_url = Some("wss://h/ws".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut cfg = Config::default();
        cfg.timeouts.move_op = Duration::ZERO;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("move_timeout_ms"));
    }
}
