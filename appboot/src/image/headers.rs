//! `Cache-Control` parsing.

use std::time::Duration;

/// The subset of `Cache-Control` directives the loader acts on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheControl {
    pub no_store: bool,
    pub no_cache: bool,
    pub max_age: Option<Duration>,
}

impl CacheControl {
    /// Parse a header value. Unknown directives are ignored.
    pub fn parse(header: &str) -> Self {
        let mut control = CacheControl::default();
        for directive in header.split(',') {
            let directive = directive.trim();
            let (name, value) = match directive.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
                None => (directive, None),
            };
            match name.to_ascii_lowercase().as_str() {
                "no-store" => control.no_store = true,
                "no-cache" => control.no_cache = true,
                "max-age" => {
                    if let Some(secs) = value.and_then(|v| v.parse::<u64>().ok()) {
                        control.max_age = Some(Duration::from_secs(secs));
                    }
                }
                _ => {}
            }
        }
        control
    }

    /// Whether a response carrying these directives may be written to disk.
    pub fn permits_disk_storage(&self) -> bool {
        !self.no_store && self.max_age != Some(Duration::ZERO)
    }
}
