//! Static file serving for the public directory.
//!
//! The landing page is served at `/` from `<public_dir>/index.html`; every
//! other unmatched path is looked up in the public directory itself.

use tower_http::services::{ServeDir, ServeFile};

use crate::config::AppSettings;

/// Service for the landing page at `/`.
pub fn create_index_service(settings: &AppSettings) -> ServeFile {
    ServeFile::new(settings.index_path())
}

/// Fallback service for any other asset in the public directory.
///
/// Directory requests resolve to their `index.html`; missing files yield 404.
pub fn create_static_service(settings: &AppSettings) -> ServeDir {
    ServeDir::new(&settings.public_dir).append_index_html_on_directories(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_services() {
        let settings = AppSettings {
            environment: "test".to_string(),
            public_dir: "/srv/vaultcheck/public".to_string(),
        };
        // Just verify construction - file serving is exercised by the API tests
        let _index = create_index_service(&settings);
        let _assets = create_static_service(&settings);
    }
}
