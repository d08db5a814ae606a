#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum PagerError {
    #[error("Invalid page size {0}: page size must be at least 1")]
    InvalidPageSize(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("API error from {api}: {message}")]
    Api { api: String, message: String },

    #[error("API JSON error from {api}: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::PagerError;

    #[test]
    fn invalid_page_size_display_names_the_value() {
        let msg = PagerError::InvalidPageSize(0).to_string();
        assert!(msg.contains("Invalid page size 0"));
        assert!(msg.contains("at least 1"));
    }

    #[test]
    fn api_error_display_includes_source_name() {
        let err = PagerError::Api {
            api: "https://example.test/invoices".to_string(),
            message: "HTTP 500".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("example.test/invoices"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn io_error_converts_with_question_mark() {
        fn open() -> Result<(), PagerError> {
            let read: Result<(), std::io::Error> = Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "missing.json",
            ));
            read?;
            Ok(())
        }

        let msg = open().expect_err("io error").to_string();
        assert!(msg.starts_with("IO error:"));
        assert!(msg.contains("missing.json"));
    }
}
