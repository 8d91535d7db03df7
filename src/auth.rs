//! Authentication for the Reinos Webservice: a single static shortkey.

/// Holds the shared-secret shortkey for the process lifetime.
#[derive(Debug, Clone)]
pub struct Auth {
    shortkey: String,
}

impl Auth {
    /// Declared content type for POST requests. The webservice expects this
    /// header even though the body it receives is multipart-encoded.
    pub const CONTENT_TYPE: &'static str = "application/x-www-form-urlencoded";

    pub fn new(shortkey: impl Into<String>) -> Self {
        Self {
            shortkey: shortkey.into(),
        }
    }

    /// Form fields every outbound request must carry. The `auth[...]`
    /// namespace keeps these apart from caller data, which is always wrapped
    /// as `data[...]`.
    pub fn params(&self) -> Vec<(String, String)> {
        vec![("auth[shortkey]".to_string(), self.shortkey.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortkey_lands_in_the_auth_namespace() {
        let auth = Auth::new("s3cret");
        assert_eq!(
            auth.params(),
            vec![("auth[shortkey]".to_string(), "s3cret".to_string())]
        );
    }
}
