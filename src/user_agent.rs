//! Default User-Agent sent by the HTTP client.

/// Default User-Agent for every request issued by the client (identifies the crate).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("pubfetch/{version} (publication-reader)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("pubfetch/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
            "UA must contain crate version"
        );
    }

    #[test]
    fn test_user_agent_identifies_reader() {
        let ua = default_user_agent();
        assert!(
            ua.contains("publication-reader"),
            "UA must identify as publication-reader: {ua}"
        );
    }
}
