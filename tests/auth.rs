// ABOUTME: Integration tests for registry credential resolution.
// ABOUTME: Docker config decoding, override precedence, and domain normalization.

use pullscope::auth::*;

mod docker_config_tests {
    use super::*;

    #[test]
    fn decodes_every_entry_form() {
        let auth = DockerConfigAuth::from_json(
            r#"{
                "auths": {
                    "https://index.docker.io/v1/": {"auth": "dXNlcjpwYXNz"},
                    "ghcr.io": {"username": "octo", "password": "token"},
                    "quay.io": {"identitytoken": "opaque"},
                    "empty.example.com": {}
                },
                "credsStore": "desktop"
            }"#,
        )
        .unwrap();
        assert_eq!(auth.len(), 3);

        let hub = auth.resolve("docker.io").unwrap();
        assert_eq!((hub.username.as_str(), hub.password.as_str()), ("user", "pass"));
        assert_eq!(hub.server.as_deref(), Some("https://index.docker.io/v1/"));

        let ghcr = auth.resolve("ghcr.io").unwrap();
        assert_eq!(ghcr.username, "octo");

        let quay = auth.resolve("quay.io").unwrap();
        assert_eq!(quay.identity_token.as_deref(), Some("opaque"));
        assert!(quay.password.is_empty());

        assert!(auth.resolve("empty.example.com").is_none());
    }

    #[test]
    fn password_may_contain_colons() {
        // "user:pa:ss"
        let auth = DockerConfigAuth::from_json(r#"{"auths":{"r.io":{"auth":"dXNlcjpwYTpzcw=="}}}"#)
            .unwrap();
        assert_eq!(auth.resolve("r.io").unwrap().password, "pa:ss");
    }

    #[test]
    fn invalid_auth_field_is_rejected() {
        let err = DockerConfigAuth::from_json(r#"{"auths":{"r.io":{"auth":"not base64!"}}}"#)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEntry { ref registry, .. } if registry == "r.io"));

        // "nocolon"
        let err = DockerConfigAuth::from_json(r#"{"auths":{"r.io":{"auth":"bm9jb2xvbg=="}}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("user:password"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            DockerConfigAuth::from_json("{"),
            Err(AuthError::Parse(_))
        ));
    }

    #[test]
    fn config_without_auths_is_empty() {
        assert!(DockerConfigAuth::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(matches!(
            DockerConfigAuth::load(&path),
            Err(AuthError::Read { .. })
        ));

        std::fs::write(&path, r#"{"auths":{"ghcr.io":{"auth":"dXNlcjpwYXNz"}}}"#).unwrap();
        assert_eq!(DockerConfigAuth::load(&path).unwrap().len(), 1);
    }

    #[test]
    fn default_path_honors_docker_config_env() {
        temp_env::with_var("DOCKER_CONFIG", Some("/etc/docker-client"), || {
            assert_eq!(
                DockerConfigAuth::default_path().unwrap(),
                std::path::PathBuf::from("/etc/docker-client/config.json")
            );
        });
    }

    #[test]
    fn missing_default_file_yields_no_credentials() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_var("DOCKER_CONFIG", Some(dir.path()), || {
            assert!(DockerConfigAuth::load_default().unwrap().is_empty());
        });
    }
}

mod resolver_tests {
    use super::*;

    #[test]
    fn overrides_take_precedence_over_fallback() {
        let fallback = StaticAuth::new()
            .with("ghcr.io", RegistryAuth::new("stored", "old"))
            .with("quay.io", RegistryAuth::new("stored", "quay"));
        let overrides = StaticAuth::new().with("ghcr.io", RegistryAuth::new("ci", "new"));
        let resolver = OverridingAuth::new(overrides, fallback);

        assert_eq!(resolver.resolve("ghcr.io").unwrap().username, "ci");
        assert_eq!(resolver.resolve("quay.io").unwrap().password, "quay");
        assert!(resolver.resolve("docker.io").is_none());
    }

    #[test]
    fn static_auth_normalizes_keys() {
        let auth = StaticAuth::new().with("https://registry-1.docker.io/v2/", RegistryAuth::new("u", "p"));
        assert!(auth.resolve("docker.io").is_some());
        assert!(auth.resolve("index.docker.io").is_some());
    }

    #[test]
    fn no_auth_resolves_nothing() {
        assert!(NoAuth.resolve("docker.io").is_none());
    }

    #[test]
    fn header_carries_identity_token() {
        let auth = RegistryAuth {
            identity_token: Some("opaque".to_string()),
            server: Some("quay.io".to_string()),
            ..Default::default()
        };
        let header = auth.to_header().unwrap();
        assert!(!header.contains('+') && !header.contains('/'));

        use base64::Engine;
        let json = base64::engine::general_purpose::URL_SAFE.decode(header).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["identitytoken"], "opaque");
        assert_eq!(value["serveraddress"], "quay.io");
        assert!(value.get("username").is_none());
    }
}
