// ABOUTME: Integration tests for validated domain types.
// ABOUTME: Image references, content digests, platforms, and layer ids.

use pullscope::types::*;

mod image_ref_tests {
    use super::*;

    #[test]
    fn parse_simple_name() {
        let img = ImageRef::parse("nginx").unwrap();
        assert_eq!(img.name(), "nginx");
        assert_eq!(img.tag(), Some("latest"));
        assert!(img.registry().is_none());
        assert!(img.digest().is_none());
        assert_eq!(img.domain(), DEFAULT_DOMAIN);
    }

    #[test]
    fn parse_with_registry_and_org() {
        let img = ImageRef::parse("ghcr.io/org/repo:v1.2.3").unwrap();
        assert_eq!(img.registry(), Some("ghcr.io"));
        assert_eq!(img.domain(), "ghcr.io");
        assert_eq!(img.name(), "org/repo");
        assert_eq!(img.tag(), Some("v1.2.3"));
        assert_eq!(img.repository(), "ghcr.io/org/repo");
    }

    #[test]
    fn registry_port_is_not_a_tag() {
        let img = ImageRef::parse("localhost:5000/app").unwrap();
        assert_eq!(img.registry(), Some("localhost:5000"));
        assert_eq!(img.name(), "app");
        assert_eq!(img.tag(), Some("latest"));
    }

    #[test]
    fn digest_pinned_reference_pulls_by_digest() {
        let img = ImageRef::parse("nginx@sha256:abc123").unwrap();
        assert_eq!(img.tag(), None);
        assert_eq!(img.digest(), Some("sha256:abc123"));
        assert_eq!(img.pull_tag(), Some("sha256:abc123"));
    }

    #[test]
    fn tagged_reference_pulls_by_tag() {
        let img = ImageRef::parse("library/redis:7").unwrap();
        assert_eq!(img.repository(), "library/redis");
        assert_eq!(img.pull_tag(), Some("7"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(ImageRef::parse(""), Err(ParseImageRefError::Empty)));
        assert!(matches!(
            ImageRef::parse("nginx latest"),
            Err(ParseImageRefError::InvalidChar(' '))
        ));
        assert!(ImageRef::parse("nginx:").is_err());
        assert!(ImageRef::parse("nginx@").is_err());
    }

    #[test]
    fn from_str_matches_parse() {
        let parsed: ImageRef = "ghcr.io/org/repo:v1".parse().unwrap();
        assert_eq!(parsed, ImageRef::parse("ghcr.io/org/repo:v1").unwrap());
        assert_eq!(parsed.to_string(), "ghcr.io/org/repo:v1");
    }
}

mod digest_tests {
    use super::*;

    #[test]
    fn parse_splits_algorithm_and_encoded() {
        let digest = Digest::parse("sha256:4f1c2e").unwrap();
        assert_eq!(digest.algorithm(), "sha256");
        assert_eq!(digest.hex(), "4f1c2e");
        assert_eq!(digest.to_string(), "sha256:4f1c2e");
    }

    #[test]
    fn short_is_clamped() {
        let digest = Digest::parse("sha256:abcdef").unwrap();
        assert_eq!(digest.short(3), "abc");
        assert_eq!(digest.short(12), "abcdef");
    }

    #[test]
    fn rejects_malformed_digests() {
        assert_eq!(Digest::parse(" "), Err(ParseDigestError::Empty));
        assert!(matches!(
            Digest::parse("deadbeef"),
            Err(ParseDigestError::MissingAlgorithm(_))
        ));
        assert!(matches!(
            Digest::parse("SHA256:abc"),
            Err(ParseDigestError::InvalidAlgorithm(_))
        ));
        assert!(matches!(
            Digest::parse("sha256:"),
            Err(ParseDigestError::InvalidEncoded(_))
        ));
    }

    #[test]
    fn serializes_as_string() {
        let digest = Digest::parse("sha256:abc").unwrap();
        assert_eq!(serde_json::to_string(&digest).unwrap(), r#""sha256:abc""#);
        let back: Digest = serde_json::from_str(r#""sha256:abc""#).unwrap();
        assert_eq!(back, digest);
    }
}

mod platform_tests {
    use super::*;

    #[test]
    fn parse_os_and_arch() {
        let platform = Platform::parse("linux/arm64").unwrap();
        assert_eq!(platform.os(), "linux");
        assert_eq!(platform.architecture(), "arm64");
        assert_eq!(platform.variant(), None);
    }

    #[test]
    fn parse_with_variant() {
        let platform: Platform = "linux/arm/v7".parse().unwrap();
        assert_eq!(platform.variant(), Some("v7"));
        assert_eq!(platform.to_string(), "linux/arm/v7");
    }

    #[test]
    fn daemon_arch_names_are_normalized() {
        assert_eq!(Platform::new("linux", "x86_64").architecture(), "amd64");
        assert_eq!(Platform::new("linux", "aarch64").architecture(), "arm64");
    }

    #[test]
    fn rejects_bad_platforms() {
        assert_eq!(Platform::parse(""), Err(ParsePlatformError::Empty));
        assert!(Platform::parse("linux").is_err());
        assert!(Platform::parse("linux//v7").is_err());
        assert!(Platform::parse("a/b/c/d").is_err());
    }
}

mod id_tests {
    use super::*;

    #[test]
    fn layer_id_stores_value() {
        let id = LayerId::new("abc123");
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(id.into_inner(), "abc123");
    }

    #[test]
    fn layer_ids_order_lexically() {
        let mut ids = vec![LayerId::new("bbb"), LayerId::new("aaa")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "aaa");
    }
}
