//! Remote-addressable container identity.
//!
//! The editor's attached-container scheme addresses a container by the hex
//! encoding of `/<container-name>`:
//!
//! ```text
//! vscode-remote://attached-container+2f73776562...2e74657374/testbed
//! ```

use crate::error::IdentityError;
use std::fmt;

/// URI prefix for files inside an attached container.
pub const REMOTE_SCHEME: &str = "vscode-remote://attached-container+";

/// Hex-encoded, path-prefixed container name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerIdentity(String);

impl ContainerIdentity {
    /// Derives the identity of a container from its runtime name.
    ///
    /// The name is always prefixed with `/` before encoding, so decoding and
    /// stripping one separator recovers the name exactly.
    pub fn from_container_name(name: &str) -> Self {
        Self(hex::encode(format!("/{name}")))
    }

    /// Lowercase hex form used inside URIs.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Recovers the container name this identity was derived from.
    pub fn decode(&self) -> Result<String, IdentityError> {
        let bytes = hex::decode(&self.0)?;
        let prefixed = String::from_utf8(bytes)?;
        match prefixed.strip_prefix('/') {
            Some(name) => Ok(name.to_string()),
            None => Err(IdentityError::MissingSeparator(prefixed)),
        }
    }

    /// Builds a remote URI for `path` inside the container.
    ///
    /// Leading slashes on `path` are collapsed into the single separator
    /// after the authority.
    pub fn remote_uri(&self, path: &str) -> String {
        format!("{REMOTE_SCHEME}{}/{}", self.0, path.trim_start_matches('/'))
    }
}

impl fmt::Display for ContainerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_hex_of_prefixed_name() {
        let identity = ContainerIdentity::from_container_name("abc");
        // "/abc" = 2f 61 62 63
        assert_eq!(identity.as_hex(), "2f616263");
        assert_eq!(identity.to_string(), "2f616263");
    }

    #[test]
    fn test_identity_decodes_back_to_name() {
        let name = "sweb.eval.django__django-11099.test";
        let identity = ContainerIdentity::from_container_name(name);
        assert_eq!(identity.decode().unwrap(), name);
    }

    #[test]
    fn test_identity_is_deterministic() {
        let a = ContainerIdentity::from_container_name("sweb.eval.x.run");
        let b = ContainerIdentity::from_container_name("sweb.eval.x.run");
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_keeps_existing_slash_reversible() {
        let identity = ContainerIdentity::from_container_name("/already");
        assert_eq!(identity.decode().unwrap(), "/already");
    }

    #[test]
    fn test_decode_rejects_missing_separator() {
        let identity = ContainerIdentity(hex::encode("abc"));
        assert!(matches!(
            identity.decode(),
            Err(IdentityError::MissingSeparator(s)) if s == "abc"
        ));
    }

    #[test]
    fn test_decode_rejects_bad_hex() {
        let identity = ContainerIdentity("zz".to_string());
        assert!(matches!(identity.decode(), Err(IdentityError::Hex(_))));
    }

    #[test]
    fn test_remote_uri() {
        let identity = ContainerIdentity::from_container_name("c");
        assert_eq!(
            identity.remote_uri("/testbed/a/b.py"),
            "vscode-remote://attached-container+2f63/testbed/a/b.py"
        );
        assert_eq!(
            identity.remote_uri("testbed"),
            "vscode-remote://attached-container+2f63/testbed"
        );
    }
}
