//! Bundled FIX dictionaries.
//!
//! [`load_bundled`] resolves a dictionary file the same way the
//! grounding crate's `easyfix-messages/build.rs` resolves its own XML
//! inputs: an environment variable takes precedence, with a path
//! relative to this crate's `CARGO_MANIFEST_DIR` as the fallback. The
//! grounding crate does this resolution at build time to feed codegen;
//! here it happens at call time since the dictionary is loaded into a
//! runtime [`fixproto_schema::Protocol`] rather than compiled into
//! generated Rust types.

use std::path::PathBuf;

use fixproto_schema::{Protocol, SchemaError};

/// Loads one of the dictionaries bundled under `dictionaries/` in this
/// crate. `version` is the dictionary's file stem, e.g. `"fix44"` for
/// `dictionaries/fix44.xml`.
///
/// The path can be overridden per version with an
/// `FIXPROTO_DICTIONARY_<VERSION>` environment variable (version
/// upper-cased), which is checked before falling back to the bundled
/// file.
pub fn load_bundled(version: &str) -> Result<Protocol, SchemaError> {
    Protocol::load(bundled_path(version))
}

fn bundled_path(version: &str) -> PathBuf {
    let env_key = format!("FIXPROTO_DICTIONARY_{}", version.to_uppercase());
    if let Ok(path) = std::env::var(&env_key) {
        tracing::debug!(version, env_key, path, "dictionary path overridden by environment");
        return PathBuf::from(path);
    }
    let dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(dir).join("dictionaries").join(format!("{version}.xml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_bundled_fix44_dictionary() {
        let protocol = load_bundled("fix44").expect("bundled FIX 4.4 dictionary loads");
        assert_eq!(protocol.protocol_id(), "FIX.4.4");
        assert!(protocol.message_by_name("Logon").is_some());
        assert!(protocol.message_by_name("NewOrderSingle").is_some());
    }

    #[test]
    fn environment_override_takes_precedence() {
        let env_key = "FIXPROTO_DICTIONARY_FIX44";
        // SAFETY: test-only mutation of a process-wide environment
        // variable; this crate's tests do not run this one in parallel
        // with another test that reads the same key.
        unsafe {
            std::env::set_var(env_key, "/nonexistent/path/does-not-exist.xml");
        }
        let err = load_bundled("fix44").unwrap_err();
        unsafe {
            std::env::remove_var(env_key);
        }
        assert_matches::assert_matches!(err, SchemaError::Io(_));
    }
}
