//! Identity marker grammar
//!
//! Three literals carry the signing identity in source files:
//!
//! ```text
//! public const string PublicKeyToken = "b77a5c561934e089";
//! public const string PublicKey = "0024000004800000...";
//! [assembly: InternalsVisibleTo("Other, PublicKey=0024000004800000...")]
//! ```
//!
//! Only the hex digits are replaced; everything around them is kept verbatim.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub text: String,
    pub changed: bool,
}

fn token_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(public\s+const\s+string\s+PublicKeyToken\s*=\s*")[0-9a-fA-F]{16}(")"#)
            .expect("token marker pattern is valid")
    })
}

fn public_key_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(public\s+const\s+string\s+PublicKey\s*=\s*")[0-9a-fA-F]*(")"#)
            .expect("public key marker pattern is valid")
    })
}

fn visibility_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(,\s*PublicKey=)[0-9a-fA-F]*(")"#)
            .expect("visibility marker pattern is valid")
    })
}

fn replace_value<'t>(re: &Regex, text: &'t str, value: &str) -> Cow<'t, str> {
    re.replace_all(text, |caps: &Captures<'_>| {
        format!("{}{}{}", &caps[1], value, &caps[2])
    })
}

/// Whether a source file carries any identity marker worth patching.
pub fn should_patch(text: &str) -> bool {
    text.contains("InternalsVisibleTo") || text.contains("PublicKeyToken")
}

pub fn patch_markers(text: &str, public_key_hex: &str, token_hex: &str) -> Patched {
    let patched = replace_value(token_marker(), text, token_hex);
    let patched = replace_value(public_key_marker(), &patched, public_key_hex);
    let patched = replace_value(visibility_marker(), &patched, public_key_hex).into_owned();

    let changed = patched != text;
    Patched {
        text: patched,
        changed,
    }
}
