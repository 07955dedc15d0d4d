//! Reversible credential obfuscation.
//!
//! This is an at-rest convenience that keeps literal plaintext defaults out
//! of source files and binaries. It is NOT encryption and NOT a security
//! boundary; real deployments supply credentials through the environment.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Encode a password for at-rest storage.
pub fn encode(plain: &str) -> String {
    STANDARD.encode(plain.as_bytes())
}

/// Decode an at-rest password. `None` when the input is not valid encoded
/// text (callers fall back to using the value verbatim).
pub fn decode(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}
