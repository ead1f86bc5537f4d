use oauth2::{CsrfToken, PkceCodeChallenge};
use secrecy::SecretString;

/// Bytes of entropy in the `state` value.
const STATE_BYTES: u32 = 32;

/// Fresh material for one authorization attempt.
///
/// The verifier and the state come from separate draws of the CSPRNG so
/// neither can be derived from the other.
#[derive(Debug)]
pub struct AuthorizationSeed {
    pub state: String,
    pub code_verifier: SecretString,
    pub code_challenge: String,
}

impl AuthorizationSeed {
    pub fn generate() -> Self {
        // 32 random bytes, base64url without padding; challenge is S256
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let state = CsrfToken::new_random_len(STATE_BYTES);
        Self {
            state: state.secret().to_string(),
            code_verifier: SecretString::new(verifier.secret().to_string()),
            code_challenge: challenge.as_str().to_string(),
        }
    }
}
