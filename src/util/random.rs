use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::core::types::{OAuthState, SessionId};

pub trait FromRandom {
    fn from_random() -> Self;
}

impl FromRandom for SessionId {
    fn from_random() -> Self {
        SessionId(random_string(32))
    }
}

impl FromRandom for OAuthState {
    fn from_random() -> Self {
        OAuthState(random_string(16))
    }
}

/// `size` random bytes, base64url encoded.
fn random_string(size: usize) -> String {
    use rand::RngCore;

    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
