// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! PKCE verifier/challenge pair for the authorization-code flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

const VERIFIER_BYTES: usize = 32;

/// Generate a fresh code verifier (43 URL-safe characters).
pub fn generate_verifier() -> anyhow::Result<String> {
    let mut bytes = [0u8; VERIFIER_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| anyhow::anyhow!("system RNG unavailable"))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// S256 challenge for a verifier.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
