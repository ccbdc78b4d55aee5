// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated encryption of session cookie values.
//!
//! Cookie format: `base64url(nonce || ciphertext || tag)` where the nonce is
//! 12 fresh random bytes per seal and the cipher is AES-GCM (128 or 256 bit
//! depending on key length). Any failure to open, whatever the cause, is
//! reported as [`SessionError::Unauthenticated`].

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Session codec errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// The token could not be opened. Deliberately carries no detail.
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("invalid session key")]
    InvalidKey,

    #[error("failed to seal session value")]
    Seal,
}

/// Seals and opens session values under a server-held key.
#[derive(Clone)]
pub struct SessionCodec {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl SessionCodec {
    /// Build a codec from raw key bytes (16 bytes for AES-128-GCM, 32 for AES-256-GCM).
    pub fn new(key: &[u8]) -> Result<Self, SessionError> {
        let algorithm = match key.len() {
            16 => &AES_128_GCM,
            32 => &AES_256_GCM,
            _ => return Err(SessionError::InvalidKey),
        };
        let unbound = UnboundKey::new(algorithm, key).map_err(|_| SessionError::InvalidKey)?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt raw bytes, returning a cookie-safe string.
    pub fn seal_bytes(&self, plaintext: &[u8]) -> Result<String, SessionError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| SessionError::Seal)?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| SessionError::Seal)?;

        let mut combined = Vec::with_capacity(NONCE_LEN + in_out.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&in_out);

        Ok(URL_SAFE_NO_PAD.encode(combined))
    }

    /// Decrypt a string produced by [`seal_bytes`](Self::seal_bytes).
    pub fn open_bytes(&self, token: &str) -> Result<Vec<u8>, SessionError> {
        let mut combined = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| SessionError::Unauthenticated)?;

        let tag_len = self.key.algorithm().tag_len();
        if combined.len() < NONCE_LEN + tag_len {
            return Err(SessionError::Unauthenticated);
        }

        let mut sealed = combined.split_off(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(&combined)
            .map_err(|_| SessionError::Unauthenticated)?;

        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut sealed)
            .map_err(|_| SessionError::Unauthenticated)?;

        Ok(plaintext.to_vec())
    }

    /// Serialize `value` as JSON and seal it.
    pub fn seal<T: Serialize>(&self, value: &T) -> Result<String, SessionError> {
        let plaintext = serde_json::to_vec(value).map_err(|_| SessionError::Seal)?;
        self.seal_bytes(&plaintext)
    }

    /// Open a token and deserialize the JSON value inside.
    pub fn open<T: DeserializeOwned>(&self, token: &str) -> Result<T, SessionError> {
        let plaintext = self.open_bytes(token)?;
        serde_json::from_slice(&plaintext).map_err(|_| SessionError::Unauthenticated)
    }
}
