// SPDX-License-Identifier: Apache-2.0

//! HMAC-signed session cookies. The cookie value is
//! `v1.<base64(username)>.<base64(hmac)>`; anything that fails the
//! signature check resolves to an anonymous identity.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use murmur_core::{Identity, IdentityService};
use murmur_model::Username;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "murmur_session";
const SESSION_VERSION: &str = "v1";

pub struct SignedSessions {
    secret: Vec<u8>,
}

impl SignedSessions {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn sign(&self, payload: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(payload.as_bytes());
        Some(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    fn verify(&self, payload: &str, sig: &str) -> bool {
        let Ok(expected) = URL_SAFE_NO_PAD.decode(sig) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(payload.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    fn cookie_value<'a>(cookie_header: &'a str) -> Option<&'a str> {
        cookie_header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
    }
}

impl IdentityService for SignedSessions {
    fn resolve(&self, cookie_header: Option<&str>) -> Identity {
        let Some(header) = cookie_header else {
            return Identity::Anonymous;
        };
        let Some(value) = Self::cookie_value(header) else {
            return Identity::Anonymous;
        };
        let mut parts = value.split('.');
        let (Some(version), Some(payload), Some(sig), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Identity::Anonymous;
        };
        if version != SESSION_VERSION || !self.verify(payload, sig) {
            return Identity::Anonymous;
        }
        let Ok(raw) = URL_SAFE_NO_PAD.decode(payload) else {
            return Identity::Anonymous;
        };
        let Ok(name) = String::from_utf8(raw) else {
            return Identity::Anonymous;
        };
        match Username::parse(&name) {
            Ok(username) => Identity::Known(username.as_str().to_string()),
            Err(_) => Identity::Anonymous,
        }
    }

    fn issue(&self, username: &str) -> String {
        let payload = URL_SAFE_NO_PAD.encode(username.as_bytes());
        let sig = self.sign(&payload).unwrap_or_default();
        format!(
            "{SESSION_COOKIE}={SESSION_VERSION}.{payload}.{sig}; Path=/; HttpOnly; SameSite=Lax"
        )
    }

    fn clear(&self) -> String {
        format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
    }
}
