//! OAuth 1.0a user-context authentication.
//!
//! [`Authenticator`] turns the four static secrets into a [`Session`], which
//! signs every outgoing request with an HMAC-SHA1 `Authorization` header.
//! Nothing is checked up front; a bad secret shows up as a 401 on first use.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::config::Credentials;
use crate::error::{TwitterError, TwitterResult};

/// Characters that must be percent-encoded in OAuth signatures.
/// RFC 3986 unreserved characters: ALPHA / DIGIT / "-" / "." / "_" / "~"
const OAUTH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Builds sessions from static credentials.
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: Credentials,
}

impl Authenticator {
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Produce a signing session. Never fails and never touches the network.
    #[must_use]
    pub fn authenticate(&self) -> Session {
        Session {
            consumer_key: self.credentials.consumer_key.clone(),
            consumer_secret: self.credentials.consumer_secret.clone(),
            access_token: self.credentials.access_token.clone(),
            access_token_secret: self.credentials.access_token_secret.clone(),
        }
    }
}

/// An authenticated session: signs requests on behalf of one account.
pub struct Session {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    access_token_secret: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Generate the OAuth 1.0a Authorization header value.
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `url` - Full URL (without query parameters)
    /// * `params` - Query parameters plus form body parameters
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> TwitterResult<String> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| TwitterError::OAuth(format!("Failed to get timestamp: {e}")))?
            .as_secs()
            .to_string();

        self.sign_with(method, url, params, &generate_nonce(), &timestamp)
    }

    fn sign_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> TwitterResult<String> {
        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                "HMAC-SHA1".to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.access_token.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        // Sorting happens on the encoded pairs
        let mut encoded: Vec<(String, String)> = oauth_params
            .iter()
            .chain(params.iter())
            .map(|(k, v)| (percent_encode(k), percent_encode(v)))
            .collect();
        encoded.sort();

        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            percent_encode(url),
            percent_encode(&param_string)
        );

        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(&self.access_token_secret)
        );

        let signature = hmac_sha1(&signing_key, &base_string)?;
        oauth_params.push(("oauth_signature".to_string(), signature));

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {header}"))
    }
}

/// Percent-encode a string according to RFC 3986.
pub(crate) fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Generate a random nonce for OAuth.
fn generate_nonce() -> String {
    use rand::RngCore;
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Compute HMAC-SHA1 and return base64-encoded result.
fn hmac_sha1(key: &str, data: &str) -> TwitterResult<String> {
    type HmacSha1 = Hmac<sha1::Sha1>;

    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| TwitterError::OAuth(e.to_string()))?;

    mac.update(data.as_bytes());
    let result = mac.finalize();
    Ok(BASE64.encode(result.into_bytes()))
}
