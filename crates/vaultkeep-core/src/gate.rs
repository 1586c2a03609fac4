//! Access gate: resolves a request's credentials to an owner id.
//!
//! A token may arrive in the `Authorization: Bearer <token>` header or in
//! the `token` cookie. When the header carries a bearer token it wins, even
//! if that token turns out to be invalid; the cookie is only consulted when
//! no bearer header is present.

use std::sync::Arc;

use uuid::Uuid;

use crate::credentials::CredentialService;

/// Name of the cookie that carries the identity token.
pub const TOKEN_COOKIE: &str = "token";

const BEARER_PREFIX: &str = "Bearer ";

/// Verifies identity tokens on behalf of protected operations.
#[derive(Debug, Clone)]
pub struct AccessGate {
    credentials: Arc<CredentialService>,
}

impl AccessGate {
    #[must_use]
    pub fn new(credentials: Arc<CredentialService>) -> Self {
        Self { credentials }
    }

    /// Pick the token to verify: a bearer header first, then the cookie.
    #[must_use]
    pub fn select_token<'a>(
        authorization: Option<&'a str>,
        cookie: Option<&'a str>,
    ) -> Option<&'a str> {
        let token = match authorization.and_then(|h| h.strip_prefix(BEARER_PREFIX)) {
            Some(bearer) => Some(bearer.trim()),
            None => cookie,
        };
        token.filter(|t| !t.is_empty())
    }

    /// Resolve the caller's owner id, or `None` if unauthenticated.
    #[must_use]
    pub fn authenticate(&self, authorization: Option<&str>, cookie: Option<&str>) -> Option<Uuid> {
        let token = Self::select_token(authorization, cookie)?;
        self.credentials.verify_token(token).map(|claims| claims.user_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::credentials::TEST_COST;

    fn gate(secret: &[u8]) -> AccessGate {
        AccessGate::new(Arc::new(CredentialService::new(TEST_COST, secret).unwrap()))
    }

    fn token(secret: &[u8], user: Uuid) -> String {
        CredentialService::new(TEST_COST, secret)
            .unwrap()
            .issue_token(user)
            .unwrap()
    }

    #[test]
    fn bearer_header_authenticates() {
        let user = Uuid::new_v4();
        let header = format!("Bearer {}", token(b"s", user));
        assert_eq!(gate(b"s").authenticate(Some(&header), None), Some(user));
    }

    #[test]
    fn cookie_authenticates_without_header() {
        let user = Uuid::new_v4();
        let cookie = token(b"s", user);
        assert_eq!(gate(b"s").authenticate(None, Some(&cookie)), Some(user));
    }

    #[test]
    fn invalid_bearer_does_not_fall_back_to_cookie() {
        let user = Uuid::new_v4();
        let cookie = token(b"s", user);
        assert_eq!(
            gate(b"s").authenticate(Some("Bearer not-a-token"), Some(&cookie)),
            None
        );
    }

    #[test]
    fn non_bearer_header_falls_back_to_cookie() {
        let user = Uuid::new_v4();
        let cookie = token(b"s", user);
        assert_eq!(
            gate(b"s").authenticate(Some("Basic dXNlcjpwYXNz"), Some(&cookie)),
            Some(user)
        );
    }

    #[test]
    fn missing_or_foreign_tokens_are_rejected() {
        let gate = gate(b"ours");
        assert_eq!(gate.authenticate(None, None), None);
        assert_eq!(gate.authenticate(Some("Bearer "), None), None);
        assert_eq!(gate.authenticate(None, Some("")), None);

        let foreign = token(b"theirs", Uuid::new_v4());
        assert_eq!(gate.authenticate(None, Some(&foreign)), None);
    }

    #[test]
    fn select_token_prefers_bearer() {
        assert_eq!(AccessGate::select_token(Some("Bearer a"), Some("b")), Some("a"));
        assert_eq!(AccessGate::select_token(None, Some("b")), Some("b"));
        assert_eq!(AccessGate::select_token(Some("bearer a"), None), None);
    }
}
