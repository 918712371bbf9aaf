use serde::{Deserialize, Serialize};

/// Token document as persisted in `token.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GrantedToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Absolute expiry in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl GrantedToken {
    /// A token without an expiry never counts as expired.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry <= now_ms,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }

    /// Keep the previous refresh token when this one arrived without one.
    pub fn retain_refresh_token(mut self, previous: &GrantedToken) -> Self {
        let missing = self.refresh_token.as_deref().map_or(true, str::is_empty);
        if missing {
            self.refresh_token = previous.refresh_token.clone();
        }
        self
    }

    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.expiry_date
            .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
    }
}

/// Raw token response from the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_granted_token(self, now_ms: i64) -> GrantedToken {
        GrantedToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            scope: self.scope.unwrap_or_default(),
            token_type: self.token_type.unwrap_or_else(default_token_type),
            expiry_date: self.expires_in
                .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expiry_date: Option<i64>) -> GrantedToken {
        GrantedToken {
            access_token: "a".into(),
            refresh_token: None,
            scope: String::new(),
            token_type: "Bearer".into(),
            expiry_date,
        }
    }

    #[test]
    fn token_document_field_names() {
        let t = GrantedToken {
            access_token: "ya29.x".into(),
            refresh_token: Some("1//r".into()),
            scope: "https://www.googleapis.com/auth/gmail.readonly".into(),
            token_type: "Bearer".into(),
            expiry_date: Some(1_700_000_000_000),
        };
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["access_token"], "ya29.x");
        assert_eq!(value["refresh_token"], "1//r");
        assert_eq!(value["token_type"], "Bearer");
        assert_eq!(value["expiry_date"], 1_700_000_000_000_i64);
    }

    #[test]
    fn token_document_without_optional_fields() {
        let t: GrantedToken = serde_json::from_str(r#"{ "access_token": "x" }"#).unwrap();
        assert_eq!(t.access_token, "x");
        assert!(t.refresh_token.is_none());
        assert!(t.expiry_date.is_none());
        assert_eq!(t.token_type, "Bearer");

        let json = serde_json::to_string(&t).unwrap();
        assert!(!json.contains("refresh_token"));
        assert!(!json.contains("expiry_date"));
    }

    #[test]
    fn token_not_expired_when_no_expiry() {
        let t = token(None);
        for now in [i64::MIN, 0, now_ms(), i64::MAX] {
            assert!(!t.is_expired_at(now));
        }
    }

    #[test]
    fn token_expiry_boundary() {
        let t = token(Some(1_000));
        assert!(!t.is_expired_at(999));
        assert!(t.is_expired_at(1_000));
        assert!(t.is_expired_at(1_001));
    }

    #[test]
    fn token_expired_when_past() {
        assert!(token(Some(now_ms() - 3_600_000)).is_expired());
        assert!(!token(Some(now_ms() + 3_600_000)).is_expired());
    }

    #[test]
    fn retains_previous_refresh_token() {
        let mut previous = token(Some(0));
        previous.refresh_token = Some("old-refresh".into());

        let renewed = token(Some(10)).retain_refresh_token(&previous);
        assert_eq!(renewed.refresh_token.as_deref(), Some("old-refresh"));

        let mut empty = token(Some(10));
        empty.refresh_token = Some(String::new());
        let renewed = empty.retain_refresh_token(&previous);
        assert_eq!(renewed.refresh_token.as_deref(), Some("old-refresh"));

        let mut rotated = token(Some(10));
        rotated.refresh_token = Some("new-refresh".into());
        let renewed = rotated.retain_refresh_token(&previous);
        assert_eq!(renewed.refresh_token.as_deref(), Some("new-refresh"));
    }

    #[test]
    fn response_expires_in_becomes_absolute_millis() {
        let resp: TokenResponse = serde_json::from_str(
            r#"{ "access_token": "x", "expires_in": 3599, "scope": "s", "token_type": "Bearer" }"#,
        )
        .unwrap();
        let t = resp.into_granted_token(1_000);
        assert_eq!(t.expiry_date, Some(1_000 + 3_599_000));
        assert_eq!(t.scope, "s");
        assert!(t.refresh_token.is_none());
    }

    #[test]
    fn absurd_expires_in_saturates() {
        let resp: TokenResponse = serde_json::from_str(&format!(
            r#"{{ "access_token": "x", "expires_in": {} }}"#,
            i64::MAX
        ))
        .unwrap();
        let t = resp.into_granted_token(1_000);
        assert_eq!(t.expiry_date, Some(i64::MAX));
        assert!(!t.is_expired_at(i64::MAX - 1));
    }

    #[test]
    fn expires_at_converts_millis() {
        let t = token(Some(1_700_000_000_000));
        assert_eq!(t.expires_at().unwrap().timestamp(), 1_700_000_000);
        assert!(token(None).expires_at().is_none());
    }
}
