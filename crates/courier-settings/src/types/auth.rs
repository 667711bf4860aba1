use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which access gate the server installs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No gate; access rules are not enforced.
    #[default]
    None,
    /// Fixed token table from [`AuthSettings::tokens`].
    Static,
    /// HS256 JWTs signed with [`JwtSettings::secret`].
    Jwt,
}

impl AuthMode {
    /// Lowercase name as used in settings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Static => "static",
            Self::Jwt => "jwt",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "static" => Ok(Self::Static),
            "jwt" => Ok(Self::Jwt),
            other => Err(format!("unknown auth mode '{other}'")),
        }
    }
}

/// Access gate settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Gate selection.
    pub mode: AuthMode,
    /// Token → caller attributes, for [`AuthMode::Static`].
    pub tokens: HashMap<String, Map<String, Value>>,
    /// JWT verification, for [`AuthMode::Jwt`].
    pub jwt: JwtSettings,
}

/// JWT verification settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JwtSettings {
    /// HMAC secret.
    pub secret: String,
    /// Required `iss` claim, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Required `aud` entry, if any. Without one the claim is not checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}
