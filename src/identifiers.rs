use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

use crate::errors::AppError;

const CNPJ_DIGITS: usize = 14;

fn handle_regex() -> &'static Regex {
    static HANDLE: OnceLock<Regex> = OnceLock::new();
    HANDLE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._]{1,30}$").expect("valid handle regex"))
}

/// Instagram username, also used as the Facebook Ads Library search keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstagramHandle(String);

impl InstagramHandle {
    /// Accepts `handle`, `@handle` or a profile URL such as
    /// `https://www.instagram.com/handle/`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        let candidate = match trimmed.find("instagram.com/") {
            Some(idx) => trimmed[idx + "instagram.com/".len()..]
                .split(['/', '?', '#'])
                .next()
                .unwrap_or_default(),
            None => trimmed,
        };
        let handle = candidate.trim_start_matches('@');

        if !handle_regex().is_match(handle) {
            return Err(AppError::BadRequest(format!(
                "Invalid Instagram username: {}",
                raw.trim()
            )));
        }
        Ok(Self(handle.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstagramHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Advertiser domain, lowercased and without `www.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain(String);

impl Domain {
    /// Accepts a bare host (`acme.com.br`) or any URL on that host.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim().to_lowercase();
        let with_scheme = if trimmed.contains("://") {
            trimmed
        } else {
            format!("https://{}", trimmed)
        };

        let host = Url::parse(&with_scheme)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .filter(|host| host.contains('.') && !host.starts_with('.') && !host.ends_with('.'))
            .ok_or_else(|| AppError::BadRequest(format!("Invalid domain: {}", raw.trim())))?;

        let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
        Ok(Self(host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Brazilian company tax ID, digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cnpj(String);

impl Cnpj {
    /// Strips formatting (`12.345.678/0001-90` → `12345678000190`) and
    /// requires exactly 14 digits.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != CNPJ_DIGITS {
            return Err(AppError::BadRequest(format!(
                "CNPJ inválido: esperado {} dígitos, recebido {}",
                CNPJ_DIGITS,
                digits.len()
            )));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses an optional identifier; blank values count as omitted.
pub fn parse_optional<T>(
    raw: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, AppError>,
) -> Result<Option<T>, AppError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => parse(value).map(Some),
        _ => Ok(None),
    }
}
