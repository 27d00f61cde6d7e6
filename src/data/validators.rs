use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use url::Url;

use crate::data::value::parse_numeric;
use crate::error::TableError;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
        .expect("email pattern")
});

static INT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(0|[1-9][0-9]*)$").expect("int pattern"));

static MAC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}|([0-9A-Fa-f]{4}\.){2}[0-9A-Fa-f]{4})$")
        .expect("mac pattern")
});

static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("domain label pattern")
});

/// Named value checks usable with the `is` filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    Int,
    Float,
    Bool,
    Email,
    Url,
    Ip,
    Ipv4,
    Ipv6,
    Mac,
    Domain,
}

impl FromStr for Validator {
    type Err = TableError;

    /// Accepts short names (`int`, `email`, ...) and `FILTER_VALIDATE_*` tokens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let name = lower.strip_prefix("filter_validate_").unwrap_or(&lower);
        match name {
            "int" | "integer" => Ok(Validator::Int),
            "float" => Ok(Validator::Float),
            "bool" | "boolean" => Ok(Validator::Bool),
            "email" => Ok(Validator::Email),
            "url" => Ok(Validator::Url),
            "ip" => Ok(Validator::Ip),
            "ipv4" => Ok(Validator::Ipv4),
            "ipv6" => Ok(Validator::Ipv6),
            "mac" => Ok(Validator::Mac),
            "domain" => Ok(Validator::Domain),
            _ => Err(TableError::UnknownValidator(s.to_string())),
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Validator::Int => "int",
            Validator::Float => "float",
            Validator::Bool => "bool",
            Validator::Email => "email",
            Validator::Url => "url",
            Validator::Ip => "ip",
            Validator::Ipv4 => "ipv4",
            Validator::Ipv6 => "ipv6",
            Validator::Mac => "mac",
            Validator::Domain => "domain",
        };
        write!(f, "{}", name)
    }
}

impl Validator {
    pub fn validate(&self, input: &str) -> bool {
        let s = input.trim();
        match self {
            Validator::Int => INT_RE.is_match(s) && s.parse::<i64>().is_ok(),
            Validator::Float => parse_numeric(s).is_some(),
            Validator::Bool => is_bool_token(s),
            Validator::Email => s.len() <= 320 && EMAIL_RE.is_match(s),
            Validator::Url => Url::parse(s).is_ok(),
            Validator::Ip => s.parse::<IpAddr>().is_ok(),
            Validator::Ipv4 => s.parse::<Ipv4Addr>().is_ok(),
            Validator::Ipv6 => s.parse::<Ipv6Addr>().is_ok(),
            Validator::Mac => MAC_RE.is_match(s),
            Validator::Domain => is_domain(s),
        }
    }
}

fn is_bool_token(s: &str) -> bool {
    matches!(
        s.to_lowercase().as_str(),
        "true" | "false" | "1" | "0" | "yes" | "no" | "on" | "off"
    )
}

/// Host names made of dot-separated labels; a single trailing dot is allowed.
fn is_domain(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| LABEL_RE.is_match(label))
}
