//! # SIP URI
//!
//! SIP URIs as defined in [RFC 3261](https://tools.ietf.org/html/rfc3261),
//! reduced to the subset this stack manipulates:
//!
//! ```text
//! sip:user@host:port;param=value;flag
//! ```
//!
//! The grammar is implemented with nom. Headers (`?key=value`) and the
//! deprecated password field are not carried; the engines never read them.
//!
//! ## Examples
//!
//! ```
//! use ferrosip_sip_core::types::uri::{Scheme, Uri};
//! use std::str::FromStr;
//!
//! let uri = Uri::from_str("sip:alice@example.com:5060;transport=udp").unwrap();
//! assert_eq!(uri.scheme, Scheme::Sip);
//! assert_eq!(uri.user.as_deref(), Some("alice"));
//! assert_eq!(uri.host, "example.com");
//! assert_eq!(uri.port, Some(5060));
//! assert_eq!(uri.param_value("transport"), Some("udp"));
//!
//! let uri = Uri::sip("example.com").with_user("bob").with_param("lr", None);
//! assert_eq!(uri.to_string(), "sip:bob@example.com;lr");
//! ```

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::{all_consuming, map, map_res, opt},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::error::SipError;

/// URI scheme component
///
/// The engines only route `sip` and `sips`; anything else is preserved
/// verbatim so it can be rejected with the right status code downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// SIP URI (non-secure)
    Sip,
    /// SIPS URI (secure SIP)
    Sips,
    /// TEL URI (telephone number)
    Tel,
    /// Any other scheme
    Custom(String),
}

impl Scheme {
    /// String form of the scheme, without the trailing colon.
    pub fn as_str(&self) -> &str {
        match self {
            Scheme::Sip => "sip",
            Scheme::Sips => "sips",
            Scheme::Tel => "tel",
            Scheme::Custom(s) => s,
        }
    }

    /// Whether this scheme addresses a SIP resource (`sip` or `sips`).
    pub fn is_sip(&self) -> bool {
        matches!(self, Scheme::Sip | Scheme::Sips)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = SipError;

    fn from_str(s: &str) -> Result<Self, SipError> {
        match s.to_ascii_lowercase().as_str() {
            "sip" => Ok(Scheme::Sip),
            "sips" => Ok(Scheme::Sips),
            "tel" => Ok(Scheme::Tel),
            _ => Ok(Scheme::Custom(s.to_string())),
        }
    }
}

/// A `;name=value` or bare `;name` URI/contact parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        Param { name: name.into(), value: value.map(Into::into) }
    }

    /// Case-insensitive name match per RFC 3261 §19.1.4.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

/// A SIP URI value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uri {
    pub scheme: Scheme,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub params: Vec<Param>,
}

impl Uri {
    /// A bare `sip:host` URI.
    pub fn sip(host: impl Into<String>) -> Self {
        Uri {
            scheme: Scheme::Sip,
            user: None,
            host: host.into(),
            port: None,
            params: Vec::new(),
        }
    }

    /// A bare `sips:host` URI.
    pub fn sips(host: impl Into<String>) -> Self {
        Uri { scheme: Scheme::Sips, ..Uri::sip(host) }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Append a parameter, replacing any existing one with the same name.
    pub fn with_param(mut self, name: &str, value: Option<&str>) -> Self {
        self.set_param(name, value);
        self
    }

    /// Set or replace a parameter in place.
    pub fn set_param(&mut self, name: &str, value: Option<&str>) {
        self.params.retain(|p| !p.is(name));
        self.params.push(Param::new(name, value));
    }

    /// Remove a parameter if present.
    pub fn remove_param(&mut self, name: &str) {
        self.params.retain(|p| !p.is(name));
    }

    /// The parameter with the given name, if present.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.is(name))
    }

    /// The value of a `name=value` parameter; `None` for absent or bare.
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(|p| p.value.as_deref())
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// The `transport` parameter, lowercased convention per RFC 3261.
    pub fn transport(&self) -> Option<&str> {
        self.param_value("transport")
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for param in &self.params {
            write!(f, ";{}", param)?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = SipError;

    fn from_str(s: &str) -> Result<Self, SipError> {
        match all_consuming(uri_parser)(s.trim()) {
            Ok((_, uri)) => Ok(uri),
            Err(_) => Err(SipError::InvalidRequest(format!("invalid URI: {s}"))),
        }
    }
}

fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'
}

fn is_user_char(c: char) -> bool {
    c != '@' && c != ';' && c != '>' && c != '?'
}

fn is_host_char(c: char) -> bool {
    c != ':' && c != ';' && c != '>' && c != '?' && c != '@'
}

fn is_param_char(c: char) -> bool {
    c != ';' && c != '=' && c != '>' && c != '?'
}

fn scheme_parser(input: &str) -> IResult<&str, Scheme> {
    map_res(
        terminated(take_while1(is_scheme_char), char(':')),
        Scheme::from_str,
    )(input)
}

/// Host part: a bracketed IPv6 reference or a bare hostname/IPv4.
fn host_parser(input: &str) -> IResult<&str, String> {
    alt((
        map(
            delimited(char('['), take_while1(|c| c != ']'), char(']')),
            |h: &str| format!("[{h}]"),
        ),
        map(take_while1(is_host_char), str::to_string),
    ))(input)
}

fn port_parser(input: &str) -> IResult<&str, u16> {
    map_res(take_while1(|c: char| c.is_ascii_digit()), str::parse::<u16>)(input)
}

fn param_parser(input: &str) -> IResult<&str, Param> {
    map(
        pair(
            take_while1(is_param_char),
            opt(preceded(char('='), take_while1(is_param_char))),
        ),
        |(name, value): (&str, Option<&str>)| Param::new(name, value),
    )(input)
}

fn uri_parser(input: &str) -> IResult<&str, Uri> {
    let (input, scheme) = scheme_parser(input)?;
    let (input, user) = opt(terminated(take_while1(is_user_char), tag("@")))(input)?;
    let (input, host) = host_parser(input)?;
    let (input, port) = opt(preceded(char(':'), port_parser))(input)?;
    let (input, params) = many0(preceded(char(';'), param_parser))(input)?;
    Ok((
        input,
        Uri {
            scheme,
            user: user.map(str::to_string),
            host,
            port,
            params,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_uri() {
        let uri = Uri::from_str("sips:carol@chicago.example.com:5061;transport=tls;lr").unwrap();
        assert_eq!(uri.scheme, Scheme::Sips);
        assert_eq!(uri.user.as_deref(), Some("carol"));
        assert_eq!(uri.host, "chicago.example.com");
        assert_eq!(uri.port, Some(5061));
        assert_eq!(uri.transport(), Some("tls"));
        assert!(uri.has_param("lr"));
        assert_eq!(uri.param_value("lr"), None);
    }

    #[test]
    fn test_parse_hostonly_uri() {
        let uri = Uri::from_str("sip:proxy.example.org").unwrap();
        assert_eq!(uri.user, None);
        assert_eq!(uri.host, "proxy.example.org");
        assert_eq!(uri.port, None);
        assert!(uri.params.is_empty());
    }

    #[test]
    fn test_parse_ipv6_host() {
        let uri = Uri::from_str("sip:bob@[2001:db8::10]:5060").unwrap();
        assert_eq!(uri.host, "[2001:db8::10]");
        assert_eq!(uri.port, Some(5060));
    }

    #[test]
    fn test_roundtrip_display() {
        for s in [
            "sip:alice@example.com",
            "sip:alice@example.com:5060;transport=udp",
            "sips:example.com;lr",
        ] {
            assert_eq!(Uri::from_str(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_param_replacement() {
        let uri = Uri::sip("example.com")
            .with_param("gr", Some("abc"))
            .with_param("gr", Some("def"));
        assert_eq!(uri.param_value("gr"), Some("def"));
        assert_eq!(uri.params.len(), 1);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Uri::from_str("not a uri").is_err());
        assert!(Uri::from_str("").is_err());
    }

    #[test]
    fn test_base64_user_part() {
        // Temporary GRUUs put base64 ciphertext in the user part.
        let uri = Uri::from_str("sip:QUJDREVG+x/z@example.com;gr").unwrap();
        assert_eq!(uri.user.as_deref(), Some("QUJDREVG+x/z"));
        assert!(uri.has_param("gr"));
    }
}
