//! Request extractors.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};

/// Device identity header sent by returning clients.
pub const BROWSER_ID_HEADER: &str = "X-Browser-ID";

/// Client IP, derived from proxy headers with a socket-address fallback.
///
/// First entry of `X-Forwarded-For`, else `X-Real-IP`, else the peer
/// address, else the literal `"unknown"`.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(forwarded) = header_str(parts, "X-Forwarded-For")
            && let Some(first) = forwarded.split(',').next()
        {
            let first = first.trim();
            if !first.is_empty() {
                return Ok(Self(first.to_string()));
            }
        }

        if let Some(real_ip) = header_str(parts, "X-Real-IP") {
            return Ok(Self(real_ip.to_string()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string());
        Ok(Self(peer))
    }
}

/// Optional device identity from the browser ID header.
#[derive(Debug, Clone)]
pub struct BrowserId(pub Option<String>);

impl<S> FromRequestParts<S> for BrowserId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            header_str(parts, BROWSER_ID_HEADER).map(ToString::to_string),
        ))
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
