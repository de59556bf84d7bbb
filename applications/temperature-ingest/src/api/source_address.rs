use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Network address a reading came from.
///
/// Behind the ingress the peer is the proxy, so forwarded headers win over
/// the socket address.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAddress(pub Option<String>);

impl<S> FromRequestParts<S> for SourceAddress
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(resolve(&parts.headers, peer)))
    }
}

pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    // X-Forwarded-For is "client, proxy1, proxy2"; the client is first.
    let forwarded = header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(str::trim).map(str::to_string))
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| header_value(headers, "x-real-ip").map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}
