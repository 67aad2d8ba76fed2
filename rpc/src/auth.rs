//! Caller identity and network origin.
//!
//! The member id arrives in `X-Member-Id`, set by the identity provider in
//! front of this service. The origin is the TCP peer address. Only when the
//! peer is a configured trusted proxy is `X-Forwarded-For` consulted.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use conclave_store::GovernanceStore;
use conclave_types::{MemberId, Origin};
use tracing::{debug, warn};

use crate::error::RpcError;
use crate::server::{blocking, AppState};

pub const MEMBER_HEADER: &str = "x-member-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// The authenticated caller. Rejects with 401 when the header is missing
/// or blank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller(pub MemberId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        member_from_headers(&parts.headers)
            .map(Caller)
            .ok_or(RpcError::Unauthenticated)
    }
}

pub fn member_from_headers(headers: &HeaderMap) -> Option<MemberId> {
    let raw = headers.get(MEMBER_HEADER)?.to_str().ok()?;
    MemberId::parse(raw).ok()
}

/// The client named by a chain of trusted proxies in `X-Forwarded-For`.
///
/// Hops are read right to left and trusted proxies are skipped; the first
/// other hop is the client. A chain made only of trusted proxies yields its
/// leftmost hop. Malformed headers yield `None`.
pub fn forwarded_client(headers: &HeaderMap, trusted_proxies: &[IpAddr]) -> Option<Origin> {
    let hops: Vec<&str> = headers
        .get_all(FORWARDED_FOR_HEADER)
        .iter()
        .map(|value| value.to_str().ok())
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .flat_map(|raw| raw.split(',').map(str::trim))
        .collect();
    if hops.iter().any(|hop| hop.is_empty()) {
        return None;
    }
    let is_trusted = |hop: &&str| {
        hop.parse::<IpAddr>()
            .is_ok_and(|ip| trusted_proxies.contains(&ip))
    };
    hops.iter()
        .rev()
        .find(|hop| !is_trusted(*hop))
        .or_else(|| hops.first())
        .map(|hop| Origin::new(*hop))
}

/// Origin of `req`: the TCP peer, or the forwarded client when the peer is
/// a trusted proxy. `None` when the server was started without connect
/// info.
pub fn request_origin(req: &Request, trusted_proxies: &[IpAddr]) -> Option<Origin> {
    let ConnectInfo(peer) = req.extensions().get::<ConnectInfo<SocketAddr>>()?;
    let peer = peer.ip();
    if trusted_proxies.contains(&peer) {
        if let Some(client) = forwarded_client(req.headers(), trusted_proxies) {
            return Some(client);
        }
    }
    Some(Origin::new(peer.to_string()))
}

/// Refuse blacklisted origins with 403 and remember the origin of
/// identified callers. Requests without a resolvable origin pass through.
pub async fn origin_gate<S>(
    State(state): State<Arc<AppState<S>>>,
    req: Request,
    next: Next,
) -> Response
where
    S: GovernanceStore + 'static,
{
    let Some(origin) = request_origin(&req, &state.trusted_proxies) else {
        return next.run(req).await;
    };

    let member = member_from_headers(req.headers());
    let checked = origin.clone();
    let verdict = blocking(&state, move |engine| {
        if engine.is_blacklisted(&checked)? {
            return Ok(true);
        }
        // Unknown callers are left to the handlers to reject.
        let known = match &member {
            Some(id) => engine.member(id)?,
            None => None,
        };
        if let Some(known) = known {
            if known.last_known_origin.as_ref() != Some(&checked) {
                engine.record_origin(&known.id, &checked)?;
            }
        }
        Ok(false)
    })
    .await;

    match verdict {
        Ok(true) => {
            debug!(origin = %origin, "request from blacklisted origin refused");
            RpcError::Blacklisted.into_response()
        }
        Ok(false) => next.run(req).await,
        Err(e) => {
            warn!(origin = %origin, error = %e, "origin check failed");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn member_header_is_trimmed_and_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(member_from_headers(&headers), None);
        headers.insert(MEMBER_HEADER, HeaderValue::from_static("   "));
        assert_eq!(member_from_headers(&headers), None);
        headers.insert(MEMBER_HEADER, HeaderValue::from_static(" alice "));
        assert_eq!(member_from_headers(&headers), Some(MemberId::new("alice")));
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn request(peer: &str, forwarded: Option<&'static str>) -> Request {
        let mut req = Request::new(axum::body::Body::empty());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(ip(peer), 40_000)));
        if let Some(value) = forwarded {
            req.headers_mut()
                .insert(FORWARDED_FOR_HEADER, HeaderValue::from_static(value));
        }
        req
    }

    #[test]
    fn forwarded_client_skips_trusted_hops_from_the_right() {
        let trusted = [ip("10.0.0.1"), ip("10.0.0.2")];
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_client(&headers, &trusted), None);

        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static("1.2.3.4, 203.0.113.5, 10.0.0.2"),
        );
        assert_eq!(
            forwarded_client(&headers, &trusted),
            Some(Origin::new("203.0.113.5"))
        );

        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("10.0.0.2, 10.0.0.1"));
        assert_eq!(forwarded_client(&headers, &trusted), Some(Origin::new("10.0.0.2")));

        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static(" , 10.0.0.1"));
        assert_eq!(forwarded_client(&headers, &trusted), None);
    }

    #[test]
    fn untrusted_peer_is_the_origin_whatever_it_forwards() {
        let req = request("198.51.100.7", Some("1.2.3.4"));
        assert_eq!(request_origin(&req, &[]), Some(Origin::new("198.51.100.7")));
        assert_eq!(
            request_origin(&req, &[ip("10.0.0.1")]),
            Some(Origin::new("198.51.100.7"))
        );
    }

    #[test]
    fn trusted_proxy_forwards_the_client() {
        let trusted = [ip("10.0.0.1")];
        let req = request("10.0.0.1", Some("203.0.113.5"));
        assert_eq!(request_origin(&req, &trusted), Some(Origin::new("203.0.113.5")));

        let bare = request("10.0.0.1", None);
        assert_eq!(request_origin(&bare, &trusted), Some(Origin::new("10.0.0.1")));
    }

    #[test]
    fn no_connect_info_means_no_origin() {
        let mut req = Request::new(axum::body::Body::empty());
        req.headers_mut()
            .insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("1.2.3.4"));
        assert_eq!(request_origin(&req, &[]), None);
    }
}
