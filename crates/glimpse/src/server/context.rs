//! Caller details captured from the HTTP request.

use axum::extract::ConnectInfo;
use axum::http::{header, Extensions, HeaderMap};
use glimpse_core::RequestContext;
use std::collections::BTreeMap;
use std::net::SocketAddr;

const UNKNOWN_IP: &str = "unknown";

/// Build a [`RequestContext`] from headers and connection extensions.
pub fn request_context(headers: &HeaderMap, extensions: &Extensions) -> RequestContext {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let client_ip = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string());

    RequestContext {
        user_agent,
        client_ip,
        headers: header_map(headers),
    }
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    map
}
