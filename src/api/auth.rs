//! Claimed-address extraction: `Authorization: Bearer <addr>`
//! or `x-user-address: <addr>`. Grounded in
//! `auth::middleware::auth_middleware` shape (extracts a header, inserts
//! an `AuthUser` extension for handlers to pull out), but since
//! authentication token parsing is out of scope this
//! does no signature or JWT verification — the header value is taken as
//! the claimed address and is subject only to the Validator's
//! address-shape check.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

const ADDRESS_HEADER: &str = "x-user-address";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub address: String,
}

pub async fn extract_claimed_address(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let address = bearer_address(&request).or_else(|| custom_header_address(&request));

    let Some(address) = address else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(AuthUser { address });
    Ok(next.run(request).await)
}

fn bearer_address(request: &Request<Body>) -> Option<String> {
    let header = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|s| s.trim().to_string())
}

fn custom_header_address(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(ADDRESS_HEADER)?
        .to_str()
        .ok()
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn bearer_header_yields_the_address() {
        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer 0xabc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_address(&req), Some("0xabc".to_string()));
    }

    #[test]
    fn custom_header_yields_the_address_when_no_bearer_present() {
        let req = Request::builder()
            .header(ADDRESS_HEADER, "0xdef")
            .body(Body::empty())
            .unwrap();
        assert_eq!(custom_header_address(&req), Some("0xdef".to_string()));
    }

    #[test]
    fn missing_both_headers_yields_none() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_address(&req), None);
        assert_eq!(custom_header_address(&req), None);
    }
}
