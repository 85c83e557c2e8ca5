//! URL builders for the session backend.
//!
//! The backend always listens on port [`DEFAULT_PORT`], regardless of where
//! the page or tool that embeds the client was served from. These helpers take
//! any origin the caller already has (an HTTP page URL, a WebSocket URL, a
//! bare host) and rewrite it onto the backend's port with the right scheme.
//!
//! The builders are pure string assembly and never fail; a nonsense origin
//! produces a nonsense URL that the transport's `connect` will reject.

/// Port the session backend listens on.
pub const DEFAULT_PORT: u16 = 8001;

/// Build the WebSocket URL for a player's session connection.
///
/// Secure origins (`https`, `wss`) map to `wss`, everything else to `ws`.
/// The optional room code is appended as a query parameter so the server can
/// attach the player to an existing narrative session.
///
/// ```
/// use seance_client::endpoint::ws_url;
///
/// assert_eq!(
///     ws_url("http://example.com:3000", "ann", None),
///     "ws://example.com:8001/ws/ann"
/// );
/// assert_eq!(
///     ws_url("https://example.com", "ann", Some("QK4N7P")),
///     "wss://example.com:8001/ws/ann?room_code=QK4N7P"
/// );
/// ```
pub fn ws_url(origin: &str, player_id: &str, room_code: Option<&str>) -> String {
    let (secure, host) = split_origin(origin);
    let scheme = if secure { "wss" } else { "ws" };
    let mut url = format!("{scheme}://{host}:{DEFAULT_PORT}/ws/{player_id}");
    if let Some(code) = room_code {
        url.push_str("?room_code=");
        url.push_str(code);
    }
    url
}

/// Build the base URL for the backend's HTTP API.
///
/// ```
/// use seance_client::endpoint::api_base_url;
///
/// assert_eq!(api_base_url("http://localhost:3000"), "http://localhost:8001");
/// assert_eq!(api_base_url("wss://manor.example"), "https://manor.example:8001");
/// ```
///
/// For plain-http localhost origins the port is still rewritten; see
/// [`ws_url`] for the scheme mapping.
pub fn api_base_url(origin: &str) -> String {
    let (secure, host) = split_origin(origin);
    let scheme = if secure { "https" } else { "http" };
    format!("{scheme}://{host}:{DEFAULT_PORT}")
}

/// Split an origin into (is-secure, hostname) with any scheme, path and port
/// stripped. Bracketed IPv6 hosts keep their brackets.
fn split_origin(origin: &str) -> (bool, &str) {
    let (scheme, rest) = match origin.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("", origin),
    };
    let secure = matches!(scheme, "https" | "wss");

    let authority = rest.split(['/', '?']).next().unwrap_or(rest);
    let host = if authority.starts_with('[') {
        // IPv6 literal: keep everything up to and including the bracket.
        match authority.split_once(']') {
            Some((bracketed, _)) => authority.get(..bracketed.len() + 1).unwrap_or(authority),
            None => authority,
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                host
            }
            _ => authority,
        }
    };
    (secure, host)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_the_origin_port() {
        assert_eq!(
            ws_url("http://localhost:3000", "ann", None),
            "ws://localhost:8001/ws/ann"
        );
    }

    #[test]
    fn keeps_the_backend_port_when_already_there() {
        assert_eq!(
            ws_url("http://localhost:8001", "ann", None),
            "ws://localhost:8001/ws/ann"
        );
    }

    #[test]
    fn maps_secure_origins_to_wss() {
        assert_eq!(
            ws_url("https://manor.example", "ann", None),
            "wss://manor.example:8001/ws/ann"
        );
        assert_eq!(
            ws_url("wss://manor.example", "ann", None),
            "wss://manor.example:8001/ws/ann"
        );
    }

    #[test]
    fn bare_hosts_default_to_plain_ws() {
        assert_eq!(ws_url("192.168.1.20", "bob", None), "ws://192.168.1.20:8001/ws/bob");
    }

    #[test]
    fn appends_the_room_code_query() {
        assert_eq!(
            ws_url("http://localhost", "ann", Some("QK4N7P")),
            "ws://localhost:8001/ws/ann?room_code=QK4N7P"
        );
    }

    #[test]
    fn strips_paths_and_queries_from_the_origin() {
        assert_eq!(
            ws_url("http://localhost:3000/play?tab=1", "ann", None),
            "ws://localhost:8001/ws/ann"
        );
    }

    #[test]
    fn preserves_ipv6_brackets() {
        assert_eq!(
            ws_url("http://[::1]:3000", "ann", None),
            "ws://[::1]:8001/ws/ann"
        );
    }

    #[test]
    fn api_base_follows_the_same_rules() {
        assert_eq!(api_base_url("http://localhost:3000"), "http://localhost:8001");
        assert_eq!(api_base_url("https://manor.example"), "https://manor.example:8001");
        assert_eq!(api_base_url("localhost"), "http://localhost:8001");
    }
}
