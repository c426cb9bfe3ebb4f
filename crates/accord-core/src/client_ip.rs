//! Resolve the caller's address from reverse-proxy headers.

/// Recorded when neither proxy header carries a usable value.
pub const UNKNOWN: &str = "unknown";

/// Pick the client IP to store with an acceptance.
///
/// Precedence: the first entry of `X-Forwarded-For`, then `X-Real-IP`, then
/// the literal [`UNKNOWN`]. Blank values fall through to the next source.
pub fn resolve(forwarded_for: Option<&str>, real_ip: Option<&str>) -> String {
  forwarded_for
    .and_then(|v| v.split(',').next())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .or_else(|| real_ip.map(str::trim).filter(|v| !v.is_empty()))
    .unwrap_or(UNKNOWN)
    .to_owned()
}
