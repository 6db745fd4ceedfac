//! Utilities for sanitizing error messages.
//!
//! Failure strings leave the helper inside measurement results, so raw error
//! text must never carry IP addresses. Messages are also stripped of control
//! characters before they are embedded in JSON or logs.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::LazyLock;

use regex::{Captures, Regex};

// Shortest literal worth redacting; a bare "::" is left alone.
const MIN_LITERAL_LEN: usize = 3;

/// Replacement text for a redacted address.
pub const SCRUBBED: &str = "[scrubbed]";

// Runs of characters that may form an IPv4/IPv6 literal, optionally bracketed
// and followed by a port. Each run is confirmed by parsing before redaction.
static ADDRESS_CANDIDATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\[\]0-9A-Fa-f:.]{3,}").ok());

/// Sanitizes an error message by removing control characters.
///
/// Control characters (0x00-0x1F, except newline/tab/carriage return) are
/// removed while preserving readability.
///
/// # Arguments
///
/// * `message` - The error message to sanitize
///
/// # Returns
///
/// A sanitized version of the message with control characters removed.
pub fn sanitize_error_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| {
            let code = *c as u32;
            code >= 0x20 // Printable ASCII starts at 0x20 (space)
                || code == 0x09 // Tab
                || code == 0x0A // Newline
                || code == 0x0D // Carriage return
        })
        .filter(|c| *c != '\u{7F}')
        .collect()
}

/// Redacts every IPv4 and IPv6 literal (with or without a port) in `message`.
///
/// `93.184.216.34:443`, `[2001:db8::1]:443` and bare `2001:db8::1` all become
/// [`SCRUBBED`]. If the address matcher is unavailable the whole message is
/// replaced, so an address can never leak.
pub fn scrub_ip_addresses(message: &str) -> String {
    let Some(re) = ADDRESS_CANDIDATE.as_ref() else {
        return SCRUBBED.to_string();
    };
    re.replace_all(message, |caps: &Captures| scrub_candidate(&caps[0]))
        .into_owned()
}

/// Sanitizes a message and redacts IP addresses from it.
pub fn scrub_error_message(message: &str) -> String {
    scrub_ip_addresses(&sanitize_error_message(message))
}

fn scrub_candidate(candidate: &str) -> String {
    // The run may begin with leftover text ("addr:93.184.216.34"), so every
    // start offset is tried, taking the longest literal found there.
    let mut out = String::with_capacity(candidate.len());
    let mut start = 0;
    while start < candidate.len() {
        let longest = (start + MIN_LITERAL_LEN..=candidate.len())
            .rev()
            .find(|&end| is_ip_literal(&candidate[start..end]));
        match longest {
            Some(end) => {
                out.push_str(SCRUBBED);
                start = end;
            }
            None => {
                out.push_str(&candidate[start..start + 1]);
                start += 1;
            }
        }
    }
    out
}

fn is_ip_literal(s: &str) -> bool {
    if s.parse::<IpAddr>().is_ok() || s.parse::<SocketAddr>().is_ok() {
        return true;
    }
    s.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|inner| inner.parse::<Ipv6Addr>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_error_message_removes_control_chars() {
        let input = "Error\x00message\x01with\x02control\x03chars";
        let output = sanitize_error_message(input);
        assert_eq!(output, "Errormessagewithcontrolchars");
    }

    #[test]
    fn test_sanitize_error_message_preserves_newlines_and_unicode() {
        let input = "Error\nmessage\twith unicode: 测试";
        assert_eq!(sanitize_error_message(input), input);
    }

    #[test]
    fn test_scrub_ipv4_with_port() {
        let out = scrub_ip_addresses("dial tcp 93.184.216.34:443: connect: no route");
        assert_eq!(out, "dial tcp [scrubbed]: connect: no route");
    }

    #[test]
    fn test_scrub_bare_ipv4() {
        let out = scrub_ip_addresses("read udp 10.0.0.1 failed");
        assert_eq!(out, "read udp [scrubbed] failed");
    }

    #[test]
    fn test_scrub_bracketed_ipv6_with_port() {
        let out = scrub_ip_addresses("dial tcp [2001:db8::1]:443: i/o error");
        assert_eq!(out, "dial tcp [scrubbed]: i/o error");
    }

    #[test]
    fn test_scrub_bare_ipv6() {
        let out = scrub_ip_addresses("no route to 2001:db8:85a3::8a2e:370:7334 today");
        assert_eq!(out, "no route to [scrubbed] today");
    }

    #[test]
    fn test_scrub_address_after_hex_prefix() {
        let out = scrub_ip_addresses("connect to addr:93.184.216.34 failed");
        assert_eq!(out, "connect to addr:[scrubbed] failed");
        let out = scrub_ip_addresses("refused:93.184.216.34:443");
        assert_eq!(out, "refused:[scrubbed]");
    }

    #[test]
    fn test_scrub_leaves_plain_text_alone() {
        let input = "certificate is not valid for example.com: deadbeef";
        assert_eq!(scrub_ip_addresses(input), input);
    }

    proptest! {
        #[test]
        fn prop_scrubbed_ipv4_never_leaks(a in 1u8..=254, b: u8, c: u8, d in 1u8..=254, port in 1u16..) {
            let addr = format!("{}.{}.{}.{}", a, b, c, d);
            let message = format!("connect {}:{}: connection refused", addr, port);
            let out = scrub_ip_addresses(&message);
            prop_assert!(!out.contains(&addr));
            prop_assert!(out.contains(SCRUBBED));
        }

        #[test]
        fn prop_scrubbed_ipv4_after_hex_prefix_never_leaks(
            prefix in "[0-9A-Fa-f:.]{1,6}",
            a in 1u8..=254, b: u8, c: u8, d in 1u8..=254, port in 1u16..,
        ) {
            let addr = format!("{}.{}.{}.{}", a, b, c, d);
            let message = format!("dial {}{}:{}: refused", prefix, addr, port);
            let out = scrub_ip_addresses(&message);
            prop_assert!(!out.contains(&addr), "leaked: {}", out);
        }

        #[test]
        fn prop_scrubbed_ipv6_never_leaks(segments in proptest::array::uniform8(any::<u16>()), port in 1u16..) {
            let ip = std::net::Ipv6Addr::from(segments);
            let message = format!("dial udp [{}]:{}: timeout", ip, port);
            let out = scrub_ip_addresses(&message);
            prop_assert!(!out.contains(&ip.to_string()));
        }
    }
}
