//! Public network interface classification.
//!
//! Only physical and wireless NICs with well-known kernel names are
//! eligible for management. Loopback, bridge, virtual and tunnel
//! interfaces never match, so the engine can never reconfigure or
//! restart an interface it does not understand. Mutating operations
//! fail closed through [`ensure_public`].

use crate::error::{Error, Result};

/// Check whether `name` denotes a public physical or wireless NIC.
///
/// Accepted naming grammars:
/// - `eth<N>`, `ens<N>`, `eno<N>`, `em<N>` (Ethernet)
/// - `enp<N>s<N>` (PCI Ethernet)
/// - `enx` + 12 hex digits (MAC-based)
/// - `p<N>p<N>` (physical port)
/// - `wlan<N>`, `wlo<N>` (wireless)
/// - `wlp<N>s<N>`, `wwp<N>s<N>` (wireless PCI / WWAN)
///
/// # Example
///
/// ```
/// use hostnet::util::ifname::is_public;
///
/// assert!(is_public("eth0"));
/// assert!(is_public("wlp2s0"));
/// assert!(!is_public("lo"));
/// assert!(!is_public("docker0"));
/// ```
pub fn is_public(name: &str) -> bool {
    prefix_digits(name, "eth")
        || prefix_digits(name, "ens")
        || prefix_digits(name, "eno")
        || prefix_digits(name, "em")
        || prefix_digits(name, "wlan")
        || prefix_digits(name, "wlo")
        || digits_sep_digits(name, "enp", 's')
        || digits_sep_digits(name, "wlp", 's')
        || digits_sep_digits(name, "wwp", 's')
        || digits_sep_digits(name, "p", 'p')
        || mac_based(name)
}

/// Fail-closed guard used by every mutating or single-interface path.
pub fn ensure_public(name: &str) -> Result<()> {
    if is_public(name) {
        Ok(())
    } else {
        Err(Error::NotPublicInterface {
            name: name.to_string(),
        })
    }
}

/// `<prefix><digits>` with at least one digit.
fn prefix_digits(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => all_digits(rest),
        None => false,
    }
}

/// `<prefix><digits><sep><digits>` with at least one digit on each side.
fn digits_sep_digits(name: &str, prefix: &str, sep: char) -> bool {
    let Some(rest) = name.strip_prefix(prefix) else {
        return false;
    };
    match rest.split_once(sep) {
        Some((left, right)) => all_digits(left) && all_digits(right),
        None => false,
    }
}

/// `enx` followed by exactly twelve lowercase hex digits.
fn mac_based(name: &str) -> bool {
    match name.strip_prefix("enx") {
        Some(rest) => {
            rest.len() == 12
                && rest
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        }
        None => false,
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
