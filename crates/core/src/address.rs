/// Prefix of a literal contract address.
pub const ADDRESS_PREFIX: &str = "0x";

/// Number of hex digits following [`ADDRESS_PREFIX`].
pub const ADDRESS_HEX_LEN: usize = 40;

/// Whether `value` is a literal address: `0x` followed by exactly 40 hex
/// digits (either case).
///
/// ```
/// use callbook_core::is_address_literal;
/// assert!(is_address_literal(&format!("0x{}", "aB".repeat(20))));
/// assert!(!is_address_literal("0xabc"));
/// ```
pub fn is_address_literal(value: &str) -> bool {
    value.strip_prefix(ADDRESS_PREFIX).is_some_and(|hex| {
        hex.len() == ADDRESS_HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit())
    })
}

/// Resolves a symbolic-or-literal contract reference to a literal address.
///
/// Implementations return the input unchanged when they cannot resolve it;
/// callers decide whether an unresolved value is an error.
pub trait AddressResolver {
    /// Resolve `token` to a literal address, or return it unchanged.
    fn resolve(&self, token: &str) -> String;
}

impl<F> AddressResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve(&self, token: &str) -> String {
        self(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_forty_hex_digits() {
        assert!(is_address_literal(&format!("0x{}", "a".repeat(40))));
        let mixed = "0123456789abcDEF".repeat(3);
        assert!(is_address_literal(&format!("0x{}", &mixed[..40])));
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(!is_address_literal(""));
        assert!(!is_address_literal(&"a".repeat(42)));
        assert!(!is_address_literal(&format!("0X{}", "a".repeat(40))));
        assert!(!is_address_literal(&format!("0x{}", "a".repeat(39))));
        assert!(!is_address_literal(&format!("0x{}", "a".repeat(41))));
        assert!(!is_address_literal(&format!("0x{}g", "a".repeat(39))));
    }

    #[test]
    fn closures_are_resolvers() {
        let upper = |t: &str| t.to_uppercase();
        assert_eq!(upper.resolve("abc"), "ABC");
    }
}
