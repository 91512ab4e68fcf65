//! Macro for implementing string conversions on wire-level enums
//!
//! Priorities, HTTP methods and error kinds are all persisted or logged as
//! short strings. This macro generates `as_str`, `Display` and `FromStr` from
//! a single variant-to-string table so the three never drift apart.
//!
//! # Example
//!
//! ```rust
//! use signage_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Tier {
//!     Gold,
//!     Silver,
//! }
//!
//! impl_domain_status_conversions!(Tier {
//!     Gold => "gold",
//!     Silver => "silver",
//! });
//!
//! assert_eq!(Tier::Gold.as_str(), "gold");
//! assert_eq!("SILVER".parse::<Tier>().unwrap(), Tier::Silver);
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum
///
/// Parsing is ASCII case-insensitive, so a table entry of `"GET"` accepts
/// `"get"` and a table entry of `"high"` accepts `"HIGH"`. Unknown input
/// yields an error message naming the enum.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form of this variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Verb {
        Get,
        Post,
    }

    impl_domain_status_conversions!(Verb {
        Get => "GET",
        Post => "POST",
    });

    #[test]
    fn display_uses_table_string() {
        assert_eq!(Verb::Get.to_string(), "GET");
        assert_eq!(Verb::Post.as_str(), "POST");
    }

    #[test]
    fn parsing_ignores_ascii_case() {
        assert_eq!(Verb::from_str("get").unwrap(), Verb::Get);
        assert_eq!(Verb::from_str("PoSt").unwrap(), Verb::Post);
    }

    #[test]
    fn unknown_values_name_the_enum() {
        let result = Verb::from_str("OPTIONS");
        assert!(result.unwrap_err().contains("Invalid Verb: OPTIONS"));
        assert!(Verb::from_str("").is_err());
    }
}
