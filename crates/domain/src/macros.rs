//! Macro for implementing Display and FromStr for wire-named enums
//!
//! Phases and bucket names travel as plain lowercase strings (store keys,
//! remote document fields, log fields). This macro keeps the string form in
//! one place for both directions.
//!
//! # Example
//!
//! ```rust
//! use studysync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum LinkState {
//!     Online,
//!     Offline,
//! }
//!
//! impl_domain_status_conversions!(LinkState {
//!     Online => "online",
//!     Offline => "offline",
//! });
//!
//! assert_eq!(LinkState::Online.to_string(), "online");
//! assert_eq!("OFFLINE".parse::<LinkState>().unwrap(), LinkState::Offline);
//! ```

/// Implements Display and FromStr traits for wire-named enums
///
/// This macro generates:
/// - Display trait: converts enum variants to their wire strings
/// - FromStr trait: parses case-insensitive strings to enum variants
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
