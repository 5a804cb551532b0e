//! Enums read from and written as a single YAML string token.
//!
//! Upstream documents carry tokens this crate does not model (new proxy
//! types, client-specific log levels). Those land in an `Other` variant
//! holding the raw token and are written back unchanged.

/// Declares a token enum with `as_str`, a case-insensitive `parse`,
/// `Display` and serde support. Unknown tokens become `Other(String)`.
macro_rules! wire_token_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $token:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A token not modelled here, kept verbatim
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $( $name::$variant => $token, )+
                    $name::Other(token) => token,
                }
            }

            /// Parses a wire token, ignoring ASCII case.
            pub fn parse(token: &str) -> Self {
                let token = token.trim();
                $(
                    if token.eq_ignore_ascii_case($token) {
                        return $name::$variant;
                    }
                )+
                $name::Other(token.to_string())
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Other(_))
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let token = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                Ok($name::parse(&token))
            }
        }
    };
}

pub(crate) use wire_token_enum;
