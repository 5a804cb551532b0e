use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

use crate::error::DecodeError;

const LENIENT_DECODE: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_DECODE);
const STANDARD_RAW: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    LENIENT_DECODE.with_encode_padding(false),
);
const URL_SAFE_RAW: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    LENIENT_DECODE.with_encode_padding(false),
);

/// The base64 flavours found in subscription payloads.
///
/// Decoding never assumes padding is present: every variant accepts input
/// with or without trailing `=`. The variants differ in alphabet and in
/// whether [`encode`] emits padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base64Variant {
    /// `A-Z a-z 0-9 + /`, padded on encode
    Standard,
    /// `A-Z a-z 0-9 + /`, unpadded
    StandardRaw,
    /// `A-Z a-z 0-9 - _`, unpadded
    UrlSafeRaw,
}

impl Base64Variant {
    fn engine(self) -> &'static GeneralPurpose {
        match self {
            Base64Variant::Standard => &STANDARD_LENIENT,
            Base64Variant::StandardRaw => &STANDARD_RAW,
            Base64Variant::UrlSafeRaw => &URL_SAFE_RAW,
        }
    }
}

impl fmt::Display for Base64Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Base64Variant::Standard => "standard",
            Base64Variant::StandardRaw => "standard-raw",
            Base64Variant::UrlSafeRaw => "url-safe-raw",
        })
    }
}

/// Decodes one base64 layer.
///
/// ASCII whitespace (line wrapping in large subscription bodies) is removed
/// first. Fails when the remaining input has a character outside the
/// variant's alphabet or an impossible length.
pub fn decode(input: &[u8], variant: Base64Variant) -> Result<Vec<u8>, DecodeError> {
    let compact: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    variant
        .engine()
        .decode(&compact)
        .map_err(|e| DecodeError::Base64 {
            variant,
            reason: e.to_string(),
        })
}

/// Decodes one base64 layer into a string, replacing invalid UTF-8.
pub fn decode_to_string(input: &str, variant: Base64Variant) -> Result<String, DecodeError> {
    decode(input.as_bytes(), variant).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Decodes a url-safe field, accepting the standard alphabet as well since
/// some producers emit `+` and `/` where `-` and `_` belong.
pub fn decode_url_safe_lenient(input: &str) -> Result<String, DecodeError> {
    decode_to_string(input, Base64Variant::UrlSafeRaw)
        .or_else(|e| decode_to_string(input, Base64Variant::Standard).map_err(|_| e))
}

/// Encodes bytes with the given variant.
pub fn encode(input: impl AsRef<[u8]>, variant: Base64Variant) -> String {
    variant.engine().encode(input)
}
