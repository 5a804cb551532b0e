//! URL encoding/decoding utilities

/// Encodes a string using URL encoding
///
/// # Examples
/// ```
/// use subrewrite::utils::url::url_encode;
///
/// let encoded = url_encode("HK 01");
/// assert_eq!(encoded, "HK%2001");
/// ```
pub fn url_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Decodes a URL-encoded string
///
/// Returns the original string if decoding fails.
///
/// # Examples
/// ```
/// use subrewrite::utils::url::url_decode;
///
/// let decoded = url_decode("%F0%9F%87%AD%F0%9F%87%B0%20HK%2001");
/// assert_eq!(decoded, "🇭🇰 HK 01");
/// ```
pub fn url_decode(input: &str) -> String {
    urlencoding::decode(input)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

/// Extracts the host part of a link, used for the download file name.
pub fn link_host(link: &str) -> Option<String> {
    url::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_decode_invalid_keeps_input() {
        assert_eq!(url_decode("%E4%ZZ"), "%E4%ZZ");
    }

    #[test]
    fn test_link_host() {
        assert_eq!(
            link_host("https://sub.example.com/link/abc?clash=2").as_deref(),
            Some("sub.example.com")
        );
        assert_eq!(link_host("not a link"), None);
    }
}
