/// Clean HTML content using the ammonia library.
///
/// Whitelisted markup such as `<sup>` survives; scripts and event handlers do not.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes an optional field, keeping `None` as is.
pub fn clean_opt(input: Option<&str>) -> Option<String> {
    input.map(clean_html)
}
