/// Clean user supplied HTML using the ammonia whitelist.
///
/// Safe formatting tags (<b>, <p>, ...) survive; <script>, <iframe> and event
/// handler attributes are stripped together with their content. Applied to
/// comments and quiz set descriptions before they are stored.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitises and trims, returning `None` when nothing printable is left.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(|s| clean_html(s).trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        assert_eq!(clean_html("<b>hi</b><script>alert(1)</script>"), "<b>hi</b>");
    }

    #[test]
    fn empty_after_cleaning_is_none() {
        assert_eq!(clean_optional(Some("<script>x</script>  ")), None);
        assert_eq!(clean_optional(Some(" ok ")), Some("ok".to_string()));
        assert_eq!(clean_optional(None), None);
    }
}
