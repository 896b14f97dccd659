/// Parse a comma-separated list into trimmed, non-empty entries.
///
/// Used for environment variables carrying speaker id sets.
pub fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_basic() {
        assert_eq!(
            parse_list("agent,recorder-bot"),
            vec!["agent".to_string(), "recorder-bot".to_string()]
        );
    }

    #[test]
    fn test_parse_list_trims_and_skips_empty() {
        assert_eq!(
            parse_list(" agent , , recorder-bot ,"),
            vec!["agent".to_string(), "recorder-bot".to_string()]
        );
    }

    #[test]
    fn test_parse_list_empty_input() {
        assert!(parse_list("").is_empty());
        assert!(parse_list(" , ,").is_empty());
    }
}
