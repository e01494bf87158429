//! `mailto:` wrapping for spectrum URIs, per RFC 6068

/// Wrap one or more already-encoded `raddata://` bodies into a `mailto:`
/// link. `part_number`/`total_parts` are `1`-based and included in the
/// subject as `[%20K-N]` when `total_parts > 1`.
pub fn build_mailto_uri(to: &str, raddata_uris: &[String], part_number: usize, total_parts: usize) -> String {
    let subject_suffix = if total_parts > 1 {
        format!("%20{part_number}-{total_parts}")
    } else {
        String::new()
    };

    let body = raddata_uris.join("%0D%0A");

    format!("mailto:{to}?subject=spectrum{subject_suffix}&body=Spectrum%20URI%0D%0A{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_part_subject_has_no_range_suffix() {
        let uri = build_mailto_uri("user@example.com", &["RADDATA://G0/00/abc".into()], 1, 1);
        assert!(uri.starts_with("mailto:user@example.com?subject=spectrum&body="));
    }

    #[test]
    fn multi_part_subject_carries_k_of_n() {
        let uri = build_mailto_uri(
            "user@example.com",
            &["RADDATA://G0/02<0>/abc".into()],
            2,
            3,
        );
        assert!(uri.contains("subject=spectrum%202-3"));
    }

    #[test]
    fn body_joins_parts_with_crlf_escape() {
        let parts = vec!["A".to_string(), "B".to_string()];
        let uri = build_mailto_uri("user@example.com", &parts, 1, 1);
        assert!(uri.contains("A%0D%0AB"));
    }
}
