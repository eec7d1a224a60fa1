//! Ant-style path matching shared by every filter stage.
//!
//! Supported pattern syntax: `*` (any chars within a segment), `?` (one
//! char), `**` (zero or more whole segments), `{name}` (one segment,
//! captured), `{name:regex}` (one segment constrained by the regex).

use regex::Regex;

use crate::models::permission::PermissionRule;

pub fn matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = split(pattern);
    let path_segments: Vec<&str> = split(path);
    match_segments(&pattern_segments, &path_segments)
}

/// The per-request authorization check: group the classification's rules by
/// pattern, probe each pattern against the path, then require a rule in the
/// matching group whose method is unset or equal to the request method.
pub fn rules_allow(rules: &[PermissionRule], path: &str, method: &str) -> bool {
    if rules.is_empty() {
        return false;
    }

    let mut patterns: Vec<&str> = rules.iter().map(|rule| rule.url.as_str()).collect();
    patterns.sort_unstable();
    patterns.dedup();

    for pattern in patterns {
        if !matches(pattern, path) {
            continue;
        }
        for rule in rules.iter().filter(|rule| rule.url == pattern) {
            match &rule.method {
                None => return true,
                Some(rule_method) if rule_method.eq_ignore_ascii_case(method) => return true,
                Some(_) => {}
            }
        }
    }
    false
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty();
    };

    if *head == "**" {
        // Zero segments, or consume one and retry.
        if match_segments(rest, path) {
            return true;
        }
        return match path.split_first() {
            Some((_, path_rest)) => match_segments(pattern, path_rest),
            None => false,
        };
    }

    match path.split_first() {
        Some((segment, path_rest)) => {
            segment_matches(head, segment) && match_segments(rest, path_rest)
        }
        None => false,
    }
}

fn segment_matches(pattern: &str, segment: &str) -> bool {
    if !pattern.contains(['*', '?', '{']) {
        return pattern == segment;
    }
    match segment_regex(pattern) {
        Some(re) => re.is_match(segment),
        None => false,
    }
}

fn segment_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::from("^");
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '*' => source.push_str("[^/]*"),
            '?' => source.push_str("[^/]"),
            '{' => {
                let mut depth = 1usize;
                let mut content = String::new();
                for inner in chars.by_ref() {
                    match inner {
                        '{' => {
                            depth += 1;
                            content.push(inner);
                        }
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            content.push(inner);
                        }
                        _ => content.push(inner),
                    }
                }
                if depth != 0 {
                    return None;
                }
                match content.split_once(':') {
                    Some((_, constraint)) => {
                        source.push_str("(?:");
                        source.push_str(constraint);
                        source.push(')');
                    }
                    None => source.push_str("[^/]+"),
                }
            }
            _ => source.push_str(&regex::escape(&c.to_string())),
        }
    }

    source.push('$');
    Regex::new(&source).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::permission::Classification;

    #[test]
    fn literal_and_single_star() {
        assert!(matches("/auth/login", "/auth/login"));
        assert!(!matches("/auth/login", "/auth/logout"));
        assert!(matches("/auth/*", "/auth/login"));
        assert!(!matches("/auth/*", "/auth/login/extra"));
        assert!(matches("/static/*.css", "/static/site.css"));
        assert!(!matches("/static/*.css", "/static/site.js"));
    }

    #[test]
    fn double_star_spans_segments() {
        assert!(matches("/upms/**", "/upms"));
        assert!(matches("/upms/**", "/upms/a/b/c"));
        assert!(matches("/**/download/**", "/files/download/report.pdf"));
        assert!(matches("/**/images/**", "/a/b/images/c/d.png"));
        assert!(!matches("/upms/**", "/sso/a"));
    }

    #[test]
    fn brace_variables() {
        assert!(matches("/user/{id}", "/user/42"));
        assert!(matches("/user/{id:[0-9]+}", "/user/42"));
        assert!(!matches("/user/{id:[0-9]+}", "/user/a"));
        assert!(matches(
            "/upms/department/{id:[0-9]+}/positions/{name}",
            "/upms/department/1/positions/b"
        ));
        assert!(!matches(
            "/upms/department/{id:[0-9]+}/positions/{name}",
            "/upms/department/x/positions/b"
        ));
    }

    #[test]
    fn unbalanced_brace_never_matches() {
        assert!(!matches("/user/{id", "/user/42"));
    }

    #[test]
    fn rules_require_pattern_and_method() {
        let rules = vec![
            PermissionRule::new("/upms/user/**", Some("GET"), Classification::Role),
            PermissionRule::new("/upms/user/**", Some("POST"), Classification::Role),
            PermissionRule::new("/sso/info", None, Classification::Role),
        ];

        assert!(rules_allow(&rules, "/upms/user/1", "GET"));
        assert!(rules_allow(&rules, "/upms/user/1", "POST"));
        assert!(!rules_allow(&rules, "/upms/user/1", "DELETE"));
        // Null method matches any method.
        assert!(rules_allow(&rules, "/sso/info", "PATCH"));
        assert!(!rules_allow(&rules, "/other", "GET"));
        assert!(!rules_allow(&[], "/upms/user/1", "GET"));
    }
}
