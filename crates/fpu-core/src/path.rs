//! Downstream tag path templating.
//!
//! Tag paths in the configuration are templates such as
//! `ns=2;s=FPU.{side}.Heading` where a configured placeholder token is
//! replaced by a device's side token, or by an instance index when
//! expanding subscription tags.

/// Replace every occurrence of `keyword` in `template` with `value`.
///
/// An empty keyword leaves the template untouched.
pub fn substitute(template: &str, keyword: &str, value: &str) -> String {
    if keyword.is_empty() {
        return template.to_string();
    }
    template.replace(keyword, value)
}

/// Expand a template into `quantity` paths, numbered from 1.
pub fn expand_indexed(template: &str, keyword: &str, quantity: u32) -> Vec<String> {
    (1..=quantity)
        .map(|i| substitute(template, keyword, &i.to_string()))
        .collect()
}

/// Index encoded in an expanded path, if `path` was produced from `template`.
///
/// This is the inverse of [`expand_indexed`] for one path, used to route
/// feedback values to the device they belong to.
pub fn index_of(template: &str, keyword: &str, path: &str) -> Option<u32> {
    if keyword.is_empty() {
        return None;
    }
    let (prefix, suffix) = template.split_once(keyword)?;
    let middle = path.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if middle.is_empty() || !middle.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    middle.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute() {
        assert_eq!(
            substitute("ns=2;s=FPU.{side}.Heading", "{side}", "SB"),
            "ns=2;s=FPU.SB.Heading"
        );
        assert_eq!(substitute("App.Heartbeat{side}", "{side}", ""), "App.Heartbeat");
    }

    #[test]
    fn test_empty_keyword_is_noop() {
        assert_eq!(substitute("FPU.Heading", "", "SB"), "FPU.Heading");
    }

    #[test]
    fn test_expand_indexed() {
        assert_eq!(
            expand_indexed("FPU#.Active", "#", 3),
            vec!["FPU1.Active", "FPU2.Active", "FPU3.Active"]
        );
        assert!(expand_indexed("FPU#.Active", "#", 0).is_empty());
    }

    #[test]
    fn test_index_of() {
        assert_eq!(index_of("FPU#.Active", "#", "FPU2.Active"), Some(2));
        assert_eq!(index_of("FPU#.Active", "#", "FPU12.Active"), Some(12));
        assert_eq!(index_of("FPU#.Active", "#", "FPUx.Active"), None);
        assert_eq!(index_of("FPU#.Active", "#", "Other.Active"), None);
        assert_eq!(index_of("FPU#.Active", "", "FPU2.Active"), None);
    }
}
