//! Key conversion between rule attribute names and host attribute names.
//!
//! Rule keys are style-qualified (`style$name`) and may use `.` to separate
//! nested groups. Host attribute names carry no style and use `__` in place
//! of `.`.

/// Separates the style from a rule name.
pub const STYLE_SEPARATOR: char = '$';
/// Nested group separator in rule keys.
pub const GROUP_SEPARATOR: char = '.';
/// Replacement for [`GROUP_SEPARATOR`] in host attribute names.
pub const HOST_GROUP_SEPARATOR: &str = "__";

/// Prefixes `name` with `style$`.
pub fn add_style(name: &str, style: &str) -> String {
    let mut out = String::with_capacity(style.len() + 1 + name.len());
    out.push_str(style);
    out.push(STYLE_SEPARATOR);
    out.push_str(name);
    out
}

/// Strips everything up to and including the first `$`.
pub fn remove_style(name: &str) -> &str {
    match name.find(STYLE_SEPARATOR) {
        Some(p) => &name[p + 1..],
        None => name,
    }
}

/// Splits a fully qualified name into `(style, name)`.
///
/// Names of length one or less yield two empty parts. Without a separator the
/// style is empty; a leading or trailing separator yields an empty part on
/// that side.
pub fn separate(fq_name: &str) -> (&str, &str) {
    if fq_name.chars().count() <= 1 {
        return ("", "");
    }
    match fq_name.find(STYLE_SEPARATOR) {
        Some(p) => (&fq_name[..p], &fq_name[p + 1..]),
        None => ("", fq_name),
    }
}

/// Rule key to host attribute name: drop the style, `.` becomes `__`.
pub fn to_host_name(rule_key: &str) -> String {
    remove_style(rule_key).replace(GROUP_SEPARATOR, HOST_GROUP_SEPARATOR)
}

/// Host attribute name to rule key: `__` becomes `.`, then `style$` is prepended.
pub fn to_rule_key(style: &str, host_name: &str) -> String {
    let dotted = host_name.replace(HOST_GROUP_SEPARATOR, ".");
    add_style(&dotted, style)
}

/// Start rules already carrying a style are kept, others are qualified with `style`.
pub fn fully_qualified_start_rule(style: &str, start_rule: &str) -> String {
    if start_rule.contains(STYLE_SEPARATOR) {
        start_rule.to_owned()
    } else {
        add_style(start_rule, style)
    }
}

/// Restricts `name` to `[A-Za-z0-9_]`, replacing every other character with `_`.
pub fn legalize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_and_rule_names_round_trip() {
        let host = to_host_name("Default$roof.color");
        assert_eq!(host, "roof__color");
        assert_eq!(to_rule_key("Default", &host), "Default$roof.color");
    }

    #[test]
    fn remove_style_without_separator_is_identity() {
        assert_eq!(remove_style("height"), "height");
        assert_eq!(remove_style("$height"), "height");
    }

    #[test]
    fn separate_edge_cases() {
        assert_eq!(separate(""), ("", ""));
        assert_eq!(separate("x"), ("", ""));
        assert_eq!(separate("$"), ("", ""));
        assert_eq!(separate("rule"), ("", "rule"));
        assert_eq!(separate("$rule"), ("", "rule"));
        assert_eq!(separate("style$"), ("style", ""));
        assert_eq!(separate("style$rule"), ("style", "rule"));
    }

    #[test]
    fn start_rule_qualification() {
        assert_eq!(fully_qualified_start_rule("Default", "Lot"), "Default$Lot");
        assert_eq!(fully_qualified_start_rule("Default", "Other$Lot"), "Other$Lot");
    }

    #[test]
    fn legalize_replaces_illegal_characters() {
        assert_eq!(legalize("lot 12/a"), "lot_12_a");
        assert_eq!(legalize("Ünïcode"), "_n_code");
        assert_eq!(legalize("ok_09"), "ok_09");
    }
}
