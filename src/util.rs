//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Comparison key for names and search text: trimmed, inner whitespace collapsed,
/// lowercased. Arabic has no case, so this only affects Latin names.
pub fn fold_key(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Log-safe truncation for large strings (counts chars, never splits one).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  let total = s.chars().count();
  if total <= max {
    s.to_string()
  } else {
    format!("{}… ({} chars total)", s.chars().take(max).collect::<String>(), total)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_all_placeholders() {
    let out = fill_template("Q: {question} / {question}", &[("question", "ما هو الفعل؟")]);
    assert_eq!(out, "Q: ما هو الفعل؟ / ما هو الفعل؟");
  }

  #[test]
  fn fold_key_normalizes_spacing_and_case() {
    assert_eq!(fold_key("  Linear   Algebra "), "linear algebra");
    assert_eq!(fold_key("النحو  العربي"), "النحو العربي");
  }

  #[test]
  fn truncation_is_char_safe() {
    let s = "مرحبا بالعالم";
    assert_eq!(trunc_for_log(s, 100), s);
    assert!(trunc_for_log(s, 3).starts_with("مرح…"));
  }
}
