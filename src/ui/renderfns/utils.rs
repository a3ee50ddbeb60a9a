use chrono::DateTime;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
  }
}

/// Format an ISO-8601 timestamp as e.g. "January 5, 2024". The raw string is
/// shown as-is when it does not parse.
pub fn format_date(date: &str) -> String {
  match DateTime::parse_from_rfc3339(date) {
    Ok(parsed) => parsed.format("%B %-d, %Y").to_string(),
    Err(_) => date.to_string(),
  }
}

/// Estimated reading time in minutes at 200 words per minute, with a floor
/// of one minute.
pub fn reading_time(content: &str) -> u64 {
  let words = content.split_whitespace().count() as u64;
  words.div_ceil(200).max(1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("héllo wörld", 8), "héllo...");
  }

  #[test]
  fn test_format_date() {
    assert_eq!(format_date("2024-01-05T10:30:00.000Z"), "January 5, 2024");
  }

  #[test]
  fn test_format_date_passes_through_garbage() {
    assert_eq!(format_date("yesterday"), "yesterday");
  }

  #[test]
  fn test_reading_time_has_a_floor() {
    assert_eq!(reading_time("just a few words"), 1);
  }

  #[test]
  fn test_reading_time_rounds_up() {
    let content = "word ".repeat(201);
    assert_eq!(reading_time(&content), 2);
  }
}
