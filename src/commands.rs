/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "blogs",
    aliases: &["b", "blog", "home"],
    description: "Browse the blog list",
  },
  Command {
    name: "write",
    aliases: &["w", "new", "create"],
    description: "Write a new blog post",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit weblog",
  },
];

impl Command {
  /// Rank how well this command matches the input. Lower is better, `None`
  /// means no match at all.
  fn match_rank(&self, input: &str) -> Option<u32> {
    if self.name == input {
      return Some(0);
    }
    if self.aliases.contains(&input) {
      return Some(1);
    }
    if self.name.starts_with(input) {
      return Some(2);
    }
    if self.aliases.iter().any(|a| a.starts_with(input)) {
      return Some(3);
    }
    if self.name.contains(input) {
      return Some(4);
    }
    if self.aliases.iter().any(|a| a.contains(input)) {
      return Some(5);
    }
    None
  }
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| cmd.match_rank(&input).map(|rank| (cmd, rank)))
    .collect();

  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("write");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "write");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("w");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "write");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("bl");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "blogs");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("rit");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "write");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
