use anyhow::{Context, Result};
use rule_config::rules::unreadable_colors;
use rule_config::{RuleSet, SchemeDocument};
use std::fs;
use std::path::PathBuf;

pub struct CheckArgs {
    pub file: PathBuf,
}

/// Prints one line per scheme or problem. Returns the number of malformed
/// patterns; unreadable colors are only warnings.
pub fn run(args: CheckArgs) -> Result<usize> {
    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read rule file {}", args.file.display()))?;
    let document: SchemeDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse rule file {}", args.file.display()))?;

    let mut problems = 0;
    for scheme in &document.schemes {
        match RuleSet::validate(&scheme.rules.types, scheme.rules.flags) {
            Ok(rule_set) => println!("{}: {} rule(s) ok", scheme.name, rule_set.len()),
            Err(err) => {
                let patterns = err.invalid_patterns().unwrap_or_default();
                problems += patterns.len();
                for pattern in patterns {
                    println!("{}: invalid type pattern '{}'", scheme.name, pattern);
                }
            }
        }

        for warning in unreadable_colors(&scheme.rules.types) {
            println!("{}: warning: {}", scheme.name, warning);
        }
    }

    Ok(problems)
}
