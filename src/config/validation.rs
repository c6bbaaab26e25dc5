//! Unknown-key detection with Levenshtein suggestions.
//!
//! The raw TOML is walked as a `toml::Value` tree before serde sees it, and
//! every key not in [`known_config_keys`] yields a warning with the closest
//! known key as a "did you mean" hint. Warnings never fail a load.

use std::collections::HashSet;

/// A non-fatal config warning.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `PipelineConfig`.
///
/// Must be kept in step with the structs in `pipeline_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [filter]
        "filter",
        "filter.max_distance_km",
        "filter.max_speed_kmh",
        // [interpolation]
        "interpolation",
        "interpolation.max_gap_secs",
        "interpolation.max_gap_meters",
        // [matcher]
        "matcher",
        "matcher.endpoint",
        "matcher.vehicle",
        "matcher.timeout_secs",
        "matcher.max_attempts",
        "matcher.initial_backoff_ms",
        "matcher.max_backoff_ms",
        "matcher.backoff_jitter_ms",
        // [pipeline]
        "pipeline",
        "pipeline.concurrency",
        "pipeline.extension",
        "pipeline.recursive",
        "pipeline.output_dir",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Collect the dotted paths of all keys in a TOML tree.
///
/// `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Closest known key within edit distance 3. Ties go to the
/// lexicographically smaller key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

/// Warnings for every unknown key in `raw_toml`.
///
/// Unparseable input yields no warnings; the serde pass reports it.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("vehicle", "vehicle"), 0);
        assert_eq!(levenshtein("vehical", "vehicle"), 2);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn walks_nested_keys() {
        let value: toml::Value = "[matcher]\nvehicle = \"bike\"\n"
            .parse()
            .expect("valid toml");
        let keys = walk_toml_keys(&value, "");
        assert_eq!(keys, vec!["matcher".to_string(), "matcher.vehicle".to_string()]);
    }

    #[test]
    fn typo_gets_suggestion() {
        let warnings = validate_unknown_keys("[matcher]\nmax_attemps = 5\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "matcher.max_attemps");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("matcher.max_attempts")
        );
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn known_keys_are_silent() {
        let toml_str = r#"
[filter]
max_distance_km = 0.2

[pipeline]
concurrency = 8
output_dir = "out"
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn unrelated_key_has_no_suggestion() {
        let warnings = validate_unknown_keys("[telemetry]\nsink = \"x\"\n");
        assert!(!warnings.is_empty());
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
    }
}
