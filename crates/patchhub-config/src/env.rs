//! Environment variable fallbacks.
//!
//! Env vars only fill fields that no config file set; embedded defaults
//! do not count. When several vars map
//! to one field, the first listed wins.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

struct EnvMapping {
    var_name: &'static str,
    field: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PATCHHUB_PUBLISHER_ORG",
        field: "registry.publisher_org",
    },
    EnvMapping {
        var_name: "PATCHHUB_GITHUB_TOKEN",
        field: "registry.token",
    },
    EnvMapping {
        var_name: "GITHUB_TOKEN",
        field: "registry.token",
    },
    EnvMapping {
        var_name: "PATCHHUB_LOG_LEVEL",
        field: "logging.level",
    },
    EnvMapping {
        var_name: "PATCHHUB_INSTALL_ROOT",
        field: "install.root",
    },
];

/// Names of every variable consulted.
#[must_use]
pub fn known_env_vars() -> Vec<&'static str> {
    ENV_MAPPINGS.iter().map(|m| m.var_name).collect()
}

/// Snapshot the variables [`apply_env_fallbacks`] reads.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    ENV_MAPPINGS
        .iter()
        .filter_map(|m| {
            std::env::var(m.var_name)
                .ok()
                .map(|v| (m.var_name.to_owned(), v))
        })
        .collect()
}

/// Apply env fallbacks to fields absent from every file layer. Blank values
/// are ignored. Returns how many were applied.
pub fn apply_env_fallbacks<S: std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;
    for mapping in ENV_MAPPINGS {
        if sources
            .get(mapping.field)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults)
        {
            continue;
        }
        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let val = val.trim();
        if val.is_empty() {
            continue;
        }
        debug!(
            var = mapping.var_name,
            field = mapping.field,
            "applying env var fallback"
        );
        if set_string_field(merged, mapping.field, val) {
            sources.insert(mapping.field.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }
    count
}

fn set_string_field(root: &mut toml::Value, path: &str, val: &str) -> bool {
    let Some((section, leaf)) = path.split_once('.') else {
        return false;
    };
    let Some(table) = root.as_table_mut() else {
        return false;
    };
    let section = table
        .entry(section.to_owned())
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    match section.as_table_mut() {
        Some(section) => {
            section.insert(leaf.to_owned(), toml::Value::String(val.to_owned()));
            true
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn empty_tree() -> toml::Value {
        toml::Value::Table(toml::map::Map::new())
    }

    #[test]
    fn fills_unset_fields() {
        let mut tree = empty_tree();
        let mut sources = FieldSources::new();
        let env = make_env(&[
            ("PATCHHUB_PUBLISHER_ORG", "Acme"),
            ("PATCHHUB_INSTALL_ROOT", "/srv/patchhub"),
        ]);
        assert_eq!(apply_env_fallbacks(&mut tree, &mut sources, &env), 2);
        assert_eq!(tree["registry"]["publisher_org"].as_str(), Some("Acme"));
        assert_eq!(tree["install"]["root"].as_str(), Some("/srv/patchhub"));
        assert_eq!(
            sources.get("registry.publisher_org"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn file_values_win_over_env() {
        let mut tree: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::User);
        let env = make_env(&[("PATCHHUB_LOG_LEVEL", "trace")]);
        assert_eq!(apply_env_fallbacks(&mut tree, &mut sources, &env), 0);
        assert_eq!(tree["logging"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn dedicated_token_var_beats_generic() {
        let mut tree = empty_tree();
        let mut sources = FieldSources::new();
        let env = make_env(&[
            ("GITHUB_TOKEN", "ghp_generic"),
            ("PATCHHUB_GITHUB_TOKEN", "ghp_dedicated"),
        ]);
        apply_env_fallbacks(&mut tree, &mut sources, &env);
        assert_eq!(tree["registry"]["token"].as_str(), Some("ghp_dedicated"));
    }

    #[test]
    fn env_overrides_embedded_defaults() {
        let mut tree: toml::Value = toml::from_str("[logging]\nlevel = \"info\"\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);
        let env = make_env(&[("PATCHHUB_LOG_LEVEL", "debug")]);
        assert_eq!(apply_env_fallbacks(&mut tree, &mut sources, &env), 1);
        assert_eq!(tree["logging"]["level"].as_str(), Some("debug"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut tree = empty_tree();
        let mut sources = FieldSources::new();
        let env = make_env(&[("PATCHHUB_GITHUB_TOKEN", "  "), ("GITHUB_TOKEN", "ghp_x")]);
        apply_env_fallbacks(&mut tree, &mut sources, &env);
        assert_eq!(tree["registry"]["token"].as_str(), Some("ghp_x"));
    }
}
