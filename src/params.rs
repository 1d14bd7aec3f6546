//! Parameter namespace lookup.
//!
//! Targets live in a flat, `/`-separated parameter namespace
//! (`aruco_lookup_locations/target_1`, ...). In the TOML config that
//! namespace is the `[params]` table, with nested tables standing in for
//! path segments.

use std::collections::HashMap;

/// Read-only source of named parameters.
pub trait ParameterSource {
    /// Look up a parameter by its full name. A leading `/` is ignored.
    fn get(&self, name: &str) -> Option<&toml::Value>;
}

impl ParameterSource for toml::Table {
    fn get(&self, name: &str) -> Option<&toml::Value> {
        let mut segments = name.trim_start_matches('/').split('/');
        let first = segments.next()?;
        let mut value = toml::Table::get(self, first)?;
        for segment in segments {
            value = value.as_table()?.get(segment)?;
        }
        Some(value)
    }
}

impl ParameterSource for HashMap<String, toml::Value> {
    fn get(&self, name: &str) -> Option<&toml::Value> {
        HashMap::get(self, name.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_table_lookup() {
        let table: toml::Table = toml::from_str(
            r#"
            [aruco_lookup_locations]
            target_1 = [1.0, 2.0]
            "#,
        )
        .unwrap();

        let value = ParameterSource::get(&table, "/aruco_lookup_locations/target_1").unwrap();
        assert_eq!(value.as_array().map(|a| a.len()), Some(2));
        assert!(ParameterSource::get(&table, "aruco_lookup_locations/target_2").is_none());
        assert!(ParameterSource::get(&table, "aruco_lookup_locations/target_1/x").is_none());
    }

    #[test]
    fn test_flat_map_lookup() {
        let mut params = HashMap::new();
        params.insert(
            "ns/target_1".to_string(),
            toml::Value::Array(vec![toml::Value::Float(0.5), toml::Value::Integer(3)]),
        );
        assert!(ParameterSource::get(&params, "/ns/target_1").is_some());
        assert!(ParameterSource::get(&params, "ns/target_2").is_none());
    }
}
