//! Builds Prometheus label-value tuples in the schema order that [`metrics::PerValidatorMetrics`]
//! registered its families with: the labels-file key schema (sorted), then `pubkey`.

use std::collections::HashMap;

use types::Pubkey;

pub fn base_values<'a>(
    schema: &[String],
    labels: &'a HashMap<String, String>,
    pubkey: &'a str,
) -> Vec<&'a str> {
    let mut values: Vec<&str> = schema
        .iter()
        .map(|key| labels.get(key).map(String::as_str).unwrap_or(""))
        .collect();
    values.push(pubkey);
    values
}

pub fn pubkey_string(pubkey: &Pubkey) -> String {
    pubkey.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_missing_label_with_empty_string() {
        let schema = vec!["team".to_owned()];
        let labels = HashMap::new();
        let values = base_values(&schema, &labels, "0xabc");
        assert_eq!(values, vec!["", "0xabc"]);
    }

    #[test]
    fn orders_values_by_schema_then_pubkey() {
        let schema = vec!["region".to_owned(), "team".to_owned()];
        let labels = HashMap::from([
            ("team".to_owned(), "infra".to_owned()),
            ("region".to_owned(), "eu".to_owned()),
        ]);
        let values = base_values(&schema, &labels, "0xabc");
        assert_eq!(values, vec!["eu", "infra", "0xabc"]);
    }
}
