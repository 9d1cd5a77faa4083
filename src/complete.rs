// Small helpers shared by the option suggesters.

pub fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// Continue an integer being typed. An unparsable partial yields nothing.
pub fn complete_integer(partial: &str) -> Vec<String> {
    if partial.is_empty() || partial == "-" {
        return (0..10).map(|digit| format!("{partial}{digit}")).collect();
    }
    if partial.parse::<i64>().is_err() {
        return Vec::new();
    }
    std::iter::once(partial.to_string())
        .chain((0..10).map(|digit| format!("{partial}{digit}")))
        .collect()
}

/// Keys starting with the partial, case-insensitively. A `minecraft:` prefix is ignored.
pub fn complete_keyed<'a, I>(partial: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let partial = partial.strip_prefix("minecraft:").unwrap_or(partial);
    keys.into_iter()
        .filter(|key| starts_with_ignore_case(key, partial))
        .map(str::to_string)
        .collect()
}

pub fn complete_bool(partial: &str) -> Vec<String> {
    complete_keyed(partial, ["true", "false"])
}
