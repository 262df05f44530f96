//! Attribute lists of start markers: `name="value"` or `name='value'` pairs.

pub(crate) type Attributes = Vec<(String, String)>;

pub(crate) fn parse_attributes(source: &str) -> Result<Attributes, String> {
    let mut attributes = Attributes::new();
    let mut rest = source.trim_start();

    while !rest.is_empty() {
        let name_len = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        if name_len == 0 {
            return Err(format!("expected an attribute name before '{}'", preview(rest)));
        }
        let name = &rest[..name_len];
        if name.contains(['"', '\'']) {
            return Err(format!("stray quote in attribute name '{name}'"));
        }

        rest = rest[name_len..].trim_start();
        let Some(after_eq) = rest.strip_prefix('=') else {
            return Err(format!("attribute '{name}' has no value"));
        };
        rest = after_eq.trim_start();

        let Some(quote) = rest.chars().next().filter(|c| matches!(c, '"' | '\'')) else {
            return Err(format!("value of attribute '{name}' is not quoted"));
        };
        let body = &rest[1..];
        let Some(close) = body.find(quote) else {
            return Err(format!("value of attribute '{name}' is not terminated"));
        };

        if !attributes.iter().any(|(existing, _)| existing == name) {
            attributes.push((name.to_string(), body[..close].to_string()));
        }
        rest = body[close + 1..].trim_start();
    }

    Ok(attributes)
}

pub(crate) fn attribute<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn preview(rest: &str) -> String {
    rest.chars().take(12).collect()
}
