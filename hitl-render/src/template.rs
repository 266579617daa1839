//! `{{variable}}` templates compiled once and rendered many times.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{RenderError, RenderResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Variable(String),
}

/// A text template with `{{variable}}` placeholders.
///
/// An opening `{{` without a matching `}}`, or an empty placeholder, is kept
/// as literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Compiles `source` into text and placeholder segments.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let segments = parse(&source);
        Self { source, segments }
    }

    /// Names of the referenced variables, in order of first appearance.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Variable(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Checks that every placeholder is one of `known`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownVariable`] for the first placeholder not
    /// in `known`.
    pub fn ensure_only(&self, known: &[&str]) -> RenderResult<()> {
        match self.variables().into_iter().find(|name| !known.contains(name)) {
            Some(name) => Err(RenderError::UnknownVariable { name: name.to_owned() }),
            None => Ok(()),
        }
    }

    /// Substitutes every placeholder with its value.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingVariable`] if a placeholder has no value.
    pub fn render(&self, values: &BTreeMap<&str, String>) -> RenderResult<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = values
                        .get(name.as_str())
                        .ok_or_else(|| RenderError::MissingVariable { name: name.clone() })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Raw template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        let name = after_open[..close].trim();
        text.push_str(&rest[..open]);
        if name.is_empty() || name.contains('{') {
            text.push_str(&rest[open..open + 2 + close + 2]);
        } else {
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Variable(name.to_owned()));
        }
        rest = &after_open[close + 2..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(entries: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        entries.iter().map(|(k, v)| (*k, (*v).to_owned())).collect()
    }

    #[test]
    fn substitutes_placeholders() {
        let template = Template::new("[{{ band }}] {{agent}}: {{band}}");
        assert_eq!(template.variables(), ["band", "agent"]);

        let rendered = template
            .render(&values(&[("band", "high"), ("agent", "retention")]))
            .unwrap();
        assert_eq!(rendered, "[high] retention: high");
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = Template::new("{{next_step}}").render(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, RenderError::MissingVariable { name } if name == "next_step"));
    }

    #[test]
    fn malformed_placeholders_stay_literal() {
        let template = Template::new("a {{}} b {{open");
        assert!(template.variables().is_empty());
        assert_eq!(template.render(&BTreeMap::new()).unwrap(), "a {{}} b {{open");
    }

    #[test]
    fn ensure_only_rejects_unknown_names() {
        let template = Template::new("{{agent}} {{mood}}");
        assert!(template.ensure_only(&["agent", "mood"]).is_ok());
        let err = template.ensure_only(&["agent"]).unwrap_err();
        assert!(matches!(err, RenderError::UnknownVariable { name } if name == "mood"));
    }
}
