//! Path template compilation and offset-anchored matching.

use regex::Regex;

use crate::error::ConfigError;
use crate::request::Params;

/// A piece of a parsed path template.
#[derive(Debug, Clone)]
enum TemplatePart {
    /// Literal text, matched byte for byte.
    Literal(String),
    /// A `:name` parameter capturing a run of non-slash characters.
    Param(String),
}

/// A compiled path template.
///
/// Templates mix literal text with `:name` parameters; a parameter
/// matches any run of characters up to the next `/`. Matching is anchored
/// at a caller-supplied offset rather than the start of the path, so
/// templates compose into nested route trees where each level resumes
/// where its parent stopped.
///
/// # Example
///
/// ```
/// use trellis_router::PathTemplate;
///
/// let template = PathTemplate::parse("/posts/:id").unwrap();
/// let (params, consumed) = template.match_at("/posts/123", 0).unwrap();
/// assert_eq!(params.get("id"), Some("123"));
/// assert_eq!(consumed, 10);
/// ```
#[derive(Debug, Clone)]
pub struct PathTemplate {
    template: String,
    parts: Vec<TemplatePart>,
    regex: Regex,
    param_names: Vec<String>,
}

impl PathTemplate {
    /// Parses and compiles a template string.
    ///
    /// Fails on an empty parameter name or a parameter name the regex
    /// engine rejects (duplicates included); both are configuration
    /// mistakes that must surface before any request is served.
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let mut parts = Vec::new();
        let mut param_names = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c == ':' {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(ConfigError::InvalidTemplate {
                        template: template.to_string(),
                        message: "empty parameter name after ':'".to_string(),
                    });
                }
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                param_names.push(name.clone());
                parts.push(TemplatePart::Param(name));
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        let mut pattern = String::from("^");
        for part in &parts {
            match part {
                TemplatePart::Literal(text) => pattern.push_str(&regex::escape(text)),
                TemplatePart::Param(name) => {
                    pattern.push_str("(?P<");
                    pattern.push_str(name);
                    pattern.push_str(">[^/]*)");
                }
            }
        }
        let regex = Regex::new(&pattern)?;

        Ok(Self {
            template: template.to_string(),
            parts,
            regex,
            param_names,
        })
    }

    /// Matches the template against `path` starting at `offset`.
    ///
    /// Returns the captured parameters and the number of bytes consumed.
    /// The byte following the consumed region must be a `/` or the end of
    /// the path: `/foo` is a valid prefix of `/foo/bar` but not of
    /// `/foobar`.
    pub fn match_at(&self, path: &str, offset: usize) -> Option<(Params, usize)> {
        let remainder = path.get(offset..)?;
        let caps = self.regex.captures(remainder)?;
        let end = caps.get(0)?.end();

        let rest = &remainder[end..];
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }

        let mut params = Params::new();
        for name in &self.param_names {
            if let Some(value) = caps.name(name) {
                params.insert(name.clone(), value.as_str().to_string());
            }
        }
        Some((params, end))
    }

    /// Returns the original template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the parameter names in template order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Builds a concrete path by substituting parameters into the
    /// template. Returns `None` if any parameter is missing.
    pub fn assemble(&self, params: &Params) -> Option<String> {
        let mut path = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => path.push_str(text),
                TemplatePart::Param(name) => path.push_str(params.get(name)?),
            }
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_template() {
        let template = PathTemplate::parse("/users").unwrap();
        let (params, consumed) = template.match_at("/users", 0).unwrap();
        assert!(params.is_empty());
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_param_capture() {
        let template = PathTemplate::parse("/posts/:post_id/comments/:comment_id").unwrap();
        let (params, _) = template.match_at("/posts/42/comments/7", 0).unwrap();
        assert_eq!(params.get("post_id"), Some("42"));
        assert_eq!(params.get("comment_id"), Some("7"));
    }

    #[test]
    fn test_consumed_region_ends_on_boundary() {
        let template = PathTemplate::parse("/foo/:id/bar").unwrap();
        let (params, consumed) = template.match_at("/foo/33/bar/baz", 0).unwrap();
        assert_eq!(params.get("id"), Some("33"));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_prefix_must_stop_at_slash() {
        let template = PathTemplate::parse("/foo").unwrap();
        assert!(template.match_at("/foo/bar", 0).is_some());
        assert!(template.match_at("/foobar", 0).is_none());
    }

    #[test]
    fn test_match_at_offset() {
        let template = PathTemplate::parse("/bar").unwrap();
        let (_, consumed) = template.match_at("/foo/bar", 4).unwrap();
        assert_eq!(consumed, 4);
        assert!(template.match_at("/foo/bar", 0).is_none());
    }

    #[test]
    fn test_offset_past_end() {
        let template = PathTemplate::parse("/foo").unwrap();
        assert!(template.match_at("/foo", 99).is_none());
    }

    #[test]
    fn test_mid_segment_param() {
        let template = PathTemplate::parse("/files/:name.:ext").unwrap();
        let (params, _) = template.match_at("/files/report.pdf", 0).unwrap();
        // `.` is not a name character, so it ends the first parameter
        assert_eq!(params.get("ext"), Some("pdf"));
    }

    #[test]
    fn test_empty_param_name_rejected() {
        assert!(matches!(
            PathTemplate::parse("/users/:"),
            Err(ConfigError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_duplicate_param_name_rejected() {
        assert!(PathTemplate::parse("/:id/:id").is_err());
    }

    #[test]
    fn test_assemble() {
        let template = PathTemplate::parse("/posts/:id").unwrap();
        let mut params = Params::new();
        params.insert("id", "123");
        assert_eq!(template.assemble(&params), Some("/posts/123".to_string()));
    }

    #[test]
    fn test_assemble_missing_param() {
        let template = PathTemplate::parse("/posts/:id").unwrap();
        assert_eq!(template.assemble(&Params::new()), None);
    }
}
