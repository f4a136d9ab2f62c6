//! Path normalization.
//!
//! Concrete parametric segments (a wallet address, say) are folded back into
//! their route template so the route table only holds one entry per shape.

use regex::Regex;
use std::collections::BTreeMap;

/// One substitution rule: a compiled matcher plus the template it collapses to.
#[derive(Debug, Clone)]
struct PathRule {
    template: &'static str,
    matcher: Regex,
}

#[derive(Debug, Clone)]
pub struct PathNormalizer {
    rules: Vec<PathRule>,
}

impl PathNormalizer {
    /// Rules are built from the parametric templates, in the given order.
    /// Templates without `{name}` segments are skipped.
    pub fn from_templates(templates: impl IntoIterator<Item = &'static str>) -> Result<Self, regex::Error> {
        let mut rules = Vec::new();
        for template in templates {
            if !template.contains('{') {
                continue;
            }
            rules.push(PathRule {
                template,
                matcher: Regex::new(&template_pattern(template))?,
            });
        }
        Ok(Self { rules })
    }

    /// Pure and total: any string is accepted.
    pub fn normalize(&self, path: &str) -> String {
        let trimmed = trim_trailing_slashes(path);
        self.rules
            .iter()
            .find(|rule| rule.matcher.is_match(trimmed))
            .map(|rule| rule.template.to_string())
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// Named segments of the first rule matching `path`.
    pub fn extract_params(&self, path: &str) -> BTreeMap<String, String> {
        let trimmed = trim_trailing_slashes(path);
        let Some((rule, captures)) = self
            .rules
            .iter()
            .find_map(|rule| rule.matcher.captures(trimmed).map(|c| (rule, c)))
        else {
            return BTreeMap::new();
        };

        rule.matcher
            .capture_names()
            .flatten()
            .filter_map(|name| captures.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect()
    }
}

/// Strip every trailing `/`; the empty path becomes `/`.
pub fn trim_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn template_pattern(template: &str) -> String {
    let segments: Vec<String> = template
        .split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => format!("(?P<{}>[^/]+)", name),
            None => regex::escape(segment),
        })
        .collect();
    format!("^{}$", segments.join("/"))
}
