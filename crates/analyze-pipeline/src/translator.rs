//! Prompt translation
//!
//! Turns a free-text prompt into `QueryParams` with one text-completion call.

use finder_core::{Engagement, FinderError, FinderResult, QueryParams, TextCompletion};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, LazyLock};

pub const TRANSLATOR_SYSTEM_PROMPT: &str = "You are an assistant that translates natural language prompts into API query parameters. \
Parse the input prompt and return a JSON object with keys: text, engagement, count, username, and age_limit_days. \
The engagement key must be one of: reactions, recasts, replies, watches. Pick the one that best fits the prompt. \
The count key must be a number. Only set count if the user mentions it. \
The text key should name the coin type (e.g. memecoin, social coin, ai coin). \
Include age_limit_days only if the prompt specifies a time frame (e.g. less than 10 days old). \
After the JSON object, add a line starting with 'Suggestion:' if the query could be improved.";

static SUGGESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)suggestion:\s*(.*)").expect("valid suggestion regex"));

/// Parsed prompt: search parameters plus an optional advisory suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub params: QueryParams,
    pub suggestion: Option<String>,
}

#[derive(Clone)]
pub struct PromptTranslator {
    completion: Arc<dyn TextCompletion>,
}

impl PromptTranslator {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }

    /// One completion call, no retry at this level.
    pub async fn translate(&self, prompt: &str) -> FinderResult<Translation> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(FinderError::BadRequest("prompt must not be empty".to_string()));
        }

        let reply = self
            .completion
            .complete(TRANSLATOR_SYSTEM_PROMPT, prompt)
            .await
            .map_err(|e| match e {
                FinderError::ExternalService { message, .. } => {
                    FinderError::Translation(format!("text completion failed: {}", message))
                }
                other => other,
            })?;

        let translation = parse_reply(&reply)?;
        tracing::info!(
            backend = self.completion.backend_name(),
            "Parsed query parameters: {:?}",
            translation.params
        );
        if let Some(suggestion) = &translation.suggestion {
            tracing::info!("Suggestion from model: {}", suggestion);
        }
        Ok(translation)
    }
}

/// Parse a model reply into a `Translation`.
pub fn parse_reply(reply: &str) -> FinderResult<Translation> {
    let (start, end) = find_json_object(reply)
        .ok_or_else(|| FinderError::Translation("no JSON object found in model reply".to_string()))?;

    let value: Value = serde_json::from_str(&reply[start..end])
        .map_err(|e| FinderError::Translation(format!("model returned invalid JSON: {}", e)))?;
    let Value::Object(object) = value else {
        return Err(FinderError::Translation("model reply is not a JSON object".to_string()));
    };

    let outside = format!("{}\n{}", &reply[..start], &reply[end..]);
    let suggestion = SUGGESTION_RE
        .captures(&outside)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            object
                .get("suggestion")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        });

    Ok(Translation {
        params: params_from_object(&object)?,
        suggestion,
    })
}

/// Byte range of the first balanced `{...}` in `text`. String literals are
/// skipped so braces inside them do not count.
pub fn find_json_object(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn params_from_object(object: &Map<String, Value>) -> FinderResult<QueryParams> {
    let text = object
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| FinderError::Translation("model reply is missing 'text'".to_string()))?
        .to_string();

    let engagement: Engagement = object
        .get("engagement")
        .and_then(Value::as_str)
        .ok_or_else(|| FinderError::Translation("model reply is missing 'engagement'".to_string()))?
        .parse()?;

    let count = match object.get("count") {
        None | Some(Value::Null) => None,
        Some(value) => Some(positive_integer(value).ok_or_else(|| {
            FinderError::Translation(format!("'count' must be a positive integer, got {}", value))
        })?),
    };

    let username = match object.get("username") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().trim_start_matches('@').to_string()),
        Some(other) => {
            tracing::warn!("Ignoring non-string 'username': {}", other);
            None
        }
    };

    let age_limit_days = match object.get("age_limit_days") {
        None | Some(Value::Null) => {
            tracing::info!("No 'age_limit_days' specified. Results will include all dates.");
            None
        }
        Some(value) => {
            let coerced = non_negative_integer(value);
            if coerced.is_none() {
                tracing::warn!(
                    "The 'age_limit_days' parameter is not an integer ({}); ignoring it",
                    value
                );
            }
            coerced
        }
    };

    Ok(QueryParams {
        text,
        engagement,
        count,
        username,
        age_limit_days,
    })
}

/// Integers, integral floats and numeric strings.
fn non_negative_integer(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn positive_integer(value: &Value) -> Option<u32> {
    non_negative_integer(value).filter(|n| *n > 0)
}
