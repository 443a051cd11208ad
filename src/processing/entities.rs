//! Structured entity extraction from claim queries.
//!
//! Five independent pattern extractors run first; whatever they leave unset may be filled by
//! a single generative-model call requesting the same five keys as JSON. Pattern-derived
//! values always take precedence, and this extractor never fails: a field that nothing can
//! produce simply stays unset.

use crate::generative::{GenerativeClient, extract_json_object};
use crate::processing::types::{Gender, QueryEntities};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,3})(?:\s*-?\s*(?:years?|yrs?|y)\b)?").expect("age pattern"));

static GENDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(m|f|male|female|man|woman|hombre|mujer|homme|femme|mann|frau|uomo|donna|homem|mulher)\b",
    )
    .expect("gender pattern")
});

static PROCEDURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([a-zA-Z][a-zA-Z\s]*(?:surgery|procedure|care|treatment|operation))")
        .expect("procedure pattern")
});

static LOCATION_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bin\s+([A-Z][a-zA-Z]{2,}(?:\s+[A-Z][a-zA-Z]+)*)").expect("location pattern")
});

static LOCATION_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-zA-Z]{2,}(?:\s+[A-Z][a-zA-Z]+)*)\b").expect("location pattern")
});

static LOCATION_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+\s*-?\s*month|policy").expect("context pattern"));

static POLICY_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2})\s*-?\s*month").expect("duration pattern"));

/// Normalize a gender surface token to the closed enum.
fn normalize_gender(token: &str) -> Option<Gender> {
    match token.to_lowercase().as_str() {
        "m" | "male" | "man" | "hombre" | "homme" | "mann" | "uomo" | "homem" => {
            Some(Gender::Male)
        }
        "f" | "female" | "woman" | "mujer" | "femme" | "frau" | "donna" | "mulher" => {
            Some(Gender::Female)
        }
        _ => None,
    }
}

/// Entity extractor with an optional generative fallback.
pub struct QueryEntityExtractor {
    generative: Option<Box<dyn GenerativeClient + Send + Sync>>,
}

impl QueryEntityExtractor {
    /// Build an extractor; `generative` is consulted only for fields the patterns miss.
    pub fn new(generative: Option<Box<dyn GenerativeClient + Send + Sync>>) -> Self {
        Self { generative }
    }

    /// Extract entities from a query already translated into the processing language.
    ///
    /// Runs the pattern extractors, then at most one generative call for still-missing
    /// fields. Returns a possibly partially populated record; never errors.
    pub async fn extract(&self, query: &str) -> QueryEntities {
        let mut entities = extract_with_patterns(query);

        if !entities.is_complete() {
            if let Some(client) = &self.generative {
                match client.generate(build_extraction_prompt(query)).await {
                    Ok(completion) => merge_generative_fields(&mut entities, &completion),
                    Err(error) => {
                        tracing::warn!(error = %error, "Generative extraction failed; keeping pattern results");
                    }
                }
            }
        }

        tracing::debug!(?entities, "Extracted query entities");
        entities
    }
}

/// Run the five independent pattern extractors; each takes its first match or stays unset.
fn extract_with_patterns(query: &str) -> QueryEntities {
    let age = AGE
        .captures(query)
        .and_then(|c| c[1].parse::<u32>().ok());

    let gender = GENDER
        .captures(query)
        .and_then(|c| normalize_gender(&c[1]));

    let procedure = PROCEDURE
        .captures(query)
        .map(|c| c[1].trim().to_string())
        .filter(|p| !p.is_empty());

    // Location only makes sense in a policy context; prefer "in <Place>" over the first
    // bare capitalized token.
    let location = if LOCATION_CONTEXT.is_match(query) {
        LOCATION_IN
            .captures(query)
            .or_else(|| LOCATION_BARE.captures(query))
            .map(|c| c[1].trim().to_string())
    } else {
        None
    };

    let policy_duration_months = POLICY_DURATION
        .captures(query)
        .and_then(|c| c[1].parse::<u32>().ok());

    QueryEntities {
        age,
        gender,
        procedure,
        location,
        policy_duration_months,
    }
}

/// Structured-extraction prompt requesting the five entity keys as JSON.
fn build_extraction_prompt(query: &str) -> String {
    format!(
        "Extract information from: \"{query}\"\n\
         Return JSON with: age (number), gender (Male/Female), procedure (medical procedure), \
         location (city name), policy_duration (months as number).\n\
         Only extract if clearly stated. Return null for missing information.\n\n\
         Example: {{\"age\": 32, \"gender\": \"Female\", \"procedure\": \"maternity care\", \
         \"location\": \"Mumbai\", \"policy_duration\": 6}}\n\nJSON:"
    )
}

/// Merge generative output into `entities`, filling only fields still unset.
fn merge_generative_fields(entities: &mut QueryEntities, completion: &str) {
    let Some(map) = extract_json_object(completion) else {
        tracing::debug!("Generative completion carried no parseable JSON object");
        return;
    };

    if entities.age.is_none() {
        entities.age = number_field(map.get("age"));
    }
    if entities.gender.is_none() {
        entities.gender = map
            .get("gender")
            .and_then(Value::as_str)
            .and_then(normalize_gender);
    }
    if entities.procedure.is_none() {
        entities.procedure = string_field(map.get("procedure"));
    }
    if entities.location.is_none() {
        entities.location = string_field(map.get("location"));
    }
    if entities.policy_duration_months.is_none() {
        entities.policy_duration_months = number_field(map.get("policy_duration"));
    }
}

/// Read a numeric field that may arrive as a JSON number or a digit string.
fn number_field(value: Option<&Value>) -> Option<u32> {
    match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
