//! Prompt construction and response parsing for link proposals.
//!
//! The generation backend is asked for strict JSON, but anything can come
//! back. Parsing here is defensive: malformed entries are dropped with a
//! warning, never surfaced as errors.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use trellis_core::{defaults, Concept, LinkProposal};

/// System prompt framing the model as a knowledge-graph curator.
pub const LINK_PROPOSAL_SYSTEM_PROMPT: &str = "You are a knowledge graph curator. \
You analyze a source concept and a list of candidate concepts, and propose which \
candidates are genuinely related to the source. Respond with a JSON array only, \
no prose, no markdown fences. Each element must be an object with the fields \
\"target_concept_id\" (string, copied exactly from a candidate), \"name\" (a short \
lowercase relationship phrase such as \"related to\" or \"depends on\", readable as \
'source <name> target'), \"confidence\" (number between 0.0 and 1.0), and \
\"reasoning\" (one sentence). Propose only links you are confident in; an empty \
array is a valid answer.";

// ============================================================================
// Prompt Construction
// ============================================================================

/// Build the user prompt for proposing links from `source` to `candidates`.
pub fn build_link_prompt(source: &Concept, candidates: &[Concept]) -> String {
    let mut prompt = String::new();

    prompt.push_str("Source concept:\n");
    prompt.push_str(&format!("Title: {}\n", source.title));
    prompt.push_str(&format!("Content: {}\n\n", snippet(&source.content)));

    prompt.push_str("Candidate concepts:\n");
    for candidate in candidates {
        prompt.push_str(&format!(
            "- id: {}\n  title: {}\n  content: {}\n",
            candidate.id,
            candidate.title,
            snippet(&candidate.content)
        ));
    }

    prompt.push_str(
        "\nPropose links from the source to candidates that are genuinely related. \
         Use only candidate ids listed above. Respond with the JSON array now.",
    );

    prompt
}

/// First `defaults::SNIPPET_LENGTH` characters of `text`, marked when cut.
///
/// Counts characters, not bytes, so multibyte content never splits.
fn snippet(text: &str) -> String {
    let mut out: String = text.chars().take(defaults::SNIPPET_LENGTH).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Parse the model's JSON into proposals, dropping anything malformed.
///
/// Accepts either a bare array or an object wrapping one under "proposals".
/// An entry survives only if it is an object, its `target_concept_id` parses
/// as a UUID, that id is a listed candidate other than the source, and its
/// `confidence` is numeric. Confidence is clamped to [0, 1], a missing or
/// empty `name` falls back to `default_name`, and on duplicate targets the
/// first entry wins.
pub fn parse_proposals(
    value: &Value,
    source_id: Uuid,
    candidate_titles: &HashMap<Uuid, String>,
    default_name: &str,
) -> Vec<LinkProposal> {
    let entries = match value {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(map) => match map.get("proposals").and_then(Value::as_array) {
            Some(entries) => entries.as_slice(),
            None => {
                warn!(
                    subsystem = "engine",
                    component = "proposer",
                    "Proposal response is an object without a proposals array"
                );
                return Vec::new();
            }
        },
        other => {
            warn!(
                subsystem = "engine",
                component = "proposer",
                kind = kind_of(other),
                "Proposal response is not a JSON array"
            );
            return Vec::new();
        }
    };

    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut proposals = Vec::new();

    for entry in entries {
        let Some(obj) = entry.as_object() else {
            warn!(
                subsystem = "engine",
                component = "proposer",
                kind = kind_of(entry),
                "Dropping non-object proposal entry"
            );
            continue;
        };

        let target_concept_id = match obj
            .get("target_concept_id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
        {
            Some(id) => id,
            None => {
                warn!(
                    subsystem = "engine",
                    component = "proposer",
                    "Dropping proposal without a parseable target_concept_id"
                );
                continue;
            }
        };

        if target_concept_id == source_id {
            warn!(
                subsystem = "engine",
                component = "proposer",
                target_id = %target_concept_id,
                "Dropping self-referential proposal"
            );
            continue;
        }

        let Some(target_title) = candidate_titles.get(&target_concept_id) else {
            warn!(
                subsystem = "engine",
                component = "proposer",
                target_id = %target_concept_id,
                "Dropping proposal for an id that was not a candidate"
            );
            continue;
        };

        let confidence = match obj.get("confidence").and_then(Value::as_f64) {
            Some(c) => (c as f32).clamp(0.0, 1.0),
            None => {
                warn!(
                    subsystem = "engine",
                    component = "proposer",
                    target_id = %target_concept_id,
                    "Dropping proposal with non-numeric confidence"
                );
                continue;
            }
        };

        if !seen.insert(target_concept_id) {
            warn!(
                subsystem = "engine",
                component = "proposer",
                target_id = %target_concept_id,
                "Dropping duplicate proposal for the same target"
            );
            continue;
        }

        let forward_name = match obj.get("name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => default_name.to_string(),
        };

        let reasoning = obj
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        proposals.push(LinkProposal {
            target_concept_id,
            target_title: target_title.clone(),
            forward_name,
            confidence,
            reasoning,
        });
    }

    proposals
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
