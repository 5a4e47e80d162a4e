//! Post-processing repairs applied to LLM-synthesized query text. Every pass here is a pure `&str -> String` transform so the
//! pipeline in [`super::sparql`] can chain and unit-test them independently.

use regex::Regex;
use std::sync::OnceLock;

/// Strips a single leading/trailing markdown code fence (```` ``` ```` or
/// ```` ```sparql ````/```` ```json ````/etc.) and surrounding whitespace.
/// Used both by the query generator and by the extraction pipeline's raw
/// chat-response handling, since both deal in "LLM wrapped the payload in a
/// fence" noise.
pub fn strip_markdown_fences(text: &str) -> String {
    let trimmed = text.trim();
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\n?```\s*$").unwrap());
    if let Some(caps) = fence.captures(trimmed) {
        return caps[1].trim().to_string();
    }
    trimmed.to_string()
}

/// Strips any preamble before the first occurrence of a SPARQL query
/// keyword, dropping chatty LLM lead-in text such as "Here's the query:".
pub fn strip_preamble_sparql(text: &str) -> String {
    static KEYWORD: OnceLock<Regex> = OnceLock::new();
    let keyword = KEYWORD.get_or_init(|| Regex::new(r"(?i)\b(PREFIX|SELECT|ASK|CONSTRUCT|DESCRIBE)\b").unwrap());
    match keyword.find(text) {
        Some(m) => text[m.start()..].to_string(),
        None => text.to_string(),
    }
}

/// Removes `SERVICE { ... }` federated-query blocks, which the in-scope
/// triplestore adapters can't execute. Handles one level of brace nesting.
pub fn remove_service_clause(query: &str) -> String {
    static SERVICE: OnceLock<Regex> = OnceLock::new();
    let service = SERVICE.get_or_init(|| Regex::new(r"(?i)SERVICE\s+(SILENT\s+)?(<[^>]*>|\?\w+)\s*\{").unwrap());
    let mut out = String::new();
    let mut rest = query;
    while let Some(m) = service.find(rest) {
        out.push_str(&rest[..m.start()]);
        let after_brace = &rest[m.end()..];
        let mut depth = 1usize;
        let mut end = after_brace.len();
        for (i, ch) in after_brace.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        rest = &after_brace[end.min(after_brace.len())..];
    }
    out.push_str(rest);
    out
}

/// Rewrites dotted pseudo-prefixed names (`Party.Complaint`) into valid
/// SPARQL prefixed names (`Party:Complaint`). Restricted to PascalCase
/// identifiers on both sides so numeric literals (`3.14`) and property
/// paths aren't touched.
pub fn fix_dotted_prefixed_names(query: &str) -> String {
    static DOTTED: OnceLock<Regex> = OnceLock::new();
    let dotted = DOTTED.get_or_init(|| Regex::new(r"\b([A-Z][A-Za-z0-9_]*)\.([A-Z][A-Za-z0-9_]*)\b").unwrap());
    dotted.replace_all(query, "$1:$2").to_string()
}

/// Moves a `LIMIT`/`OFFSET` clause that the model placed inside the `WHERE`
/// block to its proper position after the block's closing brace.
pub fn move_limit_offset_outside_where(query: &str) -> String {
    static CLAUSE: OnceLock<Regex> = OnceLock::new();
    let clause = CLAUSE.get_or_init(|| Regex::new(r"(?i)\b(LIMIT\s+\d+|OFFSET\s+\d+)\b").unwrap());
    let Some(last_brace) = query.rfind('}') else {
        return query.to_string();
    };
    let (body, tail) = query.split_at(last_brace + 1);
    let mut extracted = Vec::new();
    let mut stripped_body = String::with_capacity(body.len());
    let mut cursor = 0;
    for m in clause.find_iter(body) {
        stripped_body.push_str(&body[cursor..m.start()]);
        extracted.push(m.as_str().to_string());
        cursor = m.end();
    }
    stripped_body.push_str(&body[cursor..]);
    if extracted.is_empty() {
        return query.to_string();
    }
    // LIMIT must precede OFFSET per SPARQL grammar, and both must trail any
    // ORDER BY/GROUP BY that was already outside the WHERE block.
    extracted.sort_by_key(|c| if c.to_ascii_uppercase().starts_with("LIMIT") { 0 } else { 1 });
    let mut out = stripped_body.trim_end().to_string();
    let tail = tail.trim();
    if !tail.is_empty() {
        out.push(' ');
        out.push_str(tail);
    }
    out.push(' ');
    out.push_str(&extracted.join(" "));
    static EXTRA_SPACE: OnceLock<Regex> = OnceLock::new();
    let extra_space = EXTRA_SPACE.get_or_init(|| Regex::new(r"[ \t]{2,}").unwrap());
    extra_space.replace_all(&out, " ").trim().to_string()
}

/// Deletes malformed two-variable-only triple patterns like `{ ?s ?o }`
/// that some models emit when they drop the predicate.
pub fn delete_malformed_two_var_triples(query: &str) -> String {
    static MALFORMED: OnceLock<Regex> = OnceLock::new();
    let malformed = MALFORMED.get_or_init(|| Regex::new(r"\{\s*\?\w+\s+\?\w+\s*\}").unwrap());
    malformed.replace_all(query, "").to_string()
}

/// Appends/strips trailing parentheses so open and close counts match. Any
/// imbalance from a truncated model response is assumed to be trailing,
/// since the query's head (`SELECT ... WHERE {`) is the part most reliably
/// well-formed.
pub fn balance_parentheses(query: &str) -> String {
    let opens = query.matches('(').count();
    let closes = query.matches(')').count();
    if opens > closes {
        format!("{query}{}", ")".repeat(opens - closes))
    } else if closes > opens {
        let mut excess = closes - opens;
        let mut out = String::with_capacity(query.len());
        for ch in query.chars().rev() {
            if excess > 0 && ch == ')' {
                excess -= 1;
                continue;
            }
            out.push(ch);
        }
        out.chars().rev().collect()
    } else {
        query.to_string()
    }
}

static DDL_DML: OnceLock<Regex> = OnceLock::new();
static ALLOWED_HEAD: OnceLock<Regex> = OnceLock::new();

/// Rejects query text that isn't a read-only SPARQL form, returning the
/// reason when it is.
pub fn reject_if_not_select(query: &str) -> Result<(), String> {
    let ddl_dml = DDL_DML.get_or_init(|| Regex::new(r"(?i)\b(INSERT|DELETE|DROP|CREATE|CLEAR|LOAD|COPY|MOVE|ADD)\b").unwrap());
    let allowed_head =
        ALLOWED_HEAD.get_or_init(|| Regex::new(r"(?i)^\s*(PREFIX\b.*?)*\s*(SELECT|ASK|CONSTRUCT|DESCRIBE|WITH)\b").unwrap());
    if ddl_dml.is_match(query) {
        return Err(format!("query contains a DDL/DML keyword: {query}"));
    }
    if !allowed_head.is_match(query) {
        return Err(format!("query does not start with SELECT/ASK/CONSTRUCT/DESCRIBE/WITH: {query}"));
    }
    Ok(())
}

/// Full SPARQL repair pipeline, run against one raw chat
/// response. Returns the cleaned query, or the rejection reason if the
/// result still isn't an executable read-only query.
pub fn repair_sparql(raw: &str) -> Result<String, String> {
    let text = strip_markdown_fences(raw);
    let text = strip_preamble_sparql(&text);
    let text = remove_service_clause(&text);
    let text = fix_dotted_prefixed_names(&text);
    let text = move_limit_offset_outside_where(&text);
    let text = delete_malformed_two_var_triples(&text);
    let text = balance_parentheses(&text);
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err("empty query after repair".to_string());
    }
    reject_if_not_select(&text)?;
    Ok(text)
}
