//! Splits a free-form campaign description into rules and payrate sections.
//!
//! The walk is keyword driven: a line mentioning `rules:`/`requirements:` or
//! `payrate:`/`payment:`/`pay:` switches the active section, and every later
//! line is bulleted into that section. Text after the keyword on the header
//! line itself counts as the first entry. When the walk finds nothing a looser
//! regex pass runs over the whole description.

use std::sync::OnceLock;

use regex::Regex;

pub const BULLET: &str = "• ";
pub const PAYRATE_PLACEHOLDER: &str = "• Contact admin for details";
pub const RULES_PLACEHOLDER: &str = "• See campaign details";

const RULES_KEYWORDS: [&str; 2] = ["rules:", "requirements:"];
const PAYRATE_KEYWORDS: [&str; 3] = ["payrate:", "payment:", "pay:"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedDescription {
    pub rules_section: String,
    pub payrate_section: String,
}

impl ParsedDescription {
    pub fn rules_or_placeholder(&self) -> &str {
        if self.rules_section.is_empty() {
            RULES_PLACEHOLDER
        } else {
            &self.rules_section
        }
    }

    pub fn payrate_or_placeholder(&self) -> &str {
        if self.payrate_section.is_empty() {
            PAYRATE_PLACEHOLDER
        } else {
            &self.payrate_section
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    None,
    Rules,
    Payrate,
}

pub fn parse_description(description: &str) -> ParsedDescription {
    let mut rules = Vec::new();
    let mut payrate = Vec::new();
    let mut section = Section::None;

    for line in description.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(rest) = after_keyword(line, &RULES_KEYWORDS) {
            section = Section::Rules;
            match split_on_keyword(rest, &PAYRATE_KEYWORDS) {
                Some((before, after)) => {
                    push_entry(&mut rules, before);
                    push_entry(&mut payrate, after);
                    section = Section::Payrate;
                }
                None => push_entry(&mut rules, rest),
            }
            continue;
        }
        if let Some(rest) = after_keyword(line, &PAYRATE_KEYWORDS) {
            section = Section::Payrate;
            push_entry(&mut payrate, rest);
            continue;
        }

        match section {
            Section::Rules => push_entry(&mut rules, line),
            Section::Payrate => push_entry(&mut payrate, line),
            Section::None => {}
        }
    }

    if rules.is_empty() && payrate.is_empty() {
        return fallback_parse(description);
    }

    ParsedDescription { rules_section: rules.join("\n"), payrate_section: payrate.join("\n") }
}

fn fallback_parse(description: &str) -> ParsedDescription {
    let rules_capture = rules_pattern()
        .and_then(|pattern| pattern.captures(description))
        .and_then(|caps| caps.get(1));
    let rules_section = match rules_capture {
        Some(captured) => {
            let text = captured.as_str();
            let end = payrate_keyword_pattern()
                .and_then(|pattern| pattern.find(text))
                .map_or(text.len(), |hit| hit.start());
            bullet_lines(text.get(..end).unwrap_or(text))
        }
        None => description.to_owned(),
    };

    let payrate_section = payrate_pattern()
        .and_then(|pattern| pattern.captures(description))
        .and_then(|caps| caps.get(1))
        .map(|captured| bullet_lines(captured.as_str()))
        .filter(|section| !section.is_empty())
        .unwrap_or_else(|| PAYRATE_PLACEHOLDER.to_owned());

    ParsedDescription { rules_section, payrate_section }
}

/// Prefixes a bullet unless the line already starts with one.
pub fn bulletize(line: &str) -> String {
    bulletize_with(line, &['•', '-', '*'])
}

fn bulletize_with(line: &str, markers: &[char]) -> String {
    let trimmed = line.trim();
    if trimmed.starts_with(markers) {
        trimmed.to_owned()
    } else {
        format!("{BULLET}{trimmed}")
    }
}

/// The regex pass only trusts `•` and `-` as existing bullets.
fn bullet_lines(text: &str) -> String {
    text.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| bulletize_with(line, &['•', '-']))
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_entry(section: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        section.push(bulletize(trimmed));
    }
}

/// Returns the text following the earliest keyword match, if any keyword occurs.
fn after_keyword<'a>(line: &'a str, keywords: &[&str]) -> Option<&'a str> {
    split_on_keyword(line, keywords).map(|(_, after)| after)
}

fn split_on_keyword<'a>(line: &'a str, keywords: &[&str]) -> Option<(&'a str, &'a str)> {
    // ASCII lowercasing keeps byte offsets aligned with the original line.
    let lowered = line.to_ascii_lowercase();
    let (start, keyword) = keywords
        .iter()
        .filter_map(|keyword| lowered.find(keyword).map(|index| (index, *keyword)))
        .min_by_key(|(index, _)| *index)?;
    let before = line.get(..start)?;
    let after = line.get(start + keyword.len()..)?;
    Some((before, after))
}

fn rules_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)(?:rules?|requirements?):?\s*(.*)").ok()).as_ref()
}

fn payrate_keyword_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(?:payrate?|payment?|pay):?").ok()).as_ref()
}

fn payrate_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)(?:payrate?|payment?|pay):?\s*(.*)$").ok()).as_ref()
}
