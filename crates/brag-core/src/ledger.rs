//! The accepted brag list: a Markdown document with one `## ` heading per
//! entry, safe to edit by hand.
//!
//! Each block ends with a hidden `<!-- brag-id: ... -->` marker so entries
//! can be addressed by identity. Blocks without a marker (hand-written, or
//! from older files) are still addressable by position.

use crate::entry::AchievementEntry;
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

pub const LEDGER_HEADER: &str = "# Brag List\n";
const HEADING: &str = "## ";

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"<!--\s*brag-id:\s*([A-Za-z0-9_-]+)\s*-->").unwrap())
}

/// Summary of one ledger block, for listing and addressing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerBlock {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn render_block(entry: &AchievementEntry, id: &str, accepted_on: NaiveDate) -> String {
    let mut out = String::new();
    out.push_str(&format!("{HEADING}{}\n\n", one_line(&entry.title)));
    out.push_str(&format!("**Tags:** {}\n", one_line(&entry.tags.join(", "))));
    out.push_str(&format!(
        "**Frequency:** {} | **Confidence:** {}\n\n",
        one_line(&entry.frequency),
        entry.confidence
    ));
    for line in entry.bullet.lines() {
        out.push_str(&format!("> {line}\n"));
    }
    out.push('\n');
    if let Some(impact) = entry.overall_impact.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!("**Overall Impact:** {}\n\n", one_line(impact)));
    }
    out.push_str(&format!("**Metrics:** {}\n\n", one_line(&entry.metrics)));
    out.push_str("---\n");
    out.push_str(&format!("*Accepted on {}*\n", accepted_on.format("%Y-%m-%d")));
    out.push_str(&format!("<!-- brag-id: {id} -->\n\n"));
    out
}

/// A ledger split into its preamble and entry blocks. Rejoining the parts
/// reproduces the original text exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerDocument {
    pub header: String,
    pub blocks: Vec<String>,
}

impl LedgerDocument {
    pub fn parse(text: &str) -> Self {
        let mut doc = LedgerDocument::default();
        let mut current: Option<String> = None;
        for line in text.split_inclusive('\n') {
            if line.starts_with(HEADING) {
                if let Some(block) = current.take() {
                    doc.blocks.push(block);
                }
                current = Some(line.to_string());
            } else if let Some(block) = current.as_mut() {
                block.push_str(line);
            } else {
                doc.header.push_str(line);
            }
        }
        if let Some(block) = current {
            doc.blocks.push(block);
        }
        doc
    }

    pub fn render(&self) -> String {
        let mut out = self.header.clone();
        for b in &self.blocks {
            out.push_str(b);
        }
        out
    }

    pub fn summaries(&self) -> Vec<LedgerBlock> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(index, b)| LedgerBlock {
                index,
                id: block_id(b),
                title: block_title(b),
            })
            .collect()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| block_id(b).as_deref() == Some(id))
    }
}

pub fn block_id(block: &str) -> Option<String> {
    id_re()
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn block_title(block: &str) -> String {
    block
        .lines()
        .next()
        .and_then(|l| l.strip_prefix(HEADING))
        .unwrap_or("")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confidence;

    fn entry() -> AchievementEntry {
        AchievementEntry {
            title: "Billing release".into(),
            bullet: "Delivered the billing service release.".into(),
            metrics: "1h 30m across 1 task(s)".into(),
            category: "Delivery".into(),
            tags: vec!["DELIVERY".into(), "OWNERSHIP".into()],
            overall_impact: Some("Kept the release on schedule.".into()),
            task_ids: vec![0],
            count: 1,
            frequency: "One-time".into(),
            confidence: Confidence::High,
            accepted: false,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    #[test]
    fn render_has_every_field_line() {
        let block = render_block(&entry(), "abc-123", date());
        assert!(block.starts_with("## Billing release\n"));
        assert!(block.contains("**Tags:** DELIVERY, OWNERSHIP\n"));
        assert!(block.contains("**Frequency:** One-time | **Confidence:** high\n"));
        assert!(block.contains("\n> Delivered the billing service release.\n"));
        assert!(block.contains("**Overall Impact:** Kept the release on schedule.\n"));
        assert!(block.contains("**Metrics:** 1h 30m across 1 task(s)\n"));
        assert!(block.contains("\n---\n*Accepted on 2025-03-04*\n"));
        assert_eq!(block_id(&block).as_deref(), Some("abc-123"));
    }

    #[test]
    fn render_skips_missing_overall_impact() {
        let mut e = entry();
        e.overall_impact = None;
        assert!(!render_block(&e, "x", date()).contains("Overall Impact"));
    }

    #[test]
    fn parse_then_render_is_lossless() {
        let text = format!(
            "{LEDGER_HEADER}\nSome notes I wrote.\n\n{}{}",
            render_block(&entry(), "a", date()),
            "## Hand written\n\n> Did a thing.\n"
        );
        let doc = LedgerDocument::parse(&text);
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.render(), text);
        let s = doc.summaries();
        assert_eq!(s[0].id.as_deref(), Some("a"));
        assert_eq!(s[0].title, "Billing release");
        assert_eq!(s[1].id, None);
        assert_eq!(s[1].title, "Hand written");
        assert_eq!(doc.position_of("a"), Some(0));
        assert_eq!(doc.position_of("zzz"), None);
    }

    #[test]
    fn title_newlines_cannot_forge_headings() {
        let mut e = entry();
        e.title = "One\n## Two".into();
        let doc = LedgerDocument::parse(&render_block(&e, "x", date()));
        assert_eq!(doc.blocks.len(), 1);
    }
}
