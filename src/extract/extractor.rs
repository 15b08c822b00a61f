//! Heuristic extraction of token records from page snapshots.
//!
//! The tracked page is third-party and changes without notice, so nothing
//! here is a parser in the grammar sense. Each field is an ordered list of
//! patterns tried against a character window around the contract address;
//! the first hit wins and a miss is never an error. Only the contract itself
//! is mandatory.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::types::{placeholder_name, TokenRecord, ADDRESS_RE};
use crate::ingest::source::PageSnapshot;

/// Look-behind window: the page renders name/creator/socials above the
/// address, so almost everything we want sits shortly before it.
const WINDOW_BEFORE: usize = 400;
/// Look-ahead window for trailing fields (tax, liquidity, badges).
const WINDOW_AFTER: usize = 120;

static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([A-Z0-9]{1,10})").unwrap());
static CREATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(\w+)").unwrap());
static FOLLOWERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Followers?[:\s]*([\d,\.]+)").unwrap());
static TOKENS_CREATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Tokens created[:\s]*([\d,\.]+)").unwrap());
static TAX_LABELED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Tax[:\s]*(\d+\.?\d*)%").unwrap());
static TAX_BARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.?\d*)%").unwrap());
static LIQUIDITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[\d,\.]+[KMB]?").unwrap());
static TWEET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://(?:twitter\.com|x\.com)/\w+/status/\d+").unwrap());

// Name heuristics: a short run of text immediately before a known page
// marker is the freshest label on the card.
static NAME_BEFORE_GMGN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\n]{2,80})GMGN").unwrap());
static NAME_BEFORE_TAX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\n]{2,80})Tax:").unwrap());
static NAME_BEFORE_AT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^\n]{2,80})@").unwrap());
// UI chrome that bleeds into the captured run.
static NOISE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Filters?|Token feed|Connected|Add\?").unwrap());
static AAA_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"AAA\d").unwrap());
static LEADING_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").unwrap());

/// Scans a snapshot and yields one candidate per distinct contract address,
/// in first-seen order. Candidates without any recovered label are dropped.
/// Each call scans fresh; nothing is remembered between snapshots.
pub fn extract_tokens(snapshot: &PageSnapshot) -> impl Iterator<Item = TokenRecord> + '_ {
    let mut seen = HashSet::new();
    let mut addresses = Vec::new();
    for m in ADDRESS_RE.find_iter(&snapshot.text) {
        let canonical = m.as_str().to_lowercase();
        if seen.insert(canonical.clone()) {
            addresses.push((canonical, m.start(), m.end()));
        }
    }

    addresses
        .into_iter()
        .filter_map(move |(contract, start, end)| extract_record(snapshot, contract, start, end))
}

fn extract_record(
    snapshot: &PageSnapshot,
    contract: String,
    addr_start: usize,
    addr_end: usize,
) -> Option<TokenRecord> {
    let text = &snapshot.text;
    let start = floor_char_boundary(text, addr_start.saturating_sub(WINDOW_BEFORE));
    let end = ceil_char_boundary(text, (addr_end + WINDOW_AFTER).min(text.len()));
    let before = &text[start..addr_start];
    let after = &text[addr_start..end];
    let window = &text[start..end];

    // The ticker renders right after the address; only fall back to the
    // leading window when the card puts it first. Anything found purely in
    // the leading window may belong to the previous card.
    let symbol_text = SYMBOL_RE
        .captures(after)
        .or_else(|| SYMBOL_RE.captures(before))
        .map(|c| c[1].to_string());
    let name = extract_name(before, symbol_text.as_deref());

    // Pure noise: an address with no recoverable label at all.
    if name.is_none() && symbol_text.is_none() {
        return None;
    }

    let mut record = TokenRecord::new(contract, name.unwrap_or_else(placeholder_name));
    record.symbol = symbol_text.map(|s| format!("${s}"));
    record.creator = CREATOR_RE.captures(window).map(|c| format!("@{}", &c[1]));
    record.followers = FOLLOWERS_RE.captures(window).map(|c| c[1].to_string());
    record.tokens_created = TOKENS_CREATED_RE.captures(window).map(|c| c[1].to_string());
    record.tax = [&*TAX_LABELED_RE, &*TAX_BARE_RE]
        .into_iter()
        .find_map(|re| re.captures(window))
        .map(|c| format!("{}%", &c[1]));
    record.liquidity = LIQUIDITY_RE.find(window).map(|m| m.as_str().to_string());
    record.tags = extract_tags(window);
    record.tweet_url = extract_tweet_url(&snapshot.html, &record.contract);
    Some(record)
}

/// Ordered fallback: marker-anchored run first, last clean line second.
/// Within one marker kind the match nearest the address wins; earlier
/// matches sit in the previous card's territory.
fn extract_name(before: &str, symbol: Option<&str>) -> Option<String> {
    for re in [&*NAME_BEFORE_GMGN_RE, &*NAME_BEFORE_TAX_RE, &*NAME_BEFORE_AT_RE] {
        if let Some(caps) = re.captures_iter(before).last() {
            if let Some(name) = clean_name(&caps[1], symbol) {
                return Some(name);
            }
        }
    }
    last_clean_line(before)
}

fn clean_name(raw: &str, symbol: Option<&str>) -> Option<String> {
    let mut name = NOISE_RE.replace_all(raw, "").trim().to_string();

    // The page often renders the ticker right after the label; drop it so
    // name and symbol don't duplicate each other.
    if let Some(sym) = symbol {
        name = name.replace(&format!("${sym}"), "").trim().to_string();
        // Strip only when a proper name remains; a label that IS the ticker
        // (name "Dog", symbol "DOG") stays.
        let cut = name.len().wrapping_sub(sym.len());
        if name.len() > sym.len()
            && name.is_char_boundary(cut)
            && name[cut..].eq_ignore_ascii_case(sym)
        {
            name.truncate(cut);
            name = name.trim().to_string();
        }
    }

    // A multi-word remainder is mostly accumulated chrome; the newest label
    // is appended last.
    let words: Vec<&str> = name.split_whitespace().filter(|w| w.len() > 1).collect();
    let name = words.last()?.to_string();
    (name.len() >= 2 && name.len() <= 40).then_some(name)
}

fn last_clean_line(before: &str) -> Option<String> {
    before
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| {
            line.len() >= 3
                && line.len() <= 40
                && !ADDRESS_RE.is_match(line)
                && !line.starts_with('@')
                && !LEADING_DIGITS_RE.is_match(line)
                && !NOISE_RE.is_match(line)
        })
        .map(str::to_string)
}

fn extract_tags(window: &str) -> Option<String> {
    let mut tags = Vec::new();
    if window.contains("GMGN") {
        tags.push("GMGN".to_string());
    }
    if window.contains("Ban deployer") {
        tags.push("Ban deployer".to_string());
    }
    if let Some(m) = AAA_TAG_RE.find(window) {
        tags.push(m.as_str().to_string());
    }
    if window.contains("OP Followers") {
        tags.push("OP Followers".to_string());
    }
    (!tags.is_empty()).then(|| tags.join(", "))
}

/// The tweet link lives in an href, so it is only visible in the raw HTML.
/// Window the HTML around the address when it appears there; fall back to a
/// whole-document scan for text-only address occurrences.
fn extract_tweet_url(html: &str, contract: &str) -> Option<String> {
    let hay = match html.to_lowercase().find(contract) {
        Some(pos) => {
            let pos = pos.min(html.len());
            let start = floor_char_boundary(html, pos.saturating_sub(WINDOW_BEFORE * 4));
            let end = ceil_char_boundary(html, (pos + WINDOW_AFTER * 4).min(html.len()));
            &html[start..end]
        }
        None => html,
    };
    TWEET_RE.find(hay).map(|m| m.as_str().to_string())
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str) -> PageSnapshot {
        PageSnapshot {
            text: text.to_string(),
            html: text.to_string(),
        }
    }

    const ADDR_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ADDR_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn labeled_card_extracts_all_fields() {
        let snap = snapshot(&format!("PepeCoinGMGN {ADDR_A} $PEPE Tax: 5%"));
        let records: Vec<_> = extract_tokens(&snap).collect();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.contract, ADDR_A);
        assert_eq!(record.name, "PepeCoin");
        assert!(!record.name.contains("GMGN"));
        assert_eq!(record.symbol.as_deref(), Some("$PEPE"));
        assert_eq!(record.tax.as_deref(), Some("5%"));
    }

    #[test]
    fn contracts_are_distinct_and_case_normalized_within_one_snapshot() {
        let upper_a = ADDR_A.to_uppercase();
        let snap = snapshot(&format!(
            "FooGMGN {ADDR_A} $FOO\nFoo againGMGN 0x{} $FOO\nBarGMGN {ADDR_B} $BAR",
            &upper_a[2..]
        ));
        let records: Vec<_> = extract_tokens(&snap).collect();
        let contracts: Vec<_> = records.iter().map(|r| r.contract.as_str()).collect();
        assert_eq!(contracts, vec![ADDR_A, ADDR_B]);
    }

    #[test]
    fn every_emitted_contract_is_well_formed() {
        let snap = snapshot(&format!(
            "junkGMGN 0x1234 shortGMGN 0xZZZZ realGMGN {ADDR_A} $OK trailing 0x123456"
        ));
        let records: Vec<_> = extract_tokens(&snap).collect();
        assert!(!records.is_empty());
        for record in &records {
            assert!(crate::core::types::canonical_contract(&record.contract).is_some());
        }
    }

    #[test]
    fn address_without_any_label_is_dropped() {
        let snap = snapshot(&format!("\n\n{ADDR_A}\n\n"));
        assert_eq!(extract_tokens(&snap).count(), 0);
    }

    #[test]
    fn symbol_only_card_gets_placeholder_name() {
        let snap = snapshot(&format!("--\n{ADDR_A} $WAGMI"));
        let records: Vec<_> = extract_tokens(&snap).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Token");
        assert_eq!(records[0].symbol.as_deref(), Some("$WAGMI"));
    }

    #[test]
    fn noise_tokens_are_stripped_from_marker_names() {
        let snap = snapshot(&format!("Filters Token feed MoonDogGMGN {ADDR_A} $MOON"));
        let records: Vec<_> = extract_tokens(&snap).collect();
        assert_eq!(records[0].name, "MoonDog");
    }

    #[test]
    fn symbol_tail_is_stripped_from_name() {
        let snap = snapshot(&format!("Wojak WOJAKGMGN {ADDR_A} $WOJAK"));
        let records: Vec<_> = extract_tokens(&snap).collect();
        assert_eq!(records[0].name, "Wojak");
        assert_eq!(records[0].symbol.as_deref(), Some("$WOJAK"));
    }

    #[test]
    fn name_falls_back_to_last_clean_line() {
        let snap = snapshot(&format!("Token feed\nShadow Cat\n{ADDR_A} $SCAT"));
        let records: Vec<_> = extract_tokens(&snap).collect();
        assert_eq!(records[0].name, "Shadow Cat");
    }

    #[test]
    fn enrichment_fields_are_captured_when_present() {
        let snap = snapshot(&format!(
            "CatWifHatGMGN @deployer_guy Followers: 12,400 Tokens created: 3\n\
             {ADDR_A} $CWH Tax: 2.5% $45.2K Ban deployer AAA3"
        ));
        let records: Vec<_> = extract_tokens(&snap).collect();
        let record = &records[0];
        assert_eq!(record.creator.as_deref(), Some("@deployer_guy"));
        assert_eq!(record.followers.as_deref(), Some("12,400"));
        assert_eq!(record.tokens_created.as_deref(), Some("3"));
        assert_eq!(record.tax.as_deref(), Some("2.5%"));
        assert_eq!(record.liquidity.as_deref(), Some("$45.2K"));
        assert_eq!(record.tags.as_deref(), Some("GMGN, Ban deployer, AAA3"));
    }

    #[test]
    fn tweet_url_comes_from_raw_html() {
        let snap = PageSnapshot {
            text: format!("RugWatchGMGN {ADDR_A} $RUG"),
            html: format!(
                "<div>RugWatchGMGN {ADDR_A} <a href=\"https://x.com/rugwatch/status/12345\">tweet</a></div>"
            ),
        };
        let records: Vec<_> = extract_tokens(&snap).collect();
        assert_eq!(
            records[0].tweet_url.as_deref(),
            Some("https://x.com/rugwatch/status/12345")
        );
    }

    #[test]
    fn missing_fields_never_block_emission() {
        let snap = snapshot(&format!("JustANameGMGN {ADDR_A}"));
        let records: Vec<_> = extract_tokens(&snap).collect();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name, "JustAName");
        assert!(record.symbol.is_none());
        assert!(record.tax.is_none());
        assert!(record.liquidity.is_none());
        assert!(record.tweet_url.is_none());
    }
}
