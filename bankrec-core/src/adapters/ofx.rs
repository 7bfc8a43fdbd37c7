//! OFX/OFC statement parser
//!
//! Banks mostly export OFX 1.x SGML, where leaf elements have no closing tag, so this
//! is a tag scanner rather than a tree parser. A value runs from `<TAG>` to the next
//! `<`, line break, or end of input. Nothing here fails: a field that is missing or
//! unreadable comes back as `None`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::statement::{
    AccountIdentity, BankIdentity, ClosingBalance, ParsedStatement, StatementLine,
    StatementPeriod,
};

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static BLOCK_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<([A-Za-z0-9_.]+)>([^<\r\n]*)").expect("tag pattern"))
}

fn block_re() -> &'static Regex {
    BLOCK_RE.get_or_init(|| Regex::new(r"(?is)<STMTTRN>(.*?)</STMTTRN>").expect("block pattern"))
}

/// First non-empty value of every tag in `text`, keyed by upper-cased tag name
fn scan_tags(text: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for caps in tag_re().captures_iter(text) {
        let value = caps[2].trim();
        if value.is_empty() {
            continue;
        }
        tags.entry(caps[1].to_ascii_uppercase())
            .or_insert_with(|| value.to_string());
    }
    tags
}

/// Parse raw statement text
pub fn parse(raw: &str) -> ParsedStatement {
    let tags = scan_tags(raw);
    let get = |name: &str| tags.get(name).cloned();

    let transactions = block_re()
        .captures_iter(raw)
        .map(|caps| parse_block(&caps[1]))
        .collect();

    ParsedStatement {
        bank: BankIdentity { code: get("BANKID") },
        account: AccountIdentity {
            branch: get("BRANCHID"),
            number: get("ACCTID"),
            account_type: get("ACCTTYPE"),
        },
        period: StatementPeriod {
            start: tags.get("DTSTART").and_then(|s| parse_date(s)),
            end: tags.get("DTEND").and_then(|s| parse_date(s)),
        },
        balance: ClosingBalance {
            amount: tags.get("BALAMT").and_then(|s| parse_amount(s)),
            as_of: tags.get("DTASOF").and_then(|s| parse_date(s)),
        },
        transactions,
    }
}

fn parse_block(block: &str) -> StatementLine {
    let mut tags = scan_tags(block);
    StatementLine {
        trn_type: tags.remove("TRNTYPE"),
        posted_at: tags.get("DTPOSTED").and_then(|s| parse_date(s)),
        amount: tags.get("TRNAMT").and_then(|s| parse_amount(s)),
        bank_ref: tags.remove("FITID"),
        memo: tags.remove("MEMO"),
        name: tags.remove("NAME"),
        check_number: tags.remove("CHECKNUM"),
    }
}

/// Parse an OFX date: `YYYYMMDD[HHMM[SS]][.fff][[offset:TZ]]`
///
/// Hour, minute and second are each read only when the string is long enough to
/// hold them. Anything shorter than eight characters is not a date.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let clean = match raw.find('[') {
        Some(idx) => &raw[..idx],
        None => raw,
    }
    .trim();

    if clean.len() < 8 {
        return None;
    }

    let digits = |from: usize, len: usize| -> Option<u32> {
        let part = clean.get(from..from + len)?;
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    };
    let optional = |from: usize| -> Option<u32> {
        if clean.len() >= from + 2 {
            digits(from, 2)
        } else {
            Some(0)
        }
    };

    let year = digits(0, 4)? as i32;
    let month = digits(4, 2)?;
    let day = digits(6, 2)?;
    let hour = optional(8)?;
    let minute = optional(10)?;
    let second = optional(12)?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Largest magnitude a stored amount can take: 16 integer digits at 2 decimal places
// `Decimal::new` is not const; these parts encode 999_999_999_999_999_999 at scale 2
const MAX_ABS_AMOUNT: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

/// Parse a statement amount, keeping its sign
///
/// Accepts a leading `+`, a decimal comma (`-12,50`) and dot thousands separators
/// when a comma is the decimal mark (`1.234,56`). Values are rounded half away from
/// zero to cents; anything that still exceeds the stored range is malformed.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let normalized = match (unsigned.rfind(','), unsigned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => unsigned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => unsigned.replace(',', ""),
        (Some(_), None) => unsigned.replace(',', "."),
        _ => unsigned.to_string(),
    };

    let amount = Decimal::from_str(&normalized)
        .ok()?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (amount.abs() <= MAX_ABS_AMOUNT).then_some(amount)
}

/// Decode file bytes as Latin-1: every byte maps to the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Inverse of [`decode_latin1`]
///
/// Characters above U+00FF cannot come from a decoded file; they are kept as UTF-8.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match u8::try_from(c) {
            Ok(b) => bytes.push(b),
            Err(_) => bytes.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
        }
    }
    bytes
}
