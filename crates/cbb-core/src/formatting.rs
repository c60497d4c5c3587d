//! Telegram MarkdownV2 rendering for the daily digest.

use crate::domain::{DailyReport, OfferingRecord};

/// Characters Telegram MarkdownV2 treats as markup outside entities.
const MARKDOWN_V2_SPECIAL: [char; 18] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

const APPLY_HEADER: &str = "*当日可打新债*: \n";
const APPLY_NONE: &str = "*当日无可打新债*";
const LISTED_HEADER: &str = "*当日上市新债*: \n";
const LISTED_NONE: &str = "*当日无上市新债*";
const DISCLAIMER: &str = "_以上数据来源于互联网，仅供参考，不作为投资建议_";

/// Backslash-escape every MarkdownV2 special character in one pass.
///
/// Already-escaped input is escaped again; callers pass raw text only.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a URL for the `(...)` part of an inline link.
pub fn escape_link_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c == ')' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn link(label: &str, url: &str) -> String {
    format!("[{}]({})", escape_markdown_v2(label), escape_link_url(url))
}

fn lottery_rate(rate: &str) -> String {
    if rate.is_empty() {
        escape_markdown_v2("---")
    } else {
        format!("{}%", escape_markdown_v2(rate))
    }
}

/// Render one offering as a fixed multi-line block.
pub fn format_record(record: &OfferingRecord, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let name = format!("{}({})", record.stock_nm, record.bond_nm);
    let bond_url = format!("{base}/data/convert_bond_detail/{}", record.bond_id);
    let stock_url = format!("{base}/data/stock/{}", record.stock_id);

    let lines = [
        format!("名   称: {}", escape_markdown_v2(&name)),
        format!("债券代码: {}", link(&record.bond_id, &bond_url)),
        format!("证券代码: {}", link(&record.stock_id, &stock_url)),
        format!("现    价: {}", escape_markdown_v2(&record.price)),
        format!("中签率: {}", lottery_rate(&record.lucky_draw_rt)),
        format!("评   级: {}", escape_markdown_v2(&record.rating_cd)),
        format!("申购建议: {}", escape_markdown_v2(&record.jsl_advise_text)),
    ];

    let mut out = String::from("\n");
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn push_section(
    out: &mut String,
    records: &[OfferingRecord],
    header: &str,
    none: &str,
    base_url: &str,
) {
    if records.is_empty() {
        out.push_str(none);
        return;
    }
    out.push_str(header);
    for record in records {
        out.push_str(&format_record(record, base_url));
    }
}

/// Render the full digest: date, apply section, listing section, disclaimer.
pub fn format_report(report: &DailyReport, base_url: &str) -> String {
    let date = report.date.format("%Y-%m-%d").to_string();

    let mut out = format!("*日期*: {}\n\n", escape_markdown_v2(&date));
    push_section(&mut out, &report.apply, APPLY_HEADER, APPLY_NONE, base_url);
    out.push_str("\n\n");
    push_section(
        &mut out,
        &report.listed,
        LISTED_HEADER,
        LISTED_NONE,
        base_url,
    );
    // Blocks already end with a newline; the empty marker needs its own gap.
    if report.listed.is_empty() {
        out.push_str("\n\n");
    }
    out.push('\n');
    out.push_str(DISCLAIMER);
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const BASE: &str = "https://www.jisilu.cn";

    fn foo_bar() -> OfferingRecord {
        OfferingRecord {
            stock_id: "600001".into(),
            stock_nm: "Foo".into(),
            bond_id: "123".into(),
            bond_nm: "Bar".into(),
            price: "100.5".into(),
            lucky_draw_rt: "".into(),
            rating_cd: "AA".into(),
            jsl_advise_text: "buy".into(),
            apply_date: "2024-03-15".into(),
            ..Default::default()
        }
    }

    #[test]
    fn escapes_every_special_character() {
        for c in MARKDOWN_V2_SPECIAL {
            let input = format!("AA{c}BB");
            assert_eq!(escape_markdown_v2(&input), format!("AA\\{c}BB"), "char {c:?}");
        }
        assert_eq!(escape_markdown_v2("AA*BB"), "AA\\*BB");
    }

    #[test]
    fn escaping_is_single_pass() {
        assert_eq!(escape_markdown_v2("a.b"), "a\\.b");
        // Backslash is not in the set; an escaped dot only gains one more backslash before the dot.
        assert_eq!(escape_markdown_v2("a\\.b"), "a\\\\.b");
        assert_eq!(escape_markdown_v2(""), "");
        assert_eq!(escape_markdown_v2("中文"), "中文");
    }

    #[test]
    fn link_url_escapes_paren_and_backslash() {
        assert_eq!(escape_link_url("https://x/a)b\\c"), "https://x/a\\)b\\\\c");
        assert_eq!(escape_link_url("https://x/a.b-c"), "https://x/a.b-c");
    }

    #[test]
    fn lottery_rate_has_percent_or_placeholder() {
        assert_eq!(lottery_rate("12.3"), "12\\.3%");
        assert_eq!(lottery_rate(""), "\\-\\-\\-");
    }

    #[test]
    fn record_block_layout() {
        let block = format_record(&foo_bar(), BASE);
        assert!(block.starts_with('\n'));
        assert!(block.ends_with('\n'));
        assert!(block.contains("名   称: Foo\\(Bar\\)\n"));
        assert!(block.contains(
            "债券代码: [123](https://www.jisilu.cn/data/convert_bond_detail/123)\n"
        ));
        assert!(block.contains("证券代码: [600001](https://www.jisilu.cn/data/stock/600001)\n"));
        assert!(block.contains("现    价: 100\\.5\n"));
        assert!(block.contains("中签率: \\-\\-\\-\n"));
        assert!(block.contains("评   级: AA\n"));
        assert!(block.contains("申购建议: buy\n"));
    }

    #[test]
    fn trailing_slash_on_base_url_is_ignored() {
        let a = format_record(&foo_bar(), BASE);
        let b = format_record(&foo_bar(), "https://www.jisilu.cn/");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_report_has_both_none_markers() {
        let report = DailyReport {
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            apply: vec![],
            listed: vec![],
        };
        let text = format_report(&report, BASE);
        assert!(text.starts_with("*日期*: 2024\\-03\\-15\n\n"));
        assert!(text.contains(APPLY_NONE));
        assert!(text.contains(LISTED_NONE));
        assert!(!text.contains(APPLY_HEADER));
        assert!(!text.contains(LISTED_HEADER));
        assert!(!text.contains("名   称"));
    }

    #[test]
    fn single_apply_candidate_end_to_end() {
        let report = DailyReport {
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            apply: vec![foo_bar()],
            listed: vec![],
        };
        let text = format_report(&report, BASE);

        assert_eq!(text.matches("名   称").count(), 1);
        assert!(text.contains(APPLY_HEADER));
        assert!(text.contains("中签率: \\-\\-\\-"));
        assert!(text.contains(LISTED_NONE));
        assert_eq!(text.matches(DISCLAIMER).count(), 1);
        assert!(text.ends_with(DISCLAIMER));

        let apply_at = text.find(APPLY_HEADER).unwrap();
        let block_at = text.find("名   称").unwrap();
        let listed_at = text.find(LISTED_NONE).unwrap();
        assert!(apply_at < block_at && block_at < listed_at);
    }

    #[test]
    fn disclaimer_spacing_follows_listing_section() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let empty = format_report(
            &DailyReport {
                date,
                apply: vec![],
                listed: vec![],
            },
            BASE,
        );
        assert!(empty.ends_with(&format!("*当日无上市新债*\n\n\n{DISCLAIMER}")));

        let listed = format_report(
            &DailyReport {
                date,
                apply: vec![],
                listed: vec![foo_bar()],
            },
            BASE,
        );
        assert!(listed.ends_with(&format!("申购建议: buy\n\n{DISCLAIMER}")));
    }

    #[test]
    fn rendering_is_deterministic() {
        let report = DailyReport {
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            apply: vec![foo_bar()],
            listed: vec![foo_bar()],
        };
        assert_eq!(format_report(&report, BASE), format_report(&report, BASE));
    }
}
