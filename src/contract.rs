//! Structural checks on agent output
//!
//! Model text is free-form, so the runner verifies the few fields downstream
//! readers rely on (trend labels, fear/greed scores, the summary block) and
//! records violations instead of failing the run.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

impl Trend {
    pub const ALL: [Trend; 3] = [Trend::Up, Trend::Down, Trend::Sideways];

    pub fn label(self) -> &'static str {
        match self {
            Trend::Up => "UP",
            Trend::Down => "DOWN",
            Trend::Sideways => "SIDEWAYS",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Trend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Ok(Trend::Up),
            "DOWN" => Ok(Trend::Down),
            "SIDEWAYS" => Ok(Trend::Sideways),
            other => Err(format!("unknown trend '{other}'")),
        }
    }
}

/// What a task's output must structurally contain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputContract {
    None,
    PriceTrend { ticket: String },
    NewsSentiment { assets: Vec<String> },
    Newsletter,
}

impl OutputContract {
    pub fn check(&self, output: &str) -> Vec<String> {
        match self {
            OutputContract::None => Vec::new(),
            OutputContract::PriceTrend { ticket } => check_price_trend(output, ticket),
            OutputContract::NewsSentiment { assets } => check_news_sentiment(output, assets),
            OutputContract::Newsletter => check_newsletter(output),
        }
    }
}

/// Uppercase trend labels as whole words.
static TREND_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(UP|DOWN|SIDEWAYS)\b").expect("invalid trend regex"));

/// A fear/greed label followed directly by its score.
static FEAR_GREED_SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)fear\s*(?:/|&|and|-)?\s*greed(?:\s+(?:score|index|rating))?(?:\s*(?:[:=]|is|of|at))*\s*(-?\d+(?:\.\d+)?)",
    )
    .expect("invalid fear/greed regex")
});

/// A fear/greed score and where its label starts in the text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelledScore {
    pub offset: usize,
    pub value: f64,
}

/// Uppercase trend labels appearing as whole words, in order.
pub fn trend_mentions(text: &str) -> Vec<Trend> {
    TREND_WORD
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// The trend if exactly one distinct label is mentioned.
pub fn single_trend(text: &str) -> Option<Trend> {
    let mentions = trend_mentions(text);
    let first = *mentions.first()?;
    mentions.iter().all(|t| *t == first).then_some(first)
}

/// Whether `symbol` appears as a whole word (case-insensitive).
pub fn mentions_symbol(text: &str, symbol: &str) -> bool {
    !symbol_positions(text, symbol, true).is_empty()
}

/// The number written right after each fear/greed label.
///
/// Negative values and decimals are kept so they can be reported as out of range.
pub fn fear_greed_scores(text: &str) -> Vec<f64> {
    labelled_scores(text).into_iter().map(|s| s.value).collect()
}

pub fn labelled_scores(text: &str) -> Vec<LabelledScore> {
    FEAR_GREED_SCORE
        .captures_iter(text)
        .filter_map(|caps| {
            let offset = caps.get(0)?.start();
            let value = caps[1].parse().ok()?;
            Some(LabelledScore { offset, value })
        })
        .collect()
}

/// Byte offsets where `symbol` occurs with no word character on either side.
fn symbol_positions(text: &str, symbol: &str, case_insensitive: bool) -> Vec<usize> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Vec::new();
    }
    let Ok(pattern) = RegexBuilder::new(&regex::escape(symbol))
        .case_insensitive(case_insensitive)
        .build()
    else {
        return Vec::new();
    };
    pattern
        .find_iter(text)
        .filter(|m| {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
        .map(|m| m.start())
        .collect()
}

/// Which asset a score at `offset` belongs to.
///
/// Prefers the nearest asset named earlier on the same line, then the nearest
/// asset opening a line (a heading or bold label), then any earlier mention.
fn score_owner<'a>(text: &str, offset: usize, mentions: &[(usize, &'a str)]) -> Option<&'a str> {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let earlier = move || mentions.iter().filter(move |(pos, _)| *pos < offset);

    earlier()
        .filter(|(pos, _)| *pos >= line_start)
        .last()
        .or_else(|| earlier().filter(|(pos, _)| opens_line(text, *pos)).last())
        .or_else(|| earlier().last())
        .map(|(_, asset)| *asset)
}

fn opens_line(text: &str, pos: usize) -> bool {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    text[line_start..pos]
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '#' | '*' | '-' | '_' | '>' | '•'))
}

fn check_price_trend(output: &str, ticket: &str) -> Vec<String> {
    let mut violations = Vec::new();
    if symbol_positions(output, ticket, false).is_empty() {
        violations.push(format!("price trend output does not name {ticket}"));
    }
    let distinct = distinct_trends(output);
    if distinct.len() != 1 {
        violations.push(format!(
            "price trend output must name exactly one of UP/DOWN/SIDEWAYS, found {}",
            describe(&distinct)
        ));
    }
    violations
}

fn check_news_sentiment(output: &str, assets: &[String]) -> Vec<String> {
    let mut violations = Vec::new();

    let mut mentions: Vec<(usize, &str)> = assets
        .iter()
        .flat_map(|asset| {
            symbol_positions(output, asset, true)
                .into_iter()
                .map(move |pos| (pos, asset.as_str()))
        })
        .collect();
    mentions.sort_by_key(|(pos, _)| *pos);

    let scores = labelled_scores(output);
    let owners: Vec<&str> = scores
        .iter()
        .filter_map(|s| score_owner(output, s.offset, &mentions))
        .collect();

    for asset in assets {
        if !mentions.iter().any(|(_, a)| *a == asset.as_str()) {
            violations.push(format!("news report has no entry for {asset}"));
        } else if !owners.contains(&asset.as_str()) {
            violations.push(format!("no fear/greed score for {asset}"));
        }
    }
    for score in scores {
        let value = score.value;
        if value.fract() != 0.0 || !(0.0..=100.0).contains(&value) {
            violations.push(format!("fear/greed score {value} is not an integer in [0, 100]"));
        }
    }
    violations
}

fn check_newsletter(output: &str) -> Vec<String> {
    let mut violations = Vec::new();

    let blocks = summary_blocks(output);
    match blocks.as_slice() {
        [bullets] if *bullets == 3 => {}
        [bullets] => violations.push(format!(
            "executive summary must have 3 bullets, found {bullets}"
        )),
        other => violations.push(format!(
            "expected exactly one executive summary block, found {}",
            other.len()
        )),
    }

    let paragraphs = prose_paragraphs(output);
    if paragraphs != 3 {
        violations.push(format!("expected 3 paragraphs, found {paragraphs}"));
    }

    let closing = output
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .last()
        .unwrap_or_default();
    if trend_mentions(closing).is_empty() {
        violations.push("newsletter does not end with an UP/DOWN/SIDEWAYS prediction".to_string());
    }
    violations
}

/// Bullet count of each block introduced by an "executive summary" line.
fn summary_blocks(text: &str) -> Vec<usize> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !line.to_lowercase().contains("executive summary") || is_bullet(line) {
            continue;
        }
        let bullets = lines[i + 1..]
            .iter()
            .map(|l| l.trim())
            .skip_while(|l| l.is_empty())
            .take_while(|l| is_bullet(l))
            .count();
        blocks.push(bullets);
    }
    blocks
}

/// Blank-line separated blocks with at least one line that is not a heading,
/// bullet or executive summary line.
fn prose_paragraphs(text: &str) -> usize {
    text.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .filter(|block| {
            block.lines().any(|l| {
                let l = l.trim();
                !l.is_empty()
                    && !l.starts_with('#')
                    && !is_bullet(l)
                    && !l.to_lowercase().contains("executive summary")
            })
        })
        .count()
}

fn is_bullet(line: &str) -> bool {
    let l = line.trim_start();
    l.starts_with("- ") || l.starts_with("* ") || l.starts_with("• ")
}

fn distinct_trends(text: &str) -> Vec<Trend> {
    let mentions = trend_mentions(text);
    Trend::ALL
        .into_iter()
        .filter(|t| mentions.contains(t))
        .collect()
}

fn describe(trends: &[Trend]) -> String {
    if trends.is_empty() {
        return "none".to_string();
    }
    trends.iter().map(|t| t.label()).collect::<Vec<_>>().join(", ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
