//! Column reconstruction for invoice lines whose cells were merged into one
//! string by the PDF extractor.
//!
//! The layout is `Edition# Title... Order Ship BO List Disc Net Extension`,
//! but the extractor collapses it to single spaces and drops empty columns.
//! Everything is recovered from the right, because the Title is the only
//! field that can contain spaces, using three token shapes: digit-only
//! quantities, `ddd.dd` prices and `%` discounts.

use crate::model::DiscardReason;

const RIGHT_GROUPS: usize = 5;
const LEADING_PARTS: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Treat the number after a trailing `vol`/`volume` title word as part of
    /// the title even when Order = Ship + BO holds.
    pub volume_title_hint: bool,
}

/// Which branch of the reconstruction produced a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    /// No Order/Ship/BO numbers were found before the price columns.
    AllTitle,
    /// Nothing shipped: empty Ship (and possibly List) placeholders inserted.
    Backordered,
    /// Order and Ship present, empty BO appended.
    FullyShipped,
    /// Order, Ship and BO present and Order = Ship + BO.
    PartialBackorder,
    /// Three numbers that did not add up; the first was title text.
    TitleCorrected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedRow {
    pub fields: Vec<String>,
    pub shape: RowShape,
}

#[must_use]
pub fn is_digit_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|byte| byte.is_ascii_digit())
}

/// `\d{1,3}\.\d{2}`, anchored at both ends.
#[must_use]
pub fn is_price_token(token: &str) -> bool {
    let Some((whole, cents)) = token.split_once('.') else {
        return false;
    };
    (1..=3).contains(&whole.len())
        && cents.len() == 2
        && is_digit_token(whole)
        && is_digit_token(cents)
}

#[must_use]
pub fn is_percent_token(token: &str) -> bool {
    token.contains('%')
}

fn is_title_word(token: &str) -> bool {
    !is_digit_token(token) && !is_price_token(token) && !is_percent_token(token)
}

fn has_numeric_content(text: &str) -> bool {
    text.split_whitespace()
        .any(|token| is_digit_token(token) || is_price_token(token) || is_percent_token(token))
}

/// Splits from the right on single spaces into at most [`RIGHT_GROUPS`]
/// groups, keeping the leftmost group (the title and any quantities) intact.
fn right_groups(remainder: &str) -> Vec<String> {
    let mut groups = remainder
        .rsplitn(RIGHT_GROUPS, ' ')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    groups.reverse();
    groups
}

/// Right-splits the title group into exactly [`LEADING_PARTS`] parts. Short
/// titles leave empty parts on the left.
fn leading_parts(group: &str) -> [String; LEADING_PARTS] {
    let mut parts: [String; LEADING_PARTS] = Default::default();
    for (slot, piece) in parts.iter_mut().rev().zip(group.rsplitn(LEADING_PARTS, ' ')) {
        *slot = piece.to_string();
    }
    parts
}

fn join_title(words: &[String]) -> String {
    words
        .iter()
        .filter(|word| !word.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn demote_into_title(fields: &mut Vec<String>) {
    let word = fields.remove(1);
    let title = &mut fields[0];
    if title.is_empty() {
        *title = word;
    } else if !word.is_empty() {
        title.push(' ');
        title.push_str(&word);
    }
}

fn all_title(parts: &[String; LEADING_PARTS], tail: &[String]) -> (Vec<String>, RowShape) {
    let mut fields = vec![join_title(&parts[..3]), parts[3].clone()];
    fields.extend_from_slice(tail);

    while fields.len() > 2 && is_title_word(&fields[1]) {
        demote_into_title(&mut fields);
    }

    let last_two_are_prices = fields.len() >= 2
        && fields[fields.len() - 2..]
            .iter()
            .all(|field| is_price_token(field));
    if fields.len() < 2 || last_two_are_prices {
        return (fields, RowShape::AllTitle);
    }

    // The second number is the backordered quantity; nothing shipped.
    fields.insert(2, String::new());
    if fields.get(4).is_some_and(|field| is_percent_token(field)) {
        // Discount sits where List belongs, so List is missing too.
        fields.insert(4, String::new());
    }
    (fields, RowShape::Backordered)
}

fn two_numbers(parts: &[String; LEADING_PARTS], tail: &[String]) -> (Vec<String>, RowShape) {
    let mut fields = vec![
        join_title(&parts[..2]),
        parts[2].clone(),
        parts[3].clone(),
        String::new(),
    ];
    fields.extend_from_slice(tail);

    if !is_digit_token(&fields[1]) {
        demote_into_title(&mut fields);
    }
    (fields, RowShape::FullyShipped)
}

fn ends_with_volume_marker(title: &str) -> bool {
    title.split_whitespace().last().is_some_and(|word| {
        let word = word.trim_end_matches('.').to_ascii_lowercase();
        word == "vol" || word == "volume"
    })
}

fn quantities_balance(order: &str, ship: &str, backorder: &str) -> bool {
    let (Ok(order), Ok(ship), Ok(backorder)) = (
        order.parse::<u64>(),
        ship.parse::<u64>(),
        backorder.parse::<u64>(),
    ) else {
        return false;
    };
    ship.checked_add(backorder) == Some(order)
}

fn three_numbers(
    parts: &[String; LEADING_PARTS],
    tail: &[String],
    options: TokenizerOptions,
) -> (Vec<String>, RowShape) {
    let volume_number = options.volume_title_hint && ends_with_volume_marker(&parts[0]);
    if !volume_number && quantities_balance(&parts[1], &parts[2], &parts[3]) {
        let mut fields = parts.to_vec();
        fields.extend_from_slice(tail);
        return (fields, RowShape::PartialBackorder);
    }

    let mut fields = vec![
        join_title(&parts[..2]),
        parts[2].clone(),
        parts[3].clone(),
        String::new(),
    ];
    fields.extend_from_slice(tail);
    (fields, RowShape::TitleCorrected)
}

/// Reconstructs the columns of one invoice line.
///
/// Never panics on malformed input; rows that cannot be data (footers,
/// captions, stray fragments) come back as a [`DiscardReason`].
///
/// # Errors
///
/// Returns the reason the row was rejected as noise.
pub fn tokenize_row(text: &str, options: TokenizerOptions) -> Result<TokenizedRow, DiscardReason> {
    let text = text.trim();
    let Some((edition, remainder)) = text.split_once(' ') else {
        return Err(DiscardReason::NoRemainder);
    };
    if remainder.trim().is_empty() {
        return Err(DiscardReason::NoRemainder);
    }
    if !has_numeric_content(remainder) {
        return Err(DiscardReason::NoNumericContent);
    }

    let groups = right_groups(remainder);
    let Some((head, tail)) = groups.split_first() else {
        return Err(DiscardReason::NoRemainder);
    };

    let parts = leading_parts(head);
    let (mut fields, shape) = match (is_digit_token(&parts[1]), is_digit_token(&parts[2])) {
        (false, false) => all_title(&parts, tail),
        (true, true) => three_numbers(&parts, tail, options),
        _ => two_numbers(&parts, tail),
    };
    // Page furniture such as "Page 2 of 3" keeps its words in the quantity
    // slots and leaves the title empty.
    if fields[0].is_empty() {
        return Err(DiscardReason::EmptyTitle);
    }
    fields.insert(0, edition.to_string());

    Ok(TokenizedRow { fields, shape })
}
