use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use icu_collator::{Collator, CollatorOptions, Strength};
use icu_locid::{Locale, locale};
use tracing::{debug, trace, warn};
use unicase::UniCase;

use crate::dataset::{Column, Dataset};
use crate::domain::TableError;
use crate::labels::Lang;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Ascending => "▲",
            Direction::Descending => "▼",
        }
    }
}

/// Single column sort state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub column: Option<Column>,
    pub direction: Direction,
}

impl SortState {
    pub fn new(column: Column, direction: Direction) -> Self {
        Self {
            column: Some(column),
            direction,
        }
    }

    /// State after the header of `column` was activated.
    pub fn select(self, column: Column) -> Self {
        if self.column == Some(column) {
            Self::new(column, self.direction.toggled())
        } else {
            Self::new(column, Direction::Ascending)
        }
    }

    pub fn marker(&self, column: Column) -> Option<Direction> {
        (self.column == Some(column)).then_some(self.direction)
    }
}

/// Parses `column` or `column:asc|desc`.
impl FromStr for SortState {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, direction) = s.split_once(':').unwrap_or((s, "asc"));
        let direction = match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => Direction::Ascending,
            "desc" => Direction::Descending,
            other => return Err(TableError::UnknownDirection(other.to_string())),
        };
        Ok(Self::new(column.parse()?, direction))
    }
}

/// Case-insensitive ordering of text cells for one locale.
pub enum TextOrder {
    Collated(Collator),
    // Without collation data for the locale
    CaseFolded,
}

impl TextOrder {
    pub fn for_lang(lang: Lang) -> Self {
        let locale: Locale = match lang {
            Lang::En => locale!("en"),
            Lang::Uk => locale!("uk"),
        };
        // Secondary strength: accents count, case does not.
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Secondary);
        match Collator::try_new(&(&locale).into(), options) {
            Ok(collator) => {
                debug!("Collating text for {locale}");
                TextOrder::Collated(collator)
            }
            Err(e) => {
                warn!("No collation for {locale} ({e}), ordering text by case folding");
                TextOrder::CaseFolded
            }
        }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            TextOrder::Collated(collator) => collator.compare(a, b),
            TextOrder::CaseFolded => UniCase::new(a).cmp(&UniCase::new(b)),
        }
    }
}

impl Default for TextOrder {
    fn default() -> Self {
        Self::for_lang(Lang::default())
    }
}

impl fmt::Debug for TextOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextOrder::Collated(_) => f.write_str("TextOrder::Collated"),
            TextOrder::CaseFolded => f.write_str("TextOrder::CaseFolded"),
        }
    }
}

/// Sort `view` by `column`, toggling the direction if `column` is already active.
pub fn sort_by_column(
    dataset: &Dataset,
    view: &[usize],
    column: Column,
    previous: SortState,
    text_order: &TextOrder,
) -> (Vec<usize>, SortState) {
    let state = previous.select(column);
    (apply_sort(dataset, view, state, text_order), state)
}

struct SortKey<'a> {
    ridx: usize,
    text: Cow<'a, str>,
    number: Option<f64>,
}

/// Order `view` according to `state` without changing the state.
pub fn apply_sort(
    dataset: &Dataset,
    view: &[usize],
    state: SortState,
    text_order: &TextOrder,
) -> Vec<usize> {
    let Some(column) = state.column else {
        return view.to_vec();
    };
    trace!("Sorting {} rows by {} {:?}", view.len(), column, state.direction);

    let keys: Vec<SortKey> = view
        .iter()
        .map(|&ridx| {
            let text = dataset.cell(ridx, column);
            let number = parse_number(&text);
            SortKey { ridx, text, number }
        })
        .collect();

    let compare = |a: &SortKey, b: &SortKey| match (a.number, b.number) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => text_order.compare(&a.text, &b.text),
    };

    let mut order: Vec<usize> = (0..keys.len()).collect();
    stable_sort_by(&mut order, |&i, &j| match state.direction {
        Direction::Ascending => compare(&keys[i], &keys[j]),
        Direction::Descending => compare(&keys[j], &keys[i]),
    });
    order.into_iter().map(|i| keys[i].ridx).collect()
}

/// Numeric reading of a cell such as `"1 234,5"`, `"5,75"` or `"10 GB"`.
///
/// Whitespace and apostrophes are dropped. A single comma is the decimal
/// separator (dots before it group thousands); several commas group thousands.
/// The longest leading float is parsed.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect();
    let normalized = match cleaned.matches(',').count() {
        0 => cleaned,
        1 => cleaned.replace('.', "").replace(',', "."),
        _ => cleaned.replace(',', ""),
    };
    leading_float(&normalized)
}

fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let scan_digits = |mut pos: usize| {
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        pos
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = scan_digits(end);
    let mut digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = scan_digits(end + 1);
        if frac_end > end + 1 {
            digits += frac_end - end - 1;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_start = end + 1 + sign;
        let exp_end = scan_digits(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

// Bottom-up merge sort. Takes the left element on ties, so it is stable, and
// it terminates for comparators that are not a total order, which mixed
// numeric and text cells can produce.
fn stable_sort_by<T: Copy, F: Fn(&T, &T) -> Ordering>(items: &mut [T], compare: F) {
    let len = items.len();
    let mut buffer = items.to_vec();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j) = (start, mid);
            for slot in &mut buffer[start..end] {
                if i < mid && (j >= end || compare(&items[j], &items[i]) != Ordering::Less) {
                    *slot = items[i];
                    i += 1;
                } else {
                    *slot = items[j];
                    j += 1;
                }
            }
            start = end;
        }
        items.copy_from_slice(&buffer);
        width *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;
    use pretty_assertions::assert_eq;

    fn prices(values: &[&str]) -> Dataset {
        Dataset::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Record {
                    id: (i + 1).to_string(),
                    name: format!("r{i}"),
                    price: v.to_string(),
                    ..Record::default()
                })
                .collect(),
        )
    }

    fn names(values: &[&str]) -> Dataset {
        Dataset::new(
            values
                .iter()
                .map(|v| Record {
                    name: v.to_string(),
                    ..Record::default()
                })
                .collect(),
        )
    }

    fn sorted_prices(dataset: &Dataset, state: SortState) -> Vec<String> {
        let view: Vec<usize> = (0..dataset.len()).collect();
        apply_sort(dataset, &view, state, &TextOrder::for_lang(Lang::En))
            .into_iter()
            .map(|r| dataset.records()[r].price.clone())
            .collect()
    }

    fn sorted_names(dataset: &Dataset, direction: Direction, text_order: &TextOrder) -> Vec<String> {
        let view: Vec<usize> = (0..dataset.len()).collect();
        let state = SortState::new(Column::Name, direction);
        apply_sort(dataset, &view, state, text_order)
            .into_iter()
            .map(|r| dataset.records()[r].name.clone())
            .collect()
    }

    #[test]
    fn parses_numbers_with_format_noise() {
        assert_eq!(parse_number("10"), Some(10.0));
        assert_eq!(parse_number("1,5"), Some(1.5));
        assert_eq!(parse_number("1 234,50"), Some(1234.5));
        assert_eq!(parse_number("1.234,50"), Some(1234.5));
        assert_eq!(parse_number("1,234,567"), Some(1234567.0));
        assert_eq!(parse_number("1\u{a0}000"), Some(1000.0));
        assert_eq!(parse_number("10 GB"), Some(10.0));
        assert_eq!(parse_number("-2.5e3x"), Some(-2500.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("7e"), Some(7.0));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("Unlimited"), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn numeric_pairs_compare_as_numbers() {
        let dataset = prices(&["10", "9"]);
        let state = SortState::new(Column::Price, Direction::Ascending);
        assert_eq!(sorted_prices(&dataset, state), vec!["9", "10"]);
    }

    #[test]
    fn comma_decimals_compare_as_numbers() {
        let dataset = prices(&["1,5", "1,2"]);
        let state = SortState::new(Column::Price, Direction::Ascending);
        assert_eq!(sorted_prices(&dataset, state), vec!["1,2", "1,5"]);
    }

    #[test]
    fn mixed_pairs_fall_back_to_text() {
        let state = SortState::new(Column::Price, Direction::Ascending);
        let dataset = prices(&["N/A", "10"]);
        assert_eq!(sorted_prices(&dataset, state), vec!["10", "N/A"]);

        let dataset = prices(&["zebra", "Apple", "mango"]);
        assert_eq!(sorted_prices(&dataset, state), vec!["Apple", "mango", "zebra"]);

        // Case differences alone are ties and keep their order.
        let dataset = prices(&["abc", "ABC"]);
        assert_eq!(sorted_prices(&dataset, state), vec!["abc", "ABC"]);
    }

    #[test]
    fn text_follows_locale_collation() {
        let dataset = names(&[
            "Іспанія", "Австрія", "Єгипет", "Вірменія", "Ґана", "Гана", "Éclair", "Zulu",
        ]);
        let expected = vec![
            "Éclair", "Zulu", "Австрія", "Вірменія", "Гана", "Ґана", "Єгипет", "Іспанія",
        ];
        let uk = TextOrder::for_lang(Lang::Uk);
        assert!(matches!(uk, TextOrder::Collated(_)));
        assert_eq!(sorted_names(&dataset, Direction::Ascending, &uk), expected);

        let mut reversed = expected.clone();
        reversed.reverse();
        assert_eq!(sorted_names(&dataset, Direction::Descending, &uk), reversed);
    }

    #[test]
    fn accents_sort_next_to_their_base_letter() {
        let dataset = names(&["zebra", "Ápple", "apple", "Banana", "éclair", "Eagle"]);
        let en = TextOrder::for_lang(Lang::En);
        assert_eq!(
            sorted_names(&dataset, Direction::Ascending, &en),
            vec!["apple", "Ápple", "Banana", "Eagle", "éclair", "zebra"]
        );
        assert_eq!(en.compare("apple", "APPLE"), Ordering::Equal);
    }

    #[test]
    fn case_folding_fallback_ignores_case() {
        let folded = TextOrder::CaseFolded;
        assert_eq!(folded.compare("abc", "ABC"), Ordering::Equal);
        assert_eq!(folded.compare("Apple", "banana"), Ordering::Less);
    }

    #[test]
    fn selecting_same_column_toggles_direction() {
        let state = SortState::default().select(Column::Name);
        assert_eq!(state, SortState::new(Column::Name, Direction::Ascending));
        let state = state.select(Column::Name);
        assert_eq!(state.direction, Direction::Descending);
        let state = state.select(Column::Price);
        assert_eq!(state, SortState::new(Column::Price, Direction::Ascending));
        assert_eq!(state.marker(Column::Price), Some(Direction::Ascending));
        assert_eq!(state.marker(Column::Name), None);
    }

    #[test]
    fn sorting_twice_reverses_tie_free_order() {
        let dataset = prices(&["3", "1,5", "12", "0,25", "7"]);
        let view: Vec<usize> = (0..dataset.len()).collect();
        let text_order = TextOrder::default();
        let (first, state) =
            sort_by_column(&dataset, &view, Column::Price, SortState::default(), &text_order);
        let (second, state) = sort_by_column(&dataset, &first, Column::Price, state, &text_order);
        assert_eq!(state.direction, Direction::Descending);
        let mut reversed = first.clone();
        reversed.reverse();
        assert_eq!(second, reversed);
    }

    #[test]
    fn ties_keep_view_order_in_both_directions() {
        let dataset = prices(&["5", "1", "5", "5"]);
        let view = vec![3, 1, 0, 2];
        let text_order = TextOrder::default();
        let asc = apply_sort(
            &dataset,
            &view,
            SortState::new(Column::Price, Direction::Ascending),
            &text_order,
        );
        assert_eq!(asc, vec![1, 3, 0, 2]);
        let desc = apply_sort(
            &dataset,
            &view,
            SortState::new(Column::Price, Direction::Descending),
            &text_order,
        );
        assert_eq!(desc, vec![3, 0, 2, 1]);
    }

    #[test]
    fn inconsistent_comparisons_still_yield_a_permutation() {
        let dataset = prices(&["9", " 10", "!", "N/A", "2", "abc", "10"]);
        let view: Vec<usize> = (0..dataset.len()).collect();
        let mut sorted = apply_sort(
            &dataset,
            &view,
            SortState::new(Column::Price, Direction::Ascending),
            &TextOrder::default(),
        );
        sorted.sort_unstable();
        assert_eq!(sorted, view);
    }

    #[test]
    fn no_active_column_keeps_order() {
        let dataset = prices(&["2", "1"]);
        assert_eq!(sorted_prices(&dataset, SortState::default()), vec!["2", "1"]);
    }

    #[test]
    fn parses_sort_arguments() {
        assert_eq!(
            "price:desc".parse::<SortState>().unwrap(),
            SortState::new(Column::Price, Direction::Descending)
        );
        assert_eq!(
            "name".parse::<SortState>().unwrap(),
            SortState::new(Column::Name, Direction::Ascending)
        );
        assert!(matches!(
            "name:up".parse::<SortState>(),
            Err(TableError::UnknownDirection(_))
        ));
        assert!(matches!(
            "colour".parse::<SortState>(),
            Err(TableError::UnknownColumn(_))
        ));
    }
}
