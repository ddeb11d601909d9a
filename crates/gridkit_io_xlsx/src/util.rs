//! Stateless helpers: column codec, A1 parsing, value coercion, sheet names.

use std::sync::LazyLock;

use regex::Regex;

use crate::conf::{
    C_INF_TOKEN, C_SHEET_NAME_DEFAULT, N_COL_RADIX, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, EnumNumericCoerceMode, GridError, SpecCellReadPolicy, SpecCellRef};

static RE_CELL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z]+)([0-9]+)\s*$").expect("cell reference pattern is valid")
});

////////////////////////////////////////////////////////////////////////////////
// #region ColumnCodec

/// Encode a 1-based column index as a bijective base-26 label (`1 -> "A"`).
pub fn encode_column_label(n: u32) -> Result<String, GridError> {
    if n == 0 {
        return Err(GridError::InvalidArgument(
            "Column index must be >= 1 to have a label.".to_string(),
        ));
    }
    let mut c_label = String::new();
    push_column_label(n, &mut c_label);
    Ok(c_label)
}

/// Append the label of `n` (which must be >= 1) to `out`.
///
/// There is no zero digit: subtract one before every `% 26` and `/ 26`.
pub(crate) fn push_column_label(n: u32, out: &mut String) {
    let mut l_letters = Vec::with_capacity(7);
    let mut n_rest = n;
    while n_rest > 0 {
        let n_digit = (n_rest - 1) % N_COL_RADIX;
        l_letters.push(char::from(b'A' + n_digit as u8));
        n_rest = (n_rest - 1) / N_COL_RADIX;
    }
    out.extend(l_letters.iter().rev());
}

/// Decode a column label (case-insensitive) into its 1-based index.
pub fn decode_column_label(label: &str) -> Result<u32, GridError> {
    if label.is_empty() {
        return Err(GridError::InvalidArgument(
            "Column label must not be empty.".to_string(),
        ));
    }

    let mut n_col: u32 = 0;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(GridError::InvalidArgument(format!(
                "Invalid column label {label:?}: only letters A-Z are allowed."
            )));
        }
        let n_digit = u32::from(ch.to_ascii_uppercase() as u8 - b'A') + 1;
        n_col = n_col
            .checked_mul(N_COL_RADIX)
            .and_then(|n| n.checked_add(n_digit))
            .ok_or_else(|| {
                GridError::InvalidArgument(format!("Column label {label:?} is too long."))
            })?;
    }
    Ok(n_col)
}

/// Move a column label by `delta` columns (`shift("Z", 1) == "AA"`).
pub fn shift_column_label(label: &str, delta: i64) -> Result<String, GridError> {
    let n_col = i64::from(decode_column_label(label)?)
        .checked_add(delta)
        .ok_or_else(|| {
            GridError::InvalidArgument(format!(
                "Shifting column {label:?} by {delta} overflows the column index."
            ))
        })?;
    if n_col < 1 {
        return Err(GridError::InvalidArgument(format!(
            "Shifting column {label:?} by {delta} leaves the grid (index {n_col})."
        )));
    }
    let n_col = u32::try_from(n_col).map_err(|_| {
        GridError::InvalidArgument(format!("Column index overflow: {n_col}"))
    })?;
    encode_column_label(n_col)
}

/// Split a run of single-letter labels (`"ABC"` -> `["A", "B", "C"]`).
pub fn split_column_letters(letters: &str) -> Vec<String> {
    letters
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(String::from)
        .collect()
}

/// Parse an A1 reference (`"b12"` -> column 2, row 12).
pub fn parse_cell_ref(a1: &str) -> Result<SpecCellRef, GridError> {
    let Some(caps) = RE_CELL_REF.captures(a1) else {
        return Err(GridError::InvalidArgument(format!(
            "Invalid cell reference {a1:?}: expected letters followed by a row number."
        )));
    };
    let n_row = caps[2].parse::<u32>().map_err(|_| {
        GridError::InvalidArgument(format!("Row number out of range in {a1:?}."))
    })?;
    SpecCellRef::from_label(&caps[1], n_row)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ValueCoercion

/// Apply the numeric-text normalization policy to one value.
///
/// The token `inf` maps to `policy.inf_sentinel`, not to a real infinity.
/// Other non-finite spellings (`nan`, `infinity`) stay text.
pub fn coerce_cell_value(value: EnumCellValue, policy: &SpecCellReadPolicy) -> EnumCellValue {
    if policy.rule_coerce == EnumNumericCoerceMode::Keep {
        return value;
    }
    match value {
        EnumCellValue::String(s) => {
            let c_trimmed = s.trim();
            if c_trimmed.eq_ignore_ascii_case(C_INF_TOKEN) {
                return EnumCellValue::Number(policy.inf_sentinel);
            }
            match c_trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => EnumCellValue::Number(v),
                _ => EnumCellValue::String(s),
            }
        }
        other => other,
    }
}

/// Case-insensitive display-text equality used by lookups. Empty never matches.
pub fn is_cell_value_match(cell: &EnumCellValue, target: &EnumCellValue) -> bool {
    if cell.is_empty() || target.is_empty() {
        return false;
    }
    cell.to_string().to_lowercase() == target.to_string().to_lowercase()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = C_SHEET_NAME_DEFAULT.to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Make `name` unique among `existing` by appending `__2`, `__3`, ...
pub fn derive_unique_sheet_name(name: &str, existing: &[String]) -> String {
    if !existing.iter().any(|c_existing| c_existing == name) {
        return name.to_string();
    }

    let base_name: String = name
        .chars()
        .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
        .collect();

    let mut n_idx = 2usize;
    loop {
        let candidate: String = format!("{base_name}__{n_idx}")
            .chars()
            .take(N_LEN_EXCEL_SHEET_NAME_MAX)
            .collect();
        if !existing.iter().any(|c_existing| *c_existing == candidate) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::conf::{C_COL_LABEL_MAX, F_INF_SENTINEL, N_NCOLS_EXCEL_MAX};

    #[test]
    fn encode_known_labels() {
        assert_eq!(encode_column_label(1).expect("A"), "A");
        assert_eq!(encode_column_label(26).expect("Z"), "Z");
        assert_eq!(encode_column_label(27).expect("AA"), "AA");
        assert_eq!(encode_column_label(702).expect("ZZ"), "ZZ");
        assert_eq!(encode_column_label(703).expect("AAA"), "AAA");
    }

    #[test]
    fn encode_rejects_zero() {
        assert!(matches!(
            encode_column_label(0),
            Err(GridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn decode_last_excel_column() {
        assert_eq!(decode_column_label("XFA").expect("XFA"), 16_381);
        assert_eq!(decode_column_label("xfd").expect("xfd"), 16_384);
        assert_eq!(
            decode_column_label(C_COL_LABEL_MAX).expect("last label"),
            N_NCOLS_EXCEL_MAX
        );
        assert_eq!(
            encode_column_label(N_NCOLS_EXCEL_MAX).expect("last label"),
            C_COL_LABEL_MAX
        );
    }

    #[test]
    fn decode_rejects_malformed_labels() {
        for c_label in ["", "A1", "Ä", " A", "A-B"] {
            assert!(
                matches!(
                    decode_column_label(c_label),
                    Err(GridError::InvalidArgument(_))
                ),
                "{c_label:?} should be rejected"
            );
        }
        assert!(decode_column_label("ZZZZZZZZ").is_err());
    }

    #[test]
    fn shift_across_letter_boundary() {
        assert_eq!(shift_column_label("A", 1).expect("B"), "B");
        assert_eq!(shift_column_label("Z", 1).expect("AA"), "AA");
        assert_eq!(shift_column_label("AA", -1).expect("Z"), "Z");
        assert!(matches!(
            shift_column_label("A", -1),
            Err(GridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn shift_rejects_out_of_range_deltas() {
        for delta in [i64::MAX, i64::MIN, i64::from(u32::MAX)] {
            assert!(
                matches!(
                    shift_column_label("A", delta),
                    Err(GridError::InvalidArgument(_))
                ),
                "delta {delta} should be rejected"
            );
        }
    }

    #[test]
    fn column_letters_split_one_label_each() {
        assert_eq!(
            split_column_letters("AC e"),
            vec!["A".to_string(), "C".to_string(), "e".to_string()]
        );
        assert!(split_column_letters("").is_empty());

        let l_cols: Vec<u32> = split_column_letters("ABC")
            .iter()
            .map(|c_label| decode_column_label(c_label).expect("label"))
            .collect();
        assert_eq!(l_cols, vec![1, 2, 3]);
    }

    #[test]
    fn parse_cell_ref_accepts_a1() {
        let cell = parse_cell_ref("b12").expect("b12");
        assert_eq!((cell.col(), cell.row()), (2, 12));
        assert_eq!(cell.to_string(), "B12");

        for c_ref in ["12B", "B0", "", "B", "12", "B-1"] {
            assert!(
                matches!(parse_cell_ref(c_ref), Err(GridError::InvalidArgument(_))),
                "{c_ref:?} should be rejected"
            );
        }
    }

    #[test]
    fn coerce_numeric_text_and_inf_sentinel() {
        let policy = SpecCellReadPolicy::default();
        assert_eq!(
            coerce_cell_value(EnumCellValue::from("2.5"), &policy),
            EnumCellValue::Number(2.5)
        );
        assert_eq!(
            coerce_cell_value(EnumCellValue::from(" 7 "), &policy),
            EnumCellValue::Number(7.0)
        );
        assert_eq!(
            coerce_cell_value(EnumCellValue::from("INF"), &policy),
            EnumCellValue::Number(F_INF_SENTINEL)
        );
        assert_eq!(
            coerce_cell_value(EnumCellValue::from("nan"), &policy),
            EnumCellValue::from("nan")
        );
        assert_eq!(
            coerce_cell_value(EnumCellValue::from("abc"), &policy),
            EnumCellValue::from("abc")
        );
    }

    #[test]
    fn coerce_keep_returns_raw_text() {
        let policy = SpecCellReadPolicy::keep();
        assert_eq!(
            coerce_cell_value(EnumCellValue::from("inf"), &policy),
            EnumCellValue::from("inf")
        );
    }

    #[test]
    fn value_match_is_case_insensitive_on_display_text() {
        assert!(is_cell_value_match(
            &EnumCellValue::from("Total"),
            &EnumCellValue::from("TOTAL")
        ));
        assert!(is_cell_value_match(
            &EnumCellValue::Number(3.0),
            &EnumCellValue::from("3")
        ));
        assert!(!is_cell_value_match(&EnumCellValue::None, &EnumCellValue::None));
    }

    #[test]
    fn sheet_names_are_sanitized_and_unique() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet1");
        let existing = vec!["Data".to_string(), "Data__2".to_string()];
        assert_eq!(derive_unique_sheet_name("Data", &existing), "Data__3");
        assert_eq!(derive_unique_sheet_name("Other", &existing), "Other");
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(n in 1u32..=100_000) {
            let c_label = encode_column_label(n).expect("label");
            prop_assert_eq!(decode_column_label(&c_label).expect("index"), n);
        }

        #[test]
        fn encode_canonicalizes_decoded_labels(c_label in "[A-Za-z]{1,4}") {
            let n_col = decode_column_label(&c_label).expect("index");
            prop_assert_eq!(encode_column_label(n_col).expect("label"), c_label.to_uppercase());
        }
    }
}
