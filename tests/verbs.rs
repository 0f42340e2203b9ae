//! End-to-end checks: parse text, run verbs, render.

use tabula_core::storage::{parse_lines, render};
use tabula_core::{Table, TableOptions};

fn table(rows: &[&[&str]]) -> Table {
    Table::from_rows(rows.iter().map(|r| r.iter().copied()), TableOptions::default())
}

fn run(input: &str, command: &str) -> String {
    let mut t = parse_lines(input, 2, TableOptions::default()).unwrap();
    t.run(command.split_whitespace());
    let mut out = String::new();
    for diagnostic in t.take_diagnostics() {
        out.push_str(&format!("{diagnostic}\n"));
    }
    out.push_str(&render(&t));
    out
}

#[test]
fn test_sort_then_uniq() {
    let mut t = table(&[&["pear", "2"], &["apple", "1"], &["pear", "2"], &["apple", "1"]]);
    t.run(["sort", "uniq"]);
    assert_eq!(t.data(), &[vec!["apple", "1"], vec!["pear", "2"]]);
}

#[test]
fn test_arr_identity() {
    let rows: &[&[&str]] = &[&["1", "x", "2020-01-01"], &["2", "y", "2021-06-30"]];
    let mut t = table(rows);
    t.apply("arr", "abc");
    assert_eq!(t.data(), table(rows).data());
}

#[test]
fn test_pivot_round_trip() {
    let rows: &[&[&str]] = &[&["Name", "x", "y"], &["p", "1", "2.5"], &["q", "3", "4"]];
    let mut t = table(rows);
    t.run(["pivot", "long", "pivot", "wide"]);
    assert_eq!(t.data(), table(rows).data());
}

#[test]
fn test_rainfall_filter() {
    let mut t = table(&[
        &["Year", "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct"],
        &["2019", "1", "2", "3", "4", "5", "6", "7", "8", "12.5", "1"],
        &["2020", "1", "2", "3", "4", "5", "6", "7", "8", "9", "1"],
        &["2021", "1", "2", "3", "4", "5", "6", "7", "8", "40", "1"],
    ]);
    t.run("filter j > 10".split_whitespace());
    let years: Vec<&str> = t.data().iter().map(|r| r[0].as_str()).collect();
    assert_eq!(years, vec!["Year", "2019", "2021"]);
}

#[test]
fn test_formula_column_precision() {
    let mut t = table(&[&["135"]]);
    t.apply("arr", "a(sqrt(a))");
    assert_eq!(t.data(), &[vec!["135", "11.6189500386"]]);
}

#[test]
fn test_sort_mixed_labels_naturally() {
    let mut t = table(&[&["A10"], &["A2"], &["A1"]]);
    t.apply("sort", "");
    assert_eq!(t.data(), &[vec!["A1"], vec!["A2"], vec!["A10"]]);
}

#[test]
fn test_text_pipeline() {
    let input = "\
Item   Qty  Price
-----------------
apple    3   0.5
pear     2   1.25
";
    let out = run(input, "arr ab(b*c) add");
    assert_eq!(
        out,
        "\
Item   Qty  Qty*Price
---------------------
apple    3        1.5
pear     2       2.50
---------------------
Total    5       4.00
"
    );
}

#[test]
fn test_diagnostics_precede_table() {
    let out = run("a  1\n", "uniq % arr (a+");
    assert_eq!(out, "? %\n?! syntax (a+)\na  1\n");
}

const RAIN: &str = "\
Monday      Week  Mon  Tue  Wed  Thu  Fri   Sat   Sun  Total
------------------------------------------------------------
2019-12-30     1  0.0  0.2  0.0  0.0  1.2   0.0   0.0    1.4
2020-01-06     2  0.5  0.0  0.0  6.4  0.0   0.1   1.7    8.7
2020-01-13     3  5.3  1.7  9.1  3.0  1.7   0.0   0.0   20.8
2020-01-20     4  0.0  0.0  0.0  0.0  0.0   0.1   2.3    2.4
2020-01-27     5  8.4  2.1  0.0  0.5  1.0   0.0   7.1   19.1
2020-02-03     6  0.1  0.0  0.0  0.0  0.0   1.5  10.6   12.2
2020-02-10     7  5.5  0.0  0.5  6.6  0.0   4.9  15.6   33.1
2020-02-17     8  0.2  3.3  1.0  3.8  0.0   0.5   1.0    9.8
2020-02-24     9  6.1  0.5  0.1  8.6  5.9   7.1   0.2   28.5
2020-03-02    10  0.0  0.0  4.3  0.0  3.0  12.4   0.0   19.7
";

fn rain() -> Table {
    parse_lines(RAIN, 2, TableOptions::default()).unwrap()
}

fn rule_rows(t: &Table) -> Vec<usize> {
    t.annotations().keys().copied().collect()
}

#[test]
fn test_rain_footers() {
    let mut t = rain();
    assert_eq!(render(&t), RAIN);

    t.run("rule add".split_whitespace());
    assert_eq!(
        t.data()[11],
        ["Total", "55", "26.1", "7.8", "15.0", "28.9", "12.8", "26.6", "38.5", "155.7"]
    );
    assert_eq!(rule_rows(&t), vec![1, 11]);

    t.run("pop add mean".split_whitespace());
    assert_eq!(
        t.data()[11],
        ["Mean", "5.5", "2.61", "0.78", "1.5", "2.89", "1.28", "2.66", "3.85", "15.57"]
    );

    t.run("pop add median".split_whitespace());
    assert_eq!(
        t.data()[11],
        ["Median", "5.5", "0.35", "0.1", "0.05", "1.75", "0.5", "0.3", "1.35", "15.65"]
    );

    t.run("pop add summary dp 001".split_whitespace());
    assert_eq!(
        &t.data()[11..],
        &[
            ["Min", "1", "0.0", "0.0", "0.0", "0.0", "0.0", "0.0", "0.0", "1.4"],
            ["Median", "5", "0.2", "0.0", "0.0", "0.5", "0.0", "0.1", "1.0", "12.2"],
            ["Mean", "5", "2.2", "0.6", "1.2", "2.4", "1.1", "2.2", "3.3", "14.1"],
            ["Max", "10", "8.4", "3.3", "9.1", "8.6", "5.9", "12.4", "15.6", "33.1"],
        ]
    );
    assert_eq!(rule_rows(&t), vec![1, 11]);
}

#[test]
fn test_rain_unknown_reduction() {
    let out = run(RAIN, "add gmean");
    assert_eq!(out, format!("? gmean\n{RAIN}"));
}

#[test]
fn test_rain_pop_and_push() {
    let mut t = rain();
    t.run("pop push pop 0 push 0".split_whitespace());
    assert_eq!(render(&t), RAIN);

    t.run("rule add mean pop sort @z push".split_whitespace());
    let totals: Vec<&str> = t.data().iter().map(|r| r[9].as_str()).collect();
    assert_eq!(
        totals,
        vec![
            "Total", "1.4", "2.4", "8.7", "9.8", "12.2", "19.1", "19.7", "20.8", "28.5", "33.1",
            "15.57"
        ]
    );
    assert_eq!(rule_rows(&t), vec![1, 11]);

    let sorted = t.data().to_vec();
    t.run("roll pop 0 push pop 94".split_whitespace());
    assert_eq!(t.data(), sorted.as_slice());
    assert_eq!(rule_rows(&t), vec![1, 11]);
    assert!(t.diagnostics().is_empty());
}

#[test]
fn test_levels_print_above_table() {
    let input = "\
Place  Region   Rate
Lima   America     9
Quito  America    12
Rome   Europe     10
";
    let out = run(input, "levels ABc");
    assert_eq!(
        out,
        format!(
            "# Place: All distinct.\n# Region: America 2, Europe 1\n# c: All distinct.\n{input}"
        )
    );
}

#[test]
fn test_nospace_after_pivot() {
    let input = "\
Exposure category     Lung cancer  No lung cancer
-------------------------------------------------
Asbestos exposure               6              51
No asbestos exposure           52             941
";
    let mut t = parse_lines(input, 2, TableOptions::default()).unwrap();
    t.run(["nospace", "."]);
    assert_eq!(t.data()[0], ["Exposure.category", "Lung.cancer", "No.lung.cancer"]);
    t.run(["pivot", "long", "nospace"]);
    assert_eq!(t.data()[0], ["Exposure.category", "Name", "Value"]);
    assert_eq!(t.data()[2], ["Asbestos.exposure", "No.lung.cancer", "51"]);
}
