use crate::model::{CatColumn, CatMarks, Student, Table, CAT_TOTAL_CAP, EXAM_MAX};

/// Half-up rounding used for every mark conversion:
/// `floor(x + 0.5)`
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn clamp_mark(x: f64, max: i64) -> i64 {
    let max = max.max(0);
    if x.is_nan() {
        return 0;
    }
    round_half_up(x).clamp(0.0, max as f64) as i64
}

/// Reads the longest numeric prefix of `s` (after leading whitespace), the way a
/// lenient form field would: `"12abc"` is 12, `"abc"` is nothing.
pub fn parse_leading_number(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut j = end + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        mantissa_digits += j - (end + 1);
        if mantissa_digits > 0 {
            end = j;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut j = end + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }
    t[..end].parse::<f64>().ok()
}

/// Converts free-form mark input into an integer in `[0, max]`.
///
/// Accepted forms:
/// - `"n/d"`: the fraction scaled to `max`
/// - `"p%"`: `p` percent of `max`
/// - a plain number
///
/// Anything unparseable (including a zero denominator) is 0. Never fails.
pub fn normalize_mark(input: &str, max: i64) -> i64 {
    let t = input.trim();
    if t.is_empty() {
        return 0;
    }

    if let Some((num, den)) = t.split_once('/') {
        let (Some(n), Some(d)) = (parse_leading_number(num), parse_leading_number(den)) else {
            return 0;
        };
        if d == 0.0 {
            return 0;
        }
        return clamp_mark((n / d) * max as f64, max);
    }

    if t.contains('%') {
        return match parse_leading_number(t) {
            Some(p) => clamp_mark((p / 100.0) * max as f64, max),
            None => 0,
        };
    }

    match parse_leading_number(t) {
        Some(v) => clamp_mark(v, max),
        None => 0,
    }
}

/// Re-derives `cat_total` and `total` for one student.
///
/// Marks are rebuilt in column order and re-clamped to each column's current max
/// (a lowered max score pulls existing marks down). Marks for unknown columns are
/// dropped and columns the student has no entry for get an explicit 0.
pub fn recompute_totals(columns: &[CatColumn], student: &mut Student) {
    let marks: CatMarks = columns
        .iter()
        .map(|col| {
            let mark = student.cat_marks.get(&col.id).clamp(0, col.max_score.max(0));
            (col.id.clone(), mark)
        })
        .collect();
    // Column maxima are unbounded, so the raw sum can exceed i64.
    let sum = marks.iter().fold(0_i64, |acc, (_, v)| acc.saturating_add(v));

    student.cat_marks = marks;
    student.exam = student.exam.clamp(0, EXAM_MAX);
    student.cat_total = sum.min(CAT_TOTAL_CAP);
    student.total = student.cat_total + student.exam;
}

/// Assigns competition-style positions by `total`, highest first.
///
/// Equal totals share the position of the first student in their run, and the
/// run consumes its slots: 70, 70, 70, 60 ranks as 1, 1, 1, 4. Positions are
/// written back by index so students sharing a name never collide.
pub fn rank_table(table: &mut Table) {
    let students = &mut table.students;
    if students.is_empty() {
        return;
    }

    let mut order: Vec<usize> = (0..students.len()).collect();
    // `sort_by` is stable: ties keep roster order.
    order.sort_by(|&a, &b| students[b].total.cmp(&students[a].total));

    let mut run_total: Option<i64> = None;
    let mut run_position = 0_i64;
    for (rank_idx, &student_idx) in order.iter().enumerate() {
        let total = students[student_idx].total;
        if run_total != Some(total) {
            run_total = Some(total);
            run_position = rank_idx as i64 + 1;
        }
        students[student_idx].position = run_position;
    }
}

/// Totals for every student, then positions.
pub fn recalculate_table(table: &mut Table) {
    let columns = table.cat_columns.clone();
    for student in &mut table.students {
        recompute_totals(&columns, student);
    }
    rank_table(table);
}
