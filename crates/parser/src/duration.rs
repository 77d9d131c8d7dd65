//! Parses the `PT[<H>H][<M>M][<S[.fraction]>S]` subset of ISO-8601
//! durations used by `Duration`/`RecordingOffsetStart` (spec.md §4.3).
//! Components are optional and may be fractional; the result is whole
//! seconds, truncating any fraction.

pub fn parse_iso8601_duration_secs(s: &str) -> Option<i64> {
    let rest = s.strip_prefix("PT")?;
    if rest.is_empty() {
        return None;
    }

    let mut total = 0i64;
    let mut rest = rest;
    let mut seen_any = false;

    for unit in ['H', 'M', 'S'] {
        if let Some(idx) = rest.find(unit) {
            let (num_str, tail) = rest.split_at(idx);
            let value: f64 = num_str.parse().ok()?;
            let multiplier = match unit {
                'H' => 3600,
                'M' => 60,
                'S' => 1,
                _ => unreachable!(),
            };
            total += (value * multiplier as f64) as i64;
            rest = &tail[1..];
            seen_any = true;
        }
    }

    if !seen_any || !rest.is_empty() {
        return None;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        hours_minutes_seconds = { "PT1H30M15S", Some(5415) },
        minutes_only          = { "PT45M", Some(2700) },
        seconds_only          = { "PT30S", Some(30) },
        fractional_seconds    = { "PT1.5S", Some(1) },
        hours_and_seconds     = { "PT2H10S", Some(7210) },
        zero                  = { "PT0S", Some(0) },
        missing_prefix        = { "1H30M", None },
        empty_after_prefix    = { "PT", None },
        garbage_suffix        = { "PT5Sxyz", None },
    )]
    fn parses_subset(input: &str, expected: Option<i64>) {
        assert_eq!(parse_iso8601_duration_secs(input), expected);
    }
}
