//! Duration display helpers shared by loop settings and the activity
//! builder: `90 -> "1m 30s"`, `60 -> "1m"`, `45 -> "45s"`.

use anyhow::{anyhow, Result};

pub fn minutes_to_seconds(minutes: u32) -> u64 {
    u64::from(minutes) * 60
}

pub fn format_duration(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    match (minutes, seconds) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

/// Inverse of [`format_duration`]. Accepts `Xm Ys`, `Xm`, or `Ys`.
pub fn parse_formatted_duration(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("empty duration string"));
    }

    let mut minutes: Option<u64> = None;
    let mut seconds: Option<u64> = None;

    for part in trimmed.split_whitespace() {
        if let Some(digits) = part.strip_suffix('m') {
            if minutes.is_some() {
                return Err(anyhow!("duplicate minutes component in '{input}'"));
            }
            minutes = Some(parse_component(digits, input)?);
        } else if let Some(digits) = part.strip_suffix('s') {
            if seconds.is_some() {
                return Err(anyhow!("duplicate seconds component in '{input}'"));
            }
            seconds = Some(parse_component(digits, input)?);
        } else {
            return Err(anyhow!("unrecognized duration component '{part}'"));
        }
    }

    Ok(minutes.unwrap_or(0) * 60 + seconds.unwrap_or(0))
}

fn parse_component(digits: &str, input: &str) -> Result<u64> {
    digits
        .parse::<u64>()
        .map_err(|_| anyhow!("invalid number in duration '{input}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_the_three_shapes() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(60), "1m");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3600), "60m");
    }

    #[test]
    fn parse_inverts_format() {
        for seconds in [0u64, 1, 59, 60, 61, 90, 600, 3599, 3600, 86_461] {
            let rendered = format_duration(seconds);
            assert_eq!(
                parse_formatted_duration(&rendered).unwrap(),
                seconds,
                "round trip failed for {rendered}"
            );
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_formatted_duration("").is_err());
        assert!(parse_formatted_duration("five minutes").is_err());
        assert!(parse_formatted_duration("1m 2m").is_err());
        assert!(parse_formatted_duration("1h").is_err());
    }

    #[test]
    fn minutes_convert_at_session_granularity() {
        assert_eq!(minutes_to_seconds(0), 0);
        assert_eq!(minutes_to_seconds(25), 1500);
    }
}
