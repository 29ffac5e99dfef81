use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Durations written like `30s`, `15m`, `1d` or `1h15m30s`. A trailing bare
/// number counts as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut saw_number = false;

        for c in s.trim().chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let num: u64 = current_number
                .parse()
                .map_err(|_| format!("Unit '{}' must follow a number", c))?;
            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86400,
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total_seconds = num
                .checked_mul(unit)
                .and_then(|secs| total_seconds.checked_add(secs))
                .ok_or_else(|| format!("Duration '{}' is too large", s))?;
            current_number.clear();
            saw_number = true;
        }

        if !current_number.is_empty() {
            let num: u64 = current_number
                .parse()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(num)
                .ok_or_else(|| format!("Duration '{}' is too large", s))?;
            saw_number = true;
        }

        if !saw_number {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be longer than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0.as_secs();
        if rest == 0 {
            return f.write_str("0s");
        }
        for (unit, size) in [("d", 86400), ("h", 3600), ("m", 60), ("s", 1)] {
            if rest >= size {
                write!(f, "{}{}", rest / size, unit)?;
                rest %= size;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: &str) -> u64 {
        s.parse::<HumanDuration>().unwrap().0.as_secs()
    }

    #[test]
    fn test_single_units() {
        assert_eq!(secs("30s"), 30);
        assert_eq!(secs("15m"), 900);
        assert_eq!(secs("2h"), 7200);
        assert_eq!(secs("1d"), 86400);
    }

    #[test]
    fn test_compound_and_bare() {
        assert_eq!(secs("1h15m30s"), 4530);
        assert_eq!(secs("1h 30m"), 5400);
        assert_eq!(secs("45"), 45);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!("".parse::<HumanDuration>().is_err());
        assert!("h".parse::<HumanDuration>().is_err());
        assert!("5w".parse::<HumanDuration>().is_err());
        assert!("0s".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999d".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(HumanDuration(Duration::from_secs(4530)).to_string(), "1h15m30s");
        assert_eq!(HumanDuration(Duration::from_secs(86400)).to_string(), "1d");
    }
}
