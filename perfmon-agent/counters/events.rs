// Event specifications as given on the command line

use std::fmt;
use std::str::FromStr;

use perfmon_raw::current_arch::events;
use perfmon_raw::EventCode;
use serde::{Deserialize, Serialize};

use crate::error::{PerfmonError, Result};

/// Convert an unvalidated number into an event code
pub fn event_code(raw: i64) -> Result<EventCode> {
    EventCode::try_from(raw).map_err(|_| PerfmonError::InvalidEventCode(raw.to_string()))
}

/// Parse an event given by name (`inst_retired`), hex (`0x08`) or decimal
pub fn parse_event(s: &str) -> Result<EventCode> {
    let s = s.trim();
    if let Some(code) = events::lookup(s) {
        return Ok(code);
    }

    let raw = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        s.parse::<i64>()
    }
    .map_err(|_| PerfmonError::InvalidEventCode(s.to_string()))?;

    event_code(raw)
}

/// Display name for an event code
pub fn event_name(code: EventCode) -> String {
    events::name_of(code)
        .map(str::to_lowercase)
        .unwrap_or_else(|| format!("event_{:02x}", code.value()))
}

/// One event to watch: `<name|code>[:wide]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpec {
    pub code: EventCode,
    pub wide: bool,
}

impl FromStr for EventSpec {
    type Err = PerfmonError;

    fn from_str(s: &str) -> Result<Self> {
        let (event, wide) = match s.trim().split_once(':') {
            Some((event, "wide")) | Some((event, "64")) => (event, true),
            Some((_, suffix)) => {
                return Err(PerfmonError::ConfigError(format!(
                    "Unknown event modifier '{suffix}' in '{s}' (expected 'wide')"
                )))
            }
            None => (s, false),
        };

        Ok(Self {
            code: parse_event(event)?,
            wide,
        })
    }
}

impl fmt::Display for EventSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", event_name(self.code))?;
        if self.wide {
            write!(f, ":wide")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfmon_raw::current_arch::events::{BR_PRED, INST_RETIRED};

    #[test]
    fn test_parse_event_forms() {
        assert_eq!(parse_event("inst_retired").unwrap(), INST_RETIRED);
        assert_eq!(parse_event("0x12").unwrap(), BR_PRED);
        assert_eq!(parse_event("18").unwrap(), BR_PRED);
        assert!(matches!(
            parse_event("-3"),
            Err(PerfmonError::InvalidEventCode(_))
        ));
        assert!(matches!(
            parse_event("bogus"),
            Err(PerfmonError::InvalidEventCode(_))
        ));
    }

    #[test]
    fn test_event_spec() {
        let spec: EventSpec = "br_pred:wide".parse().unwrap();
        assert_eq!(spec, EventSpec { code: BR_PRED, wide: true });
        assert_eq!(spec.to_string(), "br_pred:wide");

        let spec: EventSpec = "0x08".parse().unwrap();
        assert_eq!(spec, EventSpec { code: INST_RETIRED, wide: false });

        assert!(matches!(
            "inst_retired:huge".parse::<EventSpec>(),
            Err(PerfmonError::ConfigError(_))
        ));
    }

    #[test]
    fn test_event_name_falls_back_to_hex() {
        assert_eq!(event_name(INST_RETIRED), "inst_retired");
        assert_eq!(event_name(event_code(0x3F).unwrap()), "event_3f");
    }
}
