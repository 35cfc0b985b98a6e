//! Action tokens.
//!
//! Textual form is `name` or `name(param)`. Quotes around the parameter are
//! stripped; a parameter made only of ASCII digits is an integer, anything
//! else is a code.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use super::error::CodecError;

/// Parameter of a `name(param)` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenParam {
    Int(u64),
    Code(String),
}

impl fmt::Display for TokenParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenParam::Int(n) => write!(f, "{n}"),
            TokenParam::Code(code) => write!(f, "'{code}'"),
        }
    }
}

/// Split a token into its name and optional parameter.
///
/// Checks shape only; whether the name and parameter exist is decided by
/// [`ActionToken::from_parts`].
pub(super) fn split_token(token: &str) -> Result<(String, Option<TokenParam>), CodecError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(CodecError::Parse {
            token: token.to_string(),
        });
    }
    if !trimmed.contains('(') && !trimmed.contains(')') {
        return Ok((trimmed.to_string(), None));
    }

    let captures = call_pattern()
        .captures(trimmed)
        .ok_or_else(|| CodecError::Parse {
            token: token.to_string(),
        })?;
    let name = captures[1].to_string();
    let raw = captures[2].trim();
    if raw.is_empty() {
        return Ok((name, None));
    }

    let unquoted = raw.trim_matches(|c: char| c == '\'' || c == '"');
    let param = if !unquoted.is_empty() && unquoted.bytes().all(|b| b.is_ascii_digit()) {
        match unquoted.parse() {
            Ok(n) => TokenParam::Int(n),
            Err(_) => TokenParam::Code(unquoted.to_string()),
        }
    } else {
        TokenParam::Code(unquoted.to_string())
    };
    Ok((name, Some(param)))
}

fn call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // name ( param ), param non-greedy so trailing spaces stay outside
        Regex::new(r"^\s*(\w+)\s*\(\s*(.*?)\s*\)\s*$").expect("valid token regex")
    })
}

// =============================================================================
// Parameter tables
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiskAngle {
    Deg0,
    Deg90,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RailPosition {
    /// Middle
    M,
    A,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatAngle {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl DiskAngle {
    fn from_param(param: Option<&TokenParam>) -> Option<Self> {
        match param {
            Some(TokenParam::Int(0)) => Some(DiskAngle::Deg0),
            Some(TokenParam::Int(90)) => Some(DiskAngle::Deg90),
            _ => None,
        }
    }

    fn degrees(&self) -> u32 {
        match self {
            DiskAngle::Deg0 => 0,
            DiskAngle::Deg90 => 90,
        }
    }
}

impl RailPosition {
    fn from_param(param: Option<&TokenParam>) -> Option<Self> {
        match param {
            Some(TokenParam::Code(code)) => match code.as_str() {
                "M" => Some(RailPosition::M),
                "A" => Some(RailPosition::A),
                "C" => Some(RailPosition::C),
                _ => None,
            },
            _ => None,
        }
    }

    fn letter(&self) -> char {
        match self {
            RailPosition::M => 'M',
            RailPosition::A => 'A',
            RailPosition::C => 'C',
        }
    }
}

impl SeatAngle {
    fn from_param(param: Option<&TokenParam>) -> Option<Self> {
        match param {
            Some(TokenParam::Int(0)) => Some(SeatAngle::Deg0),
            Some(TokenParam::Int(90)) => Some(SeatAngle::Deg90),
            Some(TokenParam::Int(180)) => Some(SeatAngle::Deg180),
            Some(TokenParam::Int(270)) => Some(SeatAngle::Deg270),
            _ => None,
        }
    }

    fn degrees(&self) -> u32 {
        match self {
            SeatAngle::Deg0 => 0,
            SeatAngle::Deg90 => 90,
            SeatAngle::Deg180 => 180,
            SeatAngle::Deg270 => 270,
        }
    }
}

// =============================================================================
// ActionToken
// =============================================================================

/// One validated seat action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionToken {
    Unchanged,
    DiskRotate(DiskAngle),
    MoveOnRail(RailPosition),
    SeatRotate(SeatAngle),
    Unfold,
    Fold,
}

impl ActionToken {
    /// Four digit code of this action, as an integer.
    pub fn code(&self) -> u32 {
        match self {
            ActionToken::Unchanged | ActionToken::Unfold => 0,
            ActionToken::DiskRotate(DiskAngle::Deg0) => 0,
            ActionToken::DiskRotate(DiskAngle::Deg90) => 10,
            ActionToken::MoveOnRail(RailPosition::M) => 0,
            ActionToken::MoveOnRail(RailPosition::A) => 100,
            ActionToken::MoveOnRail(RailPosition::C) => 200,
            ActionToken::SeatRotate(SeatAngle::Deg0) => 0,
            ActionToken::SeatRotate(SeatAngle::Deg90) => 1000,
            ActionToken::SeatRotate(SeatAngle::Deg180) => 2000,
            ActionToken::SeatRotate(SeatAngle::Deg270) => 3000,
            ActionToken::Fold => 1,
        }
    }

    /// Build a token from a parsed name and parameter.
    pub fn from_parts(name: &str, param: Option<&TokenParam>) -> Result<Self, CodecError> {
        let rendered = match param {
            Some(param) => format!("{name}({param})"),
            None => name.to_string(),
        };
        let out_of_table = |expected: &str| CodecError::Validation {
            token: rendered.clone(),
            reason: format!("{name} expects {expected}"),
        };

        match name {
            "unchanged" => Ok(ActionToken::Unchanged),
            "unfold" => Ok(ActionToken::Unfold),
            "fold" => Ok(ActionToken::Fold),
            "disk_rotate" => DiskAngle::from_param(param)
                .map(ActionToken::DiskRotate)
                .ok_or_else(|| out_of_table("0 or 90")),
            "move_on_rail" => RailPosition::from_param(param)
                .map(ActionToken::MoveOnRail)
                .ok_or_else(|| out_of_table("'M', 'A' or 'C'")),
            "seat_rotate" => SeatAngle::from_param(param)
                .map(ActionToken::SeatRotate)
                .ok_or_else(|| out_of_table("0, 90, 180 or 270")),
            _ => Err(CodecError::Validation {
                token: rendered.clone(),
                reason: format!("unknown action '{name}'"),
            }),
        }
    }
}

impl FromStr for ActionToken {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, param) = split_token(s)?;
        Self::from_parts(&name, param.as_ref())
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionToken::Unchanged => f.write_str("unchanged"),
            ActionToken::Unfold => f.write_str("unfold"),
            ActionToken::Fold => f.write_str("fold"),
            ActionToken::DiskRotate(angle) => write!(f, "disk_rotate({})", angle.degrees()),
            ActionToken::MoveOnRail(pos) => write!(f, "move_on_rail('{}')", pos.letter()),
            ActionToken::SeatRotate(angle) => write!(f, "seat_rotate({})", angle.degrees()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_tokens() {
        assert_eq!("unchanged".parse(), Ok(ActionToken::Unchanged));
        assert_eq!("  fold ".parse(), Ok(ActionToken::Fold));
        assert_eq!("unfold()".parse(), Ok(ActionToken::Unfold));
    }

    #[test]
    fn test_parameterised_tokens() {
        assert_eq!(
            "disk_rotate(90)".parse(),
            Ok(ActionToken::DiskRotate(DiskAngle::Deg90))
        );
        assert_eq!(
            "move_on_rail('A')".parse(),
            Ok(ActionToken::MoveOnRail(RailPosition::A))
        );
        assert_eq!(
            "move_on_rail(\"C\")".parse(),
            Ok(ActionToken::MoveOnRail(RailPosition::C))
        );
        assert_eq!(
            "seat_rotate( 270 )".parse(),
            Ok(ActionToken::SeatRotate(SeatAngle::Deg270))
        );
        assert_eq!(
            "seat_rotate('180')".parse(),
            Ok(ActionToken::SeatRotate(SeatAngle::Deg180))
        );
    }

    #[test]
    fn test_malformed_tokens_are_parse_errors() {
        for bad in ["", "   ", "seat_rotate(90", "seat_rotate)90(", "seat rotate(90)", "fold(1)x"] {
            assert!(
                matches!(bad.parse::<ActionToken>(), Err(CodecError::Parse { .. })),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_out_of_table_is_validation_error() {
        for bad in [
            "disk_rotate(45)",
            "disk_rotate",
            "move_on_rail('B')",
            "move_on_rail(m)",
            "seat_rotate(360)",
            "seat_rotate('x')",
            "jump",
            "spin(90)",
        ] {
            assert!(
                matches!(bad.parse::<ActionToken>(), Err(CodecError::Validation { .. })),
                "{bad:?} should fail validation"
            );
        }
    }

    #[test]
    fn test_display_parses_back() {
        let tokens = [
            ActionToken::Unchanged,
            ActionToken::DiskRotate(DiskAngle::Deg0),
            ActionToken::MoveOnRail(RailPosition::A),
            ActionToken::SeatRotate(SeatAngle::Deg90),
            ActionToken::Unfold,
            ActionToken::Fold,
        ];
        for token in tokens {
            assert_eq!(token.to_string().parse(), Ok(token));
        }
    }

    #[test]
    fn test_codes() {
        assert_eq!(ActionToken::Fold.code(), 1);
        assert_eq!(ActionToken::DiskRotate(DiskAngle::Deg90).code(), 10);
        assert_eq!(ActionToken::MoveOnRail(RailPosition::C).code(), 200);
        assert_eq!(ActionToken::SeatRotate(SeatAngle::Deg270).code(), 3000);
        assert_eq!(ActionToken::Unfold.code(), 0);
    }
}
