//! Parsing for the global-hotkey setting, e.g. `"win+shift+z"`.
//!
//! Registration against the OS lives in the Win32 layer; this module only
//! turns the settings string into modifier flags and a virtual-key code.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HotkeyModifiers {
    pub win: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

/// A parsed hotkey: modifier set plus a virtual-key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeySpec {
    pub modifiers: HotkeyModifiers,
    pub key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyParseError {
    #[error("hotkey is empty")]
    Empty,
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// Parses `"mod+mod+key"`. Modifiers are `win`, `shift`, `ctrl`, `alt`
/// (with common aliases); the final token is the key: a letter, a digit
/// or `f1`..`f12`. Case and surrounding whitespace are ignored.
pub fn parse(spec: &str) -> Result<HotkeySpec, HotkeyParseError> {
    let tokens: Vec<String> = spec
        .split('+')
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let Some((key_token, modifier_tokens)) = tokens.split_last() else {
        return Err(HotkeyParseError::Empty);
    };

    let mut modifiers = HotkeyModifiers::default();
    for token in modifier_tokens {
        match token.as_str() {
            "win" | "windows" | "super" => modifiers.win = true,
            "shift" => modifiers.shift = true,
            "ctrl" | "control" => modifiers.ctrl = true,
            "alt" => modifiers.alt = true,
            other => return Err(HotkeyParseError::UnknownModifier(other.to_string())),
        }
    }

    let key = parse_key(key_token)?;
    Ok(HotkeySpec { modifiers, key })
}

fn parse_key(token: &str) -> Result<u32, HotkeyParseError> {
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        // Letter and digit virtual-key codes match their uppercase ASCII.
        if c.is_ascii_alphanumeric() {
            return Ok(c.to_ascii_uppercase() as u32);
        }
    }
    if let Some(number) = token.strip_prefix('f') {
        if let Ok(n @ 1..=12) = number.parse::<u32>() {
            return Ok(0x70 + (n - 1)); // VK_F1..VK_F12
        }
    }
    Err(HotkeyParseError::UnknownKey(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_spec() {
        let spec = parse("win+shift+z").unwrap();
        assert!(spec.modifiers.win);
        assert!(spec.modifiers.shift);
        assert!(!spec.modifiers.ctrl);
        assert!(!spec.modifiers.alt);
        assert_eq!(spec.key, 'Z' as u32);
    }

    #[test]
    fn parsing_ignores_case_and_spacing() {
        assert_eq!(parse(" Win + Shift + Z "), parse("win+shift+z"));
        assert_eq!(parse("CTRL+ALT+F4"), parse("ctrl+alt+f4"));
    }

    #[test]
    fn parses_digits_and_function_keys() {
        assert_eq!(parse("ctrl+1").unwrap().key, '1' as u32);
        assert_eq!(parse("alt+f1").unwrap().key, 0x70);
        assert_eq!(parse("alt+f12").unwrap().key, 0x7B);
    }

    #[test]
    fn accepts_modifier_aliases() {
        assert!(parse("super+z").unwrap().modifiers.win);
        assert!(parse("control+z").unwrap().modifiers.ctrl);
    }

    #[test]
    fn rejects_empty_spec() {
        assert_eq!(parse(""), Err(HotkeyParseError::Empty));
        assert_eq!(parse(" + "), Err(HotkeyParseError::Empty));
    }

    #[test]
    fn rejects_unknown_modifier() {
        assert_eq!(
            parse("hyper+z"),
            Err(HotkeyParseError::UnknownModifier("hyper".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_key() {
        assert_eq!(
            parse("win+f13"),
            Err(HotkeyParseError::UnknownKey("f13".to_string()))
        );
        assert_eq!(
            parse("win+escape"),
            Err(HotkeyParseError::UnknownKey("escape".to_string()))
        );
    }

    #[test]
    fn bare_key_has_no_modifiers() {
        let spec = parse("f9").unwrap();
        assert_eq!(spec.modifiers, HotkeyModifiers::default());
        assert_eq!(spec.key, 0x78);
    }
}
