//! Actuator wire format.
//!
//! A frame is `'$'` followed by every value zero-padded to exactly `digits`
//! characters, concatenated with no separator and no terminator:
//! `[20, 160]` at 3 digits is `$020160`.
//!
//! Negative values spend one of the `digits` characters on the sign and pad
//! the magnitude with the rest, so `-5` at 3 digits is `-05`. A value whose
//! text is wider than `digits` is rejected.

use std::fmt;

use crate::error::MalformedValue;

pub const FRAME_MARKER: char = '$';

/// One encoded command packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandFrame {
    values: Vec<i32>,
    text: String,
}

impl CommandFrame {
    pub fn encode(values: &[i32], digits: usize) -> Result<Self, MalformedValue> {
        let mut text = String::with_capacity(1 + values.len() * digits);
        text.push(FRAME_MARKER);
        for &value in values {
            text.push_str(&pad_value(value, digits)?);
        }
        Ok(Self {
            values: values.to_vec(),
            text,
        })
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn pad_value(value: i32, digits: usize) -> Result<String, MalformedValue> {
    // sign-aware: `{:03}` renders -5 as "-05"
    let padded = format!("{:0width$}", value, width = digits);
    if padded.len() > digits {
        return Err(MalformedValue { value, digits });
    }
    Ok(padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_two_values() {
        let frame = CommandFrame::encode(&[20, 160], 3).unwrap();
        assert_eq!(frame.as_str(), "$020160");
        assert_eq!(frame.as_bytes(), b"$020160");
        assert_eq!(frame.values(), &[20, 160]);
    }

    #[test]
    fn frames_single_value() {
        assert_eq!(CommandFrame::encode(&[5], 2).unwrap().as_str(), "$05");
    }

    #[test]
    fn negative_values_reserve_a_digit_for_the_sign() {
        assert_eq!(CommandFrame::encode(&[-5, 7], 3).unwrap().as_str(), "$-05007");
        assert_eq!(
            CommandFrame::encode(&[-100, 100], 4).unwrap().as_str(),
            "$-1000100"
        );
    }

    #[test]
    fn rejects_values_wider_than_digits() {
        assert_eq!(
            CommandFrame::encode(&[90, 1000], 3),
            Err(MalformedValue {
                value: 1000,
                digits: 3
            })
        );
        assert_eq!(
            CommandFrame::encode(&[-100], 3),
            Err(MalformedValue {
                value: -100,
                digits: 3
            })
        );
    }
}
