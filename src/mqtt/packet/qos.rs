use core::fmt;
/**
 * MIT License
 *
 * Copyright (c) 2025 Takatoshi Kondo
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// MQTT Quality of Service level, as carried on the wire in a SUBSCRIBE's
/// requested-QoS byte.
///
/// This crate only honors QoS 0: every PUBLISH it writes goes out
/// fire-and-forget, with no PUBACK/PUBREC/PUBREL/PUBCOMP handshake and no
/// retry on a failed write (a short write just closes the session — see
/// [`crate::mqtt::error::TransportError`]). A SUBSCRIBE requesting QoS 1
/// or 2 is refused in the SUBACK (return code `0x80`) rather than granted
/// at a lower level. The three-level enum still exists because the wire
/// format itself carries all three values, and refusing the other two
/// needs somewhere to decode them from.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, TryFromPrimitive,
)]
#[repr(u8)]
pub enum Qos {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

/// Implementation of `Display` for `Qos`
///
/// Formats the QoS level as a human-readable string representation.
/// This allows QoS values to be used with `println!`, `format!`, and
/// other string formatting operations.
///
/// # Output Format
///
/// * `Qos::AtMostOnce` -> "AtMostOnce"
/// * `Qos::AtLeastOnce` -> "AtLeastOnce"
/// * `Qos::ExactlyOnce` -> "ExactlyOnce"
impl fmt::Display for Qos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AtMostOnce => "AtMostOnce",
            Self::AtLeastOnce => "AtLeastOnce",
            Self::ExactlyOnce => "ExactlyOnce",
        };
        write!(f, "{s}")
    }
}
