use serde::{Deserialize, Serialize};

/// Frame of a stage element, `{x, y, w, h}` as four i16 on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub w: i16,
    pub h: i16,
}

impl Rect {
    pub const SIZE: usize = 8;

    pub fn new(x: i16, y: i16, w: i16, h: i16) -> Self {
        Self { x, y, w, h }
    }
}

/// 8-bit ARGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color(pub u8);

impl Color {
    pub const CLEAR: Color = Color(0x00);
    pub const BLACK: Color = Color(0xc0);
    pub const WHITE: Color = Color(0xff);
}

/// The three windows the companion can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowKind {
    Window = 0,
    Menu = 1,
    Card = 2,
}

impl WindowKind {
    /// Out of range kinds select the last known kind.
    pub fn clamped(raw: u8) -> Self {
        match raw {
            0 => WindowKind::Window,
            1 => WindowKind::Menu,
            _ => WindowKind::Card,
        }
    }
}

/// Vibration patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VibeKind {
    Short,
    Long,
    Double,
}

impl VibeKind {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(VibeKind::Short),
            1 => Some(VibeKind::Long),
            2 => Some(VibeKind::Double),
            _ => None,
        }
    }
}

/// Physical buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonId {
    Back = 0,
    Up = 1,
    Select = 2,
    Down = 3,
}

impl ButtonId {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ButtonId::Back),
            1 => Some(ButtonId::Up),
            2 => Some(ButtonId::Select),
            3 => Some(ButtonId::Down),
            _ => None,
        }
    }
}

/// Accelerometer axes reported by tap events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccelAxis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// Kinds of stage elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Rect = 1,
    Circle = 2,
    Text = 3,
    Image = 4,
    Inverter = 5,
}

impl ElementKind {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(ElementKind::Rect),
            2 => Some(ElementKind::Circle),
            3 => Some(ElementKind::Text),
            4 => Some(ElementKind::Image),
            5 => Some(ElementKind::Inverter),
            _ => None,
        }
    }
}

/// Section and row of a menu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MenuIndex {
    pub section: u16,
    pub row: u16,
}

impl MenuIndex {
    pub fn new(section: u16, row: u16) -> Self {
        Self { section, row }
    }
}

/// One accelerometer reading
///
/// Serialized as a 16 byte record: `x, y, z: i16`, `did_vibrate: u8`, one
/// pad byte, `timestamp_ms: u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub did_vibrate: bool,
    pub timestamp_ms: u64,
}

impl AccelSample {
    pub const SIZE: usize = 16;

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
        out.extend_from_slice(&self.z.to_le_bytes());
        out.push(u8::from(self.did_vibrate));
        out.push(0);
        out.extend_from_slice(&self.timestamp_ms.to_le_bytes());
    }

    pub fn read_from(bytes: &[u8]) -> Option<Self> {
        let record: &[u8; Self::SIZE] = bytes.get(..Self::SIZE)?.try_into().ok()?;
        let i16_at = |i: usize| i16::from_le_bytes([record[i], record[i + 1]]);
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&record[8..16]);
        Some(Self {
            x: i16_at(0),
            y: i16_at(2),
            z: i16_at(4),
            did_vibrate: record[6] != 0,
            timestamp_ms: u64::from_le_bytes(ts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_kind_clamps_to_card() {
        assert_eq!(WindowKind::clamped(0), WindowKind::Window);
        assert_eq!(WindowKind::clamped(1), WindowKind::Menu);
        assert_eq!(WindowKind::clamped(2), WindowKind::Card);
        assert_eq!(WindowKind::clamped(200), WindowKind::Card);
    }

    #[test]
    fn accel_sample_record_layout() {
        let sample = AccelSample {
            x: -1,
            y: 2,
            z: 1000,
            did_vibrate: true,
            timestamp_ms: 0x0102_0304_0506_0708,
        };
        let mut out = Vec::new();
        sample.write_to(&mut out);
        assert_eq!(out.len(), AccelSample::SIZE);
        assert_eq!(&out[..8], &[0xff, 0xff, 2, 0, 0xe8, 0x03, 1, 0]);
        assert_eq!(AccelSample::read_from(&out), Some(sample));
        assert_eq!(AccelSample::read_from(&out[..15]), None);
    }
}
