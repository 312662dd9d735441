//! Outbound actions in the key/value layout
//!
//! Key 0 always carries the action id as a u8. Encoders do not check that the
//! referenced windows, menu rows or elements exist.

use crate::exceptions::{LinkError, QueueError, WireError};
use crate::wire::command::Command;
use crate::wire::consts::{ActionId, KEY_PAYLOAD};
use crate::wire::dict::DictWriter;
use crate::wire::types::{AccelAxis, AccelSample, ButtonId, MenuIndex};

/// Most samples one accel data message can announce in its u8 count
pub const MAX_ACCEL_SAMPLES: usize = u8::MAX as usize;

/// Events and reports sent to the companion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    WindowShow { id: u32 },
    WindowHide { id: u32 },
    AccelTap { axis: AccelAxis, direction: i8 },
    AccelData {
        transaction_id: Option<i32>,
        samples: &'a [AccelSample],
    },
    MenuGetSection { section: u16 },
    MenuGetItem { index: MenuIndex },
    MenuSelect { index: MenuIndex },
    MenuLongSelect { index: MenuIndex },
    MenuSelection { index: MenuIndex },
    StageAnimateDone { index: u16 },
}

impl Action<'_> {
    pub fn id(&self) -> ActionId {
        match self {
            Action::WindowShow { .. } => ActionId::WindowShow,
            Action::WindowHide { .. } => ActionId::WindowHide,
            Action::AccelTap { .. } => ActionId::AccelTap,
            Action::AccelData { .. } => ActionId::AccelData,
            Action::MenuGetSection { .. } => ActionId::GetMenuSection,
            Action::MenuGetItem { .. } => ActionId::GetMenuItem,
            Action::MenuSelect { .. } => ActionId::MenuSelect,
            Action::MenuLongSelect { .. } => ActionId::MenuLongSelect,
            Action::MenuSelection { .. } => ActionId::MenuSelection,
            Action::StageAnimateDone { .. } => ActionId::StageAnimateDone,
        }
    }

    /// Encode into a freshly reserved dictionary buffer.
    pub fn encode(&self) -> Result<Vec<u8>, LinkError> {
        let action = self.id().as_u8();
        let dict = match *self {
            Action::WindowShow { id } | Action::WindowHide { id } => {
                let mut w = DictWriter::for_values(&[1, 4])?;
                w.u8(KEY_PAYLOAD, action)?.u32(1, id)?;
                w
            }
            Action::AccelTap { axis, direction } => {
                let mut w = DictWriter::for_values(&[1, 1, 1])?;
                w.u8(KEY_PAYLOAD, action)?
                    .u8(1, axis as u8)?
                    .i8(2, direction)?;
                w
            }
            Action::AccelData {
                transaction_id,
                samples,
            } => {
                if samples.len() > MAX_ACCEL_SAMPLES {
                    return Err(WireError::TooManySamples {
                        count: samples.len(),
                        max: MAX_ACCEL_SAMPLES,
                    }
                    .into());
                }
                let mut records = Vec::new();
                records
                    .try_reserve_exact(samples.len() * AccelSample::SIZE)
                    .map_err(|_| QueueError::Allocation)?;
                for sample in samples {
                    sample.write_to(&mut records);
                }
                // A negative transaction id means "not part of a request".
                let transaction_id = transaction_id.filter(|t| *t >= 0);
                let mut sizes = vec![1, 1, records.len()];
                if transaction_id.is_some() {
                    sizes.push(4);
                }
                let mut w = DictWriter::for_values(&sizes)?;
                w.u8(KEY_PAYLOAD, action)?;
                if let Some(t) = transaction_id {
                    w.i32(1, t)?;
                }
                w.u8(2, samples.len() as u8)?.bytes(3, &records)?;
                w
            }
            Action::MenuGetSection { section } => menu_dict(action, MenuIndex::new(section, 0))?,
            Action::MenuGetItem { index }
            | Action::MenuSelect { index }
            | Action::MenuLongSelect { index }
            | Action::MenuSelection { index } => menu_dict(action, index)?,
            Action::StageAnimateDone { index } => {
                let mut w = DictWriter::for_values(&[1, 2])?;
                w.u8(KEY_PAYLOAD, action)?.u16(1, index)?;
                w
            }
        };
        Ok(dict.finish())
    }
}

fn menu_dict(action: u8, index: MenuIndex) -> Result<DictWriter, LinkError> {
    let mut w = DictWriter::for_values(&[1, 2, 2])?;
    w.u8(KEY_PAYLOAD, action)?
        .u16(1, index.section)?
        .u16(2, index.row)?;
    Ok(w)
}

/// Packed click report: command 6 or 7 with the button id.
pub fn click_packet(button: ButtonId, long: bool) -> Result<Vec<u8>, WireError> {
    let button = button as u8;
    let command = if long {
        Command::LongClick { button }
    } else {
        Command::Click { button }
    };
    command.encode()
}
