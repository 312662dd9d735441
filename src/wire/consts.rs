//! Identifiers shared by both ends of the link
//!
//! Values are part of the wire contract and must never be renumbered.

/// Size of the packed header `{command:u16, length:u16}`
pub const HEADER_SIZE: usize = 4;

/// Dictionary key that carries the command buffer or the action id
pub const KEY_PAYLOAD: u32 = 0;

/// Inbound command kinds, packed-struct encoded
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    WindowShow = 1,
    WindowHide,
    WindowProps,
    WindowButtonConfig,
    WindowActionBar,
    Click,
    LongClick,
    Image,
    CardClear,
    CardText,
    CardImage,
    CardStyle,
    Vibe,
    AccelPeek,
    AccelConfig,
    MenuClear,
    MenuClearSection,
    MenuProps,
    MenuSection,
    MenuItem,
    MenuGetSelection,
    MenuSetSelection,
    StageClear,
    ElementInsert,
    ElementRemove,
    ElementCommon,
    ElementRadius,
    ElementText,
    ElementTextStyle,
    ElementImage,
    ElementAnimate,
}

impl CommandId {
    const ALL: [CommandId; 31] = [
        CommandId::WindowShow,
        CommandId::WindowHide,
        CommandId::WindowProps,
        CommandId::WindowButtonConfig,
        CommandId::WindowActionBar,
        CommandId::Click,
        CommandId::LongClick,
        CommandId::Image,
        CommandId::CardClear,
        CommandId::CardText,
        CommandId::CardImage,
        CommandId::CardStyle,
        CommandId::Vibe,
        CommandId::AccelPeek,
        CommandId::AccelConfig,
        CommandId::MenuClear,
        CommandId::MenuClearSection,
        CommandId::MenuProps,
        CommandId::MenuSection,
        CommandId::MenuItem,
        CommandId::MenuGetSelection,
        CommandId::MenuSetSelection,
        CommandId::StageClear,
        CommandId::ElementInsert,
        CommandId::ElementRemove,
        CommandId::ElementCommon,
        CommandId::ElementRadius,
        CommandId::ElementText,
        CommandId::ElementTextStyle,
        CommandId::ElementImage,
        CommandId::ElementAnimate,
    ];

    /// Map a raw id to a known command, `None` for ids this build does not know.
    pub fn from_u16(value: u16) -> Option<Self> {
        let index = usize::from(value).checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Outbound action kinds, key/value encoded with the id under key 0
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    SetWindow = 0,
    WindowShow,
    WindowHide,
    SetUi,
    Click,
    LongClick,
    AccelTap,
    Vibe,
    AccelData,
    GetAccelData,
    ConfigAccelData,
    ConfigButtons,
    SetMenu,
    SetMenuSection,
    GetMenuSection,
    SetMenuItem,
    GetMenuItem,
    MenuSelect,
    MenuLongSelect,
    MenuSelection,
    Image,
    SetStage,
    StageElement,
    StageRemove,
    StageAnimate,
    StageAnimateDone,
}

impl ActionId {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Tuple value types of the key/value dictionary
pub const TUPLE_BYTES: u8 = 0;
pub const TUPLE_CSTRING: u8 = 1;
pub const TUPLE_UINT: u8 = 2;
pub const TUPLE_INT: u8 = 3;

/// Per-entry overhead of the dictionary: key u32, type u8, length u16
pub const TUPLE_HEADER_SIZE: usize = 7;

/// Dictionary preamble: entry count u8
pub const DICT_HEADER_SIZE: usize = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_ids_are_contiguous_from_one() {
        assert_eq!(CommandId::from_u16(0), None);
        assert_eq!(CommandId::from_u16(1), Some(CommandId::WindowShow));
        assert_eq!(CommandId::from_u16(20), Some(CommandId::MenuItem));
        assert_eq!(CommandId::from_u16(31), Some(CommandId::ElementAnimate));
        assert_eq!(CommandId::from_u16(32), None);
        for (i, id) in CommandId::ALL.iter().enumerate() {
            assert_eq!(id.as_u16() as usize, i + 1);
        }
    }

    #[test]
    fn action_ids_match_wire_values() {
        assert_eq!(ActionId::WindowShow.as_u8(), 1);
        assert_eq!(ActionId::AccelData.as_u8(), 8);
        assert_eq!(ActionId::MenuSelection.as_u8(), 19);
        assert_eq!(ActionId::StageAnimateDone.as_u8(), 25);
    }
}
