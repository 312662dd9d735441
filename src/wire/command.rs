//! Packed inbound commands
//!
//! Every command is a 4 byte header `{command:u16, length:u16}` followed by a
//! fixed run of scalar fields and, for some commands, a trailing byte region.
//! Decoding borrows from the received buffer; text and pixel regions are never
//! copied.

use crate::exceptions::WireError;
use crate::wire::consts::{CommandId, HEADER_SIZE};
use crate::wire::cursor::{Reader, Writer};
use crate::wire::types::{Color, MenuIndex, Rect};

/// Bytes per image pixel
pub const PIXEL_SIZE: usize = 4;

/// Header shared by every packed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub command: u16,
    /// Byte length of the payload after the header. Informational only.
    pub length: u16,
}

impl Header {
    pub fn read(buf: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::new(0, buf);
        let command = r.u16()?;
        let length = r.u16()?;
        Ok(Self { command, length })
    }
}

/// Typed view over one decoded command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    WindowShow {
        kind: u8,
        pushing: bool,
    },
    WindowHide {
        id: u32,
    },
    WindowProps {
        id: u32,
        background: Color,
        fullscreen: bool,
        scrollable: bool,
    },
    WindowButtonConfig {
        button_mask: u8,
    },
    WindowActionBar {
        images: [u32; 3],
        background: Color,
        visible: bool,
    },
    Click {
        button: u8,
    },
    LongClick {
        button: u8,
    },
    Image {
        id: u32,
        width: i16,
        height: i16,
        pixels: &'a [u8],
    },
    CardClear {
        flags: u8,
    },
    CardText {
        index: u8,
        text: &'a str,
    },
    CardImage {
        image: u32,
        index: u8,
    },
    CardStyle {
        style: u8,
    },
    Vibe {
        kind: u8,
    },
    AccelPeek,
    AccelConfig {
        num_samples: u16,
        rate: u8,
        subscribed: bool,
    },
    MenuClear,
    MenuClearSection {
        section: u16,
    },
    MenuProps {
        num_sections: u16,
    },
    MenuSection {
        section: u16,
        num_items: u16,
        title: Option<&'a str>,
    },
    MenuItem {
        section: u16,
        item: u16,
        icon: u32,
        title: Option<&'a str>,
        subtitle: Option<&'a str>,
    },
    MenuGetSelection,
    MenuSetSelection {
        index: MenuIndex,
        align: u8,
        animated: bool,
    },
    StageClear,
    ElementInsert {
        id: u32,
        kind: u8,
        index: u16,
    },
    ElementRemove {
        id: u32,
    },
    ElementCommon {
        id: u32,
        frame: Rect,
        background: Color,
        border: Color,
    },
    ElementRadius {
        id: u32,
        radius: u16,
    },
    ElementText {
        id: u32,
        time_units: u8,
        text: &'a str,
    },
    ElementTextStyle {
        id: u32,
        color: Color,
        overflow: u8,
        alignment: u8,
        custom_font: u32,
        system_font: &'a str,
    },
    ElementImage {
        id: u32,
        image: u32,
        compositing: u8,
    },
    ElementAnimate {
        id: u32,
        frame: Rect,
        duration_ms: u32,
        curve: u8,
    },
}

impl<'a> Command<'a> {
    /// Decode one packed command.
    ///
    /// Returns `Ok(None)` for command ids this build does not know. Fixed
    /// fields and declared trailing regions must fit in `buf`, otherwise the
    /// whole message is rejected.
    pub fn decode(buf: &'a [u8]) -> Result<Option<Self>, WireError> {
        let header = Header::read(buf)?;
        let Some(id) = CommandId::from_u16(header.command) else {
            return Ok(None);
        };
        let mut r = Reader::new(header.command, &buf[HEADER_SIZE..]);
        let command = match id {
            CommandId::WindowShow => Command::WindowShow {
                kind: r.u8()?,
                pushing: r.bool()?,
            },
            CommandId::WindowHide => Command::WindowHide { id: r.u32()? },
            CommandId::WindowProps => Command::WindowProps {
                id: r.u32()?,
                background: Color(r.u8()?),
                fullscreen: r.bool()?,
                scrollable: r.bool()?,
            },
            CommandId::WindowButtonConfig => Command::WindowButtonConfig {
                button_mask: r.u8()?,
            },
            CommandId::WindowActionBar => Command::WindowActionBar {
                images: [r.u32()?, r.u32()?, r.u32()?],
                background: Color(r.u8()?),
                visible: r.bool()?,
            },
            CommandId::Click => Command::Click { button: r.u8()? },
            CommandId::LongClick => Command::LongClick { button: r.u8()? },
            CommandId::Image => {
                let id = r.u32()?;
                let width = r.i16()?;
                let height = r.i16()?;
                if width < 0 || height < 0 {
                    return Err(WireError::InvalidDimensions { width, height });
                }
                // One u32 per pixel, row major
                let len = usize::from(width.unsigned_abs())
                    * usize::from(height.unsigned_abs())
                    * PIXEL_SIZE;
                Command::Image {
                    id,
                    width,
                    height,
                    pixels: r.bytes(len)?,
                }
            }
            CommandId::CardClear => Command::CardClear { flags: r.u8()? },
            CommandId::CardText => Command::CardText {
                index: r.u8()?,
                text: r.cstring()?,
            },
            CommandId::CardImage => Command::CardImage {
                image: r.u32()?,
                index: r.u8()?,
            },
            CommandId::CardStyle => Command::CardStyle { style: r.u8()? },
            CommandId::Vibe => Command::Vibe { kind: r.u8()? },
            CommandId::AccelPeek => Command::AccelPeek,
            CommandId::AccelConfig => Command::AccelConfig {
                num_samples: r.u16()?,
                rate: r.u8()?,
                subscribed: r.bool()?,
            },
            CommandId::MenuClear => Command::MenuClear,
            CommandId::MenuClearSection => Command::MenuClearSection { section: r.u16()? },
            CommandId::MenuProps => Command::MenuProps {
                num_sections: r.u16()?,
            },
            CommandId::MenuSection => {
                let section = r.u16()?;
                let num_items = r.u16()?;
                let title_len = usize::from(r.u16()?);
                let title = if title_len > 0 {
                    Some(r.text_field(title_len)?)
                } else {
                    None
                };
                Command::MenuSection {
                    section,
                    num_items,
                    title,
                }
            }
            CommandId::MenuItem => {
                let section = r.u16()?;
                let item = r.u16()?;
                let icon = r.u32()?;
                let title_len = usize::from(r.u16()?);
                let subtitle_len = usize::from(r.u16()?);
                // Title and subtitle share one buffer; the subtitle starts one
                // separator byte after the declared title length.
                let title = if title_len > 0 {
                    Some(r.text_field(title_len)?)
                } else {
                    None
                };
                let subtitle = if subtitle_len > 0 {
                    r.skip(1)?;
                    Some(r.text_field(subtitle_len)?)
                } else {
                    None
                };
                Command::MenuItem {
                    section,
                    item,
                    icon,
                    title,
                    subtitle,
                }
            }
            CommandId::MenuGetSelection => Command::MenuGetSelection,
            CommandId::MenuSetSelection => Command::MenuSetSelection {
                index: MenuIndex::new(r.u16()?, r.u16()?),
                align: r.u8()?,
                animated: r.bool()?,
            },
            CommandId::StageClear => Command::StageClear,
            CommandId::ElementInsert => Command::ElementInsert {
                id: r.u32()?,
                kind: r.u8()?,
                index: r.u16()?,
            },
            CommandId::ElementRemove => Command::ElementRemove { id: r.u32()? },
            CommandId::ElementCommon => Command::ElementCommon {
                id: r.u32()?,
                frame: r.rect()?,
                background: Color(r.u8()?),
                border: Color(r.u8()?),
            },
            CommandId::ElementRadius => Command::ElementRadius {
                id: r.u32()?,
                radius: r.u16()?,
            },
            CommandId::ElementText => Command::ElementText {
                id: r.u32()?,
                time_units: r.u8()?,
                text: r.cstring()?,
            },
            CommandId::ElementTextStyle => Command::ElementTextStyle {
                id: r.u32()?,
                color: Color(r.u8()?),
                overflow: r.u8()?,
                alignment: r.u8()?,
                custom_font: r.u32()?,
                system_font: r.cstring()?,
            },
            CommandId::ElementImage => Command::ElementImage {
                id: r.u32()?,
                image: r.u32()?,
                compositing: r.u8()?,
            },
            CommandId::ElementAnimate => Command::ElementAnimate {
                id: r.u32()?,
                frame: r.rect()?,
                duration_ms: r.u32()?,
                curve: r.u8()?,
            },
        };
        Ok(Some(command))
    }

    pub fn id(&self) -> CommandId {
        match self {
            Command::WindowShow { .. } => CommandId::WindowShow,
            Command::WindowHide { .. } => CommandId::WindowHide,
            Command::WindowProps { .. } => CommandId::WindowProps,
            Command::WindowButtonConfig { .. } => CommandId::WindowButtonConfig,
            Command::WindowActionBar { .. } => CommandId::WindowActionBar,
            Command::Click { .. } => CommandId::Click,
            Command::LongClick { .. } => CommandId::LongClick,
            Command::Image { .. } => CommandId::Image,
            Command::CardClear { .. } => CommandId::CardClear,
            Command::CardText { .. } => CommandId::CardText,
            Command::CardImage { .. } => CommandId::CardImage,
            Command::CardStyle { .. } => CommandId::CardStyle,
            Command::Vibe { .. } => CommandId::Vibe,
            Command::AccelPeek => CommandId::AccelPeek,
            Command::AccelConfig { .. } => CommandId::AccelConfig,
            Command::MenuClear => CommandId::MenuClear,
            Command::MenuClearSection { .. } => CommandId::MenuClearSection,
            Command::MenuProps { .. } => CommandId::MenuProps,
            Command::MenuSection { .. } => CommandId::MenuSection,
            Command::MenuItem { .. } => CommandId::MenuItem,
            Command::MenuGetSelection => CommandId::MenuGetSelection,
            Command::MenuSetSelection { .. } => CommandId::MenuSetSelection,
            Command::StageClear => CommandId::StageClear,
            Command::ElementInsert { .. } => CommandId::ElementInsert,
            Command::ElementRemove { .. } => CommandId::ElementRemove,
            Command::ElementCommon { .. } => CommandId::ElementCommon,
            Command::ElementRadius { .. } => CommandId::ElementRadius,
            Command::ElementText { .. } => CommandId::ElementText,
            Command::ElementTextStyle { .. } => CommandId::ElementTextStyle,
            Command::ElementImage { .. } => CommandId::ElementImage,
            Command::ElementAnimate { .. } => CommandId::ElementAnimate,
        }
    }

    /// Encode in the packed layout, header included.
    ///
    /// This is the companion's side of the contract; the embedded side uses
    /// it for click reports, which travel in the packed format. Payloads
    /// longer than the u16 length field are refused.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut w = Writer::with_capacity(32);
        match self {
            Command::WindowShow { kind, pushing } => {
                w.u8(*kind).bool(*pushing);
            }
            Command::WindowHide { id } | Command::ElementRemove { id } => {
                w.u32(*id);
            }
            Command::WindowProps {
                id,
                background,
                fullscreen,
                scrollable,
            } => {
                w.u32(*id).u8(background.0).bool(*fullscreen).bool(*scrollable);
            }
            Command::WindowButtonConfig { button_mask } => {
                w.u8(*button_mask);
            }
            Command::WindowActionBar {
                images,
                background,
                visible,
            } => {
                for image in images {
                    w.u32(*image);
                }
                w.u8(background.0).bool(*visible);
            }
            Command::Click { button } | Command::LongClick { button } => {
                w.u8(*button);
            }
            Command::Image {
                id,
                width,
                height,
                pixels,
            } => {
                w.u32(*id).i16(*width).i16(*height).bytes(pixels);
            }
            Command::CardClear { flags } => {
                w.u8(*flags);
            }
            Command::CardText { index, text } => {
                w.u8(*index).cstring(text);
            }
            Command::CardImage { image, index } => {
                w.u32(*image).u8(*index);
            }
            Command::CardStyle { style } => {
                w.u8(*style);
            }
            Command::Vibe { kind } => {
                w.u8(*kind);
            }
            Command::AccelPeek
            | Command::MenuClear
            | Command::MenuGetSelection
            | Command::StageClear => {}
            Command::AccelConfig {
                num_samples,
                rate,
                subscribed,
            } => {
                w.u16(*num_samples).u8(*rate).bool(*subscribed);
            }
            Command::MenuClearSection { section } => {
                w.u16(*section);
            }
            Command::MenuProps { num_sections } => {
                w.u16(*num_sections);
            }
            Command::MenuSection {
                section,
                num_items,
                title,
            } => {
                let title = clip(title.unwrap_or(""));
                w.u16(*section).u16(*num_items).u16(len16(title)).cstring(title);
            }
            Command::MenuItem {
                section,
                item,
                icon,
                title,
                subtitle,
            } => {
                let title = clip(title.unwrap_or(""));
                let subtitle = clip(subtitle.unwrap_or(""));
                w.u16(*section)
                    .u16(*item)
                    .u32(*icon)
                    .u16(len16(title))
                    .u16(len16(subtitle))
                    .cstring(title)
                    .cstring(subtitle);
            }
            Command::MenuSetSelection {
                index,
                align,
                animated,
            } => {
                w.u16(index.section).u16(index.row).u8(*align).bool(*animated);
            }
            Command::ElementInsert { id, kind, index } => {
                w.u32(*id).u8(*kind).u16(*index);
            }
            Command::ElementCommon {
                id,
                frame,
                background,
                border,
            } => {
                w.u32(*id).rect(*frame).u8(background.0).u8(border.0);
            }
            Command::ElementRadius { id, radius } => {
                w.u32(*id).u16(*radius);
            }
            Command::ElementText {
                id,
                time_units,
                text,
            } => {
                w.u32(*id).u8(*time_units).cstring(text);
            }
            Command::ElementTextStyle {
                id,
                color,
                overflow,
                alignment,
                custom_font,
                system_font,
            } => {
                w.u32(*id)
                    .u8(color.0)
                    .u8(*overflow)
                    .u8(*alignment)
                    .u32(*custom_font)
                    .cstring(system_font);
            }
            Command::ElementImage {
                id,
                image,
                compositing,
            } => {
                w.u32(*id).u32(*image).u8(*compositing);
            }
            Command::ElementAnimate {
                id,
                frame,
                duration_ms,
                curve,
            } => {
                w.u32(*id).rect(*frame).u32(*duration_ms).u8(*curve);
            }
        }
        frame_payload(self.id(), w.into_inner())
    }
}

/// Prefix a payload with its header.
pub fn frame_payload(id: CommandId, payload: Vec<u8>) -> Result<Vec<u8>, WireError> {
    let length = u16::try_from(payload.len()).map_err(|_| WireError::PayloadTooLarge {
        command: id.as_u16(),
        len: payload.len(),
    })?;
    let mut w = Writer::with_capacity(HEADER_SIZE + payload.len());
    w.u16(id.as_u16()).u16(length).bytes(&payload);
    Ok(w.into_inner())
}

fn clip(s: &str) -> &str {
    let mut end = s.len().min(usize::from(u16::MAX));
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn len16(s: &str) -> u16 {
    u16::try_from(s.len()).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(command: Command<'_>) {
        let bytes = command.encode().unwrap();
        let header = Header::read(&bytes).unwrap();
        assert_eq!(header.command, command.id().as_u16());
        assert_eq!(usize::from(header.length), bytes.len() - HEADER_SIZE);
        assert_eq!(Command::decode(&bytes).unwrap(), Some(command));
    }

    #[test]
    fn fixed_shapes_round_trip() {
        round_trip(Command::WindowShow {
            kind: 2,
            pushing: true,
        });
        round_trip(Command::WindowHide { id: u32::MAX });
        round_trip(Command::WindowProps {
            id: 7,
            background: Color::WHITE,
            fullscreen: true,
            scrollable: false,
        });
        round_trip(Command::WindowActionBar {
            images: [1, 2, 3],
            background: Color::BLACK,
            visible: true,
        });
        round_trip(Command::AccelConfig {
            num_samples: 25,
            rate: 100,
            subscribed: true,
        });
        round_trip(Command::MenuSetSelection {
            index: MenuIndex::new(u16::MAX, 0),
            align: 1,
            animated: false,
        });
        round_trip(Command::ElementCommon {
            id: 3,
            frame: Rect::new(-10, 20, i16::MAX, 0),
            background: Color(0x3c),
            border: Color::CLEAR,
        });
        round_trip(Command::ElementAnimate {
            id: 9,
            frame: Rect::new(0, 0, 144, 168),
            duration_ms: 400,
            curve: 3,
        });
        round_trip(Command::ElementTextStyle {
            id: 1,
            color: Color::BLACK,
            overflow: 1,
            alignment: 2,
            custom_font: 0,
            system_font: "RESOURCE_ID_GOTHIC_18",
        });
    }

    #[test]
    fn header_only_shapes_round_trip() {
        round_trip(Command::AccelPeek);
        round_trip(Command::MenuClear);
        round_trip(Command::MenuGetSelection);
        round_trip(Command::StageClear);
        assert_eq!(Command::StageClear.encode(), Ok(vec![23, 0, 0, 0]));
    }

    #[test]
    fn trailing_regions_round_trip() {
        round_trip(Command::CardText {
            index: 1,
            text: "",
        });
        round_trip(Command::ElementText {
            id: 4,
            time_units: 0,
            text: "12:45",
        });
        round_trip(Command::MenuSection {
            section: 0,
            num_items: 3,
            title: Some("Favourites"),
        });
        round_trip(Command::MenuSection {
            section: 1,
            num_items: 0,
            title: None,
        });
        round_trip(Command::MenuItem {
            section: 2,
            item: 5,
            icon: 11,
            title: None,
            subtitle: Some("only subtitle"),
        });
        round_trip(Command::Image {
            id: 1,
            width: 2,
            height: 1,
            pixels: &[0xff, 0x00, 0xff, 0x00, 0x00, 0xff, 0x00, 0xff],
        });
        round_trip(Command::Image {
            id: 2,
            width: 0,
            height: 40,
            pixels: &[],
        });
    }

    #[test]
    fn menu_item_splits_shared_buffer() {
        let mut w = Writer::default();
        w.u16(20).u16(0);
        w.u16(0).u16(0).u32(0).u16(5).u16(3).bytes(b"Hello\0Bye");
        let bytes = w.into_inner();
        let decoded = Command::decode(&bytes).unwrap();
        assert_eq!(
            decoded,
            Some(Command::MenuItem {
                section: 0,
                item: 0,
                icon: 0,
                title: Some("Hello"),
                subtitle: Some("Bye"),
            })
        );
    }

    #[test]
    fn declared_lengths_beyond_buffer_are_rejected() {
        let mut w = Writer::default();
        w.u16(20).u16(u16::MAX);
        w.u16(0).u16(0).u32(0).u16(u16::MAX).u16(3).bytes(b"Hello\0Bye");
        assert!(matches!(
            Command::decode(&w.into_inner()),
            Err(WireError::Truncated { command: 20, .. })
        ));

        let mut w = Writer::default();
        w.u16(20).u16(0);
        w.u16(0).u16(0).u32(0).u16(5).u16(4).bytes(b"Hello\0Bye");
        assert!(Command::decode(&w.into_inner()).is_err());
    }

    #[test]
    fn short_fixed_part_is_rejected() {
        assert!(matches!(
            Command::decode(&[3, 0, 7, 0, 1, 2, 3, 4, 5]),
            Err(WireError::Truncated { command: 3, .. })
        ));
        assert!(Command::decode(&[1, 0]).is_err());
    }

    #[test]
    fn unknown_command_is_not_an_error() {
        assert_eq!(Command::decode(&[0xe8, 0x03, 0, 0]), Ok(None));
        assert_eq!(Command::decode(&[0, 0, 0, 0]), Ok(None));
    }

    #[test]
    fn negative_image_dimensions_are_rejected() {
        let bytes = Command::Image {
            id: 1,
            width: -1,
            height: 4,
            pixels: &[],
        }
        .encode()
        .unwrap();
        assert_eq!(
            Command::decode(&bytes),
            Err(WireError::InvalidDimensions {
                width: -1,
                height: 4
            })
        );
    }

    #[test]
    fn image_pixels_must_fill_declared_dimensions() {
        let short = [8, 0, 12, 0, 1, 0, 0, 0, 100, 0, 100, 0, 1, 2, 3, 4];
        assert_eq!(
            Command::decode(&short),
            Err(WireError::Truncated {
                command: 8,
                needed: 8 + 100 * 100 * PIXEL_SIZE,
                available: 12,
            })
        );

        let mut w = Writer::default();
        w.u16(8).u16(0).u32(3).i16(1).i16(1).bytes(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(
            Command::decode(&w.into_inner()),
            Ok(Some(Command::Image {
                id: 3,
                width: 1,
                height: 1,
                pixels: &[1, 2, 3, 4],
            }))
        );
    }

    #[test]
    fn oversize_payload_is_not_framed() {
        let pixels = vec![0u8; 128 * 128 * PIXEL_SIZE];
        let image = Command::Image {
            id: 1,
            width: 128,
            height: 128,
            pixels: &pixels,
        };
        assert_eq!(
            image.encode(),
            Err(WireError::PayloadTooLarge {
                command: 8,
                len: 8 + pixels.len(),
            })
        );
    }
}
