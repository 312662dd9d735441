//! Collaborators the command handlers drive
//!
//! Rendering, resource storage, sensors and the vibration motor live outside
//! the messaging core. Handlers reach them only through these traits.

use serde::{Deserialize, Serialize};

use crate::wire::types::{AccelSample, Color, ElementKind, MenuIndex, Rect, VibeKind, WindowKind};

/// Headless implementation of every collaborator
pub mod memory;

/// Number of text fields on the card
pub const CARD_TEXT_FIELDS: usize = 3;
/// Number of image slots on the card
pub const CARD_IMAGE_FIELDS: usize = 3;
/// Number of action bar icon slots
pub const ACTION_BAR_SLOTS: usize = 3;

/// Text fields of the card window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardField {
    Title = 0,
    Subtitle = 1,
    Body = 2,
}

impl CardField {
    /// Out of range indexes select the last field.
    pub fn clamped(index: u8) -> Self {
        match index {
            0 => CardField::Title,
            1 => CardField::Subtitle,
            _ => CardField::Body,
        }
    }
}

/// Action bar attached to a window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBar {
    pub icons: [u32; ACTION_BAR_SLOTS],
    pub background: Color,
    pub visible: bool,
}

/// Properties of one app window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    pub kind: WindowKind,
    pub id: u32,
    pub background: Color,
    pub fullscreen: bool,
    pub scrollable: bool,
    pub button_mask: u8,
    pub action_bar: ActionBar,
}

impl WindowState {
    pub fn new(kind: WindowKind) -> Self {
        Self {
            kind,
            id: 0,
            background: Color::WHITE,
            fullscreen: false,
            scrollable: false,
            button_mask: 0,
            action_bar: ActionBar::default(),
        }
    }
}

/// Font reference held by text elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Font {
    Custom(u32),
    System(String),
}

/// One positioned visual object on the stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: u32,
    pub kind: ElementKind,
    pub frame: Rect,
    pub background: Color,
    pub border: Color,
    pub radius: u16,
    pub text: String,
    pub time_units: u8,
    pub text_color: Color,
    pub overflow: u8,
    pub alignment: u8,
    pub font: Option<Font>,
    pub image: u32,
    pub compositing: u8,
}

impl Element {
    pub fn new(id: u32, kind: ElementKind) -> Self {
        Self {
            id,
            kind,
            frame: Rect::default(),
            background: Color::WHITE,
            border: Color::CLEAR,
            radius: 0,
            text: String::new(),
            time_units: 0,
            text_color: Color::BLACK,
            overflow: 0,
            alignment: 0,
            font: None,
            image: 0,
            compositing: 0,
        }
    }
}

/// Timing of an element animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animation {
    pub duration_ms: u32,
    pub curve: u8,
}

/// Header of one menu section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSection {
    pub section: u16,
    pub num_items: u16,
    pub title: Option<String>,
}

/// One menu row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub section: u16,
    pub item: u16,
    pub icon: u32,
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

/// The stack of visible windows
pub trait WindowStack {
    /// Show the window of `kind`, pushing it or replacing the top.
    fn show(&mut self, kind: WindowKind, pushing: bool);

    /// Top app window; `None` when the stack is empty or shows the splash.
    fn top_mut(&mut self) -> Option<&mut WindowState>;

    /// Pop the top window if its id is `id`.
    fn pop(&mut self, id: u32);

    /// Request a redraw of the top window.
    fn schedule_render(&mut self);
}

/// The single-screen card window
pub trait Card {
    /// Clear the parts selected by `flags`, every bit set clears everything.
    fn clear(&mut self, flags: u8);
    fn set_text(&mut self, field: CardField, text: &str);
    fn set_image(&mut self, slot: usize, image: u32);
    fn set_style(&mut self, style: u8);
}

/// Image and font storage
pub trait Resources {
    fn add_image(&mut self, id: u32, width: i16, height: i16, pixels: &[u8]);
    fn font(&mut self, id: u32) -> Option<Font>;
    fn system_font(&mut self, name: &str) -> Option<Font>;
}

/// The remotely filled menu
pub trait Menu {
    fn clear(&mut self);
    fn clear_section(&mut self, section: u16);
    fn set_num_sections(&mut self, num_sections: u16);
    fn add_section(&mut self, section: MenuSection);
    fn add_item(&mut self, item: MenuItem);
    fn selection(&self) -> MenuIndex;
    fn set_selection(&mut self, index: MenuIndex, align: u8, animated: bool);
}

/// The stage of positioned elements
pub trait Stage {
    fn clear(&mut self);

    /// Insert the element with `id` at `index`, creating it with `kind`
    /// when it does not exist yet.
    fn insert(&mut self, index: u16, id: u32, kind: ElementKind);

    fn remove(&mut self, id: u32);

    fn element_mut(&mut self, id: u32) -> Option<&mut Element>;

    fn set_frame(&mut self, id: u32, frame: Rect) {
        if let Some(element) = self.element_mut(id) {
            element.frame = frame;
        }
    }

    /// Re-layout after element changes.
    fn update(&mut self);

    /// Re-arm the clock ticker after time units changed.
    fn update_ticker(&mut self);

    fn animate(&mut self, id: u32, animation: Animation, to: Rect);
}

/// Accelerometer sensor
pub trait Accelerometer {
    fn peek(&mut self) -> AccelSample;
    fn configure(&mut self, num_samples: u16, rate: u8);
    fn set_data_subscribed(&mut self, subscribed: bool);
}

/// Vibration motor
pub trait Vibes {
    fn pulse(&mut self, kind: VibeKind);
}

/// Everything a command handler may touch
pub trait Host {
    fn windows(&mut self) -> &mut dyn WindowStack;
    fn card(&mut self) -> &mut dyn Card;
    fn resources(&mut self) -> &mut dyn Resources;
    fn menu(&mut self) -> &mut dyn Menu;
    fn stage(&mut self) -> &mut dyn Stage;
    fn accel(&mut self) -> &mut dyn Accelerometer;
    fn vibes(&mut self) -> &mut dyn Vibes;
}
