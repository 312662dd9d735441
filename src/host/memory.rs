use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::host::{
    Accelerometer, Animation, CARD_IMAGE_FIELDS, CARD_TEXT_FIELDS, Card, CardField, Element,
    Font, Host, Menu, MenuItem, MenuSection, Resources, Stage, Vibes, WindowStack, WindowState,
};
use crate::wire::types::{AccelSample, ElementKind, MenuIndex, Rect, VibeKind, WindowKind};

/// Card clear flag for the text fields
pub const CLEAR_TEXT: u8 = 1 << 0;
/// Card clear flag for the image slots
pub const CLEAR_IMAGES: u8 = 1 << 1;
/// Card clear flag for the style
pub const CLEAR_STYLE: u8 = 1 << 2;

/// Window stack kept as a plain vector, top last
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryWindows {
    pub stack: Vec<WindowState>,
    /// The splash screen is on top of the stack
    pub splash: bool,
    pub pops: u32,
    pub renders: u32,
}

impl WindowStack for MemoryWindows {
    fn show(&mut self, kind: WindowKind, pushing: bool) {
        self.splash = false;
        if !pushing {
            self.stack.pop();
        }
        self.stack.push(WindowState::new(kind));
    }

    fn top_mut(&mut self) -> Option<&mut WindowState> {
        if self.splash {
            return None;
        }
        self.stack.last_mut()
    }

    fn pop(&mut self, id: u32) {
        if self.splash {
            return;
        }
        if self.stack.last().is_some_and(|top| top.id == id) {
            self.stack.pop();
            self.pops += 1;
        }
    }

    fn schedule_render(&mut self) {
        self.renders += 1;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCard {
    pub text: [String; CARD_TEXT_FIELDS],
    pub images: [u32; CARD_IMAGE_FIELDS],
    pub style: u8,
}

impl MemoryCard {
    pub fn text(&self, field: CardField) -> &str {
        &self.text[field as usize]
    }
}

impl Card for MemoryCard {
    fn clear(&mut self, flags: u8) {
        if flags & CLEAR_TEXT != 0 {
            self.text = Default::default();
        }
        if flags & CLEAR_IMAGES != 0 {
            self.images = [0; CARD_IMAGE_FIELDS];
        }
        if flags & CLEAR_STYLE != 0 {
            self.style = 0;
        }
    }

    fn set_text(&mut self, field: CardField, text: &str) {
        self.text[field as usize] = text.to_owned();
    }

    fn set_image(&mut self, slot: usize, image: u32) {
        let slot = slot.min(CARD_IMAGE_FIELDS - 1);
        self.images[slot] = image;
    }

    fn set_style(&mut self, style: u8) {
        self.style = style;
    }
}

/// Stored bitmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    pub width: i16,
    pub height: i16,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryResources {
    pub images: HashMap<u32, Bitmap>,
    /// Custom fonts that resolve, by resource id
    pub fonts: Vec<u32>,
}

impl Resources for MemoryResources {
    fn add_image(&mut self, id: u32, width: i16, height: i16, pixels: &[u8]) {
        self.images.insert(
            id,
            Bitmap {
                width,
                height,
                pixels: pixels.to_vec(),
            },
        );
    }

    fn font(&mut self, id: u32) -> Option<Font> {
        self.fonts.contains(&id).then_some(Font::Custom(id))
    }

    fn system_font(&mut self, name: &str) -> Option<Font> {
        (!name.is_empty()).then(|| Font::System(name.to_owned()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryMenu {
    pub num_sections: u16,
    pub sections: Vec<MenuSection>,
    pub items: Vec<MenuItem>,
    pub selection: MenuIndex,
    pub clears: u32,
}

impl Menu for MemoryMenu {
    fn clear(&mut self) {
        self.num_sections = 0;
        self.sections.clear();
        self.items.clear();
        self.clears += 1;
    }

    fn clear_section(&mut self, section: u16) {
        self.sections.retain(|s| s.section != section);
        self.items.retain(|i| i.section != section);
    }

    fn set_num_sections(&mut self, num_sections: u16) {
        self.num_sections = num_sections;
    }

    fn add_section(&mut self, section: MenuSection) {
        self.sections.retain(|s| s.section != section.section);
        self.sections.push(section);
    }

    fn add_item(&mut self, item: MenuItem) {
        self.items
            .retain(|i| !(i.section == item.section && i.item == item.item));
        self.items.push(item);
    }

    fn selection(&self) -> MenuIndex {
        self.selection
    }

    fn set_selection(&mut self, index: MenuIndex, _align: u8, _animated: bool) {
        self.selection = index;
    }
}

/// Running element animation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryAnimation {
    pub id: u32,
    pub animation: Animation,
    pub to: Rect,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStage {
    /// Elements in draw order
    pub elements: Vec<Element>,
    pub animations: Vec<MemoryAnimation>,
    pub updates: u32,
    pub ticker_updates: u32,
}

impl MemoryStage {
    pub fn element(&self, id: u32) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }
}

impl Stage for MemoryStage {
    fn clear(&mut self) {
        self.elements.clear();
        self.animations.clear();
    }

    fn insert(&mut self, index: u16, id: u32, kind: ElementKind) {
        let element = match self.elements.iter().position(|e| e.id == id) {
            Some(at) => self.elements.remove(at),
            None => Element::new(id, kind),
        };
        let at = usize::from(index).min(self.elements.len());
        self.elements.insert(at, element);
    }

    fn remove(&mut self, id: u32) {
        self.elements.retain(|e| e.id != id);
        self.animations.retain(|a| a.id != id);
    }

    fn element_mut(&mut self, id: u32) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    fn update(&mut self) {
        self.updates += 1;
    }

    fn update_ticker(&mut self) {
        self.ticker_updates += 1;
    }

    fn animate(&mut self, id: u32, animation: Animation, to: Rect) {
        self.animations.push(MemoryAnimation { id, animation, to });
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryAccel {
    /// Sample returned by the next peek
    pub sample: AccelSample,
    pub num_samples: u16,
    pub rate: u8,
    pub subscribed: bool,
    pub peeks: u32,
}

impl Accelerometer for MemoryAccel {
    fn peek(&mut self) -> AccelSample {
        self.peeks += 1;
        self.sample
    }

    fn configure(&mut self, num_samples: u16, rate: u8) {
        self.num_samples = num_samples;
        self.rate = rate;
    }

    fn set_data_subscribed(&mut self, subscribed: bool) {
        self.subscribed = subscribed;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryVibes {
    pub pulses: Vec<VibeKind>,
}

impl Vibes for MemoryVibes {
    fn pulse(&mut self, kind: VibeKind) {
        self.pulses.push(kind);
    }
}

/// Host that keeps the whole UI model in memory
///
/// Every collaborator records what it was asked to do, which makes the
/// model inspectable without a display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryHost {
    pub windows: MemoryWindows,
    pub card: MemoryCard,
    pub resources: MemoryResources,
    pub menu: MemoryMenu,
    pub stage: MemoryStage,
    pub accel: MemoryAccel,
    pub vibes: MemoryVibes,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose window stack starts on the splash screen
    pub fn with_splash() -> Self {
        let mut host = Self::default();
        host.windows.splash = true;
        host
    }
}

impl Host for MemoryHost {
    fn windows(&mut self) -> &mut dyn WindowStack {
        &mut self.windows
    }

    fn card(&mut self) -> &mut dyn Card {
        &mut self.card
    }

    fn resources(&mut self) -> &mut dyn Resources {
        &mut self.resources
    }

    fn menu(&mut self) -> &mut dyn Menu {
        &mut self.menu
    }

    fn stage(&mut self) -> &mut dyn Stage {
        &mut self.stage
    }

    fn accel(&mut self) -> &mut dyn Accelerometer {
        &mut self.accel
    }

    fn vibes(&mut self) -> &mut dyn Vibes {
        &mut self.vibes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_requires_matching_top() {
        let mut windows = MemoryWindows::default();
        windows.show(WindowKind::Card, true);
        windows.top_mut().unwrap().id = 9;
        windows.pop(7);
        assert_eq!(windows.pops, 0);
        windows.pop(9);
        assert_eq!(windows.pops, 1);
        assert!(windows.stack.is_empty());
    }

    #[test]
    fn splash_hides_top_window() {
        let mut host = MemoryHost::with_splash();
        assert!(host.windows.top_mut().is_none());
        host.windows.show(WindowKind::Menu, false);
        assert_eq!(host.windows.top_mut().unwrap().kind, WindowKind::Menu);
    }

    #[test]
    fn insert_moves_existing_element() {
        let mut stage = MemoryStage::default();
        stage.insert(0, 1, ElementKind::Rect);
        stage.insert(1, 2, ElementKind::Text);
        stage.element_mut(1).unwrap().radius = 4;
        stage.insert(5, 1, ElementKind::Circle);
        let ids: Vec<u32> = stage.elements.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(stage.element(1).unwrap().kind, ElementKind::Rect);
        assert_eq!(stage.element(1).unwrap().radius, 4);
    }

    #[test]
    fn card_clear_honours_flags() {
        let mut card = MemoryCard::default();
        card.set_text(CardField::Title, "t");
        card.set_image(7, 3);
        card.clear(CLEAR_IMAGES);
        assert_eq!(card.text(CardField::Title), "t");
        assert_eq!(card.images, [0; CARD_IMAGE_FIELDS]);
        card.clear(u8::MAX);
        assert_eq!(card.text(CardField::Title), "");
    }
}
