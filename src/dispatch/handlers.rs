use tracing::debug;

use crate::dispatch::FollowUp;
use crate::host::{
    Animation, CARD_IMAGE_FIELDS, CardField, Font, Host, MenuItem, MenuSection, WindowState,
};
use crate::wire::command::Command;
use crate::wire::types::{ElementKind, VibeKind, WindowKind};

/// Run the handler for one decoded command.
pub fn handle(host: &mut dyn Host, command: &Command<'_>) -> Option<FollowUp> {
    match *command {
        Command::WindowShow { kind, pushing } => {
            host.windows().show(WindowKind::clamped(kind), pushing);
        }
        Command::WindowHide { id } => {
            let on_top = host.windows().top_mut().is_some_and(|top| top.id == id);
            if on_top {
                host.windows().pop(id);
            }
        }
        Command::WindowProps {
            id,
            background,
            fullscreen,
            scrollable,
        } => with_top_window(host, |window| {
            window.id = id;
            window.background = background;
            window.fullscreen = fullscreen;
            window.scrollable = scrollable;
        }),
        Command::WindowButtonConfig { button_mask } => {
            with_top_window(host, |window| window.button_mask = button_mask)
        }
        Command::WindowActionBar {
            images,
            background,
            visible,
        } => with_top_window(host, |window| {
            window.action_bar.icons = images;
            window.action_bar.background = background;
            window.action_bar.visible = visible;
        }),
        Command::Click { .. } | Command::LongClick { .. } => {
            debug!(command = ?command.id(), "Click reports are outbound only");
        }
        Command::Image {
            id,
            width,
            height,
            pixels,
        } => host.resources().add_image(id, width, height, pixels),
        Command::CardClear { flags } => host.card().clear(flags),
        Command::CardText { index, text } => host.card().set_text(CardField::clamped(index), text),
        Command::CardImage { image, index } => {
            let slot = usize::from(index).min(CARD_IMAGE_FIELDS - 1);
            host.card().set_image(slot, image);
        }
        Command::CardStyle { style } => host.card().set_style(style),
        Command::Vibe { kind } => match VibeKind::from_u8(kind) {
            Some(kind) => host.vibes().pulse(kind),
            None => debug!(kind, "Unknown vibe kind"),
        },
        Command::AccelPeek => return Some(FollowUp::StartAccelPoll),
        Command::AccelConfig {
            num_samples,
            rate,
            subscribed,
        } => {
            let accel = host.accel();
            accel.configure(num_samples, rate);
            accel.set_data_subscribed(subscribed);
        }
        Command::MenuClear => host.menu().clear(),
        Command::MenuClearSection { section } => host.menu().clear_section(section),
        Command::MenuProps { num_sections } => host.menu().set_num_sections(num_sections),
        Command::MenuSection {
            section,
            num_items,
            title,
        } => host.menu().add_section(MenuSection {
            section,
            num_items,
            title: title.map(str::to_owned),
        }),
        Command::MenuItem {
            section,
            item,
            icon,
            title,
            subtitle,
        } => host.menu().add_item(MenuItem {
            section,
            item,
            icon,
            title: title.map(str::to_owned),
            subtitle: subtitle.map(str::to_owned),
        }),
        Command::MenuGetSelection => {
            return Some(FollowUp::ReportMenuSelection(host.menu().selection()));
        }
        Command::MenuSetSelection {
            index,
            align,
            animated,
        } => host.menu().set_selection(index, align, animated),
        Command::StageClear => host.stage().clear(),
        Command::ElementInsert { id, kind, index } => {
            let Some(kind) = ElementKind::from_u8(kind) else {
                debug!(id, kind, "Unknown element kind");
                return None;
            };
            let stage = host.stage();
            stage.insert(index, id, kind);
            stage.update();
        }
        Command::ElementRemove { id } => {
            let stage = host.stage();
            if stage.element_mut(id).is_none() {
                return missing_element(id);
            }
            stage.remove(id);
            stage.update();
        }
        Command::ElementCommon {
            id,
            frame,
            background,
            border,
        } => {
            let stage = host.stage();
            let Some(element) = stage.element_mut(id) else {
                return missing_element(id);
            };
            element.background = background;
            element.border = border;
            stage.set_frame(id, frame);
            stage.update();
        }
        Command::ElementRadius { id, radius } => {
            let stage = host.stage();
            let Some(element) = stage.element_mut(id) else {
                return missing_element(id);
            };
            element.radius = radius;
            stage.update();
        }
        Command::ElementText {
            id,
            time_units,
            text,
        } => {
            let stage = host.stage();
            let Some(element) = stage.element_mut(id) else {
                return missing_element(id);
            };
            let ticker_changed = element.time_units != time_units;
            element.time_units = time_units;
            element.text = text.to_owned();
            if ticker_changed {
                stage.update_ticker();
            }
            stage.update();
        }
        Command::ElementTextStyle {
            id,
            color,
            overflow,
            alignment,
            custom_font,
            system_font,
        } => {
            let font = resolve_font(host, custom_font, system_font);
            let stage = host.stage();
            let Some(element) = stage.element_mut(id) else {
                return missing_element(id);
            };
            element.text_color = color;
            element.overflow = overflow;
            element.alignment = alignment;
            if font.is_some() {
                element.font = font;
            }
            stage.update();
        }
        Command::ElementImage {
            id,
            image,
            compositing,
        } => {
            let stage = host.stage();
            let Some(element) = stage.element_mut(id) else {
                return missing_element(id);
            };
            element.image = image;
            element.compositing = compositing;
            stage.update();
        }
        Command::ElementAnimate {
            id,
            frame,
            duration_ms,
            curve,
        } => {
            let stage = host.stage();
            if stage.element_mut(id).is_none() {
                return missing_element(id);
            }
            stage.animate(id, Animation { duration_ms, curve }, frame);
        }
    }
    None
}

fn with_top_window(host: &mut dyn Host, apply: impl FnOnce(&mut WindowState)) {
    let windows = host.windows();
    let Some(window) = windows.top_mut() else {
        debug!("No window on top");
        return;
    };
    apply(window);
    windows.schedule_render();
}

fn missing_element(id: u32) -> Option<FollowUp> {
    debug!(id, "No such element");
    None
}

fn resolve_font(host: &mut dyn Host, custom: u32, system: &str) -> Option<Font> {
    let resources = host.resources();
    if custom != 0 {
        resources.font(custom)
    } else if !system.is_empty() {
        resources.system_font(system)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Stage;
    use crate::host::memory::MemoryHost;
    use crate::wire::types::{Color, MenuIndex, Rect};

    fn host_with_text_element(id: u32) -> MemoryHost {
        let mut host = MemoryHost::new();
        handle(
            &mut host,
            &Command::ElementInsert {
                id,
                kind: ElementKind::Text as u8,
                index: 0,
            },
        );
        host
    }

    #[test]
    fn window_hide_pops_only_matching_top() {
        let mut host = MemoryHost::new();
        handle(&mut host, &Command::WindowShow { kind: 0, pushing: true });
        handle(
            &mut host,
            &Command::WindowProps {
                id: 9,
                background: Color::BLACK,
                fullscreen: false,
                scrollable: false,
            },
        );
        handle(&mut host, &Command::WindowHide { id: 7 });
        assert_eq!(host.windows.pops, 0);
        handle(&mut host, &Command::WindowHide { id: 9 });
        assert_eq!(host.windows.pops, 1);
    }

    #[test]
    fn window_commands_ignore_splash() {
        let mut host = MemoryHost::with_splash();
        handle(&mut host, &Command::WindowButtonConfig { button_mask: 0x0f });
        handle(&mut host, &Command::WindowHide { id: 0 });
        assert_eq!(host.windows.renders, 0);
        assert_eq!(host.windows.pops, 0);
    }

    #[test]
    fn unknown_element_id_is_a_no_op() {
        let mut host = host_with_text_element(1);
        let before = host.stage.clone();
        for command in [
            Command::ElementRemove { id: 2 },
            Command::ElementRadius { id: 2, radius: 3 },
            Command::ElementText {
                id: 2,
                time_units: 1,
                text: "x",
            },
            Command::ElementAnimate {
                id: 2,
                frame: Rect::new(0, 0, 1, 1),
                duration_ms: 10,
                curve: 0,
            },
        ] {
            assert_eq!(handle(&mut host, &command), None);
        }
        assert_eq!(host.stage.elements, before.elements);
        assert_eq!(host.stage.updates, before.updates);
        assert!(host.stage.animations.is_empty());
    }

    #[test]
    fn element_text_rearms_ticker_on_unit_change() {
        let mut host = host_with_text_element(4);
        let set = |time_units| Command::ElementText {
            id: 4,
            time_units,
            text: "12:00",
        };
        handle(&mut host, &set(2));
        handle(&mut host, &set(2));
        assert_eq!(host.stage.ticker_updates, 1);
        assert_eq!(host.stage.element(4).unwrap().text, "12:00");
    }

    #[test]
    fn text_style_prefers_custom_font() {
        let mut host = host_with_text_element(1);
        host.resources.fonts.push(42);
        handle(
            &mut host,
            &Command::ElementTextStyle {
                id: 1,
                color: Color::WHITE,
                overflow: 0,
                alignment: 1,
                custom_font: 42,
                system_font: "GOTHIC_18",
            },
        );
        assert_eq!(host.stage.element(1).unwrap().font, Some(Font::Custom(42)));

        handle(
            &mut host,
            &Command::ElementTextStyle {
                id: 1,
                color: Color::WHITE,
                overflow: 0,
                alignment: 1,
                custom_font: 0,
                system_font: "",
            },
        );
        assert_eq!(host.stage.element(1).unwrap().font, Some(Font::Custom(42)));
    }

    #[test]
    fn text_style_for_missing_element_is_ignored() {
        let mut host = host_with_text_element(1);
        host.resources.fonts.push(42);
        let updates = host.stage.updates;
        let follow_up = handle(
            &mut host,
            &Command::ElementTextStyle {
                id: 404,
                color: Color::BLACK,
                overflow: 0,
                alignment: 2,
                custom_font: 42,
                system_font: "",
            },
        );
        assert_eq!(follow_up, None);
        assert_eq!(host.stage.updates, updates);
        assert_eq!(host.stage.element(1).unwrap().font, None);
    }

    #[test]
    fn menu_get_selection_reports_current_row() {
        let mut host = MemoryHost::new();
        host.menu.selection = MenuIndex::new(2, 5);
        assert_eq!(
            handle(&mut host, &Command::MenuGetSelection),
            Some(FollowUp::ReportMenuSelection(MenuIndex::new(2, 5)))
        );
    }

    #[test]
    fn card_fields_are_clamped() {
        let mut host = MemoryHost::new();
        handle(&mut host, &Command::CardText { index: 9, text: "b" });
        handle(&mut host, &Command::CardImage { image: 3, index: 9 });
        assert_eq!(host.card.text(CardField::Body), "b");
        assert_eq!(host.card.images[CARD_IMAGE_FIELDS - 1], 3);
    }

    #[test]
    fn vibe_kinds_map_to_pulses() {
        let mut host = MemoryHost::new();
        for kind in [0, 1, 2, 7] {
            handle(&mut host, &Command::Vibe { kind });
        }
        assert_eq!(
            host.vibes.pulses,
            vec![VibeKind::Short, VibeKind::Long, VibeKind::Double]
        );
    }

    #[test]
    fn insert_then_frame_update() {
        let mut host = host_with_text_element(3);
        handle(
            &mut host,
            &Command::ElementCommon {
                id: 3,
                frame: Rect::new(1, 2, 3, 4),
                background: Color::BLACK,
                border: Color::WHITE,
            },
        );
        let element = host.stage.element_mut(3).unwrap();
        assert_eq!(element.frame, Rect::new(1, 2, 3, 4));
        assert_eq!(element.border, Color::WHITE);
    }
}
