use cgmath::Vector2;
use iced::alignment;
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Program};
use iced::widget::image::{FilterMethod, Handle};
use iced::widget::{stack, Canvas, Image};
use iced::{Color, ContentFit, Element, Length, Point, Rectangle, Renderer, Theme};

use crate::render::viewport::{Badge, Frame};
use crate::Message;

/// Pointer input forwarded to the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down(Vector2<f32>),
    Moved(Vector2<f32>),
    /// Button released or cursor left the viewport
    Up,
    /// Positive scrolls down
    Wheel(f32),
}

/// A painted frame ready for the GPU
#[derive(Debug, Clone)]
pub struct ShownFrame {
    pub handle: Handle,
    pub width: u32,
    pub height: u32,
    pub badges: Vec<Badge>,
}

impl From<Frame> for ShownFrame {
    fn from(frame: Frame) -> Self {
        let (width, height) = frame.pixels.dimensions();
        Self {
            handle: Handle::from_rgba(width, height, frame.pixels.into_raw()),
            width,
            height,
            badges: frame.badges,
        }
    }
}

/// Transparent overlay on top of the painted frame: turns mouse events into
/// viewport messages and writes the badge labels
struct ViewportOverlay<'a> {
    frame: Option<&'a ShownFrame>,
    dragging: bool,
}

impl Program<Message> for ViewportOverlay<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        if let Some(shown) = self.frame {
            // The image widget centres the surface without scaling
            let origin_x = (bounds.width - shown.width as f32) / 2.0;
            let origin_y = (bounds.height - shown.height as f32) / 2.0;

            for badge in &shown.badges {
                let (x, y) = badge.text_origin();
                frame.fill_text(canvas::Text {
                    content: badge.label.to_string(),
                    position: Point::new(origin_x + x, origin_y + y),
                    color: Color::WHITE,
                    size: 12.0.into(),
                    vertical_alignment: alignment::Vertical::Bottom,
                    ..canvas::Text::default()
                });
            }
        }

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        _state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        let position = cursor
            .position_in(bounds)
            .map(|p| Vector2::new(p.x, p.y));

        match event {
            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if position.is_none() {
                    return (canvas::event::Status::Ignored, None);
                }
                let y = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => y,
                    mouse::ScrollDelta::Pixels { y, .. } => y,
                };
                if y == 0.0 {
                    return (canvas::event::Status::Ignored, None);
                }
                // iced reports scrolling up as positive
                let input = PointerInput::Wheel(-y);
                (canvas::event::Status::Captured, Some(Message::Pointer(input)))
            }

            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                match position {
                    Some(pos) => (
                        canvas::event::Status::Captured,
                        Some(Message::Pointer(PointerInput::Down(pos))),
                    ),
                    None => (canvas::event::Status::Ignored, None),
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left))
            | canvas::Event::Mouse(mouse::Event::CursorLeft)
                if self.dragging =>
            {
                (
                    canvas::event::Status::Captured,
                    Some(Message::Pointer(PointerInput::Up)),
                )
            }

            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) if self.dragging => {
                match position {
                    Some(pos) => (
                        canvas::event::Status::Captured,
                        Some(Message::Pointer(PointerInput::Moved(pos))),
                    ),
                    // Dragged out of the viewport
                    None => (
                        canvas::event::Status::Captured,
                        Some(Message::Pointer(PointerInput::Up)),
                    ),
                }
            }

            _ => (canvas::event::Status::Ignored, None),
        }
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if self.dragging {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }
}

/// The main photo view: painted surface plus the interaction overlay
pub fn view(frame: Option<&ShownFrame>, dragging: bool) -> Element<'_, Message> {
    let surface: Element<'_, Message> = match frame {
        Some(shown) => Image::new(shown.handle.clone())
            .content_fit(ContentFit::None)
            .filter_method(FilterMethod::Nearest)
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        None => iced::widget::Space::new(Length::Fill, Length::Fill).into(),
    };

    let overlay = Canvas::new(ViewportOverlay { frame, dragging })
        .width(Length::Fill)
        .height(Length::Fill);

    stack![surface, overlay].into()
}
