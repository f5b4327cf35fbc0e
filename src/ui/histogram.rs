/// Histogram panel
/// Shows the rasterized RGB plot; the placeholder curve gets an "RGB" caption
use iced::widget::image::{FilterMethod, Handle};
use iced::widget::{container, stack, text, Image};
use iced::{Color, ContentFit, Element, Length};

use crate::render::histogram::{render_plot, HistogramPlot, PLOT_HEIGHT, PLOT_WIDTH};
use crate::Message;

const CAPTION_COLOR: Color = Color::from_rgb(0.4, 0.4, 0.4);

/// Plot surface plus whether it is the placeholder
#[derive(Debug, Clone)]
pub struct HistogramView {
    pub handle: Handle,
    pub placeholder: bool,
}

impl From<&HistogramPlot> for HistogramView {
    fn from(plot: &HistogramPlot) -> Self {
        let surface = render_plot(plot, PLOT_WIDTH, PLOT_HEIGHT);
        Self {
            handle: Handle::from_rgba(PLOT_WIDTH, PLOT_HEIGHT, surface.into_raw()),
            placeholder: plot.is_placeholder(),
        }
    }
}

pub fn view(histogram: Option<&HistogramView>) -> Element<'_, Message> {
    let Some(histogram) = histogram else {
        return container(text(""))
            .width(Length::Fill)
            .height(PLOT_HEIGHT as f32)
            .into();
    };

    let plot = Image::new(histogram.handle.clone())
        .content_fit(ContentFit::Fill)
        .filter_method(FilterMethod::Nearest)
        .width(Length::Fill)
        .height(PLOT_HEIGHT as f32);

    if histogram.placeholder {
        let caption = container(text("RGB").size(10).color(CAPTION_COLOR))
            .center_x(Length::Fill)
            .center_y(Length::Fill);
        stack![plot, caption].height(PLOT_HEIGHT as f32).into()
    } else {
        plot.into()
    }
}
