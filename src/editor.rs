use crossbeam::atomic::AtomicCell;
use nih_plug::prelude::Editor;
use nih_plug_vizia::vizia::prelude::*;
use nih_plug_vizia::widgets::*;
use nih_plug_vizia::{assets, create_vizia_editor, ViziaState, ViziaTheming};
use std::sync::Arc;

use crate::cascade::Echo;
use crate::params::CascadeParams;
use crate::util::NoteName;

/// The most recent echo the audio thread produced.
pub type LastEcho = Arc<AtomicCell<Option<Echo>>>;

fn describe_echo(echo: Option<Echo>) -> String {
    match echo {
        Some(Echo { pitch, steps, .. }) => format!("{} (step {})", NoteName(pitch), steps),
        None => "-".to_string(),
    }
}

#[derive(Lens)]
struct Data {
    params: Arc<CascadeParams>,
    last_echo: LastEcho,
}

impl Model for Data {}

pub(crate) fn default_state() -> Arc<ViziaState> {
    ViziaState::new(|| (220, 240))
}

pub(crate) fn create(
    params: Arc<CascadeParams>,
    last_echo: LastEcho,
    editor_state: Arc<ViziaState>,
) -> Option<Box<dyn Editor>> {
    create_vizia_editor(editor_state, ViziaTheming::Custom, move |cx, _| {
        assets::register_noto_sans_light(cx);
        assets::register_noto_sans_thin(cx);

        Data {
            params: params.clone(),
            last_echo: last_echo.clone(),
        }
        .build(cx);

        ResizeHandle::new(cx);

        VStack::new(cx, |cx| {
            Label::new(cx, "Cascade")
                .font_family(vec![FamilyOwned::Name(String::from(
                    assets::NOTO_SANS_THIN,
                ))])
                .font_size(30.0)
                .height(Pixels(50.0))
                .child_top(Stretch(1.0))
                .child_bottom(Pixels(0.0));

            Label::new(cx, "Down/Up");
            ParamSlider::new(cx, Data::params, |params| &params.direction);

            Label::new(cx, "Scale");
            ParamSlider::new(cx, Data::params, |params| &params.scale);

            Label::new(cx, "Last echo").top(Pixels(10.0));
            // polled on every redraw, like a meter
            Label::new(
                cx,
                Data::last_echo.map(|last_echo| describe_echo(last_echo.load())),
            );
        })
        .row_between(Pixels(0.0))
        .child_left(Stretch(1.0))
        .child_right(Stretch(1.0));
    })
}
