use std::sync::Arc;

use nih_plug::prelude::*;
use nih_plug_vizia::ViziaState;

use crate::{cascade::scale::ScaleDefinition, editor};

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleChoice {
    #[name = "A Minor"]
    Minor,
    #[name = "C Major"]
    Major,
}

impl ScaleChoice {
    pub fn definition(self) -> ScaleDefinition {
        match self {
            Self::Minor => ScaleDefinition::a_minor(),
            Self::Major => ScaleDefinition::c_major(),
        }
    }
}

#[derive(Params)]
pub struct CascadeParams {
    #[persist = "editor-state"]
    pub editor_state: Arc<ViziaState>,

    /// Above 0.5 the cascade walks up the scale, otherwise down.
    #[id = "direction"]
    pub direction: FloatParam,

    #[id = "scale"]
    pub scale: EnumParam<ScaleChoice>,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            editor_state: editor::default_state(),

            direction: FloatParam::new("Down/Up", 1.0, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_step_size(1.0)
                .with_value_to_string(Arc::new(|value| {
                    if value > 0.5 { "Up" } else { "Down" }.to_string()
                })),

            scale: EnumParam::new("Scale", ScaleChoice::Minor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_choices_map_to_their_definitions() {
        assert_eq!(ScaleChoice::Minor.definition().pitch_classes()[0], 9);
        assert_eq!(ScaleChoice::Major.definition().pitch_classes()[0], 0);
    }

    #[test]
    fn defaults_walk_up_a_minor() {
        let params = CascadeParams::default();
        assert_eq!(params.direction.value(), 1.0);
        assert_eq!(params.scale.value(), ScaleChoice::Minor);
    }
}
