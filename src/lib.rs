use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use nih_plug::{nih_export_vst3, prelude::*};

mod cascade;
mod diagnostic;
mod dispatch;
mod editor;
mod params;
mod processor;
mod util;

use cascade::{scale::ScaleDefinition, Direction};
use diagnostic::NihLogSink;
use editor::LastEcho;
use params::CascadeParams;
use processor::{CascadeProcessor, HostTiming};

struct CascadePlugin {
    params: Arc<CascadeParams>,

    processor: CascadeProcessor<NihLogSink>,

    last_echo: LastEcho,
}

impl Default for CascadePlugin {
    fn default() -> Self {
        Self {
            params: Arc::new(CascadeParams::default()),

            processor: CascadeProcessor::new(ScaleDefinition::a_minor(), NihLogSink, NihLogSink),

            last_echo: Arc::new(AtomicCell::new(None)),
        }
    }
}

impl Plugin for CascadePlugin {
    const NAME: &'static str = "Midi Cascade";

    const VENDOR: &'static str = "SciDev5";

    const URL: &'static str = "no";

    const EMAIL: &'static str = "no";

    const VERSION: &'static str = "0.1.0";

    // MIDI in, MIDI out, no audio
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[];

    const MIDI_INPUT: MidiConfig = MidiConfig::Basic;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::Basic;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        nih_log!("cascade running at {} Hz", buffer_config.sample_rate);
        self.reset();

        true
    }

    fn reset(&mut self) {
        self.processor.reset();
        self.last_echo.store(None);
    }

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn editor(&mut self, _async_executor: AsyncExecutor<Self>) -> Option<Box<dyn Editor>> {
        editor::create(
            self.params.clone(),
            self.last_echo.clone(),
            self.params.editor_state.clone(),
        )
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.processor.begin_block(
            HostTiming::from_transport(context.transport()),
            buffer.samples(),
            self.params.scale.value().definition(),
        );

        // :::::::::::::::::::::: MIDI IN :::::::::::::::::::::: //

        while let Some(event) = context.next_event() {
            self.processor.handle_event(event);
        }

        // :::::::::::::::::::::: MIDI OUT :::::::::::::::::::::: //

        let direction = Direction::from_normalized(self.params.direction.value());
        if let Some(echo) = self
            .processor
            .finish_block(direction, |event| context.send_event(event))
        {
            self.last_echo.store(Some(echo));
        }

        ProcessStatus::Normal
    }
}

impl ClapPlugin for CascadePlugin {
    const CLAP_ID: &'static str = "me.scidev5.midi-cascade";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Echoes held notes down or up the scale on every eighth note");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[ClapFeature::NoteEffect, ClapFeature::Utility];
}

impl Vst3Plugin for CascadePlugin {
    const VST3_CLASS_ID: [u8; 16] = *b"MidiCascade_____";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Instrument, Vst3SubCategory::Tools];
}

nih_export_clap!(CascadePlugin);
nih_export_vst3!(CascadePlugin);
