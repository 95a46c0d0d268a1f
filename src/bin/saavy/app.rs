//! Saavy - plays one note of a compiled network through the default device

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

use saavy_params::{
    network::{CompiledNetwork, NetworkVoice},
    NoteCtx, RenderConfig, MAX_BLOCK_SIZE,
};

/// Note player builder
pub struct Saavy {
    network: Arc<CompiledNetwork>,
    note: NoteCtx,
    hold: Duration,
    tail: Duration,
    control_period: usize,
}

impl Saavy {
    pub fn new(network: CompiledNetwork, note: NoteCtx) -> Self {
        Self {
            network: Arc::new(network),
            note,
            hold: Duration::from_secs(1),
            tail: Duration::from_secs(1),
            control_period: RenderConfig::default().control_period,
        }
    }

    /// How long the key is held before the release events go out
    pub fn hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// How long to keep the stream open after release
    pub fn tail(mut self, tail: Duration) -> Self {
        self.tail = tail;
        self
    }

    pub fn control_period(mut self, samples: usize) -> Self {
        self.control_period = samples;
        self
    }

    /// Open the output stream, play, release, and return
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let cfg = RenderConfig::new(sample_rate)
            .with_control_period(self.control_period)
            .with_tempo(self.note.tempo);
        let (mut voice, mut handle) =
            NetworkVoice::with_handle(self.network.clone(), &cfg).wrap_err("invalid render config")?;
        voice
            .note_on(self.note)
            .map_err(|e| eyre!("note on failed: {e}"))?;

        info!(
            sample_rate,
            channels,
            control = self.network.control_statements().len(),
            data = self.network.data_statements().len(),
            "starting playback"
        );

        let mut left = vec![0.0f32; MAX_BLOCK_SIZE];
        let mut right = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let (l, r) = (&mut left[..frames], &mut right[..frames]);

                    if let Err(err) = voice.render(l, r) {
                        error!(%err, "formula failed, muting voice");
                        voice.kill();
                        l.fill(0.0);
                        r.fill(0.0);
                    }

                    let out_off = frames_written * channels;
                    for i in 0..frames {
                        for ch in 0..channels {
                            // Left on even channels, right on odd
                            let s = if ch % 2 == 0 { l[i] } else { r[i] };
                            data[out_off + i * channels + ch] = s;
                        }
                    }
                    frames_written += frames;
                }
            },
            |err| error!(%err, "audio stream error"),
            None,
        )?;

        stream.play()?;

        std::thread::sleep(self.hold);
        info!("releasing note");
        handle.release_all();
        std::thread::sleep(self.tail);
        Ok(())
    }
}
