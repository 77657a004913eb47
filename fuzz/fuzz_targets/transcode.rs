#![no_main]

use arbitrary::Arbitrary;
use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

use lsbshaper::codec::SampleWidth;
use lsbshaper::config;
use lsbshaper::sigen;
use lsbshaper::sigen::Signal;
use lsbshaper::source::MemSink;
use lsbshaper::source::MemSource;
use lsbshaper::source::Source;
use lsbshaper::transcode;

const MAX_CHANNELS: usize = 8;
const MAX_FRAMES: usize = 4096;

fn unit_float(u: &mut Unstructured) -> Result<f32, arbitrary::Error> {
    Ok(u32::arbitrary(u)? as f32 / u32::MAX as f32)
}

fn arbitrary_config(u: &mut Unstructured) -> Result<config::Transcode, arbitrary::Error> {
    Ok(config::Transcode {
        output_bits: *u.choose(&[8usize, 16])?,
        clip_during_integration: bool::arbitrary(u)?,
        reduce_headroom: bool::arbitrary(u)?,
        verbose: false,
        block_frames: u.int_in_range(1..=512usize)?,
    })
}

fn arbitrary_signal(u: &mut Unstructured, depth: usize) -> Result<Box<dyn Signal>, arbitrary::Error> {
    let do_clip = bool::arbitrary(u)?;
    let max_kind = if depth > 2 { 2 } else { 3 };
    let unclipped: Box<dyn Signal> = match u.int_in_range(0..=max_kind)? {
        0 => Box::new(sigen::Dc::new(2.0 * unit_float(u)? - 1.0)),
        1 => Box::new(sigen::Noise::with_seed(u64::arbitrary(u)?, 2.0 * unit_float(u)?)),
        2 => {
            let amplitude = 2.0 * unit_float(u)?;
            let phase = unit_float(u)? * 2.0 * std::f32::consts::PI;
            let period = u.int_in_range(1..=MAX_FRAMES)?;
            Box::new(sigen::Sine::with_initial_phase(period, amplitude, phase))
        }
        3 => {
            let mix_fraction = unit_float(u)?;
            let signal1 = arbitrary_signal(u, depth + 1)?;
            let signal2 = arbitrary_signal(u, depth + 1)?;
            Box::new(sigen::Mix::new(
                mix_fraction,
                signal1,
                1.0 - mix_fraction,
                signal2,
            ))
        }
        _ => unreachable!(),
    };
    if do_clip {
        Ok(Box::new(unclipped.clip()))
    } else {
        Ok(unclipped)
    }
}

#[derive(Debug)]
struct Input {
    channel_count: usize,
    frame_count: usize,
    width: SampleWidth,
    config: config::Transcode,
    signals: Vec<Box<dyn Signal>>,
}

impl Input {
    fn interleaved(&self) -> Vec<i32> {
        let mut buffer = vec![0i32; self.channel_count * self.frame_count];
        for (ch, sig) in self.signals.iter().enumerate() {
            for (t, x) in sig
                .to_vec_quantized(self.width, self.frame_count)
                .into_iter()
                .enumerate()
            {
                buffer[t * self.channel_count + ch] = x;
            }
        }
        buffer
    }
}

impl<'a> Arbitrary<'a> for Input {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self, arbitrary::Error> {
        let channel_count = u.int_in_range(1..=MAX_CHANNELS)?;
        let frame_count = u.int_in_range(0..=MAX_FRAMES)?;
        let width = *u.choose(&SampleWidth::ALL)?;
        let config = arbitrary_config(u)?;
        let mut signals = vec![];
        for _ch in 0..channel_count {
            signals.push(arbitrary_signal(u, 0)?);
        }
        Ok(Self {
            channel_count,
            frame_count,
            width,
            config,
            signals,
        })
    }
}

fuzz_target!(|input: Input| {
    let samples = input.interleaved();
    let mut source = MemSource::from_samples(&samples, input.channel_count, input.width, 44100);
    let output_width = input.config.output_width().unwrap();
    let mut sink = MemSink::new(source.params().with_width(output_width));

    let stats = transcode(&input.config, &mut source, &mut sink).unwrap();
    assert_eq!(stats.frames, input.frame_count);
    assert!(sink.is_finalized());

    let decoded = sink.to_samples().unwrap();
    assert_eq!(decoded.len(), samples.len());
    assert!(decoded.iter().all(|v| output_width.contains(i64::from(*v))));
    if input.config.clip_during_integration {
        assert_eq!(stats.write_clips, 0);
    }
    if input.width == output_width && !input.config.reduce_headroom {
        assert_eq!(decoded, samples);
    }
});
