// Copyright 2026 lsbshaper developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Note that clippy attributes should be in sync with those declared in "lib.rs"
#![warn(clippy::all, clippy::nursery, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate
)]
// Some from restriction lint-group
#![warn(
    clippy::clone_on_ref_ptr,
    clippy::create_dir,
    clippy::dbg_macro,
    clippy::empty_structs_with_brackets,
    clippy::exit,
    clippy::if_then_some_else_none,
    clippy::impl_trait_in_params,
    clippy::let_underscore_must_use,
    clippy::lossy_float_literal,
    clippy::multiple_inherent_impl,
    clippy::print_stdout,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::separated_literal_suffix,
    clippy::str_to_string,
    clippy::string_add,
    clippy::string_to_string,
    clippy::try_err,
    clippy::unnecessary_self_imports,
    clippy::wildcard_enum_match_arm
)]

use std::time::Instant;

use clap::Parser;
use log::info;

use lsbshaper::config;
use lsbshaper::error::TranscodeError;
use lsbshaper::error::Verify;
use lsbshaper::source::Source;

mod display;
mod source;

use display::Progress;
use source::WavSink;
use source::WavSource;

/// Environment variable for the log filter.
const LOG_ENV_NAME: &str = "LSBSHAPER_LOG";

/// PCM bit-depth reducer with first-order noise shaping.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path for the input WAV file.
    #[clap(short, long)]
    input: String,
    /// Path for the output WAV file.
    #[clap(short, long)]
    output: String,
    /// Output bit-depth (8 or 16). Overrides the config file.
    #[clap(short, long)]
    bits: Option<usize>,
    /// If set, clip to the output range while integrating.
    #[clap(long)]
    clip: bool,
    /// If set, do not reduce the output full-scale by one LSB.
    #[clap(long)]
    no_reduce: bool,
    /// If set, log run details.
    #[clap(short, long)]
    verbose: bool,
    /// If set, load config from the specified file.
    #[clap(short, long)]
    config: Option<String>,
    /// If set, dump the config used to the specified path.
    #[clap(long)]
    dump_config: Option<String>,
}

/// Exit codes of the process.
enum ExitCode {
    #[allow(dead_code)]
    Normal = 0,
    InvalidConfig = -1,
    IoError = -2,
}

/// Loads the config file if given, and applies the command-line overrides.
fn load_config(args: &Args) -> Result<config::Transcode, i32> {
    let mut transcode_config = match &args.config {
        None => config::Transcode::default(),
        Some(path) => {
            let conf_str = std::fs::read_to_string(path).map_err(|e| {
                eprintln!("Error: cannot read config file \"{path}\": {e}");
                ExitCode::InvalidConfig as i32
            })?;
            toml::from_str(&conf_str).map_err(|e| {
                eprintln!("Error: config file syntax error: {e}");
                ExitCode::InvalidConfig as i32
            })?
        }
    };
    if let Some(bits) = args.bits {
        transcode_config.output_bits = bits;
    }
    transcode_config.clip_during_integration |= args.clip;
    transcode_config.reduce_headroom &= !args.no_reduce;
    transcode_config.verbose |= args.verbose;

    if let Err(e) = transcode_config.verify() {
        eprintln!("Error: {}", e.within("transcode_config"));
        return Err(ExitCode::InvalidConfig as i32);
    }
    Ok(transcode_config)
}

fn log_build_constants() {
    info!(
        target: "lsbshaper-bin::build_info::jsonl",
        "{{ version: \"{}\" }}",
        lsbshaper::constant::build_info::CRATE_VERSION,
    );
}

#[allow(clippy::wildcard_enum_match_arm)]
const fn exit_code_for(err: &TranscodeError) -> ExitCode {
    match err {
        TranscodeError::Config(_) => ExitCode::InvalidConfig,
        _ => ExitCode::IoError,
    }
}

#[allow(clippy::let_underscore_must_use)]
fn main_body(args: &Args, transcode_config: &config::Transcode) -> Result<(), i32> {
    let io_info = display::IoArgs::new(&args.config, &args.input, &args.output);
    let _ = display::show_banner();
    log_build_constants();

    if let Some(path) = &args.dump_config {
        let dumped = toml::to_string(transcode_config).map_err(|e| {
            eprintln!("Error: cannot serialize config: {e}");
            ExitCode::InvalidConfig as i32
        })?;
        std::fs::write(path, dumped).map_err(|e| {
            eprintln!("Error: cannot write config to \"{path}\": {e}");
            ExitCode::IoError as i32
        })?;
    }

    let mut source = WavSource::from_path(&args.input).map_err(|e| {
        eprintln!("Error: {e}");
        ExitCode::IoError as i32
    })?;
    let output_width = transcode_config.output_width().map_err(|e| {
        eprintln!("Error: {e}");
        ExitCode::InvalidConfig as i32
    })?;
    let mut sink = WavSink::create(&args.output, &source.params().with_width(output_width))
        .map_err(|e| {
            eprintln!("Error: {e}");
            ExitCode::IoError as i32
        })?;

    let _ = display::show_progress(
        &io_info,
        &Progress::Started {
            input_bits: source.params().width().bits(),
            output_bits: output_width.bits(),
        },
    );
    let source_duration_secs = source.params().duration_as_secs();
    let start = Instant::now();

    let mut last_reported = 0;
    let stats = lsbshaper::transcode_with_progress(
        transcode_config,
        &mut source,
        &mut sink,
        |done, total| {
            let percent = if total == 0 { 100 } else { done * 100 / total };
            if percent >= last_reported + 25 {
                last_reported = percent - percent % 25;
                let _ = display::show_progress(&io_info, &Progress::Running { percent });
            }
        },
    )
    .map_err(|e| {
        eprintln!("Error: {e}");
        exit_code_for(&e) as i32
    })?;

    let _ = display::show_progress(
        &io_info,
        &Progress::Done {
            elapsed: start.elapsed(),
            stats,
            source_duration_secs,
        },
    );
    Ok(())
}

fn main() -> Result<(), i32> {
    let args = Args::parse();
    let transcode_config = load_config(&args)?;
    let default_level = if transcode_config.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV_NAME, default_level))
        .format_timestamp(None)
        .init();
    main_body(&args, &transcode_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use lsbshaper::codec::SampleWidth;
    use lsbshaper::sigen;
    use lsbshaper::sigen::Signal;
    use lsbshaper::source::Sink;
    use lsbshaper::source::StreamParams;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("lsbshaper").chain(args.iter().copied()))
    }

    fn write_input(path: &Path, channels: usize, width: SampleWidth, frames: usize) {
        let mut per_channel = vec![];
        for ch in 0..channels {
            per_channel.push(
                sigen::Sine::new(30 + 7 * ch, 0.6)
                    .noise_with_seed(ch as u64, 0.1)
                    .to_vec_quantized(width, frames),
            );
        }
        let params = StreamParams::new(channels, width, 44100, frames);
        let mut sink = WavSink::create(path, &params).unwrap();
        let mut frame = vec![0i32; channels];
        for t in 0..frames {
            for (p, s) in frame.iter_mut().zip(&per_channel) {
                *p = s[t];
            }
            sink.write_frame(&frame).unwrap();
        }
        sink.finalize().unwrap();
    }

    #[test]
    fn command_line_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let conf_path = dir.path().join("conf.toml");
        std::fs::write(&conf_path, "output_bits = 16\nblock_frames = 10\n").unwrap();
        let conf_path = conf_path.to_string_lossy().to_string();

        let args = parse(&["-i", "a.wav", "-o", "b.wav", "-c", conf_path.as_str()]);
        let conf = load_config(&args).unwrap();
        assert_eq!(conf.output_bits, 16);
        assert_eq!(conf.block_frames, 10);
        assert!(conf.reduce_headroom);

        let args = parse(&[
            "-i",
            "a.wav",
            "-o",
            "b.wav",
            "-c",
            conf_path.as_str(),
            "-b",
            "8",
            "--clip",
            "--no-reduce",
            "--verbose",
        ]);
        let conf = load_config(&args).unwrap();
        assert_eq!(conf.output_bits, 8);
        assert_eq!(conf.block_frames, 10);
        assert!(conf.clip_during_integration);
        assert!(!conf.reduce_headroom);
        assert!(conf.verbose);
    }

    #[test]
    fn invalid_config_exits_with_config_code() {
        let args = parse(&["-i", "a.wav", "-o", "b.wav", "-b", "12"]);
        assert_eq!(load_config(&args).unwrap_err(), -1);

        let dir = tempfile::tempdir().unwrap();
        let conf_path = dir.path().join("broken.toml");
        std::fs::write(&conf_path, "output_bits = \"eight\"").unwrap();
        let conf_path = conf_path.to_string_lossy().to_string();
        let args = parse(&["-i", "a.wav", "-o", "b.wav", "-c", conf_path.as_str()]);
        assert_eq!(load_config(&args).unwrap_err(), -1);
    }

    #[test]
    fn missing_input_exits_with_io_code() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.wav").to_string_lossy().to_string();
        let output = dir.path().join("out.wav").to_string_lossy().to_string();
        let args = parse(&["-i", input.as_str(), "-o", output.as_str()]);
        let conf = load_config(&args).unwrap();
        assert_eq!(main_body(&args, &conf).unwrap_err(), -2);
    }

    #[rstest]
    fn wav_round_trip(
        #[values(SampleWidth::U8, SampleWidth::S16, SampleWidth::S24)] input_width: SampleWidth,
        #[values("8", "16")] bits: &str,
        #[values(false, true)] clip: bool,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        let dumped = dir.path().join("dumped.toml");
        write_input(&input, 3, input_width, 1234);

        let input = input.to_string_lossy().to_string();
        let output_str = output.to_string_lossy().to_string();
        let dumped_str = dumped.to_string_lossy().to_string();
        let mut argv = vec!["-i", input.as_str(), "-o", output_str.as_str(), "-b", bits];
        argv.extend(["--dump-config", dumped_str.as_str()]);
        if clip {
            argv.push("--clip");
        }
        let args = parse(&argv);
        let conf = load_config(&args).unwrap();
        main_body(&args, &conf).expect("transcode failed");

        let dumped: config::Transcode =
            toml::from_str(&std::fs::read_to_string(&dumped).unwrap()).unwrap();
        assert_eq!(dumped, conf);

        let mut reader = hound::WavReader::open(&output).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 3);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample.to_string(), bits);
        assert_eq!(reader.duration(), 1234);

        if bits == "8" {
            // hound reports 8-bit samples re-centered around zero.
            let samples: Vec<i8> = reader.samples::<i8>().map(Result::unwrap).collect();
            assert_eq!(samples.len(), 3 * 1234);
        } else {
            let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
            assert_eq!(samples.len(), 3 * 1234);
            assert!(samples.iter().any(|v| *v != 0));
        }

        let reread = WavSource::from_path(&output).unwrap();
        assert_eq!(reread.params().frame_count(), 1234);
        assert_eq!(reread.params().width().bits().to_string(), bits);
    }
}
