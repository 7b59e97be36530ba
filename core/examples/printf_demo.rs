//! Example: Capture printf output over a few frames.
//!
//! A host-side producer stands in for the shader, writing records into the
//! channel while it is armed. Pass `--gpu` to run the same capture against a
//! real device buffer.
//!
//! Run with:
//!     cargo run --example printf_demo
//!     cargo run --example printf_demo -- --gpu

use anyhow::Context;
use gpu_printf::{
    init_logging, FrameId, GpuContext, MemoryBackend, PrintfConfig, RecordEncoder, ShaderPrintf,
};

fn frame_records(frame: FrameId) -> RecordEncoder {
    let t = frame.0 as f32 * 0.25;
    let mut enc = RecordEncoder::new();
    enc.set_suffix(0)
        .text("frame ")
        .uints(&[frame.0 as u32])
        .set_suffix(b'\n')
        .char(b':')
        .floats(&[t, t * t])
        .matrix(2, 2, &[1.0, 0.0, t, 1.0]);
    enc
}

fn run_in_memory(config: PrintfConfig) -> anyhow::Result<()> {
    let mut printf = ShaderPrintf::<MemoryBackend>::in_memory(config)?;

    let mut frame = FrameId(0);
    for _ in 0..3 {
        printf.capture(frame, |backend| backend.produce(&frame_records(frame)));
        report(frame, &printf);
        frame = frame.next();
    }
    Ok(())
}

fn run_on_gpu(config: PrintfConfig) -> anyhow::Result<()> {
    let ctx = GpuContext::new_blocking().context("No GPU available")?;
    let mut printf = ShaderPrintf::with_wgpu(&ctx, config, 0)?;

    let mut frame = FrameId(0);
    for _ in 0..3 {
        let words = frame_records(frame).finish();
        printf.capture(frame, |backend| backend.upload(0, &words));
        report(frame, &printf);
        frame = frame.next();
    }
    Ok(())
}

fn report<B: gpu_printf::ChannelBackend>(frame: FrameId, printf: &ShaderPrintf<B>) {
    if printf.has_output() {
        println!("--- frame {} ---", frame);
        print!("{}", printf.output());
    } else {
        println!("--- frame {} (no output) ---", frame);
    }
    if let Some(issue) = printf.last_issue() {
        println!("  incomplete: {}", issue);
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(None);

    println!("GPU Printf - Capture Example");
    println!("============================\n");

    let config = PrintfConfig {
        capacity_words: 4096,
        decode_once: false,
        float_format: "%.2f".to_string(),
        ..Default::default()
    };
    println!("Config:\n{}\n", config.to_json()?);

    if std::env::args().any(|a| a == "--gpu") {
        run_on_gpu(config)
    } else {
        run_in_memory(config)
    }
}
