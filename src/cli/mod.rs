// Copyright 2025-2026 parfor contributors
// SPDX-License-Identifier: Apache-2.0

//! Demo command: parallel block compression of one input file.
//!
//! The input is memory-mapped and split into fixed-size blocks; each block
//! is compressed independently into its own gzip member (one scheduler
//! index = one block), and the members are concatenated into a valid
//! multi-member gzip file. A single-threaded reference pass runs first so
//! the printout can report speedup.
//!
//! This is glue over [`parallel_for`]: all per-block success tracking
//! lives in caller-owned state, which the scheduler never inspects.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config::EnvConfig;
use crate::scheduler::{parallel_for, Options, ScheduleConfig};

/// Parsed demo invocation.
#[derive(Debug, Clone)]
pub struct CompressArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub threads: usize,
    pub chunk: i64,
    pub block_bytes: usize,
    pub level: u32,
    pub pin: bool,
    pub realtime: bool,
}

/// One block's caller-owned result slot. The exactly-once guarantee keeps
/// each slot's lock uncontended.
#[derive(Default)]
struct BlockSlot {
    compressed: Option<Vec<u8>>,
}

pub fn print_usage() {
    eprintln!(
        "Usage: parfor-demo <input> [output] [options]\n\
         \n\
         Compresses <input> into concatenated gzip members, once single-threaded\n\
         and once through the parallel scheduler, and reports both timings.\n\
         Output defaults to <input>.gz.\n\
         \n\
         Options:\n\
           --threads <n>    worker threads (0 = one per core)\n\
           --chunk <n>      blocks claimed per atomic operation\n\
           --block-kb <n>   block size in KiB\n\
           --level <0-9>    compression level\n\
           --pin            pin each worker to one CPU\n\
           --realtime       request SCHED_FIFO per worker (best effort)\n\
         \n\
         Defaults come from PARFOR_* environment variables where set."
    );
}

/// Parse demo arguments on top of the environment defaults.
pub fn parse_args(args: &[String], defaults: &EnvConfig) -> Result<CompressArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut parsed = CompressArgs {
        input: PathBuf::new(),
        output: PathBuf::new(),
        threads: defaults.threads,
        chunk: defaults.chunk,
        block_bytes: defaults.block_bytes,
        level: defaults.level,
        pin: defaults.pin,
        realtime: defaults.realtime,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut flag_value = |name: &str| {
            iter.next()
                .map(|v| v.clone())
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match arg.as_str() {
            "--threads" => {
                let v = flag_value("--threads")?;
                parsed.threads = v.parse().map_err(|_| format!("bad thread count: {v}"))?;
            }
            "--chunk" => {
                let v = flag_value("--chunk")?;
                parsed.chunk = v.parse().map_err(|_| format!("bad chunk size: {v}"))?;
            }
            "--block-kb" => {
                let v = flag_value("--block-kb")?;
                let kb: usize = v.parse().map_err(|_| format!("bad block size: {v}"))?;
                if kb == 0 {
                    return Err("block size must be at least 1 KiB".to_string());
                }
                parsed.block_bytes = kb * 1024;
            }
            "--level" => {
                let v = flag_value("--level")?;
                let level: u32 = v.parse().map_err(|_| format!("bad level: {v}"))?;
                if level > 9 {
                    return Err(format!("compression level {level} out of range (0-9)"));
                }
                parsed.level = level;
            }
            "--pin" => parsed.pin = true,
            "--realtime" => parsed.realtime = true,
            other if other.starts_with("--") => {
                return Err(format!("unknown option: {other}"));
            }
            positional => {
                if input.is_none() {
                    input = Some(PathBuf::from(positional));
                } else if output.is_none() {
                    output = Some(PathBuf::from(positional));
                } else {
                    return Err(format!("unexpected argument: {positional}"));
                }
            }
        }
    }

    let input = input.ok_or_else(|| "missing input file".to_string())?;
    parsed.output = output.unwrap_or_else(|| {
        let mut out = input.as_os_str().to_owned();
        out.push(".gz");
        PathBuf::from(out)
    });
    parsed.input = input;
    Ok(parsed)
}

/// Run the demo. Returns a process exit code.
pub fn run_compress(args: &CompressArgs) -> i32 {
    let file = match std::fs::File::open(&args.input) {
        Ok(f) => f,
        Err(err) => {
            eprintln!("failed to open {}: {err}", args.input.display());
            return 1;
        }
    };
    let len = file.metadata().map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        eprintln!("{} is empty, nothing to compress", args.input.display());
        return 1;
    }

    // SAFETY: the mapping is read-only and dropped before the demo exits;
    // mutating the input file mid-run is outside the demo's contract.
    let data = match unsafe { memmap2::Mmap::map(&file) } {
        Ok(m) => m,
        Err(err) => {
            eprintln!("failed to map {}: {err}", args.input.display());
            return 1;
        }
    };

    let blocks: Vec<&[u8]> = data.chunks(args.block_bytes).collect();
    let mb = data.len() as f64 / (1024.0 * 1024.0);
    println!(
        "input: {} ({mb:.2} MiB, {} blocks of {} KiB)",
        args.input.display(),
        blocks.len(),
        args.block_bytes / 1024
    );

    // Single-threaded reference pass.
    let start = Instant::now();
    let mut reference: Vec<Vec<u8>> = Vec::with_capacity(blocks.len());
    for block in &blocks {
        match compress_block(block, args.level) {
            Ok(out) => reference.push(out),
            Err(err) => {
                eprintln!("compression failed: {err}");
                return 1;
            }
        }
    }
    let single = start.elapsed().as_secs_f64();
    println!("single-thread: {single:.3}s  ({:.2} MiB/s)", mb / single);
    drop(reference);

    // Parallel pass through the scheduler.
    let slots: Vec<Mutex<BlockSlot>> = (0..blocks.len()).map(|_| Mutex::default()).collect();
    let mut options = Options::empty();
    options.set(Options::PIN_CORE, args.pin);
    options.set(Options::REALTIME, args.realtime);
    let config = ScheduleConfig {
        chunk: args.chunk,
        threads: args.threads,
        options,
        stack_size: 0,
    };

    let start = Instant::now();
    let status = parallel_for(0, blocks.len() as i64, &config, |i| {
        let block = blocks[i as usize];
        // Failures stay in the slot; the scheduler never sees them.
        slots[i as usize].lock().unwrap().compressed = compress_block(block, args.level).ok();
    });
    let parallel = start.elapsed().as_secs_f64();

    if let Err(err) = status {
        eprintln!("parallel_for failed: {err} (status {})", err.code());
        return 1;
    }

    let mut members: Vec<Vec<u8>> = Vec::with_capacity(slots.len());
    for (i, slot) in slots.iter().enumerate() {
        match slot.lock().unwrap().compressed.take() {
            Some(out) => members.push(out),
            None => {
                eprintln!("block {i} failed to compress");
                return 1;
            }
        }
    }

    println!(
        "parallel ({} threads, chunk {}, pin {}): {parallel:.3}s  ({:.2} MiB/s)",
        if config.threads == 0 { "auto".to_string() } else { config.threads.to_string() },
        config.chunk.max(1),
        args.pin,
        mb / parallel
    );
    println!("speedup: {:.2}x", single / parallel);

    if let Err(err) = write_members(&args.output, &members) {
        eprintln!("failed to write {}: {err}", args.output.display());
        return 1;
    }
    let out_bytes: usize = members.iter().map(Vec::len).sum();
    println!(
        "wrote {} ({:.2} MiB, ratio {:.3})",
        args.output.display(),
        out_bytes as f64 / (1024.0 * 1024.0),
        out_bytes as f64 / data.len() as f64
    );
    0
}

/// Compress one block into a standalone gzip member.
fn compress_block(input: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let capacity = input.len() / 2 + 64;
    let mut encoder = GzEncoder::new(Vec::with_capacity(capacity), Compression::new(level));
    encoder.write_all(input)?;
    encoder.finish()
}

fn write_members(path: &std::path::Path, members: &[Vec<u8>]) -> std::io::Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    for member in members {
        out.write_all(member)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::MultiGzDecoder;

    use super::*;

    fn defaults() -> EnvConfig {
        EnvConfig {
            threads: 0,
            chunk: 1,
            block_bytes: 256 * 1024,
            level: 6,
            pin: false,
            realtime: false,
            log: Default::default(),
        }
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn args_default_output_appends_gz() {
        let args = parse_args(&strings(&["data.bin"]), &defaults()).unwrap();
        assert_eq!(args.input, PathBuf::from("data.bin"));
        assert_eq!(args.output, PathBuf::from("data.bin.gz"));
    }

    #[test]
    fn args_flags_override_env_defaults() {
        let args = parse_args(
            &strings(&[
                "in", "out", "--threads", "4", "--chunk", "8", "--block-kb", "64", "--level",
                "9", "--pin",
            ]),
            &defaults(),
        )
        .unwrap();
        assert_eq!(args.output, PathBuf::from("out"));
        assert_eq!(args.threads, 4);
        assert_eq!(args.chunk, 8);
        assert_eq!(args.block_bytes, 64 * 1024);
        assert_eq!(args.level, 9);
        assert!(args.pin);
        assert!(!args.realtime);
    }

    #[test]
    fn args_reject_garbage() {
        assert!(parse_args(&strings(&[]), &defaults()).is_err());
        assert!(parse_args(&strings(&["in", "--level", "12"]), &defaults()).is_err());
        assert!(parse_args(&strings(&["in", "--block-kb", "0"]), &defaults()).is_err());
        assert!(parse_args(&strings(&["in", "--frobnicate"]), &defaults()).is_err());
        assert!(parse_args(&strings(&["in", "--threads"]), &defaults()).is_err());
    }

    #[test]
    fn compressed_blocks_round_trip() {
        let payload: Vec<u8> = (0..100_000u32).flat_map(|i| i.to_le_bytes()).collect();
        let members: Vec<Vec<u8>> = payload
            .chunks(16 * 1024)
            .map(|block| compress_block(block, 6).unwrap())
            .collect();

        // Concatenated members form one valid multi-member gzip stream.
        let concat: Vec<u8> = members.into_iter().flatten().collect();
        let mut restored = Vec::new();
        MultiGzDecoder::new(concat.as_slice())
            .read_to_end(&mut restored)
            .unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn end_to_end_compresses_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.bin");
        let payload: Vec<u8> = (0..64 * 1024u32).flat_map(|i| (i % 251).to_le_bytes()).collect();
        std::fs::write(&input, &payload).unwrap();

        let args = CompressArgs {
            input: input.clone(),
            output: dir.path().join("out.gz"),
            threads: 2,
            chunk: 1,
            block_bytes: 8 * 1024,
            level: 1,
            pin: false,
            realtime: false,
        };
        assert_eq!(run_compress(&args), 0);

        let compressed = std::fs::read(&args.output).unwrap();
        let mut restored = Vec::new();
        MultiGzDecoder::new(compressed.as_slice())
            .read_to_end(&mut restored)
            .unwrap();
        assert_eq!(restored, payload);
    }
}
